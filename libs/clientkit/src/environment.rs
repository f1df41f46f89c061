//! Configuration property sources consulted while resolving contract settings.

use std::collections::HashMap;
use std::sync::Arc;

/// Read-only view of the host's configuration properties.
pub trait Environment: Send + Sync {
    /// Value of `key`, or `None` if the property is not defined.
    fn property(&self, key: &str) -> Option<String>;
}

impl<E: Environment + ?Sized> Environment for Arc<E> {
    fn property(&self, key: &str) -> Option<String> {
        (**self).property(key)
    }
}

/// In-memory property map.
#[derive(Debug, Default, Clone)]
pub struct MapEnvironment {
    properties: HashMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            properties: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.properties.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Environment for MapEnvironment {
    fn property(&self, key: &str) -> Option<String> {
        self.properties.get(key).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Process environment variables.
///
/// A dotted key such as `payments.url` is looked up verbatim first, then in its
/// relaxed form `PAYMENTS_URL` (dots and dashes become underscores, upper-cased).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl ProcessEnvironment {
    pub fn relaxed_key(key: &str) -> String {
        key.chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl Environment for ProcessEnvironment {
    fn property(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .or_else(|| std::env::var(Self::relaxed_key(key)).ok())
    }
}

/// Ordered stack of environments; the first layer defining a key wins.
#[derive(Default, Clone)]
pub struct LayeredEnvironment {
    layers: Vec<Arc<dyn Environment>>,
}

impl LayeredEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with lower precedence than the ones already present.
    #[must_use]
    pub fn with_layer(mut self, layer: Arc<dyn Environment>) -> Self {
        self.layers.push(layer);
        self
    }
}

impl Environment for LayeredEnvironment {
    fn property(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.property(key))
    }
}
