//! Name-keyed registry of built clients.
//!
//! Written once by the registrar through [`ClientRegistryBuilder`], then frozen into an
//! immutable [`ClientRegistry`] shared via `Arc`. Consumers fetch by name and
//! *interface type*:
//!
//! ```rust,ignore
//! let payments: Arc<dyn PaymentClient> = registry.get::<dyn PaymentClient>("paymentClient")?;
//! ```
//!
//! Implementation details:
//! - Value = the `Arc<dyn Contract>` produced by the contract binding, stored as `Arc<dyn Any>`.
//! - `get::<T>()` downcasts to `Arc<T>`; asking for the wrong interface is a `TypeMismatch`.
//! - Re-registering a name overwrites the previous entry (last write wins) and logs a warning.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::factory::{BuiltClient, ClientConfiguration};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no client registered under '{name}'")]
    NotFound { name: String },

    #[error("client '{name}' is a {actual}, not a {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: String,
    },
}

/// Write side of the host registry, as seen by the registrar.
pub trait SingletonRegistry {
    /// Publish `client` under `name`, replacing any previous entry.
    fn register_singleton(&mut self, name: &str, client: BuiltClient);
}

#[derive(Debug, Default)]
pub struct ClientRegistryBuilder {
    entries: BTreeMap<String, BuiltClient>,
}

impl ClientRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Freeze into the read-only registry.
    pub fn build(self) -> ClientRegistry {
        ClientRegistry {
            entries: self.entries,
        }
    }
}

impl SingletonRegistry for ClientRegistryBuilder {
    fn register_singleton(&mut self, name: &str, client: BuiltClient) {
        if let Some(previous) = self.entries.insert(name.to_owned(), client) {
            tracing::warn!(
                name,
                replaced = %previous.type_name,
                "client name collision: previous registration replaced (last write wins)"
            );
        }
    }
}

/// Read-only name → client map populated by one registration pass.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    entries: BTreeMap<String, BuiltClient>,
}

impl ClientRegistry {
    /// Fetch the client registered under `name` as interface `T` (e.g. `dyn PaymentClient`).
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] for unknown names, [`RegistryError::TypeMismatch`] if the
    /// client does not implement `T`.
    pub fn get<T>(&self, name: &str) -> Result<Arc<T>, RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let entry = self.entries.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_owned(),
        })?;

        entry
            .instance
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or_else(|| RegistryError::TypeMismatch {
                name: name.to_owned(),
                expected: std::any::type_name::<T>(),
                actual: entry.type_name.clone(),
            })
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Configuration the client under `name` was built with.
    pub fn configuration(&self, name: &str) -> Option<&ClientConfiguration> {
        self.entries.get(name).map(|e| &e.configuration)
    }

    /// Fully-qualified contract type behind `name`.
    pub fn type_name(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.type_name.as_str())
    }
}
