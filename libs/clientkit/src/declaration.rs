//! Contract declarations and where they come from.
//!
//! A *declaration* is what the scanner sees: a fully-qualified type name, the kind of
//! item it is, and the markers it carries with their attribute maps. A *binding* is
//! what the factory needs to turn a configured [`ClientCore`] into an instance of the
//! contract. The two are looked up separately, so a declaration without a linked
//! binding surfaces as a [`ContractTypeLoadError`] instead of being silently dropped.
//!
//! `#[http_contract]` submits one [`ContractRegistration`] per trait via `inventory`;
//! [`InventorySource`] and [`InventoryTypes`] read them back.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::client::ClientCore;
use crate::codec::Encoder;
use crate::error::{ContractTypeLoadError, EncoderInstantiationError};

/// Name of the marker placed on HTTP contract traits.
pub const HTTP_CONTRACT_MARKER: &str = "http_contract";

/// Attribute name of the target base URL.
pub const URL_ATTRIBUTE: &str = "url";
/// Attribute name of the optional custom encoder.
pub const ENCODER_ATTRIBUTE: &str = "encoder";
/// Attribute name of the optional per-contract log level.
pub const LOG_LEVEL_ATTRIBUTE: &str = "log_level";

/// Constructs a contract instance from a configured client core.
///
/// The returned value is an `Arc<dyn Contract>` boxed as `Any`, so the registry
/// can hand it back typed via downcast.
pub type BindFn = fn(ClientCore) -> Arc<dyn Any + Send + Sync>;

/// Zero-argument constructor of an encoder type.
pub type EncoderCtor = fn() -> Result<Arc<dyn Encoder>, EncoderInstantiationError>;

/// Reference to an encoder *type*, instantiated once per contract at build time.
#[derive(Clone, Copy)]
pub struct EncoderRef {
    pub type_name: &'static str,
    pub instantiate: EncoderCtor,
}

impl EncoderRef {
    pub fn new(type_name: &'static str, instantiate: EncoderCtor) -> Self {
        Self {
            type_name,
            instantiate,
        }
    }

    /// Reference an encoder type implementing [`crate::codec::NewEncoder`].
    pub fn of<T: crate::codec::NewEncoder>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            instantiate: crate::codec::instantiate_encoder::<T>,
        }
    }
}

impl fmt::Debug for EncoderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncoderRef").field(&self.type_name).finish()
    }
}

/// Value of one marker attribute.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Text(String),
    Encoder(EncoderRef),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Encoder(_) => None,
        }
    }
}

/// Attributes of a marker, keyed by their declared names. Unset attributes are absent.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone)]
pub struct Marker {
    pub name: String,
    pub attributes: AttributeMap,
}

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: AttributeMap::new(),
        }
    }

    #[must_use]
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), AttributeValue::Text(value.into()));
        self
    }

    #[must_use]
    pub fn with_encoder(mut self, encoder: EncoderRef) -> Self {
        self.attributes
            .insert(ENCODER_ATTRIBUTE.to_owned(), AttributeValue::Encoder(encoder));
        self
    }
}

/// Kind of item a declaration describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// A trait; the only kind that can become a contract.
    Interface,
    /// A concrete type (struct or enum).
    Class,
    /// A marker definition itself.
    Annotation,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    /// Fully-qualified path, e.g. `app::clients::PaymentClient`.
    pub type_name: String,
    /// Module the declaration lives in, e.g. `app::clients`.
    pub module_path: String,
    pub kind: DeclarationKind,
    /// False for items nested inside another item (e.g. declared within a fn body).
    pub independent: bool,
    pub markers: Vec<Marker>,
}

impl Declaration {
    /// A top-level trait declaration without markers; the module path is derived from the type name.
    pub fn interface(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let module_path = type_name
            .rsplit_once("::")
            .map(|(module, _)| module.to_owned())
            .unwrap_or_default();
        Self {
            type_name,
            module_path,
            kind: DeclarationKind::Interface,
            independent: true,
            markers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: DeclarationKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn nested(mut self) -> Self {
        self.independent = false;
        self
    }

    #[must_use]
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// The marker with the given name, if the declaration carries it directly.
    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }
}

/// Anything that can enumerate declarations for the scanner.
pub trait DeclarationSource: Send + Sync {
    fn declarations(&self) -> Vec<Declaration>;
}

/// Static attribute form used inside `inventory` submissions.
#[derive(Debug, Clone, Copy)]
pub enum StaticAttribute {
    Text(&'static str),
    Encoder(EncoderRef),
}

/// The item `#[http_contract]` submits for every annotated trait.
pub struct ContractRegistration {
    pub type_name: &'static str,
    pub module_path: &'static str,
    pub attributes: &'static [(&'static str, StaticAttribute)],
    pub bind: BindFn,
}

inventory::collect!(ContractRegistration);

impl ContractRegistration {
    fn to_declaration(&self) -> Declaration {
        let attributes = self
            .attributes
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    StaticAttribute::Text(s) => AttributeValue::Text((*s).to_owned()),
                    StaticAttribute::Encoder(e) => AttributeValue::Encoder(*e),
                };
                ((*key).to_owned(), value)
            })
            .collect();

        Declaration {
            type_name: self.type_name.to_owned(),
            module_path: self.module_path.to_owned(),
            kind: DeclarationKind::Interface,
            independent: true,
            markers: vec![Marker {
                name: HTTP_CONTRACT_MARKER.to_owned(),
                attributes,
            }],
        }
    }
}

/// Every `#[http_contract]` trait linked into the current binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct InventorySource;

impl DeclarationSource for InventorySource {
    fn declarations(&self) -> Vec<Declaration> {
        inventory::iter::<ContractRegistration>
            .into_iter()
            .map(ContractRegistration::to_declaration)
            .collect()
    }
}

/// Explicit list of declarations, for hosts that declare contracts programmatically.
#[derive(Debug, Default, Clone)]
pub struct StaticSource {
    declarations: Vec<Declaration>,
}

impl StaticSource {
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Self { declarations }
    }

    pub fn push(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }
}

impl DeclarationSource for StaticSource {
    fn declarations(&self) -> Vec<Declaration> {
        self.declarations.clone()
    }
}

/// Runtime handle on a contract type: how to instantiate it over a client core.
#[derive(Clone, Copy)]
pub struct ContractBinding {
    pub type_name: &'static str,
    pub bind: BindFn,
}

impl fmt::Debug for ContractBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractBinding")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Resolves a declared type name to its runtime binding.
pub trait TypeResolver: Send + Sync {
    /// # Errors
    /// Returns [`ContractTypeLoadError`] if no binding exists for `type_name`.
    fn load(&self, type_name: &str) -> Result<ContractBinding, ContractTypeLoadError>;
}

/// Bindings generated by `#[http_contract]`, indexed once at construction.
pub struct InventoryTypes {
    by_name: HashMap<&'static str, ContractBinding>,
}

impl InventoryTypes {
    pub fn new() -> Self {
        let by_name = inventory::iter::<ContractRegistration>
            .into_iter()
            .map(|r| {
                (
                    r.type_name,
                    ContractBinding {
                        type_name: r.type_name,
                        bind: r.bind,
                    },
                )
            })
            .collect();
        Self { by_name }
    }
}

impl Default for InventoryTypes {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeResolver for InventoryTypes {
    fn load(&self, type_name: &str) -> Result<ContractBinding, ContractTypeLoadError> {
        self.by_name
            .get(type_name)
            .copied()
            .ok_or_else(|| ContractTypeLoadError {
                type_name: type_name.to_owned(),
            })
    }
}

/// Explicit binding table, the programmatic counterpart of [`InventoryTypes`].
#[derive(Debug, Default, Clone)]
pub struct StaticTypes {
    by_name: HashMap<String, ContractBinding>,
}

impl StaticTypes {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, type_name: &'static str, bind: BindFn) -> Self {
        self.by_name
            .insert(type_name.to_owned(), ContractBinding { type_name, bind });
        self
    }
}

impl TypeResolver for StaticTypes {
    fn load(&self, type_name: &str) -> Result<ContractBinding, ContractTypeLoadError> {
        self.by_name
            .get(type_name)
            .copied()
            .ok_or_else(|| ContractTypeLoadError {
                type_name: type_name.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind_unit(_core: ClientCore) -> Arc<dyn Any + Send + Sync> {
        Arc::new(())
    }

    #[test]
    fn interface_derives_module_path() {
        let d = Declaration::interface("app::clients::PaymentClient");
        assert_eq!(d.module_path, "app::clients");
        assert_eq!(d.kind, DeclarationKind::Interface);
        assert!(d.independent);

        let root = Declaration::interface("PaymentClient");
        assert_eq!(root.module_path, "");
    }

    #[test]
    fn marker_lookup_is_by_exact_name() {
        let d = Declaration::interface("app::A")
            .with_marker(Marker::new("other"))
            .with_marker(Marker::new(HTTP_CONTRACT_MARKER).with_text(URL_ATTRIBUTE, "https://a"));

        let marker = d.marker(HTTP_CONTRACT_MARKER).unwrap();
        assert_eq!(
            marker.attributes.get(URL_ATTRIBUTE).and_then(AttributeValue::as_text),
            Some("https://a")
        );
        assert!(d.marker("http").is_none());
    }

    #[test]
    fn static_types_resolve_known_and_reject_unknown() {
        let types = StaticTypes::new().with("app::A", bind_unit);
        assert_eq!(types.load("app::A").unwrap().type_name, "app::A");

        let err = types.load("app::B").unwrap_err();
        assert_eq!(err.type_name, "app::B");
    }

    #[test]
    fn encoder_ref_of_uses_type_name() {
        let r = EncoderRef::of::<crate::codec::FormEncoder>();
        assert!(r.type_name.ends_with("FormEncoder"));
        assert!((r.instantiate)().is_ok());
    }
}
