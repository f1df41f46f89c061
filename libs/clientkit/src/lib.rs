//! # ClientKit - Declarative HTTP Client Contracts
//!
//! Declare a remote API once as a trait, and ClientKit discovers it, configures it
//! from the running environment and publishes a ready HTTP client under a derived name.
//!
//! ## Features
//!
//! - **Declarative**: Use `#[http_contract(...)]` on a trait to declare a remote API
//! - **Auto-discovery**: Contracts are discovered via inventory, filtered by module path
//! - **Generated stubs**: Every trait method gets a compile-time generated HTTP call
//! - **Environment-aware**: `${key}` placeholders in URLs are resolved at startup
//! - **Explicit registry**: Clients land in a write-once [`ClientRegistry`], no globals
//!
//! ## Declaring a contract
//!
//! ```rust,ignore
//! use clientkit::{http_contract, ClientError};
//!
//! #[http_contract(url = "${payments.url}")]
//! #[clientkit::async_trait]
//! pub trait PaymentClient: Send + Sync {
//!     #[get("/payments/{id}")]
//!     async fn get_payment(&self, id: u64) -> Result<Payment, ClientError>;
//!
//!     #[post("/payments")]
//!     async fn create_payment(&self, body: NewPayment) -> Result<Payment, ClientError>;
//! }
//! ```
//!
//! ## Registering at startup
//!
//! ```rust,ignore
//! let env = Arc::new(MapEnvironment::from_pairs([
//!     ("clients.base-locations", "my_app::clients"),
//!     ("payments.url", "https://pay.internal"),
//! ]));
//! let (registry, report) = ClientsRegistrar::with_inventory(env).bootstrap()?;
//! let payments = registry.get::<dyn PaymentClient>("paymentClient")?;
//! ```
//!
//! ## Security
//!
//! The default transport trusts every server certificate (see [`tls`]). Switch
//! [`TransportConfig::trust`] to [`TrustPolicy::WebPki`] for public endpoints.

// Generated code refers to `::clientkit`, which must also resolve inside this crate.
extern crate self as clientkit;

pub use async_trait::async_trait;

// Re-export inventory for generated code
pub use inventory;

pub use clientkit_macros::http_contract;

#[doc(hidden)]
pub mod __private {
    pub use reqwest::Method;
}

pub mod client;
pub mod codec;
pub mod declaration;
pub mod environment;
pub mod error;
pub mod error_decoder;
pub mod factory;
pub mod logger;
pub mod registrar;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod scanner;
pub mod tls;

pub use client::{ClientCore, ClientResponse};
pub use codec::{Decoder, Encoder, FormEncoder, JsonDecoder, JsonEncoder, NewEncoder};
pub use declaration::{
    AttributeMap, AttributeValue, ContractBinding, ContractRegistration, Declaration,
    DeclarationKind, DeclarationSource, EncoderRef, InventorySource, InventoryTypes, Marker,
    StaticSource, StaticTypes, TypeResolver, HTTP_CONTRACT_MARKER,
};
pub use environment::{Environment, LayeredEnvironment, MapEnvironment, ProcessEnvironment};
pub use error::{
    ClientError, ConfigurationError, ContractError, ContractTypeLoadError, EncodeError,
    EncoderInstantiationError, ParseLogLevelError, RegistrationError, ScanError,
    TransportBuildError,
};
pub use error_decoder::{ErrorDecoder, StatusErrorDecoder};
pub use factory::{BuiltClient, ClientConfiguration, ClientFactory};
pub use logger::{HttpLogger, LogLevel};
pub use registrar::{
    registry_name, ClientsRegistrar, ContractFailure, EncoderFailurePolicy, RegistrarOptions,
    RegistrationReport,
};
pub use registry::{ClientRegistry, ClientRegistryBuilder, RegistryError, SingletonRegistry};
pub use request::RequestTemplate;
pub use resolver::{ConfigResolver, BASE_LOCATIONS_KEY, LOG_LEVEL_KEY};
pub use scanner::{ContractDescriptor, ContractScanner, SourceLocation};
pub use tls::{TransportConfig, TrustPolicy};
