use std::time::Duration;
use thiserror::Error;

/// A configured source location cannot be scanned.
///
/// Aborts the whole registration pass: this is a startup configuration error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScanError {
    #[error("invalid source location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },
}

/// A configuration value could not be resolved against the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("could not resolve placeholder '${{{key}}}' in value \"{raw}\"")]
    UnresolvedPlaceholder { raw: String, key: String },

    #[error("malformed placeholder in value \"{raw}\"")]
    MalformedPlaceholder { raw: String },

    #[error("circular reference to placeholder '${{{key}}}' in value \"{raw}\"")]
    CircularPlaceholder { raw: String, key: String },
}

/// A log level name outside `NONE`, `BASIC`, `HEADERS` and `FULL`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level '{0}' (expected NONE, BASIC, HEADERS or FULL)")]
pub struct ParseLogLevelError(pub String);

/// The runtime type behind a discovered declaration is unknown to the type resolver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("contract type '{type_name}' cannot be loaded: no client binding is linked into this binary")]
pub struct ContractTypeLoadError {
    pub type_name: String,
}

/// A custom encoder referenced by a contract could not be constructed.
#[derive(Debug, Error)]
#[error("failed to instantiate encoder '{encoder}': {reason}")]
pub struct EncoderInstantiationError {
    pub encoder: String,
    pub reason: String,
}

impl EncoderInstantiationError {
    pub fn new(encoder: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            encoder: encoder.into(),
            reason: reason.into(),
        }
    }
}

/// The HTTP transport (TLS context + connection pool) could not be assembled.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportBuildError {
    #[error("TLS configuration failed: {0}")]
    Tls(#[source] rustls::Error),

    #[error("HTTP transport construction failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid user agent '{0}'")]
    UserAgent(String),
}

/// Why one contract could not be registered.
///
/// Every variant is scoped to a single contract; the registrar reports it and
/// moves on to the next one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContractError {
    #[error(transparent)]
    TypeLoad(#[from] ContractTypeLoadError),

    #[error(transparent)]
    EncoderInstantiation(#[from] EncoderInstantiationError),

    #[error(transparent)]
    TransportBuild(#[from] TransportBuildError),

    #[error(transparent)]
    ConfigurationResolution(#[from] ConfigurationError),

    #[error("invalid target URL \"{url}\": {reason}")]
    InvalidTarget { url: String, reason: String },
}

/// Failure of the registration pass as a whole.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Only produced when the registrar runs with `fail_fast`.
    #[error("registration aborted at contract '{contract}'")]
    Aborted {
        contract: String,
        #[source]
        source: ContractError,
    },
}

/// Request body encoding failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodeError {
    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("form encoding failed: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),

    #[error("{encoder} cannot encode this body: {reason}")]
    Unsupported {
        encoder: &'static str,
        reason: String,
    },
}

/// Error surfaced by a built client when one of its contract methods is invoked.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Non-success HTTP status, translated by the error decoder
    #[error("{method_key} failed with HTTP {status}: {body}")]
    Status {
        method_key: String,
        status: u16,
        body: String,
    },

    /// Network, connection or TLS failure
    #[error("transport error in {method_key}: {source}")]
    Transport {
        method_key: String,
        #[source]
        source: reqwest::Error,
    },

    /// The per-call timeout configured on the transport elapsed
    #[error("{method_key} timed out after {timeout:?}")]
    Timeout {
        method_key: String,
        timeout: Duration,
    },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Response body is not valid JSON, or does not match the declared return type
    #[error("failed to decode response of {method_key}: {source}")]
    Decode {
        method_key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ClientError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
