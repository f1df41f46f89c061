//! Assembly of ready-to-use clients from resolved contract settings.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::client::ClientCore;
use crate::codec::{Decoder, Encoder, JsonDecoder, JsonEncoder};
use crate::declaration::{AttributeMap, AttributeValue, TypeResolver, ENCODER_ATTRIBUTE};
use crate::error::{ContractError, EncoderInstantiationError};
use crate::error_decoder::{ErrorDecoder, StatusErrorDecoder};
use crate::logger::LogLevel;
use crate::tls::{build_transport, TransportConfig};

/// Resolved settings a client is built with.
#[derive(Clone)]
pub struct ClientConfiguration {
    pub url: String,
    pub log_level: LogLevel,
    /// Custom encoder; `None` means the default JSON encoder.
    pub encoder: Option<Arc<dyn Encoder>>,
}

impl ClientConfiguration {
    /// Name of the encoder the client actually uses.
    pub fn encoder_name(&self) -> &'static str {
        self.encoder
            .as_ref()
            .map_or_else(|| JsonEncoder.name(), |e| e.name())
    }
}

impl fmt::Debug for ClientConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfiguration")
            .field("url", &self.url)
            .field("log_level", &self.log_level)
            .field("encoder", &self.encoder_name())
            .finish()
    }
}

/// A contract instance bound to one configuration.
///
/// `instance` holds an `Arc<dyn Contract>`; [`crate::ClientRegistry::get`] recovers it.
#[derive(Clone)]
pub struct BuiltClient {
    pub type_name: String,
    pub configuration: ClientConfiguration,
    pub instance: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for BuiltClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltClient")
            .field("type_name", &self.type_name)
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

pub struct ClientFactory {
    types: Arc<dyn TypeResolver>,
    transport: TransportConfig,
    decoder: Arc<dyn Decoder>,
    error_decoder: Arc<dyn ErrorDecoder>,
}

impl ClientFactory {
    pub fn new(types: Arc<dyn TypeResolver>, transport: TransportConfig) -> Self {
        Self {
            types,
            transport,
            decoder: Arc::new(JsonDecoder),
            error_decoder: Arc::new(StatusErrorDecoder),
        }
    }

    #[must_use]
    pub fn with_error_decoder(mut self, error_decoder: Arc<dyn ErrorDecoder>) -> Self {
        self.error_decoder = error_decoder;
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Replace the transport settings; decoders are kept.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    /// Custom encoder declared in `attributes`, instantiated through its zero-argument constructor.
    ///
    /// # Errors
    /// [`EncoderInstantiationError`] if construction fails or the attribute is not a type reference.
    pub fn encoder(
        attributes: &AttributeMap,
    ) -> Result<Option<Arc<dyn Encoder>>, EncoderInstantiationError> {
        match attributes.get(ENCODER_ATTRIBUTE) {
            None => Ok(None),
            Some(AttributeValue::Encoder(reference)) => (reference.instantiate)().map(Some),
            Some(AttributeValue::Text(name)) => Err(EncoderInstantiationError::new(
                name.clone(),
                "attribute is text, expected an encoder type reference",
            )),
        }
    }

    /// Build a client for `type_name` targeting `url`.
    ///
    /// # Errors
    /// - [`ContractError::TypeLoad`] if no binding is linked for the type
    /// - [`ContractError::InvalidTarget`] for a blank, unparsable or non-HTTP URL
    /// - [`ContractError::TransportBuild`] if the transport cannot be assembled
    pub fn build(
        &self,
        type_name: &str,
        url: &str,
        encoder: Option<Arc<dyn Encoder>>,
        log_level: LogLevel,
    ) -> Result<BuiltClient, ContractError> {
        let binding = self.types.load(type_name)?;
        validate_target(url)?;
        let http = build_transport(&self.transport)?;

        let short_name = type_name.rsplit("::").next().unwrap_or(type_name);
        let core = ClientCore::new(
            short_name,
            url,
            http,
            encoder.clone().unwrap_or_else(|| Arc::new(JsonEncoder)),
            self.decoder.clone(),
            self.error_decoder.clone(),
            log_level,
            self.transport.request_timeout,
        );
        tracing::debug!(
            type_name,
            url,
            %log_level,
            encoder = core.encoder_name(),
            "client assembled"
        );

        Ok(BuiltClient {
            type_name: type_name.to_owned(),
            configuration: ClientConfiguration {
                url: url.to_owned(),
                log_level,
                encoder,
            },
            instance: (binding.bind)(core),
        })
    }
}

fn validate_target(url: &str) -> Result<(), ContractError> {
    let invalid = |reason: String| ContractError::InvalidTarget {
        url: url.to_owned(),
        reason,
    };
    if url.trim().is_empty() {
        return Err(invalid("target URL is blank".to_owned()));
    }
    let parsed = url::Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}
