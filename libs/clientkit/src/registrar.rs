//! The registration pass: scan → resolve → build → publish.
//!
//! Runs once at startup. Per-contract failures are logged and collected in the
//! [`RegistrationReport`]; only an invalid source location (or, with
//! [`RegistrarOptions::fail_fast`], the first contract failure) aborts the pass.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::declaration::{
    AttributeValue, DeclarationSource, InventorySource, InventoryTypes, TypeResolver,
    HTTP_CONTRACT_MARKER, LOG_LEVEL_ATTRIBUTE, URL_ATTRIBUTE,
};
use crate::environment::Environment;
use crate::error::{ContractError, RegistrationError, ScanError};
use crate::factory::{BuiltClient, ClientFactory};
use crate::registry::{ClientRegistry, ClientRegistryBuilder, SingletonRegistry};
use crate::resolver::{ConfigResolver, BASE_LOCATIONS_KEY};
use crate::scanner::{ContractDescriptor, ContractScanner};
use crate::tls::TransportConfig;

/// What to do when a contract's custom encoder cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderFailurePolicy {
    /// Fail the contract and report it.
    #[default]
    Fail,
    /// Log a warning and build the client with the default JSON encoder.
    FallbackToDefault,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrarOptions {
    /// Abort the pass on the first contract failure.
    pub fail_fast: bool,
    pub encoder_failure: EncoderFailurePolicy,
}

#[derive(Debug)]
pub struct ContractFailure {
    pub type_name: String,
    pub error: ContractError,
}

#[derive(Debug, Default)]
pub struct RegistrationReport {
    /// Registry names published, in processing order.
    pub registered: Vec<String>,
    pub failures: Vec<ContractFailure>,
}

impl RegistrationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Registry name of a contract: its short type name with the first letter lower-cased.
///
/// Names starting with two capitals are kept as-is (`URLClient` stays `URLClient`).
pub fn registry_name(short_name: &str) -> String {
    let mut chars = short_name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let second_upper = chars.next().is_some_and(char::is_uppercase);
    if first.is_uppercase() && second_upper {
        return short_name.to_owned();
    }
    let mut name: String = first.to_lowercase().collect();
    name.push_str(&short_name[first.len_utf8()..]);
    name
}

pub struct ClientsRegistrar {
    scanner: ContractScanner,
    resolver: ConfigResolver,
    factory: ClientFactory,
    options: RegistrarOptions,
}

impl ClientsRegistrar {
    pub fn new(
        source: Arc<dyn DeclarationSource>,
        types: Arc<dyn TypeResolver>,
        env: Arc<dyn Environment>,
    ) -> Self {
        Self {
            scanner: ContractScanner::new(source, HTTP_CONTRACT_MARKER),
            resolver: ConfigResolver::new(env),
            factory: ClientFactory::new(types, TransportConfig::default()),
            options: RegistrarOptions::default(),
        }
    }

    /// Registrar over every `#[http_contract]` linked into the binary.
    pub fn with_inventory(env: Arc<dyn Environment>) -> Self {
        Self::new(
            Arc::new(InventorySource),
            Arc::new(InventoryTypes::new()),
            env,
        )
    }

    #[must_use]
    pub fn with_options(mut self, options: RegistrarOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.factory = self.factory.with_transport(transport);
        self
    }

    #[must_use]
    pub fn with_factory(mut self, factory: ClientFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn options(&self) -> RegistrarOptions {
        self.options
    }

    /// Register every contract found under `locations` into `registry`.
    ///
    /// # Errors
    /// - [`RegistrationError::Scan`] if a location is invalid; nothing is registered
    /// - [`RegistrationError::Aborted`] on the first contract failure when `fail_fast` is set
    pub fn run<S: AsRef<str>>(
        &self,
        locations: &[S],
        registry: &mut dyn SingletonRegistry,
    ) -> Result<RegistrationReport, RegistrationError> {
        let mut report = RegistrationReport::default();

        for descriptor in self.scanner.scan(locations)? {
            match self.build_contract(&descriptor) {
                Ok(client) => {
                    let name = registry_name(descriptor.short_name());
                    tracing::info!(
                        name = %name,
                        type_name = %descriptor.type_name,
                        url = %client.configuration.url,
                        log_level = %client.configuration.log_level,
                        encoder = client.configuration.encoder_name(),
                        "registered HTTP client"
                    );
                    registry.register_singleton(&name, client);
                    report.registered.push(name);
                }
                Err(error) => {
                    tracing::warn!(
                        type_name = %descriptor.type_name,
                        error = %error,
                        "failed to register HTTP client"
                    );
                    if self.options.fail_fast {
                        return Err(RegistrationError::Aborted {
                            contract: descriptor.type_name,
                            source: error,
                        });
                    }
                    report.failures.push(ContractFailure {
                        type_name: descriptor.type_name,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            registered = report.registered.len(),
            failed = report.failures.len(),
            "HTTP client registration pass finished"
        );
        Ok(report)
    }

    /// [`ClientsRegistrar::run`] over the locations configured under [`BASE_LOCATIONS_KEY`].
    ///
    /// # Errors
    /// See [`ClientsRegistrar::run`]; an unresolvable locations property is a scan error.
    pub fn register_clients(
        &self,
        registry: &mut dyn SingletonRegistry,
    ) -> Result<RegistrationReport, RegistrationError> {
        let locations = self
            .resolver
            .base_locations()
            .map_err(|e| ScanError::InvalidLocation {
                location: BASE_LOCATIONS_KEY.to_owned(),
                reason: e.to_string(),
            })?;
        if locations.iter().all(|l| l.trim().is_empty()) {
            tracing::info!(
                key = BASE_LOCATIONS_KEY,
                "no source locations configured, no clients to register"
            );
        }
        self.run(&locations, registry)
    }

    /// Run the configured pass into a fresh registry and freeze it.
    ///
    /// # Errors
    /// See [`ClientsRegistrar::register_clients`].
    pub fn bootstrap(
        &self,
    ) -> Result<(Arc<ClientRegistry>, RegistrationReport), RegistrationError> {
        let mut builder = ClientRegistryBuilder::new();
        let report = self.register_clients(&mut builder)?;
        Ok((Arc::new(builder.build()), report))
    }

    fn build_contract(
        &self,
        descriptor: &ContractDescriptor,
    ) -> Result<BuiltClient, ContractError> {
        let text = |key: &str| descriptor.attributes.get(key).and_then(AttributeValue::as_text);

        let url = self.resolver.resolve(text(URL_ATTRIBUTE).unwrap_or_default())?;
        let log_level = self
            .resolver
            .contract_log_level(text(LOG_LEVEL_ATTRIBUTE))?;

        let encoder = match ClientFactory::encoder(&descriptor.attributes) {
            Ok(encoder) => encoder,
            Err(error)
                if self.options.encoder_failure == EncoderFailurePolicy::FallbackToDefault =>
            {
                tracing::warn!(
                    type_name = %descriptor.type_name,
                    error = %error,
                    "custom encoder unavailable, falling back to the default JSON encoder"
                );
                None
            }
            Err(error) => return Err(error.into()),
        };

        self.factory
            .build(&descriptor.type_name, &url, encoder, log_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names() {
        assert_eq!(registry_name("OrderServiceClient"), "orderServiceClient");
        assert_eq!(registry_name("PaymentClient"), "paymentClient");
        assert_eq!(registry_name("fooBar"), "fooBar");
        assert_eq!(registry_name("URLClient"), "URLClient");
        assert_eq!(registry_name("A"), "a");
        assert_eq!(registry_name(""), "");
    }

    #[test]
    fn default_options() {
        let o = RegistrarOptions::default();
        assert!(!o.fail_fast);
        assert_eq!(o.encoder_failure, EncoderFailurePolicy::Fail);
    }

    #[test]
    fn report_completeness() {
        let mut r = RegistrationReport::default();
        assert!(r.is_complete());
        r.failures.push(ContractFailure {
            type_name: "a::B".to_owned(),
            error: ContractError::InvalidTarget {
                url: String::new(),
                reason: "blank".to_owned(),
            },
        });
        assert!(!r.is_complete());
    }
}
