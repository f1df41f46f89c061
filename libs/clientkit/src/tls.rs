//! Transport assembly and TLS trust policy.
//!
//! # Security
//!
//! [`TrustPolicy::TrustAll`] is the default. It accepts **any** server certificate
//! chain for **any** host name, which removes protection against active
//! man-in-the-middle attacks. It exists for internal endpoints behind self-signed
//! or private CAs; handshake signatures are still verified so the peer must hold
//! the key of the certificate it presents. Select [`TrustPolicy::WebPki`] for
//! anything reachable over an untrusted network.

use std::sync::Arc;
use std::time::Duration;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use serde::{Deserialize, Serialize};

use crate::error::TransportBuildError;

/// How server certificates are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustPolicy {
    /// Accept any certificate chain and host name.
    #[default]
    TrustAll,
    /// Standard chain and host name validation against the bundled web PKI roots.
    WebPki,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    pub trust: TrustPolicy,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Whole-call timeout applied to every request made by the client.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            trust: TrustPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: concat!("clientkit/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// Crypto provider for TLS: the process default if one is installed, ring otherwise.
pub fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::ring::default_provider()))
}

/// Certificate verifier that accepts every server certificate.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// rustls client configuration trusting every server certificate.
///
/// # Errors
/// [`TransportBuildError::Tls`] if the provider supports no safe protocol version.
pub fn trust_all_client_config() -> Result<rustls::ClientConfig, TransportBuildError> {
    let provider = crypto_provider();
    let verifier = Arc::new(AcceptAnyServerCert {
        provider: provider.clone(),
    });

    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(TransportBuildError::Tls)?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}

/// Build one HTTP transport for one client.
///
/// # Errors
/// [`TransportBuildError`] if TLS or the connection pool cannot be set up; no partially
/// configured transport is ever returned.
pub fn build_transport(config: &TransportConfig) -> Result<reqwest::Client, TransportBuildError> {
    let user_agent = reqwest::header::HeaderValue::from_str(&config.user_agent)
        .map_err(|_| TransportBuildError::UserAgent(config.user_agent.clone()))?;

    let builder = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .user_agent(user_agent);

    let builder = match config.trust {
        TrustPolicy::TrustAll => {
            tracing::warn!(
                "building HTTP transport with trust-all TLS: server certificates and host names are NOT verified"
            );
            builder.use_preconfigured_tls(trust_all_client_config()?)
        }
        TrustPolicy::WebPki => builder.use_rustls_tls(),
    };

    builder.build().map_err(TransportBuildError::Client)
}
