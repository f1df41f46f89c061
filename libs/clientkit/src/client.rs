//! Runtime core shared by every generated contract implementation.
//!
//! A generated `<Trait>Http` struct holds one [`ClientCore`] and turns each method call
//! into a [`RequestTemplate`]; the core encodes, sends, logs, translates errors and
//! decodes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Decoder, Encoder};
use crate::error::ClientError;
use crate::error_decoder::ErrorDecoder;
use crate::logger::{HttpLogger, LogLevel};
use crate::request::RequestTemplate;

/// Successful (2xx) response as received.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ClientResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone)]
pub struct ClientCore {
    contract: Arc<str>,
    base_url: Arc<str>,
    http: reqwest::Client,
    encoder: Arc<dyn Encoder>,
    decoder: Arc<dyn Decoder>,
    error_decoder: Arc<dyn ErrorDecoder>,
    logger: HttpLogger,
    request_timeout: Duration,
}

impl std::fmt::Debug for ClientCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCore")
            .field("contract", &self.contract)
            .field("base_url", &self.base_url)
            .field("encoder", &self.encoder.name())
            .field("log_level", &self.logger.level())
            .finish_non_exhaustive()
    }
}

impl ClientCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        contract: &str,
        base_url: &str,
        http: reqwest::Client,
        encoder: Arc<dyn Encoder>,
        decoder: Arc<dyn Decoder>,
        error_decoder: Arc<dyn ErrorDecoder>,
        log_level: LogLevel,
        request_timeout: Duration,
    ) -> Self {
        Self {
            contract: Arc::from(contract),
            base_url: Arc::from(base_url),
            http,
            encoder,
            decoder,
            error_decoder,
            logger: HttpLogger::new(contract, log_level),
            request_timeout,
        }
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn log_level(&self) -> LogLevel {
        self.logger.level()
    }

    pub fn encoder_name(&self) -> &'static str {
        self.encoder.name()
    }

    /// Serialize `body` and hand it to the contract's encoder.
    ///
    /// # Errors
    /// [`ClientError::Encode`] if serialization or encoding fails.
    pub fn encode_body<T: Serialize + ?Sized>(
        &self,
        request: &mut RequestTemplate,
        body: &T,
    ) -> Result<(), ClientError> {
        let value = serde_json::to_value(body).map_err(crate::error::EncodeError::from)?;
        self.encoder.encode(&value, request)?;
        Ok(())
    }

    /// Send the request and return the response if its status is 2xx.
    ///
    /// # Errors
    /// - [`ClientError::InvalidUrl`] if the target URL cannot be formed
    /// - [`ClientError::Timeout`] if the configured request timeout elapses
    /// - [`ClientError::Transport`] for other network failures
    /// - whatever the error decoder produces for non-2xx statuses
    pub async fn execute(
        &self,
        method_key: &str,
        request: RequestTemplate,
    ) -> Result<ClientResponse, ClientError> {
        let url = request.url(&self.base_url)?;

        let mut builder = self.http.request(request.method().clone(), url.clone());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(content_type) = request.content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }
        let http_request = builder.build().map_err(|e| self.transport_error(method_key, e))?;

        self.logger.log_request(
            method_key,
            http_request.method(),
            url.as_str(),
            http_request.headers(),
            request.body(),
        );

        let started = Instant::now();
        let response = match self.http.execute(http_request).await {
            Ok(r) => r,
            Err(e) => {
                self.logger.log_failure(method_key, &e, started.elapsed());
                return Err(self.transport_error(method_key, e));
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(b) => b.to_vec(),
            Err(e) => {
                self.logger.log_failure(method_key, &e, started.elapsed());
                return Err(self.transport_error(method_key, e));
            }
        };
        self.logger
            .log_response(method_key, status.as_u16(), &headers, &body, started.elapsed());

        if !status.is_success() {
            return Err(self
                .error_decoder
                .decode(method_key, status.as_u16(), &body));
        }

        Ok(ClientResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }

    /// Decode a successful response into the method's return type.
    ///
    /// # Errors
    /// [`ClientError::Decode`] if the body is not JSON or does not match `T`.
    pub fn decode<T: DeserializeOwned>(
        &self,
        method_key: &str,
        response: ClientResponse,
    ) -> Result<T, ClientError> {
        let decode_err = |source| ClientError::Decode {
            method_key: method_key.to_owned(),
            source,
        };
        let value = self.decoder.decode(&response.body).map_err(decode_err)?;
        serde_json::from_value(value).map_err(decode_err)
    }

    fn transport_error(&self, method_key: &str, source: reqwest::Error) -> ClientError {
        if source.is_timeout() {
            ClientError::Timeout {
                method_key: method_key.to_owned(),
                timeout: self.request_timeout,
            }
        } else {
            ClientError::Transport {
                method_key: method_key.to_owned(),
                source,
            }
        }
    }
}
