//! Per-client HTTP exchange logging.
//!
//! Every built client owns an [`HttpLogger`] bound at the [`LogLevel`] resolved for its
//! contract. Events go to the `clientkit::http` tracing target, so the host can route
//! or silence them with the usual subscriber filters.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::ParseLogLevelError;

pub const HTTP_LOG_TARGET: &str = "clientkit::http";

/// Bodies longer than this are cut in FULL logs.
const BODY_LOG_LIMIT: usize = 4 * 1024;

/// Verbosity of HTTP exchange logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// No logging.
    None,
    /// Request method and URL, response status and elapsed time.
    #[default]
    Basic,
    /// BASIC plus request and response headers.
    Headers,
    /// HEADERS plus request and response bodies.
    Full,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::None => "NONE",
            LogLevel::Basic => "BASIC",
            LogLevel::Headers => "HEADERS",
            LogLevel::Full => "FULL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(LogLevel::None),
            "BASIC" => Ok(LogLevel::Basic),
            "HEADERS" => Ok(LogLevel::Headers),
            "FULL" => Ok(LogLevel::Full),
            _ => Err(ParseLogLevelError(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpLogger {
    contract: String,
    level: LogLevel,
}

impl HttpLogger {
    pub fn new(contract: impl Into<String>, level: LogLevel) -> Self {
        Self {
            contract: contract.into(),
            level,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn log_request(
        &self,
        method_key: &str,
        method: &reqwest::Method,
        url: &str,
        headers: &HeaderMap,
        body: Option<&[u8]>,
    ) {
        match self.level {
            LogLevel::None => {}
            LogLevel::Basic => {
                tracing::info!(
                    target: HTTP_LOG_TARGET,
                    contract = %self.contract,
                    method_key,
                    "---> {method} {url}"
                );
            }
            LogLevel::Headers => {
                tracing::info!(
                    target: HTTP_LOG_TARGET,
                    contract = %self.contract,
                    method_key,
                    headers = ?headers,
                    "---> {method} {url}"
                );
            }
            LogLevel::Full => {
                tracing::info!(
                    target: HTTP_LOG_TARGET,
                    contract = %self.contract,
                    method_key,
                    headers = ?headers,
                    body = %body.map(body_preview).unwrap_or_default(),
                    "---> {method} {url}"
                );
            }
        }
    }

    pub fn log_response(
        &self,
        method_key: &str,
        status: u16,
        headers: &HeaderMap,
        body: &[u8],
        elapsed: Duration,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match self.level {
            LogLevel::None => {}
            LogLevel::Basic => {
                tracing::info!(
                    target: HTTP_LOG_TARGET,
                    contract = %self.contract,
                    method_key,
                    elapsed_ms,
                    "<--- HTTP {status}"
                );
            }
            LogLevel::Headers => {
                tracing::info!(
                    target: HTTP_LOG_TARGET,
                    contract = %self.contract,
                    method_key,
                    elapsed_ms,
                    headers = ?headers,
                    "<--- HTTP {status}"
                );
            }
            LogLevel::Full => {
                tracing::info!(
                    target: HTTP_LOG_TARGET,
                    contract = %self.contract,
                    method_key,
                    elapsed_ms,
                    headers = ?headers,
                    body = %body_preview(body),
                    "<--- HTTP {status} ({} bytes)",
                    body.len()
                );
            }
        }
    }

    pub fn log_failure(&self, method_key: &str, error: &dyn std::error::Error, elapsed: Duration) {
        if self.level == LogLevel::None {
            return;
        }
        tracing::warn!(
            target: HTTP_LOG_TARGET,
            contract = %self.contract,
            method_key,
            elapsed_ms = elapsed.as_millis() as u64,
            "<--- ERROR {error}"
        );
    }
}

fn body_preview(body: &[u8]) -> String {
    if body.len() <= BODY_LOG_LIMIT {
        return String::from_utf8_lossy(body).into_owned();
    }
    let mut s = String::from_utf8_lossy(&body[..BODY_LOG_LIMIT]).into_owned();
    s.push_str("...(truncated)");
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("full".parse::<LogLevel>().unwrap(), LogLevel::Full);
        assert_eq!(" Headers ".parse::<LogLevel>().unwrap(), LogLevel::Headers);
        assert_eq!("NONE".parse::<LogLevel>().unwrap(), LogLevel::None);
        assert_eq!(
            "verbose".parse::<LogLevel>(),
            Err(ParseLogLevelError("verbose".to_owned()))
        );
    }

    #[test]
    fn default_is_basic() {
        assert_eq!(LogLevel::default(), LogLevel::Basic);
        assert_eq!(LogLevel::default().to_string(), "BASIC");
    }

    #[test]
    fn levels_are_ordered_by_verbosity() {
        assert!(LogLevel::None < LogLevel::Basic);
        assert!(LogLevel::Headers < LogLevel::Full);
    }

    #[test]
    fn serde_uses_uppercase_names() {
        let v: LogLevel = serde_json::from_str("\"HEADERS\"").unwrap();
        assert_eq!(v, LogLevel::Headers);
        assert_eq!(serde_json::to_string(&LogLevel::Full).unwrap(), "\"FULL\"");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = vec![b'a'; BODY_LOG_LIMIT + 10];
        let preview = body_preview(&body);
        assert!(preview.ends_with("...(truncated)"));
        assert_eq!(body_preview(b"ok"), "ok");
    }
}
