//! Resolution of raw contract settings against the environment.
//!
//! Values may embed `${key}` or `${key:default}` placeholders. Every placeholder is
//! replaced; one without a value and without a default fails the resolution.
//! Property values and defaults may themselves contain placeholders and are
//! resolved in turn.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::environment::Environment;
use crate::error::ConfigurationError;
use crate::logger::LogLevel;

/// Comma-separated module paths scanned for contracts.
pub const BASE_LOCATIONS_KEY: &str = "clients.base-locations";
/// Environment-wide override of the HTTP log level.
pub const LOG_LEVEL_KEY: &str = "clients.log-level";

const PREFIX: &str = "${";

fn placeholder_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^\s{}:$]+$").expect("placeholder key pattern is a valid regex")
    })
}

/// Byte offset of the `}` closing a placeholder whose body starts at `body[0]`.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, b) in body.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' if depth == 0 => return Some(idx),
            b'}' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[derive(Clone)]
pub struct ConfigResolver {
    env: Arc<dyn Environment>,
}

impl ConfigResolver {
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Arc<dyn Environment> {
        &self.env
    }

    /// Replace every placeholder in `raw`.
    ///
    /// Blank input is returned as-is without any lookup.
    ///
    /// # Errors
    /// [`ConfigurationError::UnresolvedPlaceholder`] names the first key without a value;
    /// [`ConfigurationError::MalformedPlaceholder`] reports an unterminated or empty `${`;
    /// [`ConfigurationError::CircularPlaceholder`] reports a key whose value refers back to it.
    pub fn resolve(&self, raw: &str) -> Result<String, ConfigurationError> {
        if raw.trim().is_empty() {
            return Ok(raw.to_owned());
        }
        let mut visiting = Vec::new();
        self.expand(raw, raw, &mut visiting)
    }

    /// `visiting` holds the keys whose values are being expanded, outermost first.
    fn expand(
        &self,
        text: &str,
        raw: &str,
        visiting: &mut Vec<String>,
    ) -> Result<String, ConfigurationError> {
        let malformed = || ConfigurationError::MalformedPlaceholder {
            raw: raw.to_owned(),
        };

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find(PREFIX) {
            out.push_str(&rest[..start]);
            let body_start = start + PREFIX.len();
            let body_len = closing_brace(&rest[body_start..]).ok_or_else(malformed)?;
            let body = &rest[body_start..body_start + body_len];

            let (key, default) = match body.split_once(':') {
                Some((key, default)) => (key, Some(default)),
                None => (body, None),
            };
            if !placeholder_key_re().is_match(key) {
                return Err(malformed());
            }
            if visiting.iter().any(|k| k == key) {
                return Err(ConfigurationError::CircularPlaceholder {
                    raw: raw.to_owned(),
                    key: key.to_owned(),
                });
            }

            let value = match (self.env.property(key), default) {
                (Some(value), _) => {
                    visiting.push(key.to_owned());
                    let expanded = self.expand(&value, raw, visiting);
                    visiting.pop();
                    expanded?
                }
                (None, Some(default)) => self.expand(default, raw, visiting)?,
                (None, None) => {
                    return Err(ConfigurationError::UnresolvedPlaceholder {
                        raw: raw.to_owned(),
                        key: key.to_owned(),
                    })
                }
            };
            out.push_str(&value);
            rest = &rest[body_start + body_len + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Parse an override into a level; absent or invalid values yield [`LogLevel::Basic`].
    pub fn resolve_log_level(env_override: Option<&str>) -> LogLevel {
        match env_override.map(str::trim).filter(|s| !s.is_empty()) {
            None => LogLevel::default(),
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!(value = raw, "{err}; falling back to {}", LogLevel::default());
                LogLevel::default()
            }),
        }
    }

    /// Environment-wide level from [`LOG_LEVEL_KEY`].
    pub fn environment_log_level(&self) -> LogLevel {
        Self::resolve_log_level(self.env.property(LOG_LEVEL_KEY).as_deref())
    }

    /// Level for one contract: its own `log_level` attribute, then the environment override.
    ///
    /// # Errors
    /// Placeholder failures in the contract attribute.
    pub fn contract_log_level(
        &self,
        attribute: Option<&str>,
    ) -> Result<LogLevel, ConfigurationError> {
        match attribute.filter(|s| !s.trim().is_empty()) {
            Some(raw) => {
                let resolved = self.resolve(raw)?;
                Ok(Self::resolve_log_level(Some(&resolved)))
            }
            None => Ok(self.environment_log_level()),
        }
    }

    /// Entries of [`BASE_LOCATIONS_KEY`] split on commas, untrimmed; empty when unset.
    ///
    /// # Errors
    /// Placeholder failures in the property value.
    pub fn base_locations(&self) -> Result<Vec<String>, ConfigurationError> {
        match self.env.property(BASE_LOCATIONS_KEY) {
            None => Ok(Vec::new()),
            Some(raw) => {
                let resolved = self.resolve(&raw)?;
                if resolved.trim().is_empty() {
                    return Ok(Vec::new());
                }
                Ok(resolved.split(',').map(str::to_owned).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MapEnvironment;

    fn resolver(pairs: &[(&str, &str)]) -> ConfigResolver {
        ConfigResolver::new(Arc::new(MapEnvironment::from_pairs(pairs.iter().copied())))
    }

    #[test]
    fn literal_values_pass_through() {
        let r = resolver(&[]);
        assert_eq!(r.resolve("https://pay.internal").unwrap(), "https://pay.internal");
    }

    #[test]
    fn blank_is_returned_unchanged() {
        let r = resolver(&[]);
        assert_eq!(r.resolve("").unwrap(), "");
        assert_eq!(r.resolve("   ").unwrap(), "   ");
    }

    #[test]
    fn every_placeholder_is_replaced() {
        let r = resolver(&[("pay.host", "pay.internal"), ("pay.port", "8443")]);
        assert_eq!(
            r.resolve("https://${pay.host}:${pay.port}/v1").unwrap(),
            "https://pay.internal:8443/v1"
        );
    }

    #[test]
    fn default_applies_only_when_missing() {
        let r = resolver(&[("present", "env")]);
        assert_eq!(r.resolve("${present:dflt}").unwrap(), "env");
        assert_eq!(r.resolve("${absent:dflt}").unwrap(), "dflt");
        assert_eq!(r.resolve("${absent:}").unwrap(), "");
        assert_eq!(
            r.resolve("${absent:http://localhost:8080}").unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn missing_placeholder_fails_with_key_and_raw() {
        let r = resolver(&[]);
        let err = r.resolve("https://${pay.host}/api").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnresolvedPlaceholder {
                raw: "https://${pay.host}/api".to_owned(),
                key: "pay.host".to_owned(),
            }
        );
    }

    #[test]
    fn unterminated_placeholder_is_malformed() {
        let r = resolver(&[("a", "b")]);
        assert!(matches!(
            r.resolve("https://${a"),
            Err(ConfigurationError::MalformedPlaceholder { .. })
        ));
        assert!(matches!(
            r.resolve("${}"),
            Err(ConfigurationError::MalformedPlaceholder { .. })
        ));
    }

    #[test]
    fn property_values_are_resolved_recursively() {
        let r = resolver(&[
            ("base.url", "https://x.internal"),
            ("pay.url", "${base.url}/pay"),
            ("refund.url", "${pay.url}/refunds"),
        ]);
        assert_eq!(r.resolve("${pay.url}").unwrap(), "https://x.internal/pay");
        assert_eq!(
            r.resolve("${refund.url}?v=1").unwrap(),
            "https://x.internal/pay/refunds?v=1"
        );
    }

    #[test]
    fn defaults_may_contain_placeholders() {
        let r = resolver(&[("b", "https://b.internal"), ("port", "8443")]);
        assert_eq!(r.resolve("${a:${b}}").unwrap(), "https://b.internal");
        assert_eq!(
            r.resolve("${a:https://${host:localhost}:${port}}/v1").unwrap(),
            "https://localhost:8443/v1"
        );

        let err = r.resolve("${a:${c}}").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnresolvedPlaceholder {
                raw: "${a:${c}}".to_owned(),
                key: "c".to_owned(),
            }
        );
    }

    #[test]
    fn unresolved_nested_value_fails() {
        let r = resolver(&[("pay.url", "${base.url}/pay")]);
        assert!(matches!(
            r.resolve("${pay.url}"),
            Err(ConfigurationError::UnresolvedPlaceholder { key, .. }) if key == "base.url"
        ));
    }

    #[test]
    fn circular_reference_is_reported() {
        let r = resolver(&[("a", "${b}"), ("b", "x${a}"), ("self", "${self}")]);
        assert_eq!(
            r.resolve("${a}").unwrap_err(),
            ConfigurationError::CircularPlaceholder {
                raw: "${a}".to_owned(),
                key: "a".to_owned(),
            }
        );
        assert!(matches!(
            r.resolve("${self}"),
            Err(ConfigurationError::CircularPlaceholder { .. })
        ));
    }

    #[test]
    fn same_key_twice_is_not_a_cycle() {
        let r = resolver(&[("host", "pay.internal"), ("pair", "${host}/${host}")]);
        assert_eq!(r.resolve("${pair}").unwrap(), "pay.internal/pay.internal");
    }

    #[test]
    fn unbalanced_nested_default_is_malformed() {
        let r = resolver(&[("b", "x")]);
        assert!(matches!(
            r.resolve("${a:${b}"),
            Err(ConfigurationError::MalformedPlaceholder { .. })
        ));
    }

    #[test]
    fn log_level_defaults_and_override() {
        assert_eq!(ConfigResolver::resolve_log_level(None), LogLevel::Basic);
        assert_eq!(ConfigResolver::resolve_log_level(Some("")), LogLevel::Basic);
        assert_eq!(ConfigResolver::resolve_log_level(Some("full")), LogLevel::Full);
        assert_eq!(ConfigResolver::resolve_log_level(Some("LOUD")), LogLevel::Basic);

        let r = resolver(&[(LOG_LEVEL_KEY, "HEADERS")]);
        assert_eq!(r.environment_log_level(), LogLevel::Headers);
    }

    #[test]
    fn contract_attribute_beats_environment() {
        let r = resolver(&[(LOG_LEVEL_KEY, "HEADERS"), ("pay.log", "NONE")]);
        assert_eq!(r.contract_log_level(Some("FULL")).unwrap(), LogLevel::Full);
        assert_eq!(r.contract_log_level(Some("${pay.log}")).unwrap(), LogLevel::None);
        assert_eq!(r.contract_log_level(None).unwrap(), LogLevel::Headers);
        assert!(r.contract_log_level(Some("${missing}")).is_err());
    }

    #[test]
    fn base_locations_split_on_commas() {
        let r = resolver(&[(BASE_LOCATIONS_KEY, "a::b, c ,")]);
        assert_eq!(r.base_locations().unwrap(), vec!["a::b", " c ", ""]);

        assert!(resolver(&[]).base_locations().unwrap().is_empty());
        assert!(resolver(&[(BASE_LOCATIONS_KEY, " ")])
            .base_locations()
            .unwrap()
            .is_empty());
    }
}
