// Header strategy: pass/fail on a single request header
// Decision: Never attaches identity, only accepts or rejects

use axum::http::{request::Parts, HeaderName};

use crate::config::AuthConfig;
use crate::error::{ConfigError, StrategyError};

/// What the configured header has to satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
enum HeaderRule {
    /// Any non-empty value
    Exists,
    /// Byte-for-byte equal to the configured value
    Equals(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct HeaderStrategy {
    name: HeaderName,
    rule: HeaderRule,
}

impl HeaderStrategy {
    /// Validate the header sub-config.
    /// Exactly one of `exists` and `value` must be set.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        let header = &config.header;

        if header.name.is_empty() {
            return Err(ConfigError::MissingHeaderName {
                name: config.name.clone(),
            });
        }

        let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|_| {
            ConfigError::InvalidHeaderName {
                name: config.name.clone(),
                header: header.name.clone(),
            }
        })?;

        let rule = match (header.exists, header.value.is_empty()) {
            (true, true) => HeaderRule::Exists,
            (false, false) => HeaderRule::Equals(header.value.as_bytes().to_vec()),
            (true, false) => {
                return Err(ConfigError::ConflictingHeaderRules {
                    name: config.name.clone(),
                })
            }
            (false, true) => {
                return Err(ConfigError::MissingHeaderValue {
                    name: config.name.clone(),
                })
            }
        };

        Ok(Self { name, rule })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.name
    }

    pub fn authenticate(&self, parts: &Parts) -> Result<(), StrategyError> {
        let value = parts
            .headers
            .get(&self.name)
            .map(|v| v.as_bytes())
            .unwrap_or_default();

        let accepted = match &self.rule {
            HeaderRule::Exists => !value.is_empty(),
            HeaderRule::Equals(expected) => value == expected.as_slice(),
        };

        if accepted {
            Ok(())
        } else {
            Err(StrategyError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeaderConfig;
    use axum::http::Request;

    fn config(name: &str, value: &str, exists: bool) -> AuthConfig {
        AuthConfig {
            name: "edge".to_string(),
            auth_type: "header".to_string(),
            header: HeaderConfig {
                name: name.to_string(),
                value: value.to_string(),
                exists,
            },
            ..Default::default()
        }
    }

    fn parts(header: Option<(&str, &str)>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_requires_name() {
        let err = HeaderStrategy::new(&config("", "secret", false)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingHeaderName {
                name: "edge".to_string()
            }
        );
    }

    #[test]
    fn test_requires_value_or_exists() {
        let err = HeaderStrategy::new(&config("X-Api-Key", "", false)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingHeaderValue { .. }));
    }

    #[test]
    fn test_rejects_value_and_exists_together() {
        let err = HeaderStrategy::new(&config("X-Api-Key", "secret", true)).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingHeaderRules { .. }));
    }

    #[test]
    fn test_rejects_invalid_header_name() {
        let err = HeaderStrategy::new(&config("bad header", "secret", false)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeaderName { .. }));
    }

    #[test]
    fn test_exists_rule() {
        let strategy = HeaderStrategy::new(&config("X-Api-Key", "", true)).unwrap();

        assert!(strategy
            .authenticate(&parts(Some(("X-Api-Key", "anything"))))
            .is_ok());
        assert_eq!(
            strategy.authenticate(&parts(None)),
            Err(StrategyError::Unauthorized)
        );
        assert_eq!(
            strategy.authenticate(&parts(Some(("X-Api-Key", "")))),
            Err(StrategyError::Unauthorized)
        );
    }

    #[test]
    fn test_equals_rule() {
        let strategy = HeaderStrategy::new(&config("X-Api-Key", "secret", false)).unwrap();

        assert!(strategy
            .authenticate(&parts(Some(("X-Api-Key", "secret"))))
            .is_ok());
        assert_eq!(
            strategy.authenticate(&parts(Some(("X-Api-Key", "other")))),
            Err(StrategyError::Unauthorized)
        );
        assert_eq!(
            strategy.authenticate(&parts(Some(("X-Api-Key", "Secret")))),
            Err(StrategyError::Unauthorized)
        );
        assert_eq!(
            strategy.authenticate(&parts(None)),
            Err(StrategyError::Unauthorized)
        );
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        let strategy = HeaderStrategy::new(&config("x-api-key", "secret", false)).unwrap();
        assert!(strategy
            .authenticate(&parts(Some(("X-API-KEY", "secret"))))
            .is_ok());
    }
}
