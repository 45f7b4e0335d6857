// Server configuration from environment variables

use gateward_auth::config::parse_flag;
use gateward_auth::AuthOptions;
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 9000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix for API routes, e.g. "/api" (empty means none)
    pub api_prefix: String,
    pub request_timeout: Duration,
    /// Browser origins allowed by CORS; empty disables the CORS layer
    pub cors_allowed_origins: Vec<String>,
    pub auth_options: AuthOptions,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let request_timeout = lookup("REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        // Example: CORS_ALLOWED_ORIGINS="https://app.example.com,https://admin.example.com"
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host: lookup("HOST")
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            api_prefix: normalize_prefix(&lookup("API_PREFIX").unwrap_or_default()),
            request_timeout: Duration::from_secs(request_timeout),
            cors_allowed_origins,
            auth_options: AuthOptions {
                auth_fail_block: lookup("AUTH_FAIL_BLOCK")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(false),
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// "api", "/api" and "/api/" all become "/api"; "" and "/" mean no prefix
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.api_prefix, "");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.cors_allowed_origins.is_empty());
        assert!(!config.auth_options.auth_fail_block);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("API_PREFIX", "/api"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("CORS_ALLOWED_ORIGINS", "https://a.test, https://b.test,"),
            ("AUTH_FAIL_BLOCK", "true"),
        ]);
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.test".to_string(), "https://b.test".to_string()]
        );
        assert!(config.auth_options.auth_fail_block);
    }

    #[test]
    fn test_api_prefix_is_normalized() {
        assert_eq!(config_from(&[("API_PREFIX", "api")]).api_prefix, "/api");
        assert_eq!(config_from(&[("API_PREFIX", "/api/")]).api_prefix, "/api");
        assert_eq!(config_from(&[("API_PREFIX", "api/v2")]).api_prefix, "/api/v2");
        assert_eq!(config_from(&[("API_PREFIX", "/")]).api_prefix, "");
        assert_eq!(config_from(&[("API_PREFIX", "  ")]).api_prefix, "");
    }

    #[test]
    fn test_invalid_port_uses_default() {
        assert_eq!(config_from(&[("PORT", "http")]).port, 9000);
    }
}
