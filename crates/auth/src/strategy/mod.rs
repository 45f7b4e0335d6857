// Strategy selection and the common authenticator seam
// Decision: Built-in strategies are enum variants, external ones go through Authenticator
// Decision: Selection happens once at startup; requests only dispatch

mod header;
mod jwt;
mod rails;
mod simple;

pub use header::HeaderStrategy;
pub use jwt::{JwtProvider, JwtStrategy};
pub use rails::{RailsStrategy, RailsVersion, SessionStore, DEFAULT_SESSION_COOKIE};
pub use simple::{SimpleStrategy, USER_ID_HEADER, USER_ID_PROVIDER_HEADER, USER_ROLE_HEADER};

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, request::Parts};
use axum_extra::extract::cookie::CookieJar;
use std::fmt;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::error::{ConfigError, StrategyError};
use crate::identity::IdentityContext;

/// A request authenticator supplied from outside this crate.
///
/// `Ok(Some(identity))` attaches the identity, `Ok(None)` lets the request
/// through without one (subject to the fail-block policy) and
/// `Err(StrategyError::Unauthorized)` rejects it.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, parts: &Parts) -> Result<Option<IdentityContext>, StrategyError>;
}

/// Strategy kind, used as the `auth_type` field in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Simple,
    Header,
    Rails,
    Jwt,
    Custom,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Simple => "simple",
            StrategyKind::Header => "header",
            StrategyKind::Rails => "rails",
            StrategyKind::Jwt => "jwt",
            StrategyKind::Custom => "custom",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selected, ready-to-use authentication strategy
#[derive(Clone)]
pub enum Strategy {
    Simple(SimpleStrategy),
    Header(HeaderStrategy),
    Rails(Arc<RailsStrategy>),
    Jwt(Arc<JwtStrategy>),
    Custom(Arc<dyn Authenticator>),
}

impl Strategy {
    /// Wrap an external authenticator
    pub fn custom(authenticator: impl Authenticator + 'static) -> Self {
        Strategy::Custom(Arc::new(authenticator))
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Simple(_) => StrategyKind::Simple,
            Strategy::Header(_) => StrategyKind::Header,
            Strategy::Rails(_) => StrategyKind::Rails,
            Strategy::Jwt(_) => StrategyKind::Jwt,
            Strategy::Custom(_) => StrategyKind::Custom,
        }
    }

    pub async fn authenticate(
        &self,
        parts: &Parts,
    ) -> Result<Option<IdentityContext>, StrategyError> {
        match self {
            Strategy::Simple(simple) => Ok(Some(simple.authenticate(parts))),
            Strategy::Header(header) => header.authenticate(parts).map(|()| None),
            Strategy::Rails(rails) => rails.authenticate(parts).await,
            Strategy::Jwt(jwt) => jwt.authenticate(parts).map(Some),
            Strategy::Custom(custom) => custom.authenticate(parts).await,
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Strategy").field(&self.kind()).finish()
    }
}

/// Picks a strategy from an [`AuthConfig`].
///
/// Development mode always wins; otherwise `auth_type` decides.
pub struct StrategySelector<'a> {
    config: &'a AuthConfig,
    session_store: Option<Arc<dyn SessionStore>>,
}

impl<'a> StrategySelector<'a> {
    pub fn new(config: &'a AuthConfig) -> Self {
        Self {
            config,
            session_store: None,
        }
    }

    /// Session store used by the Rails strategy for cookie-store URLs
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn select(self) -> Result<Strategy, ConfigError> {
        let config = self.config;

        if config.development {
            tracing::warn!(
                auth = %config.name,
                "Development auth enabled: identity headers are trusted as sent"
            );
            return Ok(Strategy::Simple(SimpleStrategy));
        }

        let strategy = match config.auth_type.as_str() {
            "" | "none" => return Err(ConfigError::NoAuthDefined),
            "header" => Strategy::Header(HeaderStrategy::new(config)?),
            "jwt" => {
                let jwt = JwtStrategy::new(&config.jwt, &config.cookie)
                    .map_err(|reason| ConfigError::strategy("jwt", reason))?;
                Strategy::Jwt(Arc::new(jwt))
            }
            "rails" => {
                let rails = RailsStrategy::new(&config.rails, &config.cookie, self.session_store)
                    .map_err(|reason| ConfigError::strategy("rails", reason))?;
                Strategy::Rails(Arc::new(rails))
            }
            other => return Err(ConfigError::UnknownType(other.to_string())),
        };

        tracing::info!(
            auth = %config.name,
            auth_type = %strategy.kind(),
            "Auth strategy selected"
        );

        Ok(strategy)
    }
}

/// Select a strategy for `config` without a session store
pub fn select_strategy(config: &AuthConfig) -> Result<Strategy, ConfigError> {
    StrategySelector::new(config).select()
}

/// Token from an `Authorization: Bearer <token>` header
pub(crate) fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut segments = value.split_whitespace();

    match (segments.next(), segments.next(), segments.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

/// Value of the named request cookie
pub(crate) fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeaderConfig, JwtConfig, RailsConfig};
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn config(auth_type: &str) -> AuthConfig {
        AuthConfig {
            name: "test".to_string(),
            auth_type: auth_type.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_auth_defined() {
        assert_eq!(
            select_strategy(&config("")).unwrap_err(),
            ConfigError::NoAuthDefined
        );
        assert_eq!(
            select_strategy(&config("none")).unwrap_err(),
            ConfigError::NoAuthDefined
        );
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            select_strategy(&config("kerberos")).unwrap_err(),
            ConfigError::UnknownType("kerberos".to_string())
        );
    }

    #[test]
    fn test_development_overrides_type() {
        let mut config = config("kerberos");
        config.development = true;
        assert_eq!(select_strategy(&config).unwrap().kind(), StrategyKind::Simple);
    }

    #[test]
    fn test_selects_header() {
        let mut config = config("header");
        config.header = HeaderConfig {
            name: "X-Api-Key".to_string(),
            value: "secret".to_string(),
            exists: false,
        };
        assert_eq!(select_strategy(&config).unwrap().kind(), StrategyKind::Header);
    }

    #[test]
    fn test_selects_jwt() {
        let mut config = config("jwt");
        config.jwt = JwtConfig {
            secret: "shh".to_string(),
            ..Default::default()
        };
        assert_eq!(select_strategy(&config).unwrap().kind(), StrategyKind::Jwt);
    }

    #[test]
    fn test_jwt_config_error() {
        let err = select_strategy(&config("jwt")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Strategy {
                auth_type: "jwt",
                ..
            }
        ));
    }

    #[test]
    fn test_rails_config_error() {
        let err = select_strategy(&config("rails")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Strategy {
                auth_type: "rails",
                ..
            }
        ));
    }

    #[test]
    fn test_rails_cookie_store_uses_session_store() {
        struct NoSessions;

        #[async_trait]
        impl SessionStore for NoSessions {
            async fn load(
                &self,
                _session_id: &str,
            ) -> Result<Option<serde_json::Value>, StrategyError> {
                Ok(None)
            }
        }

        let mut config = config("rails");
        config.rails = RailsConfig {
            url: "redis://localhost:6379".to_string(),
            ..Default::default()
        };

        assert!(select_strategy(&config).is_err());

        let strategy = StrategySelector::new(&config)
            .with_session_store(Arc::new(NoSessions))
            .select()
            .unwrap();
        assert_eq!(strategy.kind(), StrategyKind::Rails);
    }

    #[tokio::test]
    async fn test_header_strategy_attaches_no_identity() {
        let mut config = config("header");
        config.header = HeaderConfig {
            name: "X-Api-Key".to_string(),
            value: String::new(),
            exists: true,
        };
        let strategy = select_strategy(&config).unwrap();

        assert_eq!(
            strategy.authenticate(&parts(&[("X-Api-Key", "k")])).await,
            Ok(None)
        );
        assert_eq!(
            strategy.authenticate(&parts(&[])).await,
            Err(StrategyError::Unauthorized)
        );
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(
            bearer_token(&parts(&[("Authorization", "Bearer abc.def")])),
            Some("abc.def")
        );
        assert_eq!(
            bearer_token(&parts(&[("Authorization", "bearer abc")])),
            Some("abc")
        );
        assert_eq!(bearer_token(&parts(&[("Authorization", "Basic abc")])), None);
        assert_eq!(bearer_token(&parts(&[("Authorization", "Bearer")])), None);
        assert_eq!(bearer_token(&parts(&[("Authorization", "Bearer a b")])), None);
        assert_eq!(bearer_token(&parts(&[])), None);
    }

    #[test]
    fn test_cookie_value() {
        let parts = parts(&[("Cookie", "a=1; session=xyz")]);
        assert_eq!(cookie_value(&parts, "session"), Some("xyz".to_string()));
        assert_eq!(cookie_value(&parts, "missing"), None);
    }
}
