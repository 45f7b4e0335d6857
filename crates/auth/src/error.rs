// Error types for strategy selection and per-request authentication
// Decision: Configuration problems and request outcomes never share a type

use thiserror::Error;

/// Error raised while turning an [`AuthConfig`](crate::AuthConfig) into a strategy.
///
/// Every variant except [`ConfigError::NoAuthDefined`] should abort startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Auth type is empty or "none"
    #[error("no auth defined")]
    NoAuthDefined,

    #[error("auth: unknown auth type: {0}")]
    UnknownType(String),

    #[error("auth '{name}': no header.name defined")]
    MissingHeaderName { name: String },

    #[error("auth '{name}': invalid header.name '{header}'")]
    InvalidHeaderName { name: String, header: String },

    #[error("auth '{name}': no header.value defined")]
    MissingHeaderValue { name: String },

    #[error("auth '{name}': header.value and header.exists cannot both be set")]
    ConflictingHeaderRules { name: String },

    /// The JWT or Rails capability refused its sub-configuration
    #[error("{auth_type}: {reason}")]
    Strategy {
        auth_type: &'static str,
        reason: String,
    },
}

impl ConfigError {
    /// True when the error only means that authentication is switched off
    pub fn is_no_auth(&self) -> bool {
        matches!(self, ConfigError::NoAuthDefined)
    }

    pub(crate) fn strategy(auth_type: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Strategy {
            auth_type,
            reason: reason.into(),
        }
    }
}

/// Outcome of a strategy that did not produce an identity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StrategyError {
    /// The credential is missing or invalid. Always rejected with 401.
    #[error("401 unauthorized")]
    Unauthorized,

    /// A backend the strategy depends on could not be reached
    #[error("credential backend unavailable: {0}")]
    Unavailable(String),

    /// The credential could not be processed
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl StrategyError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StrategyError::Unauthorized)
    }

    /// Transient failures say nothing about the credential itself
    pub fn is_transient(&self) -> bool {
        matches!(self, StrategyError::Unavailable(_))
    }
}
