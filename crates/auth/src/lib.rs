// Gateward request authentication
//
// Pluggable authentication for axum services: a strategy is selected once
// from configuration and then runs on every request inside a middleware layer.
//
// Key design decisions:
// - Strategies are a closed enum (Simple, Header, Rails, Jwt) plus a Custom trait object
// - Configuration errors are caught at selection time, never per request
// - Only StrategyError::Unauthorized rejects directly; other errors go through fail-block
// - Identity travels in request extensions and is read back with an extractor

pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod strategy;

pub use config::{AuthConfig, HeaderConfig, JwtConfig, RailsConfig};
pub use error::{ConfigError, StrategyError};
pub use identity::{is_authenticated, user_id, user_id_as_integer, IdentityContext};
pub use middleware::{
    auth_middleware, is_websocket_upgrade, AuthMiddleware, AuthMiddlewareBuilder, AuthOptions,
    UNAUTHORIZED_BODY,
};
pub use strategy::{
    select_strategy, Authenticator, SessionStore, Strategy, StrategyKind, StrategySelector,
};
