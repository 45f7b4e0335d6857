// Auth middleware: run the selected strategy and forward or reject
// Decision: Every outcome is either "forward" or a fixed 401, never a 5xx
// Decision: WebSocket upgrades skip auth only when the host supplied its own strategy

use axum::{
    extract::{Request, State},
    http::{
        header::{CONNECTION, UPGRADE},
        HeaderMap, HeaderName, StatusCode,
    },
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::error::{ConfigError, StrategyError};
use crate::identity::IdentityContext;
use crate::strategy::{SessionStore, Strategy, StrategyKind, StrategySelector};

/// Body of every rejection
pub const UNAUTHORIZED_BODY: &str = "401 unauthorized";

/// Policy options, independent of the strategy in use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthOptions {
    /// Reject requests that end up without a user id
    pub auth_fail_block: bool,
}

/// Terminal state of a request passing through the middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Bypassed,
    Authenticated(Option<IdentityContext>),
    Rejected,
}

/// Apply the fail-block policy to a strategy result
pub(crate) fn decide(
    result: Result<Option<IdentityContext>, StrategyError>,
    options: AuthOptions,
) -> Outcome {
    let identity = match result {
        Ok(identity) => identity,
        Err(StrategyError::Unauthorized) => return Outcome::Rejected,
        Err(_) => None,
    };

    let has_user = identity
        .as_ref()
        .is_some_and(IdentityContext::is_authenticated);

    if options.auth_fail_block && !has_user {
        Outcome::Rejected
    } else {
        Outcome::Authenticated(identity)
    }
}

/// True for `Connection: upgrade` + `Upgrade: websocket` requests
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let has_token = |name: HeaderName, token: &str| {
        headers.get_all(name).iter().any(|value| {
            value.to_str().is_ok_and(|v| {
                v.split(',')
                    .any(|part| part.trim().eq_ignore_ascii_case(token))
            })
        })
    };

    has_token(CONNECTION, "upgrade") && has_token(UPGRADE, "websocket")
}

struct Inner {
    strategy: Strategy,
    options: AuthOptions,
    upgrade_bypass: bool,
    log_errors: bool,
}

/// Shared state of the auth layer. Cheap to clone.
#[derive(Clone)]
pub struct AuthMiddleware {
    inner: Arc<Inner>,
}

impl AuthMiddleware {
    /// Select a strategy from `config` and build the middleware
    pub fn new(config: &AuthConfig, options: AuthOptions) -> Result<Self, ConfigError> {
        Self::builder(config).options(options).build()
    }

    pub fn builder(config: &AuthConfig) -> AuthMiddlewareBuilder<'_> {
        AuthMiddlewareBuilder {
            config,
            options: AuthOptions::default(),
            strategy: None,
            session_store: None,
            log_errors: true,
        }
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.inner.strategy.kind()
    }

    pub fn options(&self) -> AuthOptions {
        self.inner.options
    }

    /// Add the auth layer to `router`; routes added afterwards are not covered
    pub fn wrap<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(from_fn_with_state(self.clone(), auth_middleware))
    }

    async fn evaluate(&self, req: Request) -> (Outcome, Request) {
        if self.inner.upgrade_bypass && is_websocket_upgrade(req.headers()) {
            return (Outcome::Bypassed, req);
        }

        let (parts, body) = req.into_parts();
        let result = self.inner.strategy.authenticate(&parts).await;

        if let Err(error) = &result {
            self.log_error(error);
        }

        (
            decide(result, self.inner.options),
            Request::from_parts(parts, body),
        )
    }

    fn log_error(&self, error: &StrategyError) {
        if !self.inner.log_errors {
            return;
        }

        let auth_type = self.inner.strategy.kind().as_str();
        match error {
            StrategyError::Unauthorized => {
                tracing::debug!(auth_type, error = %error, "Request rejected")
            }
            StrategyError::Unavailable(_) => {
                tracing::warn!(auth_type, error = %error, "Auth backend unavailable")
            }
            StrategyError::Internal(_) => {
                tracing::error!(auth_type, error = %error, "Auth failed")
            }
        }
    }
}

pub struct AuthMiddlewareBuilder<'a> {
    config: &'a AuthConfig,
    options: AuthOptions,
    strategy: Option<Strategy>,
    session_store: Option<Arc<dyn SessionStore>>,
    log_errors: bool,
}

impl<'a> AuthMiddlewareBuilder<'a> {
    pub fn options(mut self, options: AuthOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a host-supplied strategy instead of selecting one from the config.
    /// The same strategy is expected to have authenticated upgraded sessions,
    /// so WebSocket upgrade requests are forwarded without evaluation.
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Stop logging strategy errors
    pub fn without_logging(mut self) -> Self {
        self.log_errors = false;
        self
    }

    pub fn build(self) -> Result<AuthMiddleware, ConfigError> {
        let (strategy, upgrade_bypass) = match self.strategy {
            Some(strategy) => (strategy, true),
            None => {
                let mut selector = StrategySelector::new(self.config);
                if let Some(store) = self.session_store {
                    selector = selector.with_session_store(store);
                }
                (selector.select()?, false)
            }
        };

        Ok(AuthMiddleware {
            inner: Arc::new(Inner {
                strategy,
                options: self.options,
                upgrade_bypass,
                log_errors: self.log_errors,
            }),
        })
    }
}

/// Middleware function for `axum::middleware::from_fn_with_state`
pub async fn auth_middleware(
    State(auth): State<AuthMiddleware>,
    req: Request,
    next: Next,
) -> Response {
    let (outcome, mut req) = auth.evaluate(req).await;

    match outcome {
        Outcome::Rejected => unauthorized(),
        Outcome::Bypassed | Outcome::Authenticated(None) => next.run(req).await,
        Outcome::Authenticated(Some(identity)) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, UNAUTHORIZED_BODY).into_response()
}
