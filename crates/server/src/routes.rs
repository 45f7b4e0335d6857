// HTTP routes for the server binary
// Decision: /health stays outside the auth layer and the API prefix

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    routing::get,
    Json, Router,
};
use gateward_auth::{AuthMiddleware, IdentityContext};
use serde::Serialize;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::normalize_prefix;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WhoAmI {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub user_id_provider: Option<String>,
    pub user_role: Option<String>,
}

impl From<&IdentityContext> for WhoAmI {
    fn from(identity: &IdentityContext) -> Self {
        Self {
            authenticated: identity.is_authenticated(),
            user_id: identity.user_id().map(str::to_string),
            user_id_provider: identity.user_id_provider().map(str::to_string),
            user_role: identity.user_role().map(str::to_string),
        }
    }
}

/// Identity the auth layer attached to this request
async fn whoami(identity: IdentityContext) -> Json<WhoAmI> {
    Json(WhoAmI::from(&identity))
}

fn api_routes() -> Router {
    Router::new().route("/v1/whoami", get(whoami))
}

/// Build router with optional API prefix
fn build_router_with_prefix<S: Clone + Send + Sync + 'static>(
    api_routes: Router<S>,
    api_prefix: &str,
) -> Router<S> {
    let api_prefix = normalize_prefix(api_prefix);
    if api_prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(&api_prefix, api_routes)
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
            .allow_credentials(true),
    )
}

pub struct RouterOptions<'a> {
    pub api_prefix: &'a str,
    pub request_timeout: Duration,
    pub cors_allowed_origins: &'a [String],
}

/// Assemble the application: API routes behind `auth` (when enabled) plus /health
pub fn build_router(auth: Option<&AuthMiddleware>, options: RouterOptions<'_>) -> Router {
    let api = match auth {
        Some(auth) => auth.wrap(api_routes()),
        None => api_routes(),
    };

    let app = Router::new()
        .route("/health", get(health))
        .merge(build_router_with_prefix(api, options.api_prefix));

    let app = match cors_layer(options.cors_allowed_origins) {
        Some(cors) => app.layer(cors),
        None => app,
    };

    app.layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        options.request_timeout,
    ))
    .layer(TraceLayer::new_for_http())
}
