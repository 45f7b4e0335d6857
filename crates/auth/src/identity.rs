// Request-scoped caller identity
// Decision: Identity is an immutable value stored in request extensions
// Decision: "Authenticated" means a user id is present, nothing more

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Extensions},
};
use std::convert::Infallible;

/// Identity attached to a request by an authentication strategy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    user_id: Option<String>,
    user_id_provider: Option<String>,
    user_role: Option<String>,
}

impl IdentityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_user_id_provider(mut self, provider: impl Into<String>) -> Self {
        self.user_id_provider = Some(provider.into());
        self
    }

    pub fn with_user_role(mut self, role: impl Into<String>) -> Self {
        self.user_role = Some(role.into());
        self
    }

    /// True iff a user id has been set
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// User id parsed as an integer, or -1 when absent or not numeric
    pub fn user_id_as_integer(&self) -> i64 {
        self.user_id
            .as_deref()
            .and_then(|id| id.parse().ok())
            .unwrap_or(-1)
    }

    pub fn user_id_provider(&self) -> Option<&str> {
        self.user_id_provider.as_deref()
    }

    pub fn user_role(&self) -> Option<&str> {
        self.user_role.as_deref()
    }
}

/// Whether the request carries an authenticated identity
pub fn is_authenticated(extensions: &Extensions) -> bool {
    extensions
        .get::<IdentityContext>()
        .is_some_and(IdentityContext::is_authenticated)
}

/// Raw user id attached to the request, if any
pub fn user_id(extensions: &Extensions) -> Option<&str> {
    extensions
        .get::<IdentityContext>()
        .and_then(IdentityContext::user_id)
}

/// User id attached to the request as an integer, -1 when unavailable
pub fn user_id_as_integer(extensions: &Extensions) -> i64 {
    extensions
        .get::<IdentityContext>()
        .map_or(-1, IdentityContext::user_id_as_integer)
}

/// Extracts the identity attached by the auth middleware.
/// Requests without one yield an empty, unauthenticated identity.
#[axum::async_trait]
impl<S> FromRequestParts<S> for IdentityContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<IdentityContext>()
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_identity() {
        let identity = IdentityContext::new();
        assert!(!identity.is_authenticated());
        assert_eq!(identity.user_id(), None);
        assert_eq!(identity.user_id_as_integer(), -1);
    }

    #[test]
    fn test_numeric_user_id() {
        let identity = IdentityContext::new().with_user_id("42");
        assert!(identity.is_authenticated());
        assert_eq!(identity.user_id(), Some("42"));
        assert_eq!(identity.user_id_as_integer(), 42);
    }

    #[test]
    fn test_user_id_as_integer_fallbacks() {
        assert_eq!(IdentityContext::new().with_user_id("").user_id_as_integer(), -1);
        assert_eq!(
            IdentityContext::new()
                .with_user_id("abc")
                .user_id_as_integer(),
            -1
        );
        assert_eq!(
            IdentityContext::new()
                .with_user_id("-7")
                .user_id_as_integer(),
            -7
        );
    }

    #[test]
    fn test_empty_user_id_still_authenticated() {
        // Presence, not content, decides authentication
        let identity = IdentityContext::new().with_user_id("");
        assert!(identity.is_authenticated());
    }

    #[test]
    fn test_provider_and_role_do_not_authenticate() {
        let identity = IdentityContext::new()
            .with_user_id_provider("github")
            .with_user_role("admin");
        assert!(!identity.is_authenticated());
        assert_eq!(identity.user_id_provider(), Some("github"));
        assert_eq!(identity.user_role(), Some("admin"));
    }

    #[test]
    fn test_extension_accessors() {
        let mut extensions = Extensions::new();
        assert!(!is_authenticated(&extensions));
        assert_eq!(user_id(&extensions), None);
        assert_eq!(user_id_as_integer(&extensions), -1);

        extensions.insert(IdentityContext::new().with_user_id("7"));
        assert!(is_authenticated(&extensions));
        assert_eq!(user_id(&extensions), Some("7"));
        assert_eq!(user_id_as_integer(&extensions), 7);
    }
}
