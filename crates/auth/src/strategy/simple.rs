// Development strategy: trust identity headers sent by the caller
// Decision: Never fails; the fail-block policy decides what an empty identity means

use axum::http::{request::Parts, HeaderMap};

use crate::identity::IdentityContext;

pub const USER_ID_PROVIDER_HEADER: &str = "X-User-ID-Provider";
pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Copies `X-User-ID-Provider`, `X-User-ID` and `X-User-Role` into the identity.
///
/// This is an authentication bypass and is only selected when development
/// mode is switched on explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleStrategy;

impl SimpleStrategy {
    pub fn authenticate(&self, parts: &Parts) -> IdentityContext {
        let mut identity = IdentityContext::new();

        if let Some(provider) = non_empty_header(&parts.headers, USER_ID_PROVIDER_HEADER) {
            identity = identity.with_user_id_provider(provider);
        }
        if let Some(user_id) = non_empty_header(&parts.headers, USER_ID_HEADER) {
            identity = identity.with_user_id(user_id);
        }
        if let Some(role) = non_empty_header(&parts.headers, USER_ROLE_HEADER) {
            identity = identity.with_user_role(role);
        }

        identity
    }
}

fn non_empty_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_copies_all_headers() {
        let identity = SimpleStrategy.authenticate(&parts(&[
            ("X-User-ID-Provider", "github"),
            ("X-User-ID", "42"),
            ("X-User-Role", "admin"),
        ]));

        assert_eq!(identity.user_id(), Some("42"));
        assert_eq!(identity.user_id_provider(), Some("github"));
        assert_eq!(identity.user_role(), Some("admin"));
        assert_eq!(identity.user_id_as_integer(), 42);
    }

    #[test]
    fn test_missing_headers_give_empty_identity() {
        let identity = SimpleStrategy.authenticate(&parts(&[]));
        assert_eq!(identity, IdentityContext::new());
        assert!(!identity.is_authenticated());
    }

    #[test]
    fn test_empty_header_values_are_ignored() {
        let identity = SimpleStrategy.authenticate(&parts(&[("X-User-ID", "")]));
        assert!(!identity.is_authenticated());
    }
}
