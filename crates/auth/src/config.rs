// Authentication configuration loaded from environment variables.
// Decision: AUTH_ prefix for every setting, one sub-struct per strategy type
// Decision: Validation happens in the strategy selector, not while loading

use std::fmt;

/// Header authentication settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderConfig {
    /// Name of the HTTP header to inspect
    pub name: String,
    /// Exact value the header must carry
    pub value: String,
    /// Only require the header to be present and non-empty
    pub exists: bool,
}

/// Ruby on Rails session cookie settings
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RailsConfig {
    /// Rails version the cookie was produced by ("5.2", "6", "7")
    pub version: String,
    /// `secret_key_base` from the Rails credentials
    pub secret_key_base: String,
    /// Cookie store URL, e.g. redis://redis-host:6379 or memcache://memcache-host
    pub url: String,
    /// Password for the cookie store
    pub password: String,
    /// Maximum idle connections to the cookie store
    pub max_idle: u32,
    /// Maximum active connections to the cookie store
    pub max_active: u32,
    /// Legacy (pre 5.2) encrypted cookie salt
    pub salt: String,
    /// Legacy (pre 5.2) signed cookie salt
    pub sign_salt: String,
    /// Authenticated encrypted cookie salt
    pub auth_salt: String,
}

impl fmt::Debug for RailsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RailsConfig")
            .field("version", &self.version)
            .field("secret_key_base", &redact(&self.secret_key_base))
            .field("url", &self.url)
            .field("password", &redact(&self.password))
            .field("max_idle", &self.max_idle)
            .field("max_active", &self.max_active)
            .field("salt", &self.salt)
            .field("sign_salt", &self.sign_salt)
            .field("auth_salt", &self.auth_salt)
            .finish()
    }
}

/// JWT verification settings
#[derive(Clone, Default, PartialEq, Eq)]
pub struct JwtConfig {
    /// Token issuer flavour ("generic" or "auth0")
    pub provider: String,
    /// Shared secret for HS256 tokens
    pub secret: String,
    /// Path to a PEM encoded public key
    pub public_key_file: String,
    /// Type of the public key ("rsa" or "ecdsa")
    pub public_key_type: String,
    /// Expected `aud` claim
    pub audience: String,
    /// Expected `iss` claim
    pub issuer: String,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("provider", &self.provider)
            .field("secret", &redact(&self.secret))
            .field("public_key_file", &self.public_key_file)
            .field("public_key_type", &self.public_key_type)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// Trust identity headers sent by the caller (never enable in production)
    pub development: bool,
    /// Friendly name used in configuration errors
    pub name: String,
    /// Strategy type: "none", "header", "jwt" or "rails"
    pub auth_type: String,
    /// Name of the cookie carrying the credential
    pub cookie: String,
    /// Header authentication
    pub header: HeaderConfig,
    /// Rails session cookie authentication
    pub rails: RailsConfig,
    /// JWT authentication
    pub jwt: JwtConfig,
}

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str| lookup(key).unwrap_or_default();
        let flag = |key: &str| lookup(key).map(|s| parse_flag(&s)).unwrap_or(false);
        let number = |key: &str| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or_default()
        };

        Self {
            development: flag("AUTH_DEVELOPMENT"),
            name: string("AUTH_NAME"),
            auth_type: string("AUTH_TYPE").trim().to_lowercase(),
            cookie: string("AUTH_COOKIE"),
            header: HeaderConfig {
                name: string("AUTH_HEADER_NAME"),
                value: string("AUTH_HEADER_VALUE"),
                exists: flag("AUTH_HEADER_EXISTS"),
            },
            rails: RailsConfig {
                version: string("AUTH_RAILS_VERSION"),
                secret_key_base: string("AUTH_RAILS_SECRET_KEY_BASE"),
                url: string("AUTH_RAILS_URL"),
                password: string("AUTH_RAILS_PASSWORD"),
                max_idle: number("AUTH_RAILS_MAX_IDLE"),
                max_active: number("AUTH_RAILS_MAX_ACTIVE"),
                salt: string("AUTH_RAILS_SALT"),
                sign_salt: string("AUTH_RAILS_SIGN_SALT"),
                auth_salt: string("AUTH_RAILS_AUTH_SALT"),
            },
            jwt: JwtConfig {
                provider: string("AUTH_JWT_PROVIDER"),
                secret: string("AUTH_JWT_SECRET"),
                public_key_file: string("AUTH_JWT_PUBLIC_KEY_FILE"),
                public_key_type: string("AUTH_JWT_PUBLIC_KEY_TYPE"),
                audience: string("AUTH_JWT_AUDIENCE"),
                issuer: string("AUTH_JWT_ISSUER"),
            },
        }
    }

    /// Check if an authentication type is configured
    pub fn is_enabled(&self) -> bool {
        self.development || !matches!(self.auth_type.as_str(), "" | "none")
    }
}

/// Parse a boolean environment flag ("true" or "1")
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "[REDACTED]"
    }
}
