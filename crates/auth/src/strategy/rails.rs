// Rails strategy: read the logged-in user from a Rails session cookie
// Decision: Encrypted cookies (Rails 5.2+) are decrypted in-process with AES-256-GCM
// Decision: Server-side cookie stores are reached through an injected SessionStore

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use axum::http::request::Parts;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use super::cookie_value;
use crate::config::RailsConfig;
use crate::error::StrategyError;
use crate::identity::IdentityContext;

pub const DEFAULT_SESSION_COOKIE: &str = "_app_session";
const DEFAULT_AUTH_SALT: &str = "authenticated encrypted cookie";
const KEY_ITERATIONS: u32 = 1000;
const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const WARDEN_USER_KEY: &str = "warden.user.user.key";

/// Server-side session lookup for cookie-store deployments (Redis, Memcache).
///
/// Implementations own their connection pool and must be safe to call from
/// many requests at once. Transport failures should be reported as
/// [`StrategyError::Unavailable`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the decoded session stored under `session_id`
    async fn load(&self, session_id: &str) -> Result<Option<Value>, StrategyError>;
}

/// Rails release line, which decides the key derivation digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailsVersion {
    V5_2,
    V6,
    V7,
}

impl RailsVersion {
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        let mut segments = value.split('.');
        let major = segments.next().unwrap_or_default();
        let minor = segments.next().unwrap_or("0");

        match (major, minor) {
            ("", _) | ("6", _) => Ok(RailsVersion::V6),
            ("5", "2") => Ok(RailsVersion::V5_2),
            ("7", _) | ("8", _) => Ok(RailsVersion::V7),
            _ => Err(format!(
                "rails version '{}' is not supported (requires 5.2 or later)",
                value
            )),
        }
    }
}

/// AES-256-GCM cipher keyed from `secret_key_base`
#[derive(Clone)]
struct CookieCipher {
    cipher: Aes256Gcm,
}

impl CookieCipher {
    fn new(config: &RailsConfig, version: RailsVersion) -> Result<Self, String> {
        let salt = if config.auth_salt.is_empty() {
            DEFAULT_AUTH_SALT
        } else {
            config.auth_salt.as_str()
        };

        let key = derive_key(&config.secret_key_base, salt, version);
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| format!("failed to create cookie cipher: {}", e))?;

        Ok(Self { cipher })
    }

    /// Decrypt a `data--iv--tag` cookie value into its JSON payload
    fn decrypt(&self, cookie: &str) -> Result<Value, StrategyError> {
        let mut segments = cookie.split("--");
        let (Some(data), Some(iv), Some(tag), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(StrategyError::Unauthorized);
        };

        let decode = |s: &str| BASE64.decode(s).map_err(|_| StrategyError::Unauthorized);
        let mut ciphertext = decode(data)?;
        let iv = decode(iv)?;
        let tag = decode(tag)?;

        if iv.len() != NONCE_SIZE {
            return Err(StrategyError::Unauthorized);
        }
        ciphertext.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
            .map_err(|_| StrategyError::Unauthorized)?;

        serde_json::from_slice(&plaintext).map_err(|e| {
            StrategyError::Internal(format!("session cookie is not JSON serialized: {}", e))
        })
    }
}

fn derive_key(secret_key_base: &str, salt: &str, version: RailsVersion) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    let (password, salt) = (secret_key_base.as_bytes(), salt.as_bytes());
    match version {
        RailsVersion::V5_2 | RailsVersion::V6 => {
            pbkdf2::pbkdf2_hmac::<sha1::Sha1>(password, salt, KEY_ITERATIONS, &mut key)
        }
        RailsVersion::V7 => {
            pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, salt, KEY_ITERATIONS, &mut key)
        }
    }
    key
}

#[derive(Clone)]
enum SessionSource {
    Encrypted(CookieCipher),
    Store(Arc<dyn SessionStore>),
}

#[derive(Clone)]
pub struct RailsStrategy {
    cookie: String,
    source: SessionSource,
}

impl RailsStrategy {
    /// Build the strategy from its sub-config.
    ///
    /// With `rails.url` set the session lives in a cookie store and `store`
    /// must be supplied; otherwise the cookie itself is decrypted with a key
    /// derived from `rails.secret_key_base`.
    pub fn new(
        config: &RailsConfig,
        cookie: &str,
        store: Option<Arc<dyn SessionStore>>,
    ) -> Result<Self, String> {
        let cookie = if cookie.is_empty() {
            DEFAULT_SESSION_COOKIE.to_string()
        } else {
            cookie.to_string()
        };

        let source = if config.url.is_empty() {
            if config.secret_key_base.is_empty() {
                return Err("no rails.secret_key_base defined".to_string());
            }
            let version = RailsVersion::parse(&config.version)?;
            SessionSource::Encrypted(CookieCipher::new(config, version)?)
        } else {
            let url = url::Url::parse(&config.url)
                .map_err(|e| format!("invalid rails.url '{}': {}", config.url, e))?;
            match url.scheme() {
                "redis" | "rediss" | "memcache" => {}
                other => return Err(format!("unsupported cookie store scheme '{}'", other)),
            }
            let store = store.ok_or_else(|| {
                format!(
                    "cookie store '{}' requires a session store to be supplied",
                    url.scheme()
                )
            })?;
            SessionSource::Store(store)
        };

        Ok(Self { cookie, source })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie
    }

    pub async fn authenticate(
        &self,
        parts: &Parts,
    ) -> Result<Option<IdentityContext>, StrategyError> {
        let raw = cookie_value(parts, &self.cookie).ok_or(StrategyError::Unauthorized)?;
        let value = urlencoding::decode(&raw)
            .map_err(|_| StrategyError::Unauthorized)?
            .into_owned();

        let session = match &self.source {
            SessionSource::Encrypted(cipher) => {
                let payload = cipher.decrypt(&value)?;
                unwrap_envelope(payload, &self.cookie)?
            }
            SessionSource::Store(store) => store
                .load(&value)
                .await?
                .ok_or(StrategyError::Unauthorized)?,
        };

        Ok(session_user_id(&session).map(|id| IdentityContext::new().with_user_id(id)))
    }
}

/// Strip the `_rails` metadata envelope, checking expiry and purpose.
/// Payloads without an envelope are returned unchanged.
fn unwrap_envelope(payload: Value, cookie: &str) -> Result<Value, StrategyError> {
    let Some(meta) = payload.get("_rails") else {
        return Ok(payload);
    };

    if let Some(exp) = meta.get("exp").and_then(Value::as_str) {
        let expires = DateTime::parse_from_rfc3339(exp)
            .map_err(|e| StrategyError::Internal(format!("invalid session expiry: {}", e)))?;
        if expires.with_timezone(&Utc) <= Utc::now() {
            return Err(StrategyError::Unauthorized);
        }
    }

    if let Some(purpose) = meta.get("pur").and_then(Value::as_str) {
        if purpose != format!("cookie.{}", cookie) {
            return Err(StrategyError::Unauthorized);
        }
    }

    let message = meta
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| StrategyError::Internal("session envelope has no message".to_string()))?;
    let decoded = BASE64
        .decode(message)
        .map_err(|e| StrategyError::Internal(format!("invalid session message: {}", e)))?;

    serde_json::from_slice(&decoded).map_err(|e| {
        StrategyError::Internal(format!("session message is not JSON serialized: {}", e))
    })
}

/// User id from a Devise/Warden session (`[[id], salt]`) or a plain `user_id` key
fn session_user_id(session: &Value) -> Option<String> {
    let scalar = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    if let Some(Value::Array(entry)) = session.get(WARDEN_USER_KEY) {
        let id = match entry.first() {
            Some(Value::Array(ids)) => ids.first().and_then(scalar),
            Some(other) => scalar(other),
            None => None,
        };
        if id.is_some() {
            return id;
        }
    }

    session.get("user_id").and_then(scalar)
}
