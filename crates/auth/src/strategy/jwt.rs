// JWT strategy: verify a bearer token or cookie and read the subject
// Decision: HS256 for shared secrets, RS256/ES256 for PEM public keys
// Decision: Every token problem is a plain 401; only key problems are internal errors

use axum::http::request::Parts;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::{bearer_token, cookie_value};
use crate::config::JwtConfig;
use crate::error::StrategyError;
use crate::identity::IdentityContext;

/// Token issuer flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtProvider {
    Generic,
    /// Subjects look like `github|1234`; the prefix becomes the id provider
    Auth0,
}

impl JwtProvider {
    fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "" | "generic" | "jwt" => Ok(JwtProvider::Generic),
            "auth0" => Ok(JwtProvider::Auth0),
            other => Err(format!("unsupported jwt provider '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Clone)]
pub struct JwtStrategy {
    provider: JwtProvider,
    key: DecodingKey,
    validation: Validation,
    cookie: Option<String>,
}

impl JwtStrategy {
    /// Build the verifier. `cookie` names an optional cookie checked when
    /// no `Authorization: Bearer` header is present.
    pub fn new(config: &JwtConfig, cookie: &str) -> Result<Self, String> {
        let provider = JwtProvider::parse(&config.provider)?;
        let (key, algorithm) = decoding_key(config)?;

        // exp is optional, but still enforced when the token carries one
        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims.remove("exp");
        if config.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&[config.audience.as_str()]);
        }
        if !config.issuer.is_empty() {
            validation.set_issuer(&[config.issuer.as_str()]);
        }

        Ok(Self {
            provider,
            key,
            validation,
            cookie: (!cookie.is_empty()).then(|| cookie.to_string()),
        })
    }

    pub fn provider(&self) -> JwtProvider {
        self.provider
    }

    pub fn authenticate(&self, parts: &Parts) -> Result<IdentityContext, StrategyError> {
        let token = bearer_token(parts)
            .map(str::to_string)
            .or_else(|| {
                self.cookie
                    .as_deref()
                    .and_then(|name| cookie_value(parts, name))
            })
            .ok_or(StrategyError::Unauthorized)?;

        let claims = decode::<TokenClaims>(&token, &self.key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidRsaKey(_)
                | ErrorKind::InvalidEcdsaKey
                | ErrorKind::InvalidKeyFormat
                | ErrorKind::Crypto(_) => StrategyError::Internal(e.to_string()),
                _ => {
                    tracing::debug!(error = %e, "JWT validation failed");
                    StrategyError::Unauthorized
                }
            })?
            .claims;

        let subject = claims
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(StrategyError::Unauthorized)?;

        let mut identity = match (self.provider, subject.split_once('|')) {
            (JwtProvider::Auth0, Some((provider, id))) => IdentityContext::new()
                .with_user_id_provider(provider)
                .with_user_id(id),
            _ => IdentityContext::new().with_user_id(subject),
        };

        if let Some(role) = claims.role.filter(|r| !r.is_empty()) {
            identity = identity.with_user_role(role);
        }

        Ok(identity)
    }
}

fn decoding_key(config: &JwtConfig) -> Result<(DecodingKey, Algorithm), String> {
    match (config.secret.is_empty(), config.public_key_file.is_empty()) {
        (true, true) => Err("no jwt.secret or jwt.public_key_file defined".to_string()),
        (false, false) => {
            Err("jwt.secret and jwt.public_key_file cannot both be set".to_string())
        }
        (false, true) => Ok((
            DecodingKey::from_secret(config.secret.as_bytes()),
            Algorithm::HS256,
        )),
        (true, false) => {
            let pem = std::fs::read(&config.public_key_file).map_err(|e| {
                format!(
                    "failed to read public key '{}': {}",
                    config.public_key_file, e
                )
            })?;

            match config.public_key_type.trim().to_lowercase().as_str() {
                "" | "rsa" => DecodingKey::from_rsa_pem(&pem)
                    .map(|key| (key, Algorithm::RS256))
                    .map_err(|e| format!("invalid rsa public key: {}", e)),
                "ecdsa" | "ec" => DecodingKey::from_ec_pem(&pem)
                    .map(|key| (key, Algorithm::ES256))
                    .map_err(|e| format!("invalid ecdsa public key: {}", e)),
                other => Err(format!("unsupported jwt.public_key_type '{}'", other)),
            }
        }
    }
}
