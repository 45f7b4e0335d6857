// Remote field resolver
//
// Fetches a JSON document for a single id from an HTTP endpoint whose URL is
// a template containing `$id`. Used to join data that lives outside the
// database into a response.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Placeholder replaced with the requested id in the URL template
pub const ID_PLACEHOLDER: &str = "$id";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("remote api: {0}")]
    Config(String),

    #[error("failed to connect to '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server responded with a {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A single resolution request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverRequest {
    pub id: String,
}

impl ResolverRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Remote endpoint returning a JSON document per id
#[derive(Debug, Clone)]
pub struct RemoteApi {
    url: String,
    debug: bool,
    set_headers: HeaderMap,
    client: Client,
}

impl RemoteApi {
    /// Build from a config object:
    /// `{ "url": "...$id...", "debug": bool, "set_headers": { name: value } }`
    pub fn from_value(value: &Value) -> Result<Self, ResolveError> {
        let url = value
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ResolveError::Config("no url defined".to_string()))?
            .to_string();

        let debug = value.get("debug").and_then(Value::as_bool).unwrap_or(false);

        let mut set_headers = HeaderMap::new();
        if let Some(headers) = value.get("set_headers").and_then(Value::as_object) {
            for (name, value) in headers {
                let Some(value) = value.as_str() else {
                    return Err(ResolveError::Config(format!(
                        "set_headers.{} must be a string",
                        name
                    )));
                };
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| ResolveError::Config(format!("invalid header name '{}'", name)))?;
                let value = HeaderValue::from_str(value).map_err(|_| {
                    ResolveError::Config(format!("invalid value for header '{}'", name))
                })?;
                set_headers.insert(name, value);
            }
        }

        let client = Client::builder()
            .build()
            .map_err(|e| ResolveError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            url,
            debug,
            set_headers,
            client,
        })
    }

    pub fn url_template(&self) -> &str {
        &self.url
    }

    /// URL for `id` with every placeholder substituted
    pub fn url_for(&self, id: &str) -> String {
        self.url.replace(ID_PLACEHOLDER, id)
    }

    /// GET the document for `request.id`; only a 200 with a JSON body succeeds
    pub async fn resolve(&self, request: &ResolverRequest) -> Result<Vec<u8>, ResolveError> {
        let url = self.url_for(&request.id);

        if self.debug {
            debug!(
                url = %url,
                headers = ?self.set_headers,
                "Remote request"
            );
        }

        let response = self
            .client
            .get(&url)
            .headers(self.set_headers.clone())
            .send()
            .await
            .map_err(|source| ResolveError::Connect {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let headers = self.debug.then(|| response.headers().clone());
        let body = response.bytes().await.map_err(ResolveError::Body)?;

        if let Some(headers) = headers {
            debug!(
                url = %url,
                status = status.as_u16(),
                headers = ?headers,
                body = %String::from_utf8_lossy(&body),
                "Remote response"
            );
        }

        if status != reqwest::StatusCode::OK {
            return Err(ResolveError::Status(status.as_u16()));
        }

        serde_json::from_slice::<serde::de::IgnoredAny>(&body)?;

        Ok(body.to_vec())
    }
}
