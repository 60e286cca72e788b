use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const RATE_LIMIT_MESSAGE: &str = "API rate limit exceeded. Please try again later.";

/// Failure reported by a provider inside an otherwise successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentinelKind {
    RateLimited,
    InvalidSymbol,
    /// Any other provider error code, kept verbatim.
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// No response was received.
    #[error("network error")]
    Network,
    #[error("http status {status} {status_text}")]
    HttpStatus {
        status: u16,
        status_text: String,
        /// Provider supplied `message` field from the error body, if any.
        message: Option<String>,
    },
    /// Malformed JSON or a payload that does not match the expected shape.
    #[error("{message}")]
    Decode { message: String },
    #[error("{message}")]
    ProviderSentinel { kind: SentinelKind, message: String },
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl GatewayError {
    pub fn decode(message: impl Into<String>) -> Self {
        GatewayError::Decode {
            message: message.into(),
        }
    }

    pub fn sentinel(kind: SentinelKind, message: impl Into<String>) -> Self {
        GatewayError::ProviderSentinel {
            kind,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            GatewayError::HttpStatus { status: 429, .. }
                | GatewayError::ProviderSentinel {
                    kind: SentinelKind::RateLimited,
                    ..
                }
        )
    }

    /// Text shown to the user in place of the widget content.
    pub fn user_message(&self) -> String {
        if self.is_rate_limited() {
            return RATE_LIMIT_MESSAGE.to_string();
        }
        match self {
            GatewayError::Network => {
                "Network error. Please check your connection and try again.".to_string()
            }
            GatewayError::HttpStatus { status: 401, .. } => {
                "Invalid API key. Please check your configuration.".to_string()
            }
            GatewayError::HttpStatus { status: 404, .. } => {
                "Data not found. Please check your search terms.".to_string()
            }
            GatewayError::HttpStatus {
                message: Some(message),
                ..
            } => message.clone(),
            GatewayError::HttpStatus {
                status,
                status_text,
                ..
            } => format!("Request failed: {status} {status_text}")
                .trim_end()
                .to_string(),
            GatewayError::ProviderSentinel {
                kind: SentinelKind::InvalidSymbol,
                ..
            } => "Invalid symbol. Please check the ticker and try again.".to_string(),
            GatewayError::ProviderSentinel { message, .. } => message.clone(),
            GatewayError::Decode { message } | GatewayError::InvalidRequest { message } => {
                message.clone()
            }
        }
    }
}

/// A GET request against an absolute HTTP(S) endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    url: Url,
    params: Vec<(String, String)>,
}

impl GatewayRequest {
    pub fn get(url: &str) -> Result<Self, GatewayError> {
        let url = Url::parse(url).map_err(|err| GatewayError::InvalidRequest {
            message: format!("'{url}' is not a valid url: {err}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(GatewayError::InvalidRequest {
                message: format!("'{url}' is not an http(s) endpoint"),
            });
        }
        Ok(Self {
            url,
            params: Vec::new(),
        })
    }

    pub fn param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Endpoint with the parameters serialised as a query string.
    pub fn full_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(
                self.params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
        }
        url
    }
}

/// Issues requests and turns responses into JSON or a [`GatewayError`].
///
/// There is no retry or caching at this layer.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
}

impl Gateway {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("pulse-dashboard")
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch(&self, request: &GatewayRequest) -> Result<Value, GatewayError> {
        // Query strings carry API keys; only host and path are logged.
        let host = request.url().host_str().unwrap_or_default().to_string();
        let path = request.url().path().to_string();
        tracing::debug!(%host, %path, "gateway request");

        let resp = self
            .client
            .get(request.full_url())
            .send()
            .await
            .map_err(|err| {
                tracing::warn!(%host, %path, "request failed: {}", err.without_url());
                GatewayError::Network
            })?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|err| {
            tracing::warn!(%host, %path, "reading body failed: {}", err.without_url());
            GatewayError::Network
        })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string));
            tracing::debug!(%host, %path, status = status.as_u16(), "non-success status");
            return Err(GatewayError::HttpStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|err| {
            tracing::debug!(%host, %path, "invalid json body: {err}");
            GatewayError::decode("parse error")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_relative_and_non_http_urls() {
        assert!(matches!(
            GatewayRequest::get("/onecall"),
            Err(GatewayError::InvalidRequest { .. })
        ));
        assert!(matches!(
            GatewayRequest::get("ftp://example.com/data"),
            Err(GatewayError::InvalidRequest { .. })
        ));
        assert!(GatewayRequest::get("https://example.com/query").is_ok());
    }

    #[test]
    fn params_are_encoded_into_query() {
        let req = GatewayRequest::get("https://example.com/geo")
            .unwrap()
            .param("q", "New York")
            .param("limit", 1);
        let url = req.full_url();
        assert_eq!(url.query(), Some("q=New+York&limit=1"));
        assert_eq!(req.param_value("limit"), Some("1"));
    }

    #[test]
    fn no_params_leaves_query_empty() {
        let req = GatewayRequest::get("https://example.com/geo").unwrap();
        assert_eq!(req.full_url().query(), None);
    }

    #[test]
    fn user_messages_follow_status() {
        let unauthorized = GatewayError::HttpStatus {
            status: 401,
            status_text: "Unauthorized".into(),
            message: Some("Invalid API key".into()),
        };
        assert!(unauthorized.user_message().contains("Invalid API key"));

        let limited = GatewayError::sentinel(SentinelKind::RateLimited, "Thank you for using");
        assert_eq!(limited.user_message(), RATE_LIMIT_MESSAGE);

        let too_many = GatewayError::HttpStatus {
            status: 429,
            status_text: "Too Many Requests".into(),
            message: None,
        };
        assert_eq!(too_many.user_message(), RATE_LIMIT_MESSAGE);

        let server = GatewayError::HttpStatus {
            status: 500,
            status_text: "Internal Server Error".into(),
            message: None,
        };
        assert_eq!(server.user_message(), "Request failed: 500 Internal Server Error");
        assert_eq!(server.status_code(), Some(500));
        assert_eq!(GatewayError::Network.status_code(), None);
    }
}
