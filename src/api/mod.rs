// API client - outbound HTTP to the CRM backend
//
// Thin wrapper over reqwest that attaches the bearer token from the session
// store, normalizes failures into the ApiError taxonomy, and reacts to 401 by
// clearing the persisted session and emitting SessionExpired. Everything else
// in the client is plain request/decode plumbing; no retries, no client-side
// timeout beyond the transport's own.

pub mod types;

use crate::cache::CollectionKey;
use crate::config::Config;
use crate::events::AppEvent;
use crate::session::SessionStore;
use crate::util::truncate_utf8_safe;
use anyhow::Context;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use types::{AuthUser, LoginResponse};

use crate::assistant::types::{
    QueryRequest, QueryResponse, SuggestionsRequest, SuggestionsResponse, Suggestion,
};

/// Failure taxonomy for backend calls
///
/// The variants mirror what the assistant's error classification needs to
/// distinguish; see `assistant::classify`.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// The transport reported an aborted or timed-out call
    Timeout,
    /// No response at all (DNS, refused connection, unplugged cable)
    Unreachable(String),
    /// The backend rejected our token; the session has been cleared
    Unauthorized,
    /// Non-2xx with a structured `error`/`detail` field in the body
    Api { status: u16, detail: String },
    /// Non-2xx without a usable error body
    Http { status: u16 },
    /// 2xx whose body could not be read or parsed
    Decode(String),
}

impl ApiError {
    /// Map a reqwest transport-level failure into the taxonomy
    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Unreachable(msg) => write!(f, "backend unreachable: {}", msg),
            Self::Unauthorized => write!(f, "not authenticated"),
            Self::Api { status, detail } => write!(f, "API error ({}): {}", status, detail),
            Self::Http { status } => write!(f, "HTTP {}", status),
            Self::Decode(msg) => write!(f, "invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Cap on extracted error details; some backends echo whole request bodies
const MAX_ERROR_DETAIL_BYTES: usize = 500;

/// Pull a human-readable error out of a failure body
///
/// The backend is inconsistent: sometimes `{"error": "..."}`, sometimes
/// `{"error": {"message": "..."}}`, sometimes `{"detail": "..."}`.
fn extract_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for field in ["error", "detail", "message"] {
        match value.get(field) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => {
                return Some(truncate_utf8_safe(s, MAX_ERROR_DETAIL_BYTES).to_string())
            }
            Some(serde_json::Value::Object(obj)) => {
                if let Some(serde_json::Value::String(s)) = obj.get("message") {
                    if !s.is_empty() {
                        return Some(truncate_utf8_safe(s, MAX_ERROR_DETAIL_BYTES).to_string());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// HTTP client for the CRM backend
///
/// Cheap to clone: reqwest's client is an Arc internally and the session
/// store is a shared handle, so spawned tasks take their own copy.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
    /// Where to announce session expiry; absent in CLI-only use
    events: Option<mpsc::Sender<AppEvent>>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        session: SessionStore,
        events: Option<mpsc::Sender<AppEvent>>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            session,
            events,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Finish a request: attach auth, send, normalize the outcome
    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, ApiError> {
        let builder = match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(
                token_hash = ?self.session.token_hash(),
                "Backend rejected token, clearing session"
            );
            self.session.clear();
            if let Some(tx) = &self.events {
                // try_send: expiry must not block, and a full channel means
                // the UI is about to learn about it some other way anyway
                let _ = tx.try_send(AppEvent::SessionExpired);
            }
            return Err(ApiError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(match extract_error_detail(&body) {
                Some(detail) => ApiError::Api {
                    status: status.as_u16(),
                    detail,
                },
                None => ApiError::Http {
                    status: status.as_u16(),
                },
            });
        }

        if body.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ApiError> {
        self.execute(self.http.get(self.url(path))).await
    }

    async fn post_json<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, ApiError> {
        self.execute(self.http.post(self.url(path)).json(body)).await
    }

    fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────────

    /// Exchange credentials for a token. Does not touch the session store;
    /// the caller decides whether to establish the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let value = self.post_json("/api/auth/login", &body).await?;
        Self::decode(value)
    }

    /// Validate the current token and fetch its user
    pub async fn me(&self) -> Result<AuthUser, ApiError> {
        let value = self.get_json("/api/auth/me").await?;
        Self::decode(value)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Assistant
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn assistant_query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        let value = self.post_json("/api/assistant/query", request).await?;
        Self::decode(value)
    }

    pub async fn assistant_suggestions(
        &self,
        request: &SuggestionsRequest,
    ) -> Result<Vec<Suggestion>, ApiError> {
        let value = self.post_json("/api/assistant/suggestions", request).await?;
        let response: SuggestionsResponse = Self::decode(value)?;
        Ok(response.suggestions)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collections
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a whole collection as raw JSON for the query cache
    pub async fn list_collection(&self, key: CollectionKey) -> Result<serde_json::Value, ApiError> {
        self.get_json(&format!("/api/{}", key.as_str())).await
    }

    /// Delete one entity. The caller is responsible for invalidating the
    /// collection afterwards.
    pub async fn delete_entity(&self, key: CollectionKey, id: &str) -> Result<(), ApiError> {
        self.execute(self.http.delete(self.url(&format!("/api/{}/{}", key.as_str(), id))))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_detail_string_field() {
        assert_eq!(
            extract_error_detail(r#"{"error": "lead not found"}"#),
            Some("lead not found".to_string())
        );
        assert_eq!(
            extract_error_detail(r#"{"detail": "validation failed"}"#),
            Some("validation failed".to_string())
        );
    }

    #[test]
    fn test_extract_error_detail_nested_message() {
        assert_eq!(
            extract_error_detail(r#"{"error": {"message": "bad request", "code": 400}}"#),
            Some("bad request".to_string())
        );
    }

    #[test]
    fn test_extract_error_detail_unusable_bodies() {
        assert_eq!(extract_error_detail("<html>502</html>"), None);
        assert_eq!(extract_error_detail(r#"{"error": ""}"#), None);
        assert_eq!(extract_error_detail(r#"{"status": "down"}"#), None);
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Api {
            status: 422,
            detail: "stage unknown".to_string(),
        };
        assert_eq!(err.to_string(), "API error (422): stage unknown");
        assert_eq!(ApiError::Timeout.to_string(), "request timed out");
    }
}
