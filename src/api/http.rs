//! HTTP implementation of the Sentinel API
//!
//! REST layout:
//!
//! - `POST   {endpoint}/v1/sentries/{kind}` - create, answers `{"id": ...}`
//! - `GET    {endpoint}/v1/sentries/{id}`   - fetch, 404 when gone
//! - `PUT    {endpoint}/v1/sentries/{id}`   - update
//! - `DELETE {endpoint}/v1/sentries/{id}`   - delete

use super::{ApiError, SentryApi};
use crate::config::SecretString;
use crate::resource::{ResourceInstance, ResourceKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client for the Sentinel API
#[derive(Clone)]
pub struct HttpSentryApi {
    client: Client,
    base: Url,
    api_key: Option<SecretString>,
}

impl HttpSentryApi {
    /// Create a new HTTP client for `endpoint`
    pub fn new(endpoint: &str, api_key: Option<SecretString>, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(endpoint).context("Invalid Sentinel endpoint URL")?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(concat!("sentinel-provider/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let path = segments
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        self.base
            .join(&format!("v1/sentries/{}", path))
            .map_err(|e| ApiError::Transport(format!("bad request URL: {}", e)))
    }

    /// Send a request and return the status and body
    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, String), ApiError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let mut request = request.header("X-Request-Id", request_id.as_str());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.without_url().to_string()))?;

        if !status.is_success() && status != StatusCode::NOT_FOUND {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!(
                request_id = %request_id,
                "API error: {} - {}",
                status,
                sanitize_for_log(&body)
            );
        }

        Ok((status, body))
    }

    fn check(status: StatusCode, id: &str) -> Result<(), ApiError> {
        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(id.to_string()))
        } else if !status.is_success() {
            Err(ApiError::Status {
                status: status.as_u16(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SentryApi for HttpSentryApi {
    async fn create_remote(
        &self,
        kind: &ResourceKind,
        instance: &ResourceInstance,
    ) -> Result<String, ApiError> {
        let url = self.url(&[&kind.name])?;
        tracing::debug!("POST {}", url);

        let (status, body) = self
            .send(self.client.post(url).json(&instance.to_record()))
            .await?;
        Self::check(status, &kind.name)?;

        // Handle empty response
        if body.trim().is_empty() {
            return instance
                .id()
                .map(str::to_string)
                .ok_or_else(|| ApiError::InvalidResponse("create returned no id".to_string()));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("create response: {}", e)))?;
        value
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::InvalidResponse("create response has no id".to_string()))
    }

    async fn fetch_remote(&self, id: &str) -> Result<Option<ResourceInstance>, ApiError> {
        let url = self.url(&[id])?;
        tracing::debug!("GET {}", url);

        let (status, body) = self.send(self.client.get(url)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check(status, id)?;

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ApiError::InvalidResponse(format!("fetch response: {}", e)))
    }

    async fn update_remote(&self, id: &str, instance: &ResourceInstance) -> Result<(), ApiError> {
        let url = self.url(&[id])?;
        tracing::debug!("PUT {}", url);

        let (status, _) = self
            .send(self.client.put(url).json(&instance.to_record()))
            .await?;
        Self::check(status, id)
    }

    async fn delete_remote(&self, id: &str) -> Result<(), ApiError> {
        let url = self.url(&[id])?;
        tracing::debug!("DELETE {}", url);

        let (status, _) = self.send(self.client.delete(url)).await?;
        Self::check(status, id)
    }
}

/// Format a Sentinel API error for a diagnostic
/// Security: Generic messages avoid leaking API structure details or credentials
pub fn format_api_error(error: &ApiError) -> String {
    match error {
        ApiError::NotFound(id) => format!("Resource {} not found.", id),
        ApiError::Status { status: 401 } => {
            "Authentication failed. Check the provider api_key.".to_string()
        }
        ApiError::Status { status: 403 } => {
            "Permission denied. Check the permissions of the provider api_key.".to_string()
        }
        ApiError::Status { status: 409 } => {
            "Resource conflict. The resource may already exist or be in use.".to_string()
        }
        ApiError::Status { status: 429 } => {
            "Rate limit exceeded. Please try again later.".to_string()
        }
        ApiError::Status { status: 400 } => {
            "Invalid request. Check the resource attributes.".to_string()
        }
        ApiError::Status { status } if *status >= 500 => {
            "Sentinel API temporarily unavailable. Please try again.".to_string()
        }
        ApiError::Status { status } => {
            format!("Sentinel API request failed with status {}.", status)
        }
        ApiError::Transport(_) => {
            "Request failed. Check the endpoint and your network connection.".to_string()
        }
        other => {
            // Truncate long error messages and remove potential sensitive data
            let error_str = other.to_string();
            let sanitized = error_str
                .chars()
                .filter(|c| c.is_ascii_graphic() || *c == ' ')
                .take(120)
                .collect::<String>();

            if sanitized.len() < error_str.len() {
                format!("{}...", sanitized)
            } else {
                sanitized
            }
        }
    }
}
