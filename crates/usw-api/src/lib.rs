//! Client for the userstyles.world style publishing API.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
mod style;

pub use config::{ConfigError, DEFAULT_USW_BASE_URL, ENV_USW_BASE_URL};
pub use style::{Style, StyleId, StyleInfo, UswLinkage};

#[derive(Debug, Clone)]
pub struct UswApiClientConfig {
    pub base_url: String,
}

impl UswApiClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let (base_url, source) = config::resolve_base_url()?;
        tracing::debug!(%base_url, source, "Resolved USW base url");
        Ok(Self::new(base_url))
    }
}

impl Default for UswApiClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_USW_BASE_URL)
    }
}

/// Stateless client for the two style endpoints.
///
/// Requests never carry cookies: the underlying `reqwest::Client` has no
/// cookie store, so the bearer token is the only credential sent. There is no
/// retry and no timeout; a failed request surfaces to the caller as is.
/// A non-2xx status is an `ApiError::Http` even when the body is a `{data}`
/// envelope.
#[derive(Debug, Clone)]
pub struct UswApiClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("usw_invalid_base_url:{0}")]
    InvalidBaseUrl(#[from] ConfigError),
    #[error("usw_style_not_linked")]
    NotLinked,
    #[error("usw_request_failed:{message}")]
    Request { message: String },
    #[error("usw_read_failed:{message}")]
    Read { message: String },
    #[error("usw_http_{status}:{body}")]
    Http { status: StatusCode, body: String },
    #[error("usw_json_decode_failed:{message}")]
    Decode { message: String },
    #[error("usw_json_encode_failed:{message}")]
    Encode { message: String },
}

#[derive(Debug, Serialize)]
pub struct UploadStyleRequest<'a> {
    pub code: &'a str,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

impl UswApiClient {
    pub fn new(config: UswApiClientConfig) -> Result<Self, ApiError> {
        let base_url = config::normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(UswApiClientConfig::from_env()?)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim().trim_start_matches('/'))
    }

    #[must_use]
    pub fn style_path() -> &'static str {
        "/api/style"
    }

    #[must_use]
    pub fn style_upload_path(id: &StyleId) -> String {
        format!("/api/style/{id}")
    }

    /// Fetches the server-side info of the style the token is bound to.
    pub async fn fetch_style_info(&self, token: &str) -> Result<StyleInfo, ApiError> {
        let url = self.endpoint(Self::style_path());
        tracing::debug!(%url, "Fetching USW style info");
        let request = self
            .http
            .get(url.as_str())
            .header(AUTHORIZATION, bearer(token));
        send_for_data(request).await
    }

    /// Uploads the style's source code to the remote style it is linked to.
    pub async fn upload_style(&self, style: &Style) -> Result<StyleInfo, ApiError> {
        let linkage = style.usw.as_ref().ok_or(ApiError::NotLinked)?;
        let (Some(id), Some(token)) = (linkage.id.as_ref(), linkage.token()) else {
            return Err(ApiError::NotLinked);
        };
        if id.is_empty() {
            return Err(ApiError::NotLinked);
        }

        let url = self.endpoint(&Self::style_upload_path(id));
        tracing::debug!(%url, %id, bytes = style.source_code.len(), "Uploading style to USW");
        let body = encode_upload_body(style)?;
        let request = self
            .http
            .post(url.as_str())
            .header(AUTHORIZATION, bearer(token))
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        send_for_data(request).await
    }
}

/// JSON body of an upload: exactly `{"code": <source>}`.
pub fn encode_upload_body(style: &Style) -> Result<String, ApiError> {
    serde_json::to_string(&UploadStyleRequest {
        code: &style.source_code,
    })
    .map_err(|error| ApiError::Encode {
        message: error.to_string(),
    })
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> ApiError {
    let body = non_empty_string(String::from_utf8_lossy(body).to_string())
        .unwrap_or_else(|| "<empty>".to_string());
    ApiError::Http { status, body }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

async fn send_for_data(request: reqwest::RequestBuilder) -> Result<StyleInfo, ApiError> {
    let response = request.send().await.map_err(|error| ApiError::Request {
        message: error.to_string(),
    })?;
    let envelope: DataEnvelope<Option<StyleInfo>> = decode_json_response(response).await?;
    Ok(envelope.data.unwrap_or_default())
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ApiError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let status = response.status();
    let bytes = response.bytes().await.map_err(|error| ApiError::Read {
        message: error.to_string(),
    })?;

    if !status.is_success() {
        tracing::warn!(%status, "USW request rejected");
        return Err(format_http_error(status, &bytes));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|error| ApiError::Decode {
        message: error.to_string(),
    })
}

fn non_empty_string(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_builder_normalizes_paths() {
        let client = UswApiClient::new(UswApiClientConfig::new("https://userstyles.world/"))
            .expect("usw client");

        assert_eq!(
            client.endpoint("/api/style"),
            "https://userstyles.world/api/style"
        );
        assert_eq!(
            client.endpoint("api/style"),
            "https://userstyles.world/api/style"
        );
        assert_eq!(
            client.endpoint(&UswApiClient::style_upload_path(&StyleId::Number(42))),
            "https://userstyles.world/api/style/42"
        );
        assert_eq!(
            client.endpoint(&UswApiClient::style_upload_path(&StyleId::from("abc"))),
            "https://userstyles.world/api/style/abc"
        );
    }

    #[test]
    fn upload_body_contains_only_code() {
        let mut style = Style::new("body{}");
        style
            .extra
            .insert("name".to_string(), serde_json::json!("ignored"));
        assert_eq!(
            encode_upload_body(&style).expect("body"),
            r#"{"code":"body{}"}"#
        );
    }

    #[test]
    fn http_error_mapping_preserves_shape() {
        let error = format_http_error(StatusCode::UNAUTHORIZED, b" bad token ");
        assert_eq!(error.to_string(), "usw_http_401 Unauthorized:bad token");

        let empty_body = format_http_error(StatusCode::BAD_GATEWAY, b" ");
        assert_eq!(empty_body.to_string(), "usw_http_502 Bad Gateway:<empty>");
    }

    #[test]
    fn base_url_missing_is_rejected() {
        let result = UswApiClient::new(UswApiClientConfig::new("   "));
        assert!(matches!(
            result,
            Err(ApiError::InvalidBaseUrl(ConfigError::EmptyBaseUrl))
        ));
    }

    #[tokio::test]
    async fn upload_without_linkage_fails_before_sending() {
        let client = UswApiClient::new(UswApiClientConfig::new("http://127.0.0.1:9"))
            .expect("usw client");

        let unlinked = Style::new("a{}");
        assert!(matches!(
            client.upload_style(&unlinked).await,
            Err(ApiError::NotLinked)
        ));

        let mut tokenless = Style::new("a{}");
        tokenless.usw = Some(UswLinkage {
            id: Some(StyleId::Number(3)),
            ..UswLinkage::default()
        });
        assert!(matches!(
            client.upload_style(&tokenless).await,
            Err(ApiError::NotLinked)
        ));

        let mut blank_id = Style::new("a{}");
        blank_id.usw = Some(UswLinkage {
            id: Some(StyleId::from(" ")),
            token: Some("t".to_string()),
            ..UswLinkage::default()
        });
        assert!(matches!(
            client.upload_style(&blank_id).await,
            Err(ApiError::NotLinked)
        ));
    }
}
