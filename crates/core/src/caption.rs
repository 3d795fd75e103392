//! Caption service client.
//!
//! The service is an opaque HTTP endpoint:
//!
//! - request: `POST` JSON `{"image_data": "data:image/png;base64,..."}`
//! - success: 2xx JSON `{"captions": ["primary", "alternate", ...]}`
//! - failure: non-2xx JSON `{"error": "..."}` (the field may be missing)
//!
//! Response handling lives in [`interpret_response`] so it can be exercised
//! without a live server.

use crate::config::Config;
use crate::error::{AppError, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

/// Fallback message when a failed response carries no `error` field.
pub const GENERIC_SERVER_ERROR: &str = "Server error";

#[derive(Serialize)]
struct CaptionRequest<'a> {
    image_data: &'a str,
}

#[derive(Deserialize)]
struct CaptionResponse {
    captions: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

/// Captions from one successful submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionResult {
    /// First caption returned by the service.
    pub primary: Option<String>,
    /// Remaining captions, in server order.
    pub alternates: Vec<String>,
}

impl CaptionResult {
    /// Splits an ordered caption list into primary and alternates.
    pub fn from_captions(captions: Vec<String>) -> Self {
        let mut iter = captions.into_iter();
        let primary = iter.next();
        Self {
            primary,
            alternates: iter.collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none()
    }
}

/// Optional text post-processing applied to each caption.
///
/// The default leaves captions untouched. Formatting never reorders or drops
/// captions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionFormat {
    /// Replace every occurrence of `.0` with `.1`.
    #[serde(default)]
    pub replace_separator: Option<(String, String)>,
    /// Keep at most this many whitespace-separated words.
    #[serde(default)]
    pub max_words: Option<usize>,
}

impl CaptionFormat {
    /// Rewrites `" - "` separators as `", "`.
    pub fn dash_to_comma() -> Self {
        Self {
            replace_separator: Some((" - ".to_string(), ", ".to_string())),
            max_words: None,
        }
    }

    pub fn with_max_words(mut self, max_words: Option<usize>) -> Self {
        self.max_words = max_words;
        self
    }

    pub fn apply(&self, caption: &str) -> String {
        let mut text = match &self.replace_separator {
            Some((from, to)) if !from.is_empty() => caption.replace(from.as_str(), to),
            _ => caption.to_string(),
        };
        if let Some(limit) = self.max_words {
            if text.split_whitespace().count() > limit {
                text = text.split_whitespace().take(limit).collect::<Vec<_>>().join(" ");
            }
        }
        text
    }

    pub fn apply_all(&self, captions: Vec<String>) -> Vec<String> {
        if *self == Self::default() {
            return captions;
        }
        captions.iter().map(|c| self.apply(c)).collect()
    }
}

/// Turns an HTTP status and body into captions or an error.
///
/// # Errors
///
/// - [`AppError::CaptionService`] for non-2xx statuses, carrying the body's
///   `error` field or [`GENERIC_SERVER_ERROR`].
/// - [`AppError::MalformedResponse`] for 2xx bodies without a `captions` list.
pub fn interpret_response(status: StatusCode, body: &str) -> Result<Vec<String>> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|e| e.error)
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_string());
        return Err(AppError::CaptionService(message));
    }

    let response: CaptionResponse = serde_json::from_str(body)
        .map_err(|e| AppError::MalformedResponse(e.to_string()))?;
    Ok(response.captions)
}

/// HTTP client for the caption endpoint.
#[derive(Clone)]
pub struct CaptionClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl CaptionClient {
    /// Builds a client for the endpoint and timeout in `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Submits a composite (as a PNG data URI) and returns the ordered
    /// captions.
    pub async fn caption(&self, image_data: &str) -> Result<Vec<String>> {
        let body = serde_json::to_string(&CaptionRequest { image_data })?;
        info!(endpoint = %self.endpoint, bytes = image_data.len(), "submitting composite");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::network(format!("Caption request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::network(format!("Failed to read caption response: {}", e)))?;

        let result = interpret_response(status, &text);
        match &result {
            Ok(captions) => info!(count = captions.len(), "captions received"),
            Err(e) => warn!(%status, error = %e, "caption request rejected"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_preserves_server_order() {
        let captions = interpret_response(
            StatusCode::OK,
            r#"{"captions":["A red boat on water","boat, water, red"]}"#,
        )
        .unwrap();
        let result = CaptionResult::from_captions(captions);
        assert_eq!(result.primary.as_deref(), Some("A red boat on water"));
        assert_eq!(result.alternates, vec!["boat, water, red".to_string()]);
    }

    #[test]
    fn server_error_message_is_surfaced() {
        let err = interpret_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"model unavailable"}"#,
        )
        .unwrap_err();
        assert!(matches!(&err, AppError::CaptionService(m) if m == "model unavailable"));
    }

    #[test]
    fn missing_error_field_falls_back_to_generic_message() {
        for body in ["{}", "not json", r#"{"error":""}"#] {
            let err = interpret_response(StatusCode::BAD_GATEWAY, body).unwrap_err();
            assert_eq!(err.to_string(), GENERIC_SERVER_ERROR);
        }
    }

    #[test]
    fn success_without_captions_is_malformed() {
        let err = interpret_response(StatusCode::OK, r#"{"result":[]}"#).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[test]
    fn empty_caption_list_is_not_an_error() {
        let captions = interpret_response(StatusCode::OK, r#"{"captions":[]}"#).unwrap();
        assert!(CaptionResult::from_captions(captions).is_empty());
    }

    #[test]
    fn request_body_shape() {
        let json = serde_json::to_string(&CaptionRequest {
            image_data: "data:image/png;base64,AAAA",
        })
        .unwrap();
        assert_eq!(json, r#"{"image_data":"data:image/png;base64,AAAA"}"#);
    }

    #[test]
    fn default_format_is_identity() {
        let input = vec!["cell - membrane - vesicle".to_string()];
        assert_eq!(CaptionFormat::default().apply_all(input.clone()), input);
    }

    #[test]
    fn dash_to_comma_and_word_limit() {
        let format = CaptionFormat::dash_to_comma().with_max_words(Some(3));
        assert_eq!(format.apply("cell - membrane - vesicle"), "cell, membrane, vesicle");
        assert_eq!(format.apply("a b c d e"), "a b c");
        assert_eq!(
            format.apply_all(vec!["x - y".into(), "one two".into()]),
            vec!["x, y".to_string(), "one two".to_string()]
        );
    }
}
