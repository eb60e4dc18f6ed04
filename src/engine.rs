//! The OCR service seam: a trait for "image in, Markdown out".
//!
//! Production code talks to an OpenAI-compatible vision endpoint through
//! [`TogetherVision`]; tests inject a scripted engine via
//! [`crate::config::ExtractConfig::engine`]. Keeping the boundary this thin
//! means the retry loop in [`crate::extract`] never knows whether Markdown
//! came from a network call or a fixture.

use crate::error::TableScanError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A base64-encoded image ready for a JSON request body.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Base64 image bytes (standard alphabet, padded).
    pub data: String,
    /// MIME type from format sniffing, e.g. `image/png`.
    pub mime_type: String,
}

impl ImagePayload {
    /// Render as a `data:` URL, the form vision APIs embed in message content.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// An OCR backend: given an image, return Markdown text.
///
/// Implementations map their own failures onto [`TableScanError`] service
/// variants; the caller classifies severity via
/// [`TableScanError::is_transient`].
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(
        &self,
        image: &ImagePayload,
        prompt: &str,
    ) -> Result<String, TableScanError>;
}

/// OCR via an OpenAI-compatible chat-completions endpoint (Together by
/// default) with a vision model.
///
/// One request per call: a single user message carrying the prompt text and
/// the image as a data-URL attachment. The HTTP client owns the per-attempt
/// timeout so a hung connection cannot stall the retry loop indefinitely.
pub struct TogetherVision {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl TogetherVision {
    /// Build a client with the given credential and per-call timeout.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, TableScanError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TableScanError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl OcrEngine for TogetherVision {
    async fn recognize(
        &self,
        image: &ImagePayload,
        prompt: &str,
    ) -> Result<String, TableScanError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: vec![
                    Content::Text { text: prompt },
                    Content::ImageUrl {
                        image_url: ImageUrl {
                            url: image.to_data_url(),
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TableScanError::OcrTimeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    TableScanError::OcrFailed {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let detail = response.text().await.unwrap_or_default();
            return Err(TableScanError::AuthRejected {
                detail: format!("HTTP {status}: {}", snippet(&detail)),
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TableScanError::OcrFailed {
                message: format!("HTTP {status}: {}", snippet(&detail)),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| TableScanError::OcrFailed {
                    message: format!("malformed response body: {e}"),
                })?;

        let markdown = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| TableScanError::OcrFailed {
                message: "response contained no choices".into(),
            })?;

        debug!("OCR returned {} bytes of markdown", markdown.len());
        Ok(markdown)
    }
}

/// Truncate an error body for log/message hygiene.
fn snippet(s: &str) -> &str {
    let end = s
        .char_indices()
        .take(200)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    &s[..end]
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Content<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_shape() {
        let p = ImagePayload {
            data: "QUJD".into(),
            mime_type: "image/png".into(),
        };
        assert_eq!(p.to_data_url(), "data:image/png;base64,QUJD");
    }

    #[test]
    fn request_body_serialises_tagged_content() {
        let req = ChatRequest {
            model: "m",
            messages: vec![Message {
                role: "user",
                content: vec![
                    Content::Text { text: "hi" },
                    Content::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AA==".into(),
                        },
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image_url");
        assert!(json["messages"][0]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png"));
    }

    #[test]
    fn response_body_deserialises() {
        let raw = r#"{"id":"x","choices":[{"message":{"role":"assistant","content":"| A |"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "| A |");
    }

    #[test]
    fn empty_choices_is_tolerated_by_deserialiser() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn snippet_truncates() {
        let long = "x".repeat(500);
        assert_eq!(snippet(&long).len(), 200);
        assert_eq!(snippet("short"), "short");
    }
}
