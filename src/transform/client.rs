use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image-preview:generateContent";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of a generative edit: the produced image bytes and their type.
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub data: Bytes,
    pub mime_type: String,
}

/// Client for the external generative image-editing service.
///
/// The service is opaque, slow and rate-limited upstream; every failure
/// surfaces as a typed external-service error. Dropping the returned future
/// aborts the in-flight request.
pub struct GenerativeImageClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerativeImageClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Applies `prompt` to the given image and returns the edited image.
    pub async fn transform(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<TransformedImage> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(format!("{prompt}\n\nOutput exactly one image.")),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: STANDARD.encode(image),
                        }),
                    },
                ],
            }],
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("transform request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ExternalService(format!(
                "transform service returned {status}"
            )));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("invalid transform response: {e}")))?;

        let inline = extract_inline_image(payload)
            .ok_or_else(|| Error::ExternalService("no image in transform response".to_string()))?;

        let data = STANDARD
            .decode(&inline.data)
            .map_err(|e| Error::ExternalService(format!("undecodable image payload: {e}")))?;

        let mime_type = if inline.mime_type.is_empty() {
            "image/png".to_string()
        } else {
            inline.mime_type
        };

        Ok(TransformedImage {
            data: Bytes::from(data),
            mime_type,
        })
    }

    /// Fetches source image bytes from a URL, for transform requests that
    /// reference an image by link instead of inline data.
    pub async fn fetch_image(&self, url: &str) -> Result<(Bytes, String)> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ExternalService(format!("image fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ExternalService(format!(
                "image fetch returned {status}"
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or_else(|| "image/png".to_string(), |s| s.to_string());

        let data = response
            .bytes()
            .await
            .map_err(|e| Error::ExternalService(format!("image fetch failed: {e}")))?;

        Ok((data, mime_type))
    }
}

/// The first inline-image part of the first candidate wins; text parts are
/// skipped.
fn extract_inline_image(payload: GenerateResponse) -> Option<InlineData> {
    payload
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.inline_data)
}
