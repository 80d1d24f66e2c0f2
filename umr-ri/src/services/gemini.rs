//! Google Gemini recognition client
//!
//! Implements [`RecognitionProvider`] against the Generative Language API:
//! a raw file upload followed by a `generateContent` call that asks the
//! model for the numeric value on the meter face.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::recognition::{RecognitionError, RecognitionProvider};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_MODEL: &str = "gemini-1.5-flash";
const USER_AGENT: &str = "UMR/0.1.0 (reading-ingest)";
const REQUEST_TIMEOUT_SECS: u64 = 30;

const EXTRACTION_PROMPT: &str =
    "Extract only the numeric measurement value from this image, as a single number.";

/// Gemini vision client
pub struct GeminiVision {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiVision {
    pub fn new(api_key: String) -> Result<Self, RecognitionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RecognitionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (tests)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[derive(Debug, Deserialize)]
struct FileUploadResponse {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    uri: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum RequestPart {
    FileData { mime_type: String, file_uri: String },
    Text(String),
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl RecognitionProvider for GeminiVision {
    async fn upload(
        &self,
        image: &[u8],
        mime_type: &str,
        display_name: &str,
    ) -> Result<String, RecognitionError> {
        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);

        tracing::debug!(display_name, mime_type, bytes = image.len(), "uploading image to Gemini");

        let response = self
            .http_client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type)
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| RecognitionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognitionError::Api(status.as_u16(), truncate(&body, 200)));
        }

        let upload: FileUploadResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::Parse(e.to_string()))?;

        Ok(upload.file.uri)
    }

    async fn extract_number(
        &self,
        image_url: &str,
        mime_type: &str,
    ) -> Result<f64, RecognitionError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, GEMINI_MODEL, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::FileData {
                        mime_type: mime_type.to_string(),
                        file_uri: image_url.to_string(),
                    },
                    RequestPart::Text(EXTRACTION_PROMPT.to_string()),
                ],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RecognitionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognitionError::Api(status.as_u16(), truncate(&body, 200)));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::Parse(e.to_string()))?;

        let text: String = generated
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        parse_measurement(&text)
    }
}

/// Parse the model's text reply as a finite measurement value
fn parse_measurement(text: &str) -> Result<f64, RecognitionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RecognitionError::InvalidResult("empty response".to_string()));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| RecognitionError::InvalidResult(truncate(trimmed, 80)))?;

    if !value.is_finite() {
        return Err(RecognitionError::InvalidResult(truncate(trimmed, 80)));
    }

    Ok(value)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_measurement_integers_and_decimals() {
        assert_eq!(parse_measurement("1234").unwrap(), 1234.0);
        assert_eq!(parse_measurement(" 42.5 \n").unwrap(), 42.5);
        assert_eq!(parse_measurement("0").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_measurement_rejects_prose() {
        assert!(parse_measurement("the meter shows 42").is_err());
        assert!(parse_measurement("").is_err());
        assert!(parse_measurement("  ").is_err());
    }

    #[test]
    fn test_parse_measurement_rejects_non_finite() {
        assert!(parse_measurement("NaN").is_err());
        assert!(parse_measurement("inf").is_err());
        assert!(parse_measurement("-inf").is_err());
    }

    #[test]
    fn test_request_part_serialization_shape() {
        let part = RequestPart::FileData {
            mime_type: "image/png".to_string(),
            file_uri: "files/abc".to_string(),
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["file_data"]["mime_type"], "image/png");
        assert_eq!(json["file_data"]["file_uri"], "files/abc");

        let text = RequestPart::Text("prompt".to_string());
        let json = serde_json::to_value(&text).unwrap();
        assert_eq!(json["text"], "prompt");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = "água e gás";
        let out = truncate(s, 4);
        assert!(out.starts_with("águ") || out.starts_with("ág"));
    }
}
