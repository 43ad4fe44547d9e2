//! Remote OCR via the Google Cloud Vision `images:annotate` endpoint.
//!
//! Used for handwriting, which Tesseract reads poorly. Requests carry the
//! preprocessed page as base64 PNG with `DOCUMENT_TEXT_DETECTION` and the
//! configured language hints. The API key travels in the
//! `x-goog-api-key` header, never in the URL.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use base64::Engine;
use image::GrayImage;
use reqwest::blocking::{Client, Response};
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::RemoteEngineConfig;
use crate::processor::image::encode_png;
use crate::secrets::{credential_source_present, resolve_secret};

use super::{EngineType, OcrEngine, OcrError, DEFAULT_CONFIDENCE};

const FEATURE_TYPE: &str = "DOCUMENT_TEXT_DETECTION";
const API_KEY_HEADER: &str = "x-goog-api-key";
const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: Vec<Feature>,
    image_context: ImageContext<'a>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext<'a> {
    language_hints: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<PageAnnotation>,
}

#[derive(Debug, Deserialize)]
struct PageAnnotation {
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

/// Text and confidence pulled from an annotate response.
#[derive(Debug, PartialEq)]
struct Recognized {
    text: String,
    confidence: u8,
}

pub struct VisionEngine {
    config: RemoteEngineConfig,
    /// Built on first extraction.
    client: OnceLock<Client>,
    last_confidence: AtomicU8,
}

impl VisionEngine {
    pub fn new(config: RemoteEngineConfig) -> Self {
        Self {
            config,
            client: OnceLock::new(),
            last_confidence: AtomicU8::new(DEFAULT_CONFIDENCE),
        }
    }

    fn client(&self) -> Result<&Client, OcrError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| {
                OcrError::Initialization(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(self.client.get_or_init(|| client))
    }

    fn request_body<'a>(&'a self, png: &[u8]) -> AnnotateRequest<'a> {
        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(png),
                },
                features: vec![Feature { kind: FEATURE_TYPE }],
                image_context: ImageContext {
                    language_hints: &self.config.language_hints,
                },
            }],
        }
    }

    /// Sends the request, retrying rate limits, server errors and transport
    /// failures with exponential backoff.
    fn send_with_retry(
        &self,
        client: &Client,
        api_key: &HeaderValue,
        body: &AnnotateRequest<'_>,
    ) -> Result<Response, OcrError> {
        let max_retries = self.config.max_retries;
        let mut attempt: u32 = 0;
        loop {
            let request = client
                .post(&self.config.endpoint)
                .header(API_KEY_HEADER, api_key.clone())
                .json(body);
            let (retryable, wait_hint) = match request.send() {
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable_status(status) {
                        return Ok(response);
                    }
                    if attempt >= max_retries {
                        if status == StatusCode::TOO_MANY_REQUESTS {
                            return Err(OcrError::RateLimited {
                                attempts: attempt + 1,
                            });
                        }
                        return Err(failed(format!("Vision API returned {}", status)));
                    }
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after);
                    (status.to_string(), retry_after)
                }
                Err(e) => {
                    let e = e.without_url();
                    if attempt >= max_retries {
                        return Err(OcrError::Request(e.to_string()));
                    }
                    (e.to_string(), None)
                }
            };

            let wait = wait_hint.unwrap_or_else(|| backoff_delay(attempt));
            tracing::warn!(
                "Remote OCR attempt {} failed ({}), retrying in {:?}",
                attempt + 1,
                retryable,
                wait
            );
            std::thread::sleep(wait);
            attempt += 1;
        }
    }
}

impl OcrEngine for VisionEngine {
    fn engine_type(&self) -> EngineType {
        EngineType::Remote
    }

    fn is_available(&self) -> bool {
        self.config.enabled
            && credential_source_present(
                self.config.credentials_path.as_deref(),
                Some(self.config.api_key_env_var.as_str()),
            )
    }

    fn extract_text(&self, image: &GrayImage) -> Result<String, OcrError> {
        let _span = tracing::info_span!("ocr.remote").entered();

        if !self.config.enabled {
            return Err(OcrError::EngineUnavailable(EngineType::Remote));
        }
        let api_key = resolve_secret(
            self.config.credentials_path.as_deref(),
            Some(self.config.api_key_env_var.as_str()),
        )?;
        let mut api_key = HeaderValue::from_str(api_key.expose_secret()).map_err(|_| {
            OcrError::Initialization("API key is not a valid header value".to_string())
        })?;
        api_key.set_sensitive(true);
        let client = self.client()?;

        let png = encode_png(image).map_err(|e| OcrError::ImageEncoding(e.to_string()))?;
        let body = self.request_body(&png);

        let response = self.send_with_retry(client, &api_key, &body)?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(failed(format!("Vision API error ({}): {}", status, detail)));
        }

        let parsed: AnnotateResponse = response
            .json()
            .map_err(|e| failed(format!("Failed to parse response: {}", e)))?;
        let recognized = interpret_response(parsed)?;

        self.last_confidence
            .store(recognized.confidence, Ordering::Relaxed);
        tracing::debug!(
            chars = recognized.text.len(),
            confidence = recognized.confidence,
            "Remote OCR finished"
        );
        Ok(recognized.text)
    }

    fn confidence(&self) -> u8 {
        self.last_confidence.load(Ordering::Relaxed)
    }
}

fn failed(message: String) -> OcrError {
    OcrError::EngineFailed {
        engine: EngineType::Remote,
        message,
    }
}

fn interpret_response(response: AnnotateResponse) -> Result<Recognized, OcrError> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Recognized {
            text: String::new(),
            confidence: DEFAULT_CONFIDENCE,
        });
    };

    if let Some(error) = first.error {
        return Err(failed(format!("Vision API error: {}", error.message)));
    }

    let Some(annotation) = first.full_text_annotation else {
        return Ok(Recognized {
            text: String::new(),
            confidence: DEFAULT_CONFIDENCE,
        });
    };

    let scores: Vec<f32> = annotation.pages.iter().filter_map(|p| p.confidence).collect();
    let confidence = if scores.is_empty() {
        DEFAULT_CONFIDENCE
    } else {
        let mean = scores.iter().sum::<f32>() / scores.len() as f32;
        (mean * 100.0).round().clamp(0.0, 100.0) as u8
    };

    Ok(Recognized {
        text: annotation.text,
        confidence,
    })
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Parses a delay-seconds `Retry-After` value. HTTP dates are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_BACKOFF))
}

fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.min(16));
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor)).min(MAX_BACKOFF)
}
