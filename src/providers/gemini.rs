/*!
 * Google Gemini client speaking the generateContent REST API.
 *
 * Every HTTP and parse failure is classified into a [`CallOutcome`];
 * this client never retries by itself. Quota responses are inspected
 * for a server-suggested retry delay, which the retry state machine
 * honors when it is longer than the computed backoff.
 */

use std::time::Duration;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::providers::{CallOutcome, FatalReason, GenerationRequest, Provider};

/// Public Gemini API host, used when no endpoint override is given
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// RetryInfo as the REST API serializes it: `"retryDelay": "7s"`
static RETRY_DELAY_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""retryDelay"\s*:\s*"(\d+)(?:\.\d+)?s""#).unwrap());

/// RetryInfo in protobuf text form: `retry_delay { seconds: 7 }`
static RETRY_DELAY_PROTO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"retry_delay\s*\{\s*seconds:\s*(\d+)").unwrap());

/// Gemini client for the generateContent endpoint
#[derive(Debug)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API endpoint URL (empty selects the public API)
    endpoint: String,
    /// Model name, e.g. "gemini-2.0-flash"
    model: String,
}

/// generateContent request body
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,

    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,

    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// One content block (a list of text parts)
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn from_text(text: &str) -> Self {
        Self {
            parts: vec![GeminiPart {
                text: text.to_string(),
            }],
        }
    }
}

/// A single text part
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

/// Sampling configuration
#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

/// One response candidate
#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

impl Gemini {
    /// Create a new Gemini client. An empty endpoint selects the
    /// public API host.
    pub fn new(model: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    fn request_url(&self, api_key: &str) -> Result<Url, url::ParseError> {
        let base = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            self.endpoint.trim_end_matches('/').to_string()
        };
        let mut url = Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            base, self.model
        ))?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }

    /// Concatenate the text parts of the first candidate
    fn extract_text(response: &GeminiResponse) -> String {
        response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

/// Server-suggested retry delay carried in a quota error body, plus
/// one second of slack like the rest of the pipeline expects.
pub fn parse_retry_hint(body: &str) -> Option<Duration> {
    let captures = RETRY_DELAY_JSON
        .captures(body)
        .or_else(|| RETRY_DELAY_PROTO.captures(body))?;
    let seconds: u64 = captures.get(1)?.as_str().parse().ok()?;
    Some(Duration::from_secs(seconds + 1))
}

#[async_trait::async_trait]
impl Provider for Gemini {
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> CallOutcome {
        let url = match self.request_url(api_key) {
            Ok(url) => url,
            Err(e) => {
                return CallOutcome::Fatal(FatalReason::Request(format!(
                    "invalid endpoint for model '{}': {}",
                    self.model, e
                )));
            }
        };

        let payload = GeminiRequest {
            contents: vec![GeminiContent::from_text(&request.prompt)],
            system_instruction: request
                .system
                .as_deref()
                .map(GeminiContent::from_text),
            generation_config: request.temperature.map(|temperature| GenerationConfig {
                temperature: Some(temperature),
            }),
        };

        let response = match self.client.post(url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return CallOutcome::Retryable {
                    reason: format!("request timed out: {}", e),
                    retry_after: None,
                };
            }
            Err(e) => {
                return CallOutcome::Retryable {
                    reason: format!("connection error: {}", e),
                    retry_after: None,
                };
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            let parsed: GeminiResponse = match serde_json::from_str(&body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    return CallOutcome::Retryable {
                        reason: format!("unparseable response envelope: {}", e),
                        retry_after: None,
                    };
                }
            };
            let text = Self::extract_text(&parsed);
            if text.is_empty() {
                // Ranges from safety blocks to empty candidates, all retryable
                return CallOutcome::Retryable {
                    reason: "response contained no text".to_string(),
                    retry_after: None,
                };
            }
            debug!("Gemini returned {} chars", text.len());
            return CallOutcome::Success(text);
        }

        let summary = format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200));
        match status.as_u16() {
            401 | 403 => CallOutcome::Fatal(FatalReason::CredentialRejected(summary)),
            400 if body.to_lowercase().contains("api key") => {
                CallOutcome::Fatal(FatalReason::CredentialRejected(summary))
            }
            400 | 404 => CallOutcome::Fatal(FatalReason::Request(summary)),
            429 => CallOutcome::Retryable {
                reason: summary,
                retry_after: parse_retry_hint(&body),
            },
            _ => CallOutcome::Retryable {
                reason: summary,
                retry_after: None,
            },
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn truncate(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_length).collect();
        format!("{}...", truncated)
    }
}
