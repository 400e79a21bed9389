/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Parses the prompt payload and answers correctly
 * - `MockProvider::short_array()` - Answers batches with one element missing
 * - `MockProvider::failing()` - Always fails with a retryable error
 *
 * The mock understands the payload markers emitted by the prompt builder,
 * so it can answer batch prompts with a positional JSON array and single
 * prompts with plain text, exactly like a cooperating remote model.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::providers::{CallOutcome, FatalReason, GenerationRequest, Provider};
use crate::translation::prompts::{BATCH_PAYLOAD_MARKER, SINGLE_PAYLOAD_MARKER};

/// Canned answer for file-context prompts
pub const MOCK_CONTEXT: &str = "A mock file about testing.";

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Parses the payload and answers every entry correctly
    Working,
    /// Like `Working` but wraps batch answers in a ```json code fence
    FencedJson,
    /// Answers batches with the last element missing
    ShortArray,
    /// Answers with text that is not valid JSON
    Malformed,
    /// Always fails with a retryable error
    Failing,
    /// Fails the first `failures` calls, then behaves like `Working`
    FailuresThenSuccess { failures: usize },
    /// Rejects one specific credential, succeeds with any other
    RejectKey { key: String },
    /// Rejects every credential
    RejectAll,
    /// Rate-limits every call, optionally carrying a server retry hint
    RateLimited { retry_after: Option<Duration> },
}

/// Mock provider for testing remote call behavior
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    keys_seen: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            keys_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock provider that always answers correctly
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that wraps batch answers in a JSON code fence
    pub fn fenced() -> Self {
        Self::new(MockBehavior::FencedJson)
    }

    /// Create a mock that drops the last element of every batch answer
    pub fn short_array() -> Self {
        Self::new(MockBehavior::ShortArray)
    }

    /// Create a mock that answers with unparseable text
    pub fn malformed() -> Self {
        Self::new(MockBehavior::Malformed)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that recovers after the given number of failures
    pub fn failures_then_success(failures: usize) -> Self {
        Self::new(MockBehavior::FailuresThenSuccess { failures })
    }

    /// Create a mock that rejects one specific credential
    pub fn reject_key(key: &str) -> Self {
        Self::new(MockBehavior::RejectKey { key: key.to_string() })
    }

    /// The translation this mock produces for a source text
    pub fn expected_translation(text: &str) -> String {
        format!("[translated] {}", text)
    }

    /// Number of calls received so far
    pub fn calls(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Credentials used so far, in call order
    pub fn keys_seen(&self) -> Vec<String> {
        self.keys_seen.lock().clone()
    }

    /// Source texts of a batch prompt, if the prompt carries the batch marker
    fn batch_payload(prompt: &str) -> Option<Vec<String>> {
        let (_, tail) = prompt.rsplit_once(BATCH_PAYLOAD_MARKER)?;
        serde_json::from_str(tail.trim()).ok()
    }

    /// Source text of a single-entry prompt, if the prompt carries its marker
    fn single_payload(prompt: &str) -> Option<String> {
        let (_, tail) = prompt.rsplit_once(SINGLE_PAYLOAD_MARKER)?;
        let text = tail
            .split("\n\nTranslation into")
            .next()
            .unwrap_or(tail)
            .trim();
        Some(text.to_string())
    }

    /// Build the answer a cooperating model would give for this prompt
    fn answer(prompt: &str, drop_last: bool, fenced: bool) -> String {
        if let Some(texts) = Self::batch_payload(prompt) {
            let mut translated: Vec<String> =
                texts.iter().map(|t| Self::expected_translation(t)).collect();
            if drop_last {
                translated.pop();
            }
            let body = serde_json::to_string(&translated).unwrap_or_default();
            if fenced {
                format!("```json\n{}\n```", body)
            } else {
                body
            }
        } else if let Some(text) = Self::single_payload(prompt) {
            Self::expected_translation(&text)
        } else {
            MOCK_CONTEXT.to_string()
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            request_count: Arc::clone(&self.request_count),
            keys_seen: Arc::clone(&self.keys_seen),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> CallOutcome {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.keys_seen.lock().push(api_key.to_string());

        match &self.behavior {
            MockBehavior::Working => {
                CallOutcome::Success(Self::answer(&request.prompt, false, false))
            }

            MockBehavior::FencedJson => {
                CallOutcome::Success(Self::answer(&request.prompt, false, true))
            }

            MockBehavior::ShortArray => {
                CallOutcome::Success(Self::answer(&request.prompt, true, false))
            }

            MockBehavior::Malformed => {
                CallOutcome::Success("I would rather chat about the weather.".to_string())
            }

            MockBehavior::Failing => CallOutcome::Retryable {
                reason: format!("simulated server error (request #{})", count + 1),
                retry_after: None,
            },

            MockBehavior::FailuresThenSuccess { failures } => {
                if count < *failures {
                    CallOutcome::Retryable {
                        reason: format!("simulated failure {}/{}", count + 1, failures),
                        retry_after: None,
                    }
                } else {
                    CallOutcome::Success(Self::answer(&request.prompt, false, false))
                }
            }

            MockBehavior::RejectKey { key } => {
                if api_key == key {
                    CallOutcome::Fatal(FatalReason::CredentialRejected(
                        "simulated 403: key revoked".to_string(),
                    ))
                } else {
                    CallOutcome::Success(Self::answer(&request.prompt, false, false))
                }
            }

            MockBehavior::RejectAll => CallOutcome::Fatal(FatalReason::CredentialRejected(
                "simulated 403: key revoked".to_string(),
            )),

            MockBehavior::RateLimited { retry_after } => CallOutcome::Retryable {
                reason: "simulated 429: rate limited".to_string(),
                retry_after: *retry_after,
            },
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
