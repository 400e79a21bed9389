/*!
 * Provider implementations for remote translation endpoints.
 *
 * Providers issue exactly one generation request per call and report
 * the result as an explicit [`CallOutcome`] instead of an error tree:
 * the retry/backoff/rotation policy lives entirely in the remote-call
 * wrapper, and a provider only has to classify what happened.
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// A failure no retry will fix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalReason {
    /// The API rejected the credential itself (invalid, revoked or
    /// permanently out of quota). The caller should blacklist it.
    CredentialRejected(String),

    /// The request can never succeed as constructed
    Request(String),
}

/// Outcome of one remote generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call produced usable text
    Success(String),

    /// Transient failure, a retry may succeed
    Retryable {
        /// What went wrong, for logs
        reason: String,
        /// Server-suggested wait before the next attempt, when the
        /// response carried one
        retry_after: Option<Duration>,
    },

    /// Permanent failure
    Fatal(FatalReason),
}

/// One generation request, provider-agnostic
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// The user prompt
    pub prompt: String,

    /// System instruction, when the provider supports one
    pub system: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    /// Create a new request around a prompt
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Set the system instruction
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Common trait for all remote translation providers
///
/// Implementations classify every failure as retryable or fatal; they
/// never retry on their own and never panic on malformed responses.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Issue one generation request with the given credential
    async fn generate(&self, api_key: &str, request: &GenerationRequest) -> CallOutcome;

    /// Short display name for log lines
    fn name(&self) -> &str;
}

pub mod gemini;
pub mod mock;
