/*!
 * Remote call wrapper: one logical API call, with retry, backoff and
 * credential rotation folded into an explicit state machine.
 *
 * Callers hand in a prepared request and get back either the response
 * text or a `RemoteError` that tells them how bad things are: retries
 * spent (demote the work), credentials exhausted (abandon the run) or
 * an interrupt (stop / skip-file signal observed at a checkpoint).
 */

use log::{debug, info, warn};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::control::{Interrupt, RunControl};
use crate::credentials::{key_suffix, CredentialPool, RotateReason};
use crate::errors::RemoteError;
use crate::providers::{CallOutcome, FatalReason, GenerationRequest, Provider};
use crate::rate_limit::{RateLimiter, SlotState};
use crate::stats::RunStats;

/// Backoff sleeps are sliced so stop/pause signals are observed quickly
const BACKOFF_SLICE: Duration = Duration::from_millis(500);

/// Retry knobs for a single logical call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per credential before giving up or rotating
    pub max_attempts: u32,
    /// First backoff delay, doubled on every further attempt
    pub backoff_base: Duration,
    /// Upper bound for the doubling backoff
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            backoff_max: Duration::from_secs(60),
        }
    }
}

/// Drives provider calls through rate limiting, retries and rotation
#[derive(Debug, Clone)]
pub struct RemoteCaller {
    provider: Arc<dyn Provider>,
    pool: Arc<CredentialPool>,
    limiter: Arc<RateLimiter>,
    control: Arc<RunControl>,
    stats: Arc<RunStats>,
    policy: RetryPolicy,
    rotate_on_limit: bool,
    rotate_on_error: bool,
}

impl RemoteCaller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn Provider>,
        pool: Arc<CredentialPool>,
        limiter: Arc<RateLimiter>,
        control: Arc<RunControl>,
        stats: Arc<RunStats>,
        policy: RetryPolicy,
        rotate_on_limit: bool,
        rotate_on_error: bool,
    ) -> Self {
        Self {
            provider,
            pool,
            limiter,
            control,
            stats,
            policy,
            rotate_on_limit,
            rotate_on_error,
        }
    }

    /// Perform one logical call: rate-limit, try the active credential up
    /// to `max_attempts` times with doubling backoff, rotate away from
    /// rejected credentials, and optionally spend one more attempt cycle
    /// on the next credential after a failure streak.
    pub async fn call(&self, request: &GenerationRequest) -> Result<String, RemoteError> {
        // Operator asked for a different credential between calls
        if self.control.take_skip_credential() {
            match self.pool.rotate(RotateReason::UserRequested) {
                Ok(_) => {}
                Err(crate::errors::PoolError::Exhausted(_)) => {
                    return Err(RemoteError::CredentialsExhausted);
                }
                Err(other) => debug!("Requested rotation not performed: {}", other),
            }
        }

        let mut rotated_after_failures = false;
        let mut total_attempts = 0u32;

        'cycle: loop {
            let mut last_reason = String::from("no attempt made");
            let mut attempt = 1u32;

            while attempt <= self.policy.max_attempts {
                self.control.checkpoint().await?;
                self.acquire_slot().await?;

                let key = self.pool.active_key();
                self.pool.record_call();
                self.stats.add_remote_call();
                total_attempts += 1;

                match self.provider.generate(&key, request).await {
                    CallOutcome::Success(text) => return Ok(text),

                    CallOutcome::Retryable { reason, retry_after } => {
                        warn!(
                            "{} call failed (attempt {}/{}): {}",
                            self.provider.name(),
                            attempt,
                            self.policy.max_attempts,
                            reason
                        );
                        last_reason = reason;
                        if attempt < self.policy.max_attempts {
                            let delay = self.backoff_delay(attempt, retry_after);
                            debug!("Waiting {:.1}s before retrying", delay.as_secs_f32());
                            self.sleep_observed(delay).await?;
                        }
                        attempt += 1;
                    }

                    CallOutcome::Fatal(FatalReason::CredentialRejected(reason)) => {
                        warn!("Credential ...{} rejected: {}", key_suffix(&key), reason);
                        match self.pool.blacklist_active() {
                            Ok(_) => continue 'cycle,
                            Err(_) => return Err(RemoteError::CredentialsExhausted),
                        }
                    }

                    CallOutcome::Fatal(FatalReason::Request(reason)) => {
                        return Err(RemoteError::Fatal(reason));
                    }
                }
            }

            // Attempts spent on this credential; one rotation gets a
            // fresh cycle, a second failure streak gives up.
            if self.rotate_on_error && !rotated_after_failures {
                if self.pool.rotate(RotateReason::FailureStreak).is_ok() {
                    rotated_after_failures = true;
                    info!(
                        "Retrying with the next credential after {} failed attempts",
                        self.policy.max_attempts
                    );
                    continue 'cycle;
                }
            }

            return Err(RemoteError::RetriesExhausted {
                attempts: total_attempts,
                reason: last_reason,
            });
        }
    }

    /// Take a rate-limiter slot. When the window is full and rotation on
    /// rate limits is enabled, switching to another credential proceeds
    /// immediately without recording a slot; otherwise wait it out.
    async fn acquire_slot(&self) -> Result<(), Interrupt> {
        match self.limiter.try_acquire() {
            SlotState::Acquired => Ok(()),
            SlotState::MustWait(_)
                if self.rotate_on_limit
                    && self.pool.rotate(RotateReason::RateLimit).is_ok() =>
            {
                Ok(())
            }
            SlotState::MustWait(_) => self.limiter.acquire(&self.control).await,
        }
    }

    /// Doubling backoff capped at the policy maximum. A server-suggested
    /// delay wins when it is larger, and a small random jitter spreads
    /// retries that would otherwise land together.
    fn backoff_delay(&self, attempt: u32, server_hint: Option<Duration>) -> Duration {
        let doubled = self
            .policy
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let mut delay = doubled.min(self.policy.backoff_max);
        if let Some(hint) = server_hint {
            if hint > delay {
                delay = hint;
            }
        }
        delay + delay.mul_f32(rand::rng().random_range(0.0..0.25))
    }

    /// Sleep in short slices so interrupts cut long backoffs short
    async fn sleep_observed(&self, total: Duration) -> Result<(), Interrupt> {
        let mut remaining = total;
        while !remaining.is_zero() {
            self.control.checkpoint().await?;
            let slice = remaining.min(BACKOFF_SLICE);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
        }
        Ok(())
    }
}
