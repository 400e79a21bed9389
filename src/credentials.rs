/*!
 * API credential pool.
 *
 * Holds the ring of API keys the run rotates through. Exactly one
 * credential is active at a time; blacklisting is monotone within a
 * run (keys only leave the usable set, except via an explicit runtime
 * `add`). Rotation never silently leaves the pool with zero usable
 * credentials: that condition is always surfaced as an error.
 */

use log::{info, warn};
use parking_lot::Mutex;
use std::fmt;

use crate::errors::PoolError;

/// Why a rotation was requested, for log lines and stats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateReason {
    /// Retry ceiling reached on the active credential
    FailureStreak,
    /// RPM window full and rotate-on-limit enabled
    RateLimit,
    /// The API rejected the credential itself
    Rejected,
    /// Operator command
    UserRequested,
    /// Active credential was blacklisted
    Blacklisted,
}

impl fmt::Display for RotateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RotateReason::FailureStreak => "failure threshold reached",
            RotateReason::RateLimit => "rate limit reached",
            RotateReason::Rejected => "credential rejected by the API",
            RotateReason::UserRequested => "user command",
            RotateReason::Blacklisted => "credential blacklisted",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone)]
struct Credential {
    key: String,
    calls: u64,
    blacklisted: bool,
}

/// Read-only view of one pool entry, for the stats display
#[derive(Debug, Clone)]
pub struct CredentialSnapshot {
    /// Last four characters of the key, safe to print
    pub suffix: String,
    /// Remote calls made with this credential
    pub calls: u64,
    pub blacklisted: bool,
    pub active: bool,
}

#[derive(Debug)]
struct PoolState {
    credentials: Vec<Credential>,
    active: usize,
}

/// Thread-safe credential ring. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct CredentialPool {
    state: Mutex<PoolState>,
}

/// Printable key suffix for log lines, never the whole key
pub fn key_suffix(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars[start..].iter().collect()
}

impl CredentialPool {
    /// Build the pool from merged key sources (CLI arguments first, then
    /// key file). Duplicates keep their first occurrence; an empty merge
    /// is a fatal configuration error.
    pub fn from_keys<I>(keys: I) -> Result<Self, PoolError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut credentials: Vec<Credential> = Vec::new();
        for key in keys {
            let key = key.trim().to_string();
            if key.is_empty() || credentials.iter().any(|c| c.key == key) {
                continue;
            }
            credentials.push(Credential {
                key,
                calls: 0,
                blacklisted: false,
            });
        }
        if credentials.is_empty() {
            return Err(PoolError::NoCredentials);
        }
        info!("Credential pool initialized with {} key(s)", credentials.len());
        Ok(Self {
            state: Mutex::new(PoolState {
                credentials,
                active: 0,
            }),
        })
    }

    pub fn len(&self) -> usize {
        self.state.lock().credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Credentials not blacklisted yet
    pub fn usable_count(&self) -> usize {
        let state = self.state.lock();
        state.credentials.iter().filter(|c| !c.blacklisted).count()
    }

    pub fn active_index(&self) -> usize {
        self.state.lock().active
    }

    /// Clone of the active key, for the next remote call
    pub fn active_key(&self) -> String {
        let state = self.state.lock();
        state.credentials[state.active].key.clone()
    }

    /// Select the credential at `index`. On a failed activation the
    /// previously active credential stays selected; if that one is
    /// blacklisted too the pool is unusable and the error is fatal.
    pub fn activate(&self, index: usize) -> Result<(), PoolError> {
        let mut state = self.state.lock();
        let count = state.credentials.len();
        if index >= count {
            return Err(PoolError::OutOfRange(index));
        }
        let target = &state.credentials[index];
        if target.blacklisted || target.key.trim().is_empty() {
            let reason = if target.blacklisted {
                "credential is blacklisted".to_string()
            } else {
                "credential key is empty".to_string()
            };
            let previous_usable = !state.credentials[state.active].blacklisted;
            if previous_usable {
                warn!(
                    "Activation of credential #{} failed ({}), keeping ...{}",
                    index,
                    reason,
                    key_suffix(&state.credentials[state.active].key)
                );
                return Err(PoolError::ActivationFailed { index, reason });
            }
            return Err(PoolError::ActivationFailed {
                index,
                reason: format!("{} and the previous credential is blacklisted", reason),
            });
        }
        state.active = index;
        Ok(())
    }

    /// Advance the ring to the next non-blacklisted credential.
    ///
    /// With zero usable credentials this fails with `Exhausted`
    /// (critical, the caller must stop its workflow). With exactly one
    /// usable credential and a usable active one, rotation is a no-op
    /// that reports `SingleCredential`.
    pub fn rotate(&self, reason: RotateReason) -> Result<usize, PoolError> {
        let mut state = self.state.lock();
        let count = state.credentials.len();
        let usable = state.credentials.iter().filter(|c| !c.blacklisted).count();

        if usable == 0 {
            warn!("Rotation impossible: all {} credentials blacklisted", count);
            return Err(PoolError::Exhausted(count));
        }
        if usable <= 1 && !state.credentials[state.active].blacklisted {
            return Err(PoolError::SingleCredential);
        }

        let start = state.active;
        let mut candidate = start;
        loop {
            candidate = (candidate + 1) % count;
            if !state.credentials[candidate].blacklisted {
                break;
            }
            if candidate == start {
                // Cannot happen while usable >= 1, kept as a hard stop
                return Err(PoolError::Exhausted(count));
            }
        }

        state.active = candidate;
        info!(
            "Rotated to credential ...{} ({})",
            key_suffix(&state.credentials[candidate].key),
            reason
        );
        Ok(candidate)
    }

    /// Blacklist the active credential and rotate away from it.
    /// Returns the newly active index, or `Exhausted` when this was the
    /// last usable credential.
    pub fn blacklist_active(&self) -> Result<usize, PoolError> {
        {
            let mut state = self.state.lock();
            let active = state.active;
            if state.credentials[active].blacklisted {
                return Err(PoolError::SingleCredential);
            }
            let suffix = key_suffix(&state.credentials[active].key);
            state.credentials[active].blacklisted = true;
            warn!("Credential ...{} blacklisted", suffix);
        }
        self.rotate(RotateReason::Blacklisted)
    }

    /// Count one remote call against the active credential
    pub fn record_call(&self) {
        let mut state = self.state.lock();
        let active = state.active;
        state.credentials[active].calls += 1;
    }

    /// Runtime key addition from the operator console. Returns false
    /// for empty or duplicate keys.
    pub fn add(&self, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            warn!("Refusing to add an empty API key");
            return false;
        }
        let mut state = self.state.lock();
        if state.credentials.iter().any(|c| c.key == key) {
            info!("API key ...{} already present", key_suffix(key));
            return false;
        }
        state.credentials.push(Credential {
            key: key.to_string(),
            calls: 0,
            blacklisted: false,
        });
        info!(
            "API key ...{} added, pool now holds {} key(s)",
            key_suffix(key),
            state.credentials.len()
        );
        true
    }

    /// Per-credential view for the stats display
    pub fn snapshot(&self) -> Vec<CredentialSnapshot> {
        let state = self.state.lock();
        state
            .credentials
            .iter()
            .enumerate()
            .map(|(i, c)| CredentialSnapshot {
                suffix: key_suffix(&c.key),
                calls: c.calls,
                blacklisted: c.blacklisted,
                active: i == state.active,
            })
            .collect()
    }
}
