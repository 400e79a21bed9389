/*!
 * Error types for the traduko application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

use crate::control::Interrupt;

/// Errors raised by the credential pool
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    /// No credential was provided at startup
    #[error("No API credentials available: provide keys via CLI or key file")]
    NoCredentials,

    /// Every credential in the pool is blacklisted
    #[error("All {0} credentials are blacklisted")]
    Exhausted(usize),

    /// Rotation was requested but only one usable credential remains
    #[error("Rotation is a no-op: only one usable credential in the pool")]
    SingleCredential,

    /// A credential could not be activated and the previous one is unusable
    #[error("Failed to activate credential #{index}: {reason}")]
    ActivationFailed {
        /// Pool index of the credential that failed to activate
        index: usize,
        /// Why activation failed
        reason: String,
    },

    /// An index outside the pool was referenced
    #[error("Credential index {0} is out of range")]
    OutOfRange(usize),
}

/// Errors surfaced by the remote-call wrapper after its retry state
/// machine is spent
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Backoff and rotation did not produce a usable response
    #[error("Remote call failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        /// Total attempts across all credentials tried
        attempts: u32,
        /// Last failure reason observed
        reason: String,
    },

    /// Rotation ran out of usable credentials mid-run
    #[error("All API credentials are exhausted")]
    CredentialsExhausted,

    /// The API rejected the request in a way no retry can fix
    #[error("Remote API rejected the request: {0}")]
    Fatal(String),

    /// A stop or skip signal arrived at a checkpoint
    #[error("Interrupted: {0}")]
    Interrupted(#[from] Interrupt),
}

impl RemoteError {
    /// True when the error must abort the whole file rather than just the
    /// current batch (stop/skip signals and credential exhaustion).
    pub fn aborts_file(&self) -> bool {
        matches!(
            self,
            RemoteError::CredentialsExhausted | RemoteError::Interrupted(_)
        )
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the credential pool
    #[error("Credential error: {0}")]
    Pool(#[from] PoolError),

    /// Error from the remote API
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
