/*!
 * Run control signals shared between the worker, the operator console
 * and the CLI signal handler.
 *
 * Four signals exist: stop (terminal), pause (blocks at the next
 * checkpoint until resumed), skip-file (one-shot, aborts the current
 * file), and skip-credential (one-shot, forces a rotation before the
 * next remote call). Workers observe them cooperatively by calling
 * `checkpoint()` at batch and call boundaries.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info};
use thiserror::Error;
use tokio::sync::Notify;

/// Why a checkpoint refused to continue
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The operator requested a full stop
    #[error("stop requested")]
    Stopped,

    /// The operator requested that the current file be skipped
    #[error("skip requested for the current file")]
    SkipFile,
}

/// Shared flag set observed at worker checkpoints.
///
/// Stop is terminal and never cleared. Pause holds the worker inside
/// `checkpoint()` until `resume()`. Skip flags are one-shot: they are
/// cleared by the take that observes them.
#[derive(Debug, Default)]
pub struct RunControl {
    stop: AtomicBool,
    pause: AtomicBool,
    skip_file: AtomicBool,
    skip_credential: AtomicBool,
    resumed: Notify,
}

impl RunControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request a full stop. Wakes any worker blocked in a pause wait.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.resumed.notify_waiters();
        info!("Stop requested");
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
        info!("Pause requested, worker will hold at the next checkpoint");
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::SeqCst);
        self.resumed.notify_waiters();
        info!("Resume requested");
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    pub fn request_skip_file(&self) {
        self.skip_file.store(true, Ordering::SeqCst);
        info!("Skip requested for the current file");
    }

    pub fn request_skip_credential(&self) {
        self.skip_credential.store(true, Ordering::SeqCst);
        info!("Credential rotation requested");
    }

    /// One-shot read of the skip-credential signal. Consumed by the
    /// remote caller right before it picks a key.
    pub fn take_skip_credential(&self) -> bool {
        self.skip_credential.swap(false, Ordering::SeqCst)
    }

    fn take_skip_file(&self) -> bool {
        self.skip_file.swap(false, Ordering::SeqCst)
    }

    /// Cooperative checkpoint. Signal priority is stop, then pause,
    /// then skip-file; skip-credential is polled separately by the
    /// remote caller so rotation happens between calls, not here.
    pub async fn checkpoint(&self) -> Result<(), Interrupt> {
        if self.stop_requested() {
            return Err(Interrupt::Stopped);
        }

        while self.is_paused() {
            if self.stop_requested() {
                return Err(Interrupt::Stopped);
            }
            let resumed = self.resumed.notified();
            // Re-check after arming the waiter so a resume between the
            // flag read and the await cannot be lost.
            if !self.is_paused() {
                break;
            }
            debug!("Paused, waiting for resume");
            tokio::select! {
                _ = resumed => {},
                _ = tokio::time::sleep(Duration::from_millis(200)) => {},
            }
        }

        if self.stop_requested() {
            return Err(Interrupt::Stopped);
        }
        if self.take_skip_file() {
            return Err(Interrupt::SkipFile);
        }
        Ok(())
    }
}
