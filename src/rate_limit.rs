/*!
 * Sliding-window requests-per-minute limiter.
 *
 * Timestamps of admitted calls are kept in a deque; a call is admitted
 * while fewer than `limit` timestamps fall inside the trailing 60
 * seconds. Only admitted calls are recorded, so waiting never consumes
 * quota. The clock is injected so tests can drive the window without
 * real sleeps.
 */

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use parking_lot::Mutex;

use crate::control::{Interrupt, RunControl};

const WINDOW: Duration = Duration::from_secs(60);

/// Pause slice while a slot is pending, keeps stop/pause responsive
const WAIT_SLICE: Duration = Duration::from_millis(500);

/// Time source for the limiter window
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Instant;
}

/// Real wall-clock time
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock advanced by hand
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Outcome of a non-blocking admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Call admitted and recorded
    Acquired,
    /// Window full, retry after the given duration
    MustWait(Duration),
}

/// Sliding-window limiter shared by every remote call of the run
#[derive(Debug)]
pub struct RateLimiter {
    limit: Option<u32>,
    window: Mutex<VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Limiter against the system clock. `None` disables limiting.
    pub fn new(limit: Option<u32>) -> Self {
        Self::with_clock(limit, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: Option<u32>, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window: Mutex::new(VecDeque::new()),
            clock,
        }
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Timestamps currently inside the window (diagnostics only)
    pub fn in_flight(&self) -> usize {
        let now = self.clock.now();
        let mut window = self.window.lock();
        Self::prune(&mut window, now);
        window.len()
    }

    /// Try to admit one call right now. Admission records a timestamp;
    /// refusal reports how long until the oldest slot expires.
    pub fn try_acquire(&self) -> SlotState {
        let Some(limit) = self.limit else {
            return SlotState::Acquired;
        };

        let now = self.clock.now();
        let mut window = self.window.lock();
        Self::prune(&mut window, now);

        if window.len() < limit as usize {
            window.push_back(now);
            return SlotState::Acquired;
        }
        let oldest = window[0];
        SlotState::MustWait((oldest + WINDOW).saturating_duration_since(now))
    }

    /// Block until a slot is admitted, observing run control between
    /// wait slices so pause and stop keep working during a long wait.
    pub async fn acquire(&self, control: &RunControl) -> Result<(), Interrupt> {
        let Some(limit) = self.limit else {
            return Ok(());
        };

        let mut announced = false;
        loop {
            control.checkpoint().await?;
            match self.try_acquire() {
                SlotState::Acquired => {
                    debug!("RPM slot acquired");
                    return Ok(());
                }
                SlotState::MustWait(wait) => {
                    if !announced {
                        info!("RPM limit ({}/min) reached, waiting {:.1}s", limit, wait.as_secs_f32());
                        announced = true;
                    }
                    tokio::time::sleep(wait.min(WAIT_SLICE)).await;
                }
            }
        }
    }

    fn prune(window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = window.front() {
            if now.duration_since(*front) >= WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}
