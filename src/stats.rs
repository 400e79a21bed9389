/*!
 * Run statistics.
 *
 * Monotone counters updated by the worker and read by the operator
 * console at any time. Counters use relaxed atomics; a snapshot taken
 * mid-batch may lag by a few increments, which is acceptable for a
 * progress display.
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::cache::CacheStats;
use crate::credentials::CredentialSnapshot;

/// Counters for one run, shared behind an `Arc`
#[derive(Debug)]
pub struct RunStats {
    started: Instant,
    files_done: AtomicU64,
    files_skipped: AtomicU64,
    files_failed: AtomicU64,
    entries_translated: AtomicU64,
    entries_failed: AtomicU64,
    remote_calls: AtomicU64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            files_done: AtomicU64::new(0),
            files_skipped: AtomicU64::new(0),
            files_failed: AtomicU64::new(0),
            entries_translated: AtomicU64::new(0),
            entries_failed: AtomicU64::new(0),
            remote_calls: AtomicU64::new(0),
        }
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn add_file_done(&self) {
        self.files_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_file_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_file_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_entries_translated(&self, count: u64) {
        self.entries_translated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_entry_failed(&self) {
        self.entries_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_remote_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files_done(&self) -> u64 {
        self.files_done.load(Ordering::Relaxed)
    }

    pub fn files_skipped(&self) -> u64 {
        self.files_skipped.load(Ordering::Relaxed)
    }

    pub fn files_failed(&self) -> u64 {
        self.files_failed.load(Ordering::Relaxed)
    }

    pub fn entries_translated(&self) -> u64 {
        self.entries_translated.load(Ordering::Relaxed)
    }

    pub fn entries_failed(&self) -> u64 {
        self.entries_failed.load(Ordering::Relaxed)
    }

    pub fn remote_calls(&self) -> u64 {
        self.remote_calls.load(Ordering::Relaxed)
    }

    /// Multi-line report for the console `stats` command and the
    /// end-of-run summary.
    pub fn render(&self, cache: &CacheStats, credentials: &[CredentialSnapshot]) -> String {
        let mut out = String::new();
        out.push_str("Run statistics\n");
        out.push_str(&format!("  elapsed:  {}\n", format_elapsed(self.elapsed())));
        out.push_str(&format!(
            "  files:    {} done, {} skipped, {} failed\n",
            self.files_done(),
            self.files_skipped(),
            self.files_failed()
        ));
        out.push_str(&format!(
            "  entries:  {} translated, {} failed\n",
            self.entries_translated(),
            self.entries_failed()
        ));
        out.push_str(&format!(
            "  cache:    {} exact hits, {} fuzzy hits ({:.1}% hit rate)\n",
            cache.exact_hits,
            cache.fuzzy_hits,
            cache.hit_rate() * 100.0
        ));
        out.push_str(&format!("  remote:   {} calls\n", self.remote_calls()));
        out.push_str("  credentials:\n");
        for snap in credentials {
            let marker = if snap.blacklisted {
                " [blacklisted]"
            } else if snap.active {
                " (active)"
            } else {
                ""
            };
            out.push_str(&format!(
                "    ...{}  {} calls{}\n",
                snap.suffix, snap.calls, marker
            ));
        }
        out
    }
}

/// hh:mm:ss rendering of an elapsed duration
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
