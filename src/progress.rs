//! Throttled progress reporting and cooperative cancellation
//!
//! Engines sample their progress every [`PROGRESS_INTERVAL`] records. At each
//! sample the caller's callback receives the percentage of input bytes
//! consumed so far and may ask the run to stop by returning `true`. The request
//! is recorded in a [`CancelToken`] that every worker polls at the same cadence.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Number of records between two progress samples
pub const PROGRESS_INTERVAL: u64 = 1024;

/// Highest percentage reported before the run has finished
const RUNNING_CAP: f32 = 99.9;

/// Caller-supplied progress hook
///
/// Receives a completion percentage in `[0, 100]`; returning `true` requests
/// cancellation.
pub type ProgressCallback = Box<dyn FnMut(f32) -> bool + Send>;

/// Whether the `count`-th record is a progress checkpoint
#[inline]
#[must_use]
pub fn has_to_update_progress(count: u64) -> bool {
    count != 0 && count % PROGRESS_INTERVAL == 0
}

/// Shared cancellation flag
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives the optional callback and keeps the reported value monotonic
///
/// The callback is borrowed from its engine, so it stays installed for later runs.
pub struct ProgressReporter<'a> {
    callback: Option<&'a mut ProgressCallback>,
    cancel: CancelToken,
    last: f32,
}
impl<'a> ProgressReporter<'a> {
    #[must_use]
    pub fn new(callback: Option<&'a mut ProgressCallback>, cancel: CancelToken) -> Self {
        Self {
            callback,
            cancel,
            last: 0.0,
        }
    }

    /// Reports `done` out of `total` bytes
    ///
    /// Returns `true` if the run should stop, either because the callback asked
    /// for it now or because the token was cancelled earlier.
    pub fn update(&mut self, done: u64, total: u64) -> bool {
        let percent = percentage(done, total).min(RUNNING_CAP).max(self.last);
        self.last = percent;
        if let Some(callback) = self.callback.as_deref_mut() {
            if callback(percent) {
                self.cancel.cancel();
            }
        }
        self.cancel.is_cancelled()
    }

    /// Reports completion; a cancellation request at this point is moot
    pub fn finish(&mut self) {
        self.last = 100.0;
        if let Some(callback) = self.callback.as_deref_mut() {
            callback(100.0);
        }
    }

    #[must_use]
    pub fn last(&self) -> f32 {
        self.last
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(done: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((done as f64 / total as f64) * 100.0) as f32
}

/// Level of banners and summaries: `info` when verbose, `debug` otherwise
#[must_use]
pub fn verbosity(verbose: bool) -> log::Level {
    if verbose {
        log::Level::Info
    } else {
        log::Level::Debug
    }
}

/// Outcome of a completed (or cancelled) run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    /// Records read from the inputs
    pub records_read: u64,
    /// Records written to the outputs
    pub records_written: u64,
    /// Output files created, in creation order
    pub outputs: Vec<PathBuf>,
    /// The run stopped early on request; outputs are partial
    pub cancelled: bool,
    pub elapsed: Duration,
}
impl Report {
    /// Logs the run summary at the level given by [`verbosity`]
    pub fn log_summary(&self, operation: &str, verbose: bool) {
        let level = verbosity(verbose);
        if self.cancelled {
            log::log!(
                level,
                "{operation} cancelled after {} records, output is partial",
                self.records_read
            );
        }
        log::log!(
            level,
            "{operation}: {} records processed, {} written to {} file(s) in {:.3} seconds",
            self.records_read,
            self.records_written,
            self.outputs.len(),
            self.elapsed.as_secs_f64()
        );
    }
}
