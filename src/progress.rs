//! Progress reporting and cancellation support.
//!
//! The alignment job runner reports `(current, total)` request counts plus
//! a human-readable status line through [`ProgressCallback`], and polls a
//! [`CancellationToken`] once per queued request. Cancellation is
//! cooperative: it is never observed mid-scan, only between requests.
//!
//! # Example
//!
//! ```
//! use subalign::progress::{ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{}/{}] {}", info.current, info.total, info.message);
//!     }
//! }
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A snapshot of alignment progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// How many requests have been processed so far.
    pub current: u64,
    /// Total number of queued requests.
    pub total: u64,
    /// Human-readable status line for the current step.
    pub message: String,
}

impl ProgressInfo {
    /// Completion percentage (0.0 – 100.0), when `total` is non-zero.
    pub fn percentage(&self) -> Option<f32> {
        (self.total > 0).then(|| (self.current as f32 / self.total as f32) * 100.0)
    }
}

/// Trait for receiving progress updates during an alignment run.
///
/// Implementations must be [`Send`] and [`Sync`] so a UI thread can observe
/// a worker. Progress callbacks are **infallible** — they observe but
/// cannot halt the run. Use [`CancellationToken`] to stop it.
pub trait ProgressCallback: Send + Sync {
    /// Called once before each request is processed and once at the end of
    /// the run.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to request
/// cancellation. The job runner checks
/// [`is_cancelled`](CancellationToken::is_cancelled) before each queued
/// request — requests not yet processed stay queued.
///
/// # Example
///
/// ```
/// use subalign::progress::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// // From another thread (or a signal handler, etc.):
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
