//! Capture progress and cancellation.
//!
//! A capture reports how many frames it has redrawn through a
//! [`ProgressCallback`] and stops early when its [`CancellationToken`] is
//! cancelled.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use playblast::{CaptureConfig, HeadlessHost, Playblast, PlayblastError, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% captured");
//!         }
//!     }
//! }
//!
//! let config = CaptureConfig::new("shots/shot010")
//!     .with_frame_range(1001.0, 1024.0)
//!     .with_progress(Arc::new(PrintProgress));
//!
//! let mut host = HeadlessHost::new();
//! Playblast::new(config).run(&mut host)?;
//! # Ok::<(), PlayblastError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::time::Time;

/// Where a capture stands.
///
/// Sent to [`ProgressCallback::on_progress`] every
/// [`batch_size`](crate::CaptureConfig::with_batch_size) frames and once
/// more when the frame loop ends, however it ends.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames redrawn so far, written or not.
    pub current: u64,
    /// Frames in the configured range.
    pub total: Option<u64>,
    /// `current` as a share of `total`, 0 to 100. `None` for an empty range.
    pub percentage: Option<f32>,
    /// Time since the first frame was requested.
    pub elapsed: Duration,
    /// Remaining time at the average rate so far.
    pub estimated_remaining: Option<Duration>,
    /// The frame just redrawn. `None` in the closing report.
    pub current_time: Option<Time>,
}

/// Observer of a running capture.
///
/// Callbacks cannot stop a capture; hand a [`CancellationToken`] to the
/// configuration for that.
pub trait ProgressCallback: Send + Sync {
    /// Receive a progress snapshot.
    fn on_progress(&self, info: &ProgressInfo);
}

pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Shared stop flag for a capture.
///
/// Every clone sees the same flag. The frame loop looks at it before each
/// redraw, so a cancelled capture stops between frames, never inside one.
///
/// # Example
///
/// ```
/// use playblast::CancellationToken;
///
/// let token = CancellationToken::new();
/// let watcher = token.clone();
///
/// token.cancel();
/// assert!(watcher.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the capture to stop before its next frame.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Counts redrawn frames and batches reports to the callback.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    redrawn: u64,
    pending: u64,
    batch_size: u64,
    started: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>, batch_size: u64) -> Self {
        Self {
            callback,
            total,
            redrawn: 0,
            pending: 0,
            batch_size: batch_size.max(1),
            started: Instant::now(),
        }
    }

    /// Count the frame at `time`; report once a batch is full.
    pub(crate) fn advance(&mut self, time: Time) {
        self.redrawn += 1;
        self.pending += 1;
        if self.pending == self.batch_size {
            self.pending = 0;
            self.emit(Some(time));
        }
    }

    /// Closing report.
    pub(crate) fn finish(&mut self) {
        self.pending = 0;
        self.emit(None);
    }

    fn emit(&self, time: Option<Time>) {
        let elapsed = self.started.elapsed();
        let percentage = match self.total {
            Some(total) if total > 0 => Some(self.redrawn as f32 * 100.0 / total as f32),
            _ => None,
        };
        let estimated_remaining = match (self.total, self.redrawn) {
            (Some(total), redrawn) if redrawn > 0 => {
                let left = total.saturating_sub(redrawn);
                Some(elapsed.mul_f64(left as f64 / redrawn as f64))
            }
            _ => None,
        };

        self.callback.on_progress(&ProgressInfo {
            current: self.redrawn,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_time: time,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ProgressInfo>>);

    impl ProgressCallback for Collect {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn batches_then_closes() {
        let collect = Arc::new(Collect::default());
        let mut tracker = ProgressTracker::new(collect.clone(), Some(3), 2);
        for frame in 1..=3 {
            tracker.advance(Time::new(frame as f64));
        }
        tracker.finish();

        let infos = collect.0.lock().unwrap();
        let seen: Vec<(u64, Option<Time>)> = infos.iter().map(|info| (info.current, info.current_time)).collect();
        assert_eq!(seen, vec![(2, Some(Time::new(2.0))), (3, None)]);
        assert_eq!(infos[1].estimated_remaining, Some(Duration::ZERO));
    }
}
