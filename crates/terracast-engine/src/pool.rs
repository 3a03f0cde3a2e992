//! Level-parallel worker pool with live progress.
//!
//! Cost derivation dispatches one dependency level at a time to a
//! rayon pool of configurable width. Inputs are sorted before dispatch
//! and outputs re-sorted after, so pool width never changes the
//! result. A sampler thread reads the progress counters every 100 ms
//! and emits a tracing event; it stops as soon as the level drains.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};
use tracing::debug;

// =============================================================================
// PROGRESS
// =============================================================================

/// Shared progress counters for one derivation run.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// A point-in-time progress reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Instances scheduled.
    pub total: usize,
    /// Instances finished successfully.
    pub completed: usize,
    /// Instances that failed.
    pub failed: usize,
    /// Estimated time to completion, when computable.
    pub eta: Option<Duration>,
}

impl ProgressTracker {
    /// Creates a tracker expecting `total` instances.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total: AtomicUsize::new(total),
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        }
    }

    /// Records one success.
    pub fn complete_one(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one failure.
    pub fn fail_one(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads the counters, estimating time-to-completion from the
    /// elapsed time since `started`.
    #[must_use]
    pub fn snapshot(&self, started: Instant) -> ProgressSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let done = completed + failed;
        let eta = if done > 0 && done < total {
            let per_item = started.elapsed().div_f64(done as f64);
            Some(per_item.mul_f64((total - done) as f64))
        } else {
            None
        };
        ProgressSnapshot {
            total,
            completed,
            failed,
            eta,
        }
    }
}

/// Handle that stops the sampler thread when dropped.
pub struct SamplerHandle {
    stop: Sender<()>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawns a thread that logs progress at `interval` until stopped.
#[must_use]
pub fn spawn_sampler(tracker: Arc<ProgressTracker>, interval: Duration) -> SamplerHandle {
    let (stop, stopped) = bounded::<()>(1);
    let started = Instant::now();
    let thread = std::thread::spawn(move || loop {
        if stopped.recv_timeout(interval).is_ok() {
            return;
        }
        let snap = tracker.snapshot(started);
        debug!(
            total = snap.total,
            completed = snap.completed,
            failed = snap.failed,
            eta_ms = snap.eta.map(|d| d.as_millis() as u64),
            "derivation progress"
        );
    });
    SamplerHandle {
        stop,
        thread: Some(thread),
    }
}

// =============================================================================
// LEVEL DISPATCH
// =============================================================================

/// Runs `work` over `items` on a pool of `width` threads, preserving
/// input order in the output.
pub fn run_level<T, R, F>(width: usize, items: Vec<T>, work: F) -> Vec<R>
where
    T: Send + Sync,
    R: Send,
    F: Fn(&T) -> R + Send + Sync,
{
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(width.max(1))
        .build()
        .expect("worker pool builds");
    pool.install(|| items.par_iter().map(&work).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_order_matches_input_order() {
        let items: Vec<u32> = (0..100).collect();
        let doubled = run_level(4, items.clone(), |n| n * 2);
        let expected: Vec<u32> = items.iter().map(|n| n * 2).collect();
        assert_eq!(doubled, expected);
    }

    #[test]
    fn width_does_not_change_output() {
        let items: Vec<u32> = (0..50).collect();
        let one = run_level(1, items.clone(), |n| n + 7);
        let eight = run_level(8, items, |n| n + 7);
        assert_eq!(one, eight);
    }

    #[test]
    fn progress_counts_and_eta() {
        let tracker = ProgressTracker::new(10);
        let started = Instant::now();
        for _ in 0..4 {
            tracker.complete_one();
        }
        tracker.fail_one();
        std::thread::sleep(Duration::from_millis(5));
        let snap = tracker.snapshot(started);
        assert_eq!(snap.completed, 4);
        assert_eq!(snap.failed, 1);
        assert!(snap.eta.is_some());
    }
}
