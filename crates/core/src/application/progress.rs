// Progress Reporter

use crate::port::progress::{Progress, ProgressObserver};
use std::sync::Arc;
use tracing::info;

/// `(submitted - active) / submitted * 100`, or 100 when nothing was submitted
pub fn percent_complete(submitted: usize, active: usize) -> f64 {
    if submitted == 0 {
        return 100.0;
    }
    let finalized = submitted.saturating_sub(active);
    finalized as f64 / submitted as f64 * 100.0
}

/// Default observer: one info line per snapshot
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_progress(&self, progress: Progress) {
        info!(
            submitted = progress.submitted,
            active = progress.active,
            percent = progress.percent,
            "Batch progress"
        );
    }
}

/// Forwards progress snapshots to an observer.
///
/// The percentage is computed from counts alone and held at its high-water
/// mark: submitting more work mid-batch lowers the raw ratio, but the
/// reported value never goes backwards.
pub struct ProgressReporter {
    observer: Arc<dyn ProgressObserver>,
    enabled: bool,
    high_water: f64,
}

impl ProgressReporter {
    pub fn new(observer: Arc<dyn ProgressObserver>, enabled: bool) -> Self {
        Self {
            observer,
            enabled,
            high_water: 0.0,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(TracingProgress), false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn snapshot(&mut self, submitted: usize, active: usize) -> Progress {
        let raw = percent_complete(submitted, active);
        // Everything finalized always reads 100
        let percent = if active == 0 {
            100.0
        } else {
            raw.max(self.high_water)
        };
        self.high_water = percent;
        Progress {
            submitted,
            active,
            finalized: submitted.saturating_sub(active),
            percent,
        }
    }

    pub fn report(&mut self, submitted: usize, active: usize) {
        if !self.enabled {
            return;
        }
        let progress = self.snapshot(submitted, active);
        self.observer.on_progress(progress);
    }

    pub fn finish(&mut self, submitted: usize, active: usize) {
        if !self.enabled {
            return;
        }
        let progress = self.snapshot(submitted, active);
        self.observer.on_finish(progress);
    }
}
