// Progress Observer Port

/// Snapshot reported after a drain pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub submitted: usize,
    pub active: usize,
    pub finalized: usize,
    /// Non-decreasing within a batch; 100.0 once everything is finalized
    pub percent: f64,
}

/// Receives progress snapshots. Purely observational.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: Progress);

    /// Called once after the final drain
    fn on_finish(&self, _progress: Progress) {}
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every snapshot it receives
    #[derive(Default)]
    pub struct RecordingObserver {
        snapshots: Mutex<Vec<Progress>>,
        finished: Mutex<Option<Progress>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn snapshots(&self) -> Vec<Progress> {
            self.snapshots.lock().unwrap().clone()
        }

        pub fn percents(&self) -> Vec<f64> {
            self.snapshots().iter().map(|p| p.percent).collect()
        }

        pub fn finished(&self) -> Option<Progress> {
            *self.finished.lock().unwrap()
        }
    }

    impl ProgressObserver for RecordingObserver {
        fn on_progress(&self, progress: Progress) {
            self.snapshots.lock().unwrap().push(progress);
        }

        fn on_finish(&self, progress: Progress) {
            *self.finished.lock().unwrap() = Some(progress);
        }
    }
}
