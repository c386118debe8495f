// Result Collector - finalizes completed slots and abandons expired ones

use super::slot_table::{ActiveSlotSet, TaskSlot};
use crate::domain::{OperationError, SlotId, SlotState, Target, TargetResult};
use crate::port::Clock;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Shortest wait between blocking passes
const MIN_PASS_WAIT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// Exactly one pass, never waits
    NonBlocking,
    /// Repeat passes until the active set is empty
    BlockUntilEmpty,
}

/// A target dropped because its slot exceeded the timeout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedOutTarget {
    pub slot_id: SlotId,
    pub target: Target,
    pub elapsed_ms: u64,
    /// State the slot was in when it expired (Pending or Running)
    pub last_state: SlotState,
}

/// Counters for one drain call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub passes: usize,
    pub completed: usize,
    pub timed_out: usize,
    pub remaining: usize,
}

/// Accumulates results for a batch.
///
/// The collector is the only code that finalizes slots. Each pass first
/// finalizes every slot whose handle reports completion, then abandons every
/// remaining slot older than the timeout.
pub struct ResultCollector<T> {
    timeout: Duration,
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
    results: Vec<TargetResult<T>>,
    timed_out: Vec<TimedOutTarget>,
}

impl<T> ResultCollector<T> {
    pub fn new(timeout: Duration, poll_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            timeout,
            poll_interval,
            clock,
            results: Vec::new(),
            timed_out: Vec::new(),
        }
    }

    pub fn results(&self) -> &[TargetResult<T>] {
        &self.results
    }

    pub fn timed_out(&self) -> &[TimedOutTarget] {
        &self.timed_out
    }

    /// Number of slots finalized so far, either way
    pub fn finalized(&self) -> usize {
        self.results.len() + self.timed_out.len()
    }

    pub fn into_parts(self) -> (Vec<TargetResult<T>>, Vec<TimedOutTarget>) {
        (self.results, self.timed_out)
    }

    /// One pass over the active set
    pub fn drain_pass(&mut self, active: &mut ActiveSlotSet<T>) -> DrainSummary {
        let mut summary = DrainSummary {
            passes: 1,
            ..Default::default()
        };

        let mut done = Vec::new();
        let mut expired = Vec::new();
        let now = self.clock.now();

        // Completion is checked before expiry, so a slot that finished right
        // at its deadline still yields a result
        for slot in active.iter_mut() {
            slot.sync_state();
            if slot.handle.is_done() {
                done.push(slot.id);
            } else if slot.elapsed(now) >= self.timeout {
                expired.push(slot.id);
            }
        }

        for id in done {
            if let Some(slot) = active.remove(id) {
                self.finalize_completed(slot, now);
                summary.completed += 1;
            }
        }

        for id in expired {
            if let Some(slot) = active.remove(id) {
                self.abandon(slot, now);
                summary.timed_out += 1;
            }
        }

        summary.remaining = active.len();
        summary
    }

    /// Drain the active set.
    ///
    /// `on_pass` runs after every pass with the number of slots still active.
    /// In blocking mode the wait between passes ends on the next completion,
    /// the poll interval, or the nearest slot deadline, whichever is first.
    pub async fn drain<F>(
        &mut self,
        active: &mut ActiveSlotSet<T>,
        mode: DrainMode,
        completions: &Notify,
        mut on_pass: F,
    ) -> DrainSummary
    where
        F: FnMut(usize),
    {
        let mut total = DrainSummary::default();
        loop {
            let pass = self.drain_pass(active);
            total.passes += pass.passes;
            total.completed += pass.completed;
            total.timed_out += pass.timed_out;
            total.remaining = pass.remaining;
            on_pass(pass.remaining);

            if mode == DrainMode::NonBlocking || active.is_empty() {
                return total;
            }

            let wait = self.next_wait(active);
            // Elapsed wait is expected: it triggers the next timeout check
            let _ = tokio::time::timeout(wait, completions.notified()).await;
        }
    }

    fn next_wait(&self, active: &ActiveSlotSet<T>) -> Duration {
        let now = self.clock.now();
        let until_deadline = active
            .next_deadline(self.timeout)
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(self.poll_interval);
        until_deadline.min(self.poll_interval).max(MIN_PASS_WAIT)
    }

    fn finalize_completed(&mut self, mut slot: TaskSlot<T>, now: Instant) {
        let Some(outcome) = slot.handle.take_outcome() else {
            return;
        };
        // Finished between two passes without ever being observed Running
        if slot.state == SlotState::Pending {
            slot.state = SlotState::Running;
        }
        slot.state = match slot.state.transition(SlotState::Completed) {
            Ok(next) => next,
            Err(e) => {
                warn!(slot_id = %slot.id, error = %e, "Unexpected slot state on completion");
                SlotState::Completed
            }
        };
        slot.handle.dispose();

        let elapsed_ms = slot.elapsed(now).as_millis() as u64;
        match &outcome {
            Ok(_) => debug!(slot_id = %slot.id, host = %slot.target, elapsed_ms, "Slot completed"),
            Err(OperationError::Cancelled) => {
                warn!(slot_id = %slot.id, host = %slot.target, "Operation cancelled before running")
            }
            Err(e) => {
                warn!(slot_id = %slot.id, host = %slot.target, elapsed_ms, error = %e, "Operation failed")
            }
        }

        self.results.push(TargetResult {
            slot_id: slot.id,
            target: slot.target,
            finished_at: Utc::now(),
            elapsed_ms,
            outcome,
        });
    }

    fn abandon(&mut self, mut slot: TaskSlot<T>, now: Instant) {
        let last_state = slot.state;
        if let Err(e) = slot.state.transition(SlotState::TimedOut) {
            warn!(slot_id = %slot.id, error = %e, "Unexpected slot state on timeout");
        }
        slot.handle.dispose();

        let elapsed_ms = slot.elapsed(now).as_millis() as u64;
        warn!(
            slot_id = %slot.id,
            host = %slot.target,
            elapsed_ms,
            timeout_secs = self.timeout.as_secs(),
            state = %last_state,
            "Target timed out, result dropped"
        );

        self.timed_out.push(TimedOutTarget {
            slot_id: slot.id,
            target: slot.target,
            elapsed_ms,
            last_state,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pool::WorkerPool;
    use crate::domain::SharedContext;
    use crate::port::clock::mocks::ManualClock;
    use crate::port::operation::mocks::{MockBehavior, MockOperation};
    use crate::port::SystemClock;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn pool(capacity: usize) -> WorkerPool {
        WorkerPool::open(capacity, SharedContext::new(TIMEOUT)).unwrap()
    }

    #[tokio::test]
    async fn test_drain_empty_set_is_noop() {
        let mut collector: ResultCollector<String> =
            ResultCollector::new(TIMEOUT, Duration::from_millis(10), Arc::new(SystemClock));
        let mut active = ActiveSlotSet::new();
        let notify = Notify::new();

        for mode in [DrainMode::NonBlocking, DrainMode::BlockUntilEmpty] {
            let summary = collector.drain(&mut active, mode, &notify, |_| {}).await;
            assert_eq!(summary.passes, 1);
            assert_eq!(summary.completed, 0);
            assert_eq!(summary.remaining, 0);
        }
        assert!(collector.results().is_empty());
    }

    #[tokio::test]
    async fn test_block_until_empty_collects_everything() {
        let mut pool = pool(2);
        let op = Arc::new(MockOperation::new(MockBehavior::Delay(Duration::from_millis(20))));
        let mut active = ActiveSlotSet::new();
        let mut collector =
            ResultCollector::new(TIMEOUT, Duration::from_millis(10), Arc::new(SystemClock));

        for host in ["a", "b", "c"] {
            let handle = pool.submit(Target::new(host), Arc::clone(&op));
            active.admit(Target::new(host), handle, Instant::now());
        }

        let completions = pool.completions();
        let summary = collector
            .drain(&mut active, DrainMode::BlockUntilEmpty, &completions, |_| {})
            .await;

        assert_eq!(summary.completed, 3);
        assert!(active.is_empty());
        let mut hosts: Vec<_> = collector
            .results()
            .iter()
            .map(|r| r.target.host().to_string())
            .collect();
        hosts.sort();
        assert_eq!(hosts, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_expired_slot_is_dropped_without_result() {
        let mut pool = pool(1);
        let clock = Arc::new(ManualClock::new());
        let mut collector: ResultCollector<String> =
            ResultCollector::new(TIMEOUT, Duration::from_millis(10), clock.clone());
        let mut active = ActiveSlotSet::new();

        let op = Arc::new(MockOperation::new(MockBehavior::Hang));
        let handle = pool.submit(Target::new("stuck"), op);
        active.admit(Target::new("stuck"), handle, clock.now());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let first = collector.drain_pass(&mut active);
        assert_eq!(first.timed_out, 0);
        assert_eq!(first.remaining, 1);

        clock.advance(TIMEOUT);
        let second = collector.drain_pass(&mut active);
        assert_eq!(second.timed_out, 1);
        assert!(active.is_empty());
        assert!(collector.results().is_empty());

        let dropped = &collector.timed_out()[0];
        assert_eq!(dropped.target.host(), "stuck");
        assert_eq!(dropped.last_state, SlotState::Running);
        assert_eq!(dropped.elapsed_ms, TIMEOUT.as_millis() as u64);
    }

    #[tokio::test]
    async fn test_queued_slot_can_expire_while_pending() {
        let mut pool = pool(1);
        let clock = Arc::new(ManualClock::new());
        let mut collector: ResultCollector<String> =
            ResultCollector::new(TIMEOUT, Duration::from_millis(10), clock.clone());
        let mut active = ActiveSlotSet::new();
        let op = Arc::new(MockOperation::new(MockBehavior::Hang));

        for host in ["first", "queued"] {
            let handle = pool.submit(Target::new(host), Arc::clone(&op));
            active.admit(Target::new(host), handle, clock.now());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        clock.advance(TIMEOUT + Duration::from_secs(1));
        collector.drain_pass(&mut active);

        let states: Vec<_> = collector
            .timed_out()
            .iter()
            .map(|t| (t.target.host().to_string(), t.last_state))
            .collect();
        assert_eq!(
            states,
            vec![
                ("first".to_string(), SlotState::Running),
                ("queued".to_string(), SlotState::Pending),
            ]
        );
    }

    #[tokio::test]
    async fn test_completion_wins_over_expiry_in_same_pass() {
        let mut pool = pool(1);
        let clock = Arc::new(ManualClock::new());
        let mut collector =
            ResultCollector::new(TIMEOUT, Duration::from_millis(10), clock.clone());
        let mut active = ActiveSlotSet::new();

        let handle = pool.submit(Target::new("edge"), Arc::new(MockOperation::new_success()));
        active.admit(Target::new("edge"), handle, clock.now());
        tokio::time::sleep(Duration::from_millis(20)).await;

        clock.advance(TIMEOUT * 2);
        let summary = collector.drain_pass(&mut active);

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.timed_out, 0);
        assert_eq!(collector.results()[0].outcome, Ok("edge".to_string()));
    }

    #[tokio::test]
    async fn test_operation_error_becomes_error_result() {
        let mut pool = pool(1);
        let mut collector =
            ResultCollector::new(TIMEOUT, Duration::from_millis(10), Arc::new(SystemClock));
        let mut active = ActiveSlotSet::new();

        let op = Arc::new(MockOperation::new(MockBehavior::Fail("access denied".into())));
        let handle = pool.submit(Target::new("dc01"), op);
        active.admit(Target::new("dc01"), handle, Instant::now());

        let completions = pool.completions();
        collector
            .drain(&mut active, DrainMode::BlockUntilEmpty, &completions, |_| {})
            .await;

        let result = &collector.results()[0];
        assert!(!result.is_success());
        assert_eq!(
            result.error(),
            Some(&OperationError::Failed("access denied".into()))
        );
    }
}
