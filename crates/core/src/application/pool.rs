// Worker Pool - bounded admission of per-target operations

use super::constants::MAX_CAPACITY;
use super::panic_guard::execute_guarded;
use crate::domain::{OperationError, OperationOutcome, SharedContext, SlotState, Target};
use crate::error::{EngineError, Result};
use crate::port::TargetOperation;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to one submitted operation.
///
/// Supports exactly three queries: whether it is done, retrieving the outcome,
/// and force-disposing it. Nothing else crosses between the operation's task
/// and the engine.
pub struct TaskHandle<T> {
    outcome_rx: Option<oneshot::Receiver<OperationOutcome<T>>>,
    ready: Option<OperationOutcome<T>>,
    join: Option<JoinHandle<()>>,
    state: Arc<AtomicU8>,
}

impl<T> TaskHandle<T> {
    /// True once the operation has produced an outcome (or can never produce one)
    pub fn is_done(&mut self) -> bool {
        self.poll_outcome();
        self.ready.is_some()
    }

    /// Take the outcome if the operation finished; `None` while it is still running
    pub fn take_outcome(&mut self) -> Option<OperationOutcome<T>> {
        self.poll_outcome();
        let outcome = self.ready.take()?;
        // Task has already returned; dropping the join handle just detaches it
        self.join = None;
        Some(outcome)
    }

    /// Stop observing the operation and abort its task.
    ///
    /// Best-effort: the task is dropped at its next suspension point and its
    /// capacity permit is released, but work already handed to a remote
    /// system is not recalled.
    pub fn dispose(&mut self) {
        if let Some(join) = self.join.take() {
            join.abort();
        }
        self.outcome_rx = None;
        self.ready = None;
    }

    /// Pending until the operation acquired an execution slot, then Running
    pub fn observed_state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn poll_outcome(&mut self) {
        if self.ready.is_some() {
            return;
        }
        let Some(rx) = self.outcome_rx.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(outcome) => {
                self.ready = Some(outcome);
                self.outcome_rx = None;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                // Task went away without reporting (aborted or runtime shut down)
                self.ready = Some(Err(OperationError::Cancelled));
                self.outcome_rx = None;
            }
        }
    }
}

impl<T> Drop for TaskHandle<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub submitted: usize,
    pub running: usize,
    pub peak_running: usize,
}

#[derive(Default)]
struct ConcurrencyGauge {
    running: AtomicUsize,
    peak: AtomicUsize,
}

struct RunningGuard<'a>(&'a ConcurrencyGauge);

impl ConcurrencyGauge {
    fn enter(&self) -> RunningGuard<'_> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        RunningGuard(self)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounded pool of execution slots.
///
/// Every submission becomes a runtime task that waits on a fair semaphore
/// with `capacity` permits, so at most `capacity` operations run at once and
/// queued work is admitted in submission order. `submit` never blocks.
pub struct WorkerPool {
    capacity: usize,
    permits: Arc<Semaphore>,
    context: Arc<SharedContext>,
    runtime: Handle,
    completions: Arc<Notify>,
    gauge: Arc<ConcurrencyGauge>,
    submitted: usize,
}

impl WorkerPool {
    /// Open a pool with exactly `capacity` execution slots sharing `context`
    ///
    /// # Errors
    /// - EngineError::PoolSetup if capacity is zero or too large, or if no
    ///   async runtime is available to run operations on
    pub fn open(capacity: usize, context: SharedContext) -> Result<Self> {
        if capacity == 0 {
            return Err(EngineError::PoolSetup(
                "capacity must be at least 1".to_string(),
            ));
        }
        if capacity > MAX_CAPACITY || capacity > Semaphore::MAX_PERMITS {
            return Err(EngineError::PoolSetup(format!(
                "capacity {} exceeds maximum {}",
                capacity, MAX_CAPACITY
            )));
        }
        let runtime = Handle::try_current().map_err(|e| {
            EngineError::PoolSetup(format!("no async runtime available: {}", e))
        })?;

        info!(capacity = capacity, "Worker pool opened");

        Ok(Self {
            capacity,
            permits: Arc::new(Semaphore::new(capacity)),
            context: Arc::new(context),
            runtime,
            completions: Arc::new(Notify::new()),
            gauge: Arc::new(ConcurrencyGauge::default()),
            submitted: 0,
        })
    }

    /// Queue `operation` for `target` and return immediately
    pub fn submit<O>(&mut self, target: Target, operation: Arc<O>) -> TaskHandle<O::Output>
    where
        O: TargetOperation + ?Sized,
    {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let state = Arc::new(AtomicU8::new(SlotState::Pending.as_u8()));

        let permits = Arc::clone(&self.permits);
        let context = Arc::clone(&self.context);
        let completions = Arc::clone(&self.completions);
        let gauge = Arc::clone(&self.gauge);
        let task_state = Arc::clone(&state);

        let join = self.runtime.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => {
                    task_state.store(SlotState::Running.as_u8(), Ordering::Release);
                    let _running = gauge.enter();
                    debug!(host = %target, operation = operation.name(), "Operation started");
                    execute_guarded(operation.run(target, context)).await
                }
                // Semaphore closed: the pool shut down before this slot ran
                Err(_) => Err(OperationError::Cancelled),
            };
            // Receiver may already be gone if the slot was abandoned
            let _ = outcome_tx.send(outcome);
            completions.notify_one();
        });

        self.submitted += 1;

        TaskHandle {
            outcome_rx: Some(outcome_rx),
            ready: None,
            join: Some(join),
            state,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Signalled each time an operation finishes
    pub fn completions(&self) -> Arc<Notify> {
        Arc::clone(&self.completions)
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            submitted: self.submitted,
            running: self.gauge.running.load(Ordering::SeqCst),
            peak_running: self.gauge.peak.load(Ordering::SeqCst),
        }
    }

    /// Stop admitting work and release the execution slots.
    ///
    /// Operations still queued resolve to `OperationError::Cancelled`.
    pub fn close(self) -> PoolStats {
        self.permits.close();
        let stats = self.stats();
        info!(
            submitted = stats.submitted,
            peak_running = stats.peak_running,
            "Worker pool closed"
        );
        stats
    }
}
