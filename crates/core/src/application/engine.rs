// Engine - orchestrates one batch: submit, drain incrementally, drain to empty

use super::collector::{DrainMode, DrainSummary, ResultCollector, TimedOutTarget};
use super::pool::WorkerPool;
use super::progress::{ProgressReporter, TracingProgress};
use super::slot_table::ActiveSlotSet;
use crate::config::EngineConfig;
use crate::domain::{SharedContext, SlotId, Target, TargetResult};
use crate::error::{EngineError, Result};
use crate::port::progress::ProgressObserver;
use crate::port::{Clock, SystemClock, TargetOperation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything a finished batch produced
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T> {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub capacity: usize,
    pub submitted: usize,
    /// Highest number of operations observed running at once
    pub peak_concurrency: usize,
    /// One entry per target that completed or errored, in completion order
    pub results: Vec<TargetResult<T>>,
    /// Targets dropped after exceeding the timeout; they have no result
    pub timed_out: Vec<TimedOutTarget>,
}

impl<T> BatchReport<T> {
    pub fn successes(&self) -> impl Iterator<Item = &TargetResult<T>> {
        self.results.iter().filter(|r| r.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetResult<T>> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// True when every submitted target produced a successful result
    pub fn is_clean(&self) -> bool {
        self.timed_out.is_empty() && self.failures().next().is_none()
    }
}

/// Single-writer driver for one batch.
///
/// Holds the pool, the active slot set and the collector. Every submission is
/// followed by one non-blocking drain pass, so finished work is collected
/// while later targets are still being queued.
pub struct Dispatcher<T> {
    batch_id: Uuid,
    pool: WorkerPool,
    active: ActiveSlotSet<T>,
    collector: ResultCollector<T>,
    progress: ProgressReporter,
    clock: Arc<dyn Clock>,
    completions: Arc<Notify>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Open the pool for a batch
    ///
    /// # Errors
    /// - EngineError::PoolSetup if the pool cannot be opened
    pub fn open(
        config: &EngineConfig,
        context: SharedContext,
        clock: Arc<dyn Clock>,
        progress: ProgressReporter,
    ) -> Result<Self> {
        let pool = WorkerPool::open(config.capacity, context)?;
        let completions = pool.completions();
        Ok(Self {
            batch_id: Uuid::new_v4(),
            pool,
            active: ActiveSlotSet::new(),
            collector: ResultCollector::new(
                config.timeout(),
                config.poll_interval(),
                Arc::clone(&clock),
            ),
            progress,
            clock,
            completions,
            started_at: Utc::now(),
            started: Instant::now(),
        })
    }

    pub fn with_batch_id(mut self, batch_id: Uuid) -> Self {
        self.batch_id = batch_id;
        self
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// Queue one target, then run a non-blocking drain pass
    pub fn submit<O>(&mut self, target: Target, operation: &Arc<O>) -> SlotId
    where
        O: TargetOperation<Output = T> + ?Sized,
    {
        let dispatched_at = self.clock.now();
        let handle = self.pool.submit(target.clone(), Arc::clone(operation));
        let slot_id = self.active.admit(target, handle, dispatched_at);
        self.drain_now();
        slot_id
    }

    /// One non-blocking pass over the active set
    pub fn drain_now(&mut self) -> DrainSummary {
        let summary = self.collector.drain_pass(&mut self.active);
        let submitted = self.submitted();
        self.progress.report(submitted, summary.remaining);
        summary
    }

    pub fn submitted(&self) -> usize {
        self.pool.stats().submitted
    }

    pub fn active(&self) -> usize {
        self.active.len()
    }

    pub fn results(&self) -> &[TargetResult<T>] {
        self.collector.results()
    }

    /// Block until every slot is finalized, close the pool and build the report
    pub async fn finish(mut self) -> BatchReport<T> {
        let submitted = self.submitted();
        let progress = &mut self.progress;
        let summary = self
            .collector
            .drain(
                &mut self.active,
                DrainMode::BlockUntilEmpty,
                &self.completions,
                |active| progress.report(submitted, active),
            )
            .await;
        self.progress.finish(submitted, self.active.len());

        let stats = self.pool.close();
        let (results, timed_out) = self.collector.into_parts();

        if !timed_out.is_empty() {
            warn!(
                timed_out = timed_out.len(),
                submitted = submitted,
                "Some targets timed out and produced no result"
            );
        }
        info!(
            submitted = submitted,
            results = results.len(),
            timed_out = timed_out.len(),
            passes = summary.passes,
            peak_concurrency = stats.peak_running,
            "Batch finished"
        );

        BatchReport {
            batch_id: self.batch_id,
            started_at: self.started_at,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            capacity: stats.capacity,
            submitted,
            peak_concurrency: stats.peak_running,
            results,
            timed_out,
        }
    }
}

/// Runs one operation against a list of targets with bounded concurrency
pub struct Engine<O: TargetOperation + ?Sized> {
    config: EngineConfig,
    operation: Arc<O>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn ProgressObserver>,
}

impl<O: TargetOperation + ?Sized> Engine<O> {
    pub fn new(config: EngineConfig, operation: Arc<O>) -> Self {
        Self {
            config,
            operation,
            clock: Arc::new(SystemClock),
            observer: Arc::new(TracingProgress),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receives progress when `show_progress` is set
    pub fn with_progress_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Context carrying this engine's timeout and verbosity; callers add the
    /// credential and local-host set
    pub fn base_context(&self) -> SharedContext {
        SharedContext::new(self.config.timeout()).with_verbose(self.config.verbose)
    }

    /// Run the batch to completion.
    ///
    /// Targets are submitted in order and never deduplicated. Per-target
    /// failures and timeouts end up in the report; only configuration and
    /// pool setup problems are returned as errors.
    ///
    /// # Errors
    /// - EngineError::Config if the configuration is invalid
    /// - EngineError::PoolSetup if the pool cannot be opened
    pub async fn run<I>(&self, targets: I, context: SharedContext) -> Result<BatchReport<O::Output>>
    where
        I: IntoIterator<Item = Target>,
    {
        self.config.validate()?;

        let batch_id = Uuid::new_v4();
        let span = info_span!("batch", batch_id = %batch_id, operation = self.operation.name());

        async move {
            let progress =
                ProgressReporter::new(Arc::clone(&self.observer), self.config.show_progress);
            let mut dispatcher =
                Dispatcher::open(&self.config, context, Arc::clone(&self.clock), progress)?
                    .with_batch_id(batch_id);

            info!(
                capacity = self.config.capacity,
                timeout_secs = self.config.timeout_secs,
                "Batch started"
            );

            for target in targets {
                dispatcher.submit(target, &self.operation);
            }

            Ok::<_, EngineError>(dispatcher.finish().await)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperationError;
    use crate::port::operation::mocks::{MockBehavior, MockOperation};
    use crate::port::operation_fn;
    use crate::port::progress::mocks::RecordingObserver;
    use std::time::Duration;

    fn config(capacity: usize) -> EngineConfig {
        EngineConfig {
            capacity,
            timeout_secs: 5,
            poll_interval_ms: 10,
            ..Default::default()
        }
    }

    fn targets(hosts: &[&str]) -> Vec<Target> {
        hosts.iter().map(|h| Target::new(*h)).collect()
    }

    #[tokio::test]
    async fn test_run_collects_every_target() {
        let engine = Engine::new(config(2), Arc::new(MockOperation::new_success()));
        let ctx = engine.base_context();

        let report = engine.run(targets(&["a", "b", "c"]), ctx).await.unwrap();

        assert_eq!(report.submitted, 3);
        assert_eq!(report.results.len(), 3);
        assert!(report.timed_out.is_empty());
        assert!(report.is_clean());
        assert!(report.peak_concurrency <= 2);
    }

    #[tokio::test]
    async fn test_duplicates_are_not_deduplicated() {
        let op = Arc::new(MockOperation::new_success());
        let engine = Engine::new(config(4), op.clone());
        let ctx = engine.base_context();

        let report = engine.run(targets(&["dup", "dup"]), ctx).await.unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(op.call_count(), 2);
        assert_ne!(report.results[0].slot_id, report.results[1].slot_id);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_running() {
        let op = Arc::new(MockOperation::new_success());
        let engine = Engine::new(config(0), op.clone());
        let ctx = engine.base_context();

        let err = engine.run(targets(&["a"]), ctx).await.unwrap_err();

        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(op.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_finishes_immediately() {
        let engine = Engine::new(config(2), Arc::new(MockOperation::new_success()));
        let ctx = engine.base_context();

        let report = engine.run(Vec::new(), ctx).await.unwrap();

        assert_eq!(report.submitted, 0);
        assert!(report.results.is_empty());
    }

    #[tokio::test]
    async fn test_unbounded_timeout_is_rejected() {
        let op = Arc::new(MockOperation::new_success());
        let cfg = EngineConfig {
            timeout_secs: u64::MAX,
            ..config(2)
        };
        let engine = Engine::new(cfg, op.clone());
        let ctx = engine.base_context();

        let err = engine.run(targets(&["a"]), ctx).await.unwrap_err();

        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(op.call_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatcher_drains_with_unbounded_timeout() {
        let cfg = EngineConfig {
            timeout_secs: u64::MAX,
            ..config(2)
        };
        let op = Arc::new(MockOperation::new(MockBehavior::Delay(Duration::from_millis(20))));
        let mut dispatcher: Dispatcher<String> = Dispatcher::open(
            &cfg,
            SharedContext::new(Duration::from_secs(5)),
            Arc::new(SystemClock),
            ProgressReporter::disabled(),
        )
        .unwrap();

        dispatcher.submit(Target::new("a"), &op);
        dispatcher.submit(Target::new("b"), &op);
        let report = dispatcher.finish().await;

        assert_eq!(report.results.len(), 2);
        assert!(report.timed_out.is_empty());
    }

    #[tokio::test]
    async fn test_failures_and_successes_split() {
        let op = MockOperation::new_success()
            .on("bad", MockBehavior::Fail("denied".into()))
            .on("worse", MockBehavior::Panic("boom".into()));
        let engine = Engine::new(config(3), Arc::new(op));
        let ctx = engine.base_context();

        let report = engine
            .run(targets(&["good", "bad", "worse"]), ctx)
            .await
            .unwrap();

        assert_eq!(report.successes().count(), 1);
        let mut errors: Vec<_> = report.failures().filter_map(|r| r.error().cloned()).collect();
        errors.sort_by_key(|e| e.to_string());
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&OperationError::Failed("denied".into())));
        assert!(errors.contains(&OperationError::Panicked("boom".into())));
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_progress_reaches_one_hundred() {
        let observer = Arc::new(RecordingObserver::new());
        let mut cfg = config(2);
        cfg.show_progress = true;
        let op = MockOperation::new(MockBehavior::Delay(Duration::from_millis(5)));
        let engine = Engine::new(cfg, Arc::new(op)).with_progress_observer(observer.clone());
        let ctx = engine.base_context();

        engine.run(targets(&["a", "b", "c", "d"]), ctx).await.unwrap();

        let percents = observer.percents();
        assert!(!percents.is_empty());
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(observer.finished().map(|p| p.percent), Some(100.0));
    }

    #[tokio::test]
    async fn test_closure_operation_receives_context() {
        let op = Arc::new(operation_fn("len", |target: Target, ctx: Arc<SharedContext>| async move {
            Ok((target.host().len(), ctx.timeout()))
        }));
        let engine = Engine::new(config(1), op);
        let ctx = engine.base_context();

        let report = engine.run(targets(&["abcd"]), ctx).await.unwrap();

        assert_eq!(
            report.results[0].payload(),
            Some(&(4, Duration::from_secs(5)))
        );
    }

    #[tokio::test]
    async fn test_dispatcher_drains_while_submitting() {
        let cfg = config(4);
        let mut dispatcher: Dispatcher<String> = Dispatcher::open(
            &cfg,
            SharedContext::new(cfg.timeout()),
            Arc::new(SystemClock),
            ProgressReporter::disabled(),
        )
        .unwrap();
        let op = Arc::new(MockOperation::new_success());

        dispatcher.submit(Target::new("first"), &op);
        tokio::time::sleep(Duration::from_millis(20)).await;
        dispatcher.submit(Target::new("second"), &op);

        // The first target was collected by the pass that followed the second submit
        assert_eq!(dispatcher.results().len(), 1);
        assert_eq!(dispatcher.results()[0].target.host(), "first");

        let report = dispatcher.finish().await;
        assert_eq!(report.results.len(), 2);
    }
}
