// Target Operation Port
// The per-target task body the engine fans out

use crate::domain::{OperationOutcome, SharedContext, Target};
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Work executed once per target.
///
/// Implementations do their own I/O and should return within roughly the
/// configured timeout. Invocations must not share mutable state; the only
/// shared input is the read-only `SharedContext`.
///
/// Implementations:
/// - CommandOperation: runs a local program per target (infra-system)
/// - TcpProbeOperation: TCP reachability check (infra-system)
/// - FnOperation: wraps an async closure (`operation_fn`)
#[async_trait]
pub trait TargetOperation: Send + Sync + 'static {
    /// Structured payload produced on success
    type Output: Send + 'static;

    /// Run the operation against one target
    ///
    /// # Errors
    /// Any `OperationError`; it is recorded for this target only
    async fn run(&self, target: Target, ctx: Arc<SharedContext>) -> OperationOutcome<Self::Output>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "operation"
    }
}

/// Operation backed by an async closure, see [`operation_fn`]
pub struct FnOperation<F, T> {
    name: String,
    f: F,
    _output: PhantomData<fn() -> T>,
}

/// Turn `|target, ctx| async move { ... }` into a `TargetOperation`.
///
/// # Example
/// ```text
/// let op = operation_fn("ping", |target: Target, _ctx| async move {
///     Ok(target.host().len())
/// });
/// ```
pub fn operation_fn<F, Fut, T>(name: impl Into<String>, f: F) -> FnOperation<F, T>
where
    F: Fn(Target, Arc<SharedContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OperationOutcome<T>> + Send + 'static,
    T: Send + 'static,
{
    FnOperation {
        name: name.into(),
        f,
        _output: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, T> TargetOperation for FnOperation<F, T>
where
    F: Fn(Target, Arc<SharedContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = OperationOutcome<T>> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    async fn run(&self, target: Target, ctx: Arc<SharedContext>) -> OperationOutcome<T> {
        (self.f)(target, ctx).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::OperationError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted behavior for one host
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Return the host name immediately
        Succeed,
        /// Sleep, then return the host name
        Delay(Duration),
        /// Fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Never complete
        Hang,
    }

    /// Scripted operation keyed by host, with concurrency tracking
    pub struct MockOperation {
        default: MockBehavior,
        per_host: HashMap<String, MockBehavior>,
        calls: Arc<AtomicUsize>,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl MockOperation {
        pub fn new(default: MockBehavior) -> Self {
            Self {
                default,
                per_host: HashMap::new(),
                calls: Arc::new(AtomicUsize::new(0)),
                running: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Succeed)
        }

        /// Override the behavior for one host
        pub fn on(mut self, host: impl Into<String>, behavior: MockBehavior) -> Self {
            self.per_host.insert(host.into(), behavior);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Highest number of invocations observed running at once
        pub fn peak_concurrency(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }

        /// Hosts in the order their invocations started
        pub fn started_hosts(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    struct RunningGuard(Arc<AtomicUsize>);

    impl Drop for RunningGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TargetOperation for MockOperation {
        type Output = String;

        async fn run(&self, target: Target, _ctx: Arc<SharedContext>) -> OperationOutcome<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(target.host().to_string());
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = RunningGuard(Arc::clone(&self.running));

            let behavior = self
                .per_host
                .get(target.host())
                .unwrap_or(&self.default)
                .clone();

            match behavior {
                MockBehavior::Succeed => Ok(target.host().to_string()),
                MockBehavior::Delay(d) => {
                    tokio::time::sleep(d).await;
                    Ok(target.host().to_string())
                }
                MockBehavior::Fail(msg) => Err(OperationError::Failed(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Hang => std::future::pending().await,
            }
        }

        fn name(&self) -> &str {
            "mock"
        }
    }
}
