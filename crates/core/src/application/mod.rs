// Application Layer - pool, collection, progress and batch orchestration

pub mod collector;
pub mod constants;
pub mod engine;
pub mod panic_guard;
pub mod pool;
pub mod progress;
pub mod resolver;
pub mod slot_table;

// Re-exports
pub use collector::{DrainMode, DrainSummary, ResultCollector, TimedOutTarget};
pub use engine::{BatchReport, Dispatcher, Engine};
pub use pool::{PoolStats, TaskHandle, WorkerPool};
pub use progress::{percent_complete, ProgressReporter, TracingProgress};
pub use resolver::LocalHostResolver;
pub use slot_table::{ActiveSlotSet, TaskSlot};
