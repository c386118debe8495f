// Port Layer - Interfaces for external dependencies

pub mod clock; // For deterministic timeout tests
pub mod host_network;
pub mod operation;
pub mod progress;

// Re-exports
pub use clock::{Clock, SystemClock};
pub use host_network::HostNetwork;
pub use operation::{operation_fn, FnOperation, TargetOperation};
pub use progress::{Progress, ProgressObserver};
