// Engine constants (no magic values in the engine code)
use std::time::Duration;

/// Default number of concurrently running operations
pub const DEFAULT_CAPACITY: usize = 32;

/// Largest capacity accepted; bounded by the semaphore's permit limit
pub const MAX_CAPACITY: usize = 65_536;

/// Default per-target timeout (2 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper bound on the wait between blocking drain passes (100ms)
/// Completion notifications usually wake the drain sooner
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Largest per-target timeout accepted (30 days)
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);
