// fanout Core - Engine, Domain Logic & Ports
// NO infrastructure dependencies: processes, DNS and terminals live in adapter crates

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{BatchReport, Engine, LocalHostResolver};
pub use config::EngineConfig;
pub use domain::{Credential, OperationError, OperationOutcome, SharedContext, Target, TargetResult};
pub use error::{EngineError, Result};
pub use port::{operation_fn, TargetOperation};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
