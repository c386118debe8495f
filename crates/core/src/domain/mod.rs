// Domain Layer - Targets, slots, outcomes and the shared execution context

pub mod context;
pub mod error;
pub mod local_hosts;
pub mod outcome;
pub mod slot;
pub mod target;

// Re-exports
pub use context::{Credential, SharedContext};
pub use error::DomainError;
pub use local_hosts::LocalHostSet;
pub use outcome::{OperationError, OperationOutcome, TargetResult};
pub use slot::{SlotId, SlotState};
pub use target::Target;
