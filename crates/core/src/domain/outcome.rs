// Per-target outcome records

use super::slot::SlotId;
use super::target::Target;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single target's operation.
///
/// Always isolated to that target: it becomes an error result and never aborts
/// the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum OperationError {
    #[error("Operation failed: {0}")]
    Failed(String),

    #[error("Process exited with code {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("Spawn failed: {0}")]
    Spawn(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Operation panicked: {0}")]
    Panicked(String),

    #[error("Operation cancelled before completion")]
    Cancelled,
}

impl From<std::io::Error> for OperationError {
    fn from(err: std::io::Error) -> Self {
        OperationError::Io(err.to_string())
    }
}

/// What an operation produced: its typed payload or an operation error
pub type OperationOutcome<T> = Result<T, OperationError>;

/// Result record for a target whose slot reached `Completed`.
///
/// Timed-out targets never produce one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetResult<T> {
    pub slot_id: SlotId,
    pub target: Target,
    pub finished_at: DateTime<Utc>,
    /// Time from submission to observed completion
    pub elapsed_ms: u64,
    pub outcome: OperationOutcome<T>,
}

impl<T> TargetResult<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn payload(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&OperationError> {
        self.outcome.as_ref().err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(outcome: OperationOutcome<u32>) -> TargetResult<u32> {
        TargetResult {
            slot_id: SlotId::new(1),
            target: Target::new("a"),
            finished_at: Utc::now(),
            elapsed_ms: 5,
            outcome,
        }
    }

    #[test]
    fn test_success_accessors() {
        let result = result_with(Ok(7));
        assert!(result.is_success());
        assert_eq!(result.payload(), Some(&7));
        assert!(result.error().is_none());
    }

    #[test]
    fn test_error_accessors() {
        let result = result_with(Err(OperationError::Failed("access denied".into())));
        assert!(!result.is_success());
        assert!(result.payload().is_none());
        assert_eq!(
            result.error().unwrap().to_string(),
            "Operation failed: access denied"
        );
    }

    #[test]
    fn test_error_serializes_as_tagged_record() {
        let err = OperationError::NonZeroExit {
            code: Some(2),
            stderr: "boom".into(),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "non_zero_exit");
        assert_eq!(value["detail"]["code"], 2);

        let cancelled = serde_json::to_value(OperationError::Cancelled).unwrap();
        assert_eq!(cancelled["kind"], "cancelled");
    }
}
