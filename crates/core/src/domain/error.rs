// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid slot state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
