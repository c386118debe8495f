// Slot Domain Model

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slot identifier, unique and increasing for the lifetime of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(u64);

impl SlotId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotState {
    /// Submitted, waiting for a free execution slot
    Pending,
    /// Operation is executing
    Running,
    /// Outcome retrieved (success or operation error)
    Completed,
    /// Abandoned after exceeding the timeout
    TimedOut,
}

impl SlotState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SlotState::Completed | SlotState::TimedOut)
    }

    /// Validate and apply a state transition.
    ///
    /// `Pending -> TimedOut` is legal: the timeout runs from submission, so a
    /// slot can expire while still queued behind a full pool.
    pub fn transition(self, to: SlotState) -> Result<SlotState> {
        use SlotState::*;
        match (self, to) {
            (Pending, Running)
            | (Running, Completed)
            | (Running, TimedOut)
            | (Pending, TimedOut) => Ok(to),
            (from, to) => Err(DomainError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            SlotState::Pending => 0,
            SlotState::Running => 1,
            SlotState::Completed => 2,
            SlotState::TimedOut => 3,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SlotState::Pending,
            1 => SlotState::Running,
            2 => SlotState::Completed,
            _ => SlotState::TimedOut,
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Pending => write!(f, "PENDING"),
            SlotState::Running => write!(f, "RUNNING"),
            SlotState::Completed => write!(f, "COMPLETED"),
            SlotState::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}
