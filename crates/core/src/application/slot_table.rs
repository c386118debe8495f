// Active slot bookkeeping

use super::pool::TaskHandle;
use crate::domain::{SlotId, SlotState, Target};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// One in-flight unit of work: a target plus the handle of its operation
pub struct TaskSlot<T> {
    pub id: SlotId,
    pub target: Target,
    /// Submission instant; the timeout is measured from here
    pub dispatched_at: Instant,
    pub handle: TaskHandle<T>,
    /// Last state the collector recorded for this slot
    pub state: SlotState,
}

impl<T> TaskSlot<T> {
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.dispatched_at)
    }

    /// Refresh `state` from the handle; Pending becomes Running once the
    /// operation acquired an execution slot
    pub fn sync_state(&mut self) -> SlotState {
        if self.state == SlotState::Pending
            && self.handle.observed_state() == SlotState::Running
        {
            self.state = SlotState::Running;
        }
        self.state
    }
}

/// Slots submitted but not yet finalized, in submission order.
///
/// Owned by the submitting caller; mutation goes through `&mut self`, so there
/// is a single writer at all times.
pub struct ActiveSlotSet<T> {
    slots: BTreeMap<SlotId, TaskSlot<T>>,
    next_id: u64,
}

impl<T> ActiveSlotSet<T> {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register a freshly submitted handle under a new, never reused id
    pub fn admit(&mut self, target: Target, handle: TaskHandle<T>, dispatched_at: Instant) -> SlotId {
        let id = SlotId::new(self.next_id);
        self.next_id += 1;
        self.slots.insert(
            id,
            TaskSlot {
                id,
                target,
                dispatched_at,
                handle,
                state: SlotState::Pending,
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: SlotId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn remove(&mut self, id: SlotId) -> Option<TaskSlot<T>> {
        self.slots.remove(&id)
    }

    pub fn ids(&self) -> Vec<SlotId> {
        self.slots.keys().copied().collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TaskSlot<T>> {
        self.slots.values_mut()
    }

    /// Earliest instant at which some slot will exceed `timeout`.
    ///
    /// Deadlines past the clock's range are treated as never.
    pub fn next_deadline(&self, timeout: Duration) -> Option<Instant> {
        self.slots
            .values()
            .filter_map(|slot| slot.dispatched_at.checked_add(timeout))
            .min()
    }
}

impl<T> Default for ActiveSlotSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
