//! Deferred callbacks for hold and double-tap detection. Single threaded:
//! the engine owner decides when "now" is and asks for what is due.

use std::time::Duration;

use crate::frame::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerPurpose {
    Hold,
    DoubleTap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEntry {
    pub slot: Slot,
    pub purpose: TimerPurpose,
    /// Generation of the contact that registered the timer.
    pub generation: u64,
    pub deadline: Duration,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: Vec<TimerEntry>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a timer; an existing one with the same key is replaced.
    pub fn schedule(&mut self, slot: Slot, purpose: TimerPurpose, generation: u64, deadline: Duration) {
        self.cancel(slot, purpose);
        self.entries.push(TimerEntry {
            slot,
            purpose,
            generation,
            deadline,
        });
    }

    pub fn cancel(&mut self, slot: Slot, purpose: TimerPurpose) {
        self.entries
            .retain(|e| !(e.slot == slot && e.purpose == purpose));
    }

    pub fn cancel_slot(&mut self, slot: Slot) {
        self.entries.retain(|e| e.slot != slot);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Removes and returns the earliest entry due at `now`, if any.
    pub fn pop_due(&mut self, now: Duration) -> Option<TimerEntry> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= now)
            .min_by_key(|(_, e)| (e.deadline, e.purpose, e.slot))
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(idx))
    }
}
