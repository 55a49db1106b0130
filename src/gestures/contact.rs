//! One tracked touch point and the geometry the state functions need.

use std::time::Duration;

use crate::event::{Direction, Point};
use crate::frame::{Sample, Slot, elapsed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactState {
    Initial,
    Tap,
    Pan,
    Hold,
    /// Ignores everything until its own lift.
    Void,
}

/// Tentative claim on a two-finger gesture while the buddy catches up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingMulti {
    Tap,
    Swipe,
    PanRelease,
    Rotate,
}

#[derive(Debug, Clone)]
pub struct Contact {
    pub slot: Slot,
    /// Unique per contact instance; timers carry it to detect slot reuse.
    pub generation: u64,
    pub tracking_id: i32,
    /// Copy of the finger-down sample.
    pub initial: Sample,
    /// Latest sample for the slot, refreshed every frame.
    pub current: Sample,
    pub down: bool,
    pub state: ContactState,
    pub pending_hold_timer: bool,
    pub pending_double_tap_timer: bool,
    pub pending_multi: Option<PendingMulti>,
    pub multiswipe: Vec<(Direction, Sample)>,
    pub hold_panning: bool,
    /// Down landed on a recent tap; its events are swallowed.
    pub bouncing: bool,
    pub last_pos: Point,
    /// Frame in which this contact emitted a combined two-finger event.
    pub pair_emitted_frame: Option<u64>,
}

impl Contact {
    pub fn new(generation: u64, sample: Sample) -> Self {
        Self {
            slot: sample.slot,
            generation,
            tracking_id: sample.tracking_id,
            initial: sample,
            current: sample,
            down: false,
            state: ContactState::Initial,
            pending_hold_timer: false,
            pending_double_tap_timer: false,
            pending_multi: None,
            multiswipe: Vec::new(),
            hold_panning: false,
            bouncing: false,
            last_pos: Point::new(sample.x, sample.y),
            pair_emitted_frame: None,
        }
    }

    /// Starts a fresh touch on this contact from its current sample.
    pub fn begin_touch(&mut self) {
        self.initial = self.current;
        self.down = true;
        self.state = ContactState::Tap;
        self.pending_multi = None;
        self.multiswipe.clear();
        self.hold_panning = false;
        self.bouncing = false;
        self.last_pos = self.pos();
    }

    pub fn pos(&self) -> Point {
        Point::new(self.current.x, self.current.y)
    }

    pub fn initial_pos(&self) -> Point {
        Point::new(self.initial.x, self.initial.y)
    }

    pub fn delta(&self) -> (f64, f64) {
        (self.current.x - self.initial.x, self.current.y - self.initial.y)
    }

    pub fn distance(&self) -> f64 {
        self.initial_pos().distance(self.pos())
    }

    pub fn direction(&self) -> Option<Direction> {
        let (dx, dy) = self.delta();
        Direction::from_delta(dx, dy)
    }

    /// Down-to-now duration; infinite if the clock went backwards.
    pub fn duration(&self) -> Duration {
        elapsed(self.initial.time, self.current.time)
    }

    /// Movement since the previous call.
    pub fn take_relative(&mut self) -> Point {
        let pos = self.pos();
        let rel = Point::new(pos.x - self.last_pos.x, pos.y - self.last_pos.y);
        self.last_pos = pos;
        rel
    }

    /// Extends the multiswipe chain when the finger has travelled far enough
    /// from the last snapshot: a new leg on a direction change, otherwise the
    /// last leg's snapshot moves forward.
    pub fn record_multiswipe(&mut self, threshold: f64) {
        let reference = self
            .multiswipe
            .last()
            .map(|(_, s)| *s)
            .unwrap_or(self.initial);
        let dx = self.current.x - reference.x;
        let dy = self.current.y - reference.y;
        if dx.hypot(dy) <= threshold {
            return;
        }
        let Some(dir) = Direction::from_delta(dx, dy) else {
            return;
        };
        match self.multiswipe.last_mut() {
            Some(last) if last.0 == dir => *last = (dir, self.current),
            _ => self.multiswipe.push((dir, self.current)),
        }
    }

    pub fn multiswipe_path(&self) -> Vec<Direction> {
        self.multiswipe.iter().map(|(d, _)| *d).collect()
    }
}
