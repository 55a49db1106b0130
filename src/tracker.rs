//! Assembles per-slot evdev updates into touch frames.

use log::debug;
use std::time::Duration;

use crate::frame::{LIFT, MAX_SLOTS, Sample, Slot, TouchFrame};

#[derive(Debug, Clone)]
struct SlotState {
    tracking_id: i32, // LIFT = inactive
    x: f64,
    y: f64,
    // touched since the last SYN_REPORT
    dirty: bool,
}

impl Default for SlotState {
    fn default() -> Self {
        Self {
            tracking_id: LIFT,
            x: 0.0,
            y: 0.0,
            dirty: false,
        }
    }
}

#[derive(Debug)]
pub struct Tracker {
    slots: Vec<SlotState>,
    cur_slot: Option<usize>,
    // raw axis ranges
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    // panel size in pixels
    width: f64,
    height: f64,
}

impl Tracker {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            slots: vec![SlotState::default(); MAX_SLOTS],
            cur_slot: Some(0),
            x_min: 0,
            x_max: 4096,
            y_min: 0,
            y_max: 4096,
            width,
            height,
        }
    }

    pub fn set_ranges(&mut self, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        self.x_min = x_min;
        self.x_max = x_max.max(x_min + 1);
        self.y_min = y_min;
        self.y_max = y_max.max(y_min + 1);
    }

    pub fn set_screen_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn on_slot(&mut self, slot: i32) {
        self.cur_slot = usize::try_from(slot).ok().filter(|&s| s < self.slots.len());
        if self.cur_slot.is_none() {
            debug!("ignoring updates for out-of-range slot {slot}");
        }
    }

    pub fn on_tracking_id(&mut self, tracking_id: i32) {
        let Some(s) = self.current() else { return };
        s.tracking_id = tracking_id.max(LIFT);
        s.dirty = true;
    }

    pub fn on_pos_x(&mut self, raw: i32) {
        let x = scale(raw, self.x_min, self.x_max, self.width);
        if let Some(s) = self.current().filter(|s| s.tracking_id != LIFT) {
            s.x = x;
            s.dirty = true;
        }
    }

    pub fn on_pos_y(&mut self, raw: i32) {
        let y = scale(raw, self.y_min, self.y_max, self.height);
        if let Some(s) = self.current().filter(|s| s.tracking_id != LIFT) {
            s.y = y;
            s.dirty = true;
        }
    }

    /// Closes the sync period: one sample per slot that changed, lifts
    /// carrying the last known position.
    pub fn on_syn_report(&mut self, time: Duration) -> TouchFrame {
        let samples = self
            .slots
            .iter_mut()
            .enumerate()
            .filter(|(_, s)| s.dirty)
            .map(|(i, s)| {
                s.dirty = false;
                Sample::new(i as Slot, s.tracking_id, s.x, s.y, time)
            })
            .collect();
        TouchFrame::new(samples)
    }

    fn current(&mut self) -> Option<&mut SlotState> {
        self.cur_slot.and_then(|i| self.slots.get_mut(i))
    }
}

fn scale(raw: i32, min: i32, max: i32, extent: f64) -> f64 {
    let n = (f64::from(raw - min) / f64::from(max - min)).clamp(0.0, 1.0);
    n * extent
}
