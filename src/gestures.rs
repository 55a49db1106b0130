//! Multi-touch gesture recognizer: one state machine per slot, fed a frame at
//! a time, with hold and double-tap decided by deferred timers.

mod contact;
mod pairing;
mod timers;

pub use contact::{Contact, ContactState, PendingMulti};
pub use timers::{TimerEntry, TimerPurpose, TimerQueue};

use log::{debug, warn};
use std::time::Duration;

use crate::clock::ClockCalibrator;
use crate::config::{ConfigError, GestureSettings, Thresholds};
use crate::event::{GestureEvent, GestureKind, Point};
use crate::frame::{MAX_SLOTS, Sample, Slot, TouchFrame, elapsed};
use crate::rotate::{Orientation, Screen, rotate_event};

/// Where and when the last single tap on a slot landed.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TapRecord {
    pos: Point,
    time: Duration,
}

impl TapRecord {
    fn of(c: &Contact) -> Self {
        Self {
            pos: c.pos(),
            time: c.current.time,
        }
    }

    fn near(&self, pos: Point, time: Duration, distance: f64, interval: Duration) -> bool {
        (pos.x - self.pos.x).abs() < distance
            && (pos.y - self.pos.y).abs() < distance
            && elapsed(self.time, time) < interval
    }
}

#[derive(Debug)]
pub struct GestureEngine {
    th: Thresholds,
    screen: Screen,
    main_slot: Slot,
    contacts: Vec<Option<Contact>>,
    previous_tap: [Option<TapRecord>; MAX_SLOTS],
    timers: TimerQueue,
    clock: ClockCalibrator,
    next_generation: u64,
    frame_seq: u64,
    // waiting taps resolved early while handling the current sample or timer
    flushed: Vec<GestureEvent>,
}

impl GestureEngine {
    pub fn new(settings: &GestureSettings) -> Result<Self, ConfigError> {
        Self::with_clock(settings, ClockCalibrator::default())
    }

    pub fn with_clock(settings: &GestureSettings, clock: ClockCalibrator) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            th: Thresholds::derive(settings),
            screen: settings.screen()?,
            main_slot: settings.screen.main_finger_slot,
            contacts: vec![None; MAX_SLOTS],
            previous_tap: [None; MAX_SLOTS],
            timers: TimerQueue::new(),
            clock,
            next_generation: 0,
            frame_seq: 0,
            flushed: Vec::new(),
        })
    }

    /// Applies new settings. Live contacts keep running under the new
    /// thresholds.
    pub fn reconfigure(&mut self, settings: &GestureSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.th = Thresholds::derive(settings);
        self.screen = settings.screen()?;
        self.main_slot = settings.screen.main_finger_slot;
        Ok(())
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.screen.orientation = orientation;
    }

    pub fn active_contacts(&self) -> usize {
        self.contacts.iter().flatten().count()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Current time in the input clock domain, for driving `fire_timers`.
    pub fn now(&self) -> Option<Duration> {
        self.clock.now()
    }

    /// Drops every contact, timer and tap memory.
    pub fn reset(&mut self) {
        self.contacts.iter_mut().for_each(|c| *c = None);
        self.previous_tap = [None; MAX_SLOTS];
        self.timers.clear();
        self.flushed.clear();
    }

    /// Resume hook: the input clock may have jumped, calibrate it again.
    pub fn reset_clock_source(&mut self) {
        self.clock.reset();
    }

    /// Consumes one frame and returns what it produced, already rotated into
    /// the current screen orientation.
    pub fn feed_frame(&mut self, frame: &TouchFrame) -> Vec<GestureEvent> {
        self.frame_seq += 1;
        if let Some(t) = frame.time() {
            self.clock.observe(t);
        }
        let mut out = Vec::new();
        for sample in frame.deduplicated() {
            let ev = self.consume(sample);
            self.collect(ev, &mut out);
        }
        out
    }

    /// Runs every timer callback due at `now`, earliest first.
    pub fn fire_timers(&mut self, now: Duration) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        while let Some(entry) = self.timers.pop_due(now) {
            let ev = match entry.purpose {
                TimerPurpose::Hold => self.on_hold_timer(entry),
                TimerPurpose::DoubleTap => self.on_double_tap_timer(entry),
            };
            self.collect(ev, &mut out);
        }
        out
    }

    /// Early-resolved taps first, then the event of the step itself.
    fn collect(&mut self, ev: Option<GestureEvent>, out: &mut Vec<GestureEvent>) {
        for early in std::mem::take(&mut self.flushed) {
            out.push(rotate_event(early, &self.screen));
        }
        if let Some(ev) = ev {
            out.push(rotate_event(ev, &self.screen));
        }
    }

    fn consume(&mut self, sample: Sample) -> Option<GestureEvent> {
        let Some(idx) = sample.slot_index() else {
            warn!("ignoring sample for out-of-range slot {}", sample.slot);
            return None;
        };
        let lift = sample.is_lift();

        match self.contacts[idx].as_mut() {
            None if lift => {
                warn!("lift on slot {} without a live contact", sample.slot);
                return None;
            }
            None => self.create_contact(idx, sample),
            Some(c) if !lift && c.tracking_id != sample.tracking_id => {
                if !c.down
                    && c.pending_double_tap_timer
                    && c.pending_multi.is_none()
                    && c.state == ContactState::Tap
                {
                    // Second tap of a possible double tap reuses the contact.
                    c.tracking_id = sample.tracking_id;
                    c.state = ContactState::Initial;
                } else {
                    warn!(
                        "slot {} went down as {} while still tracking {}",
                        sample.slot, sample.tracking_id, c.tracking_id
                    );
                    self.resolve_waiting_tap(idx);
                    self.destroy(idx);
                    self.create_contact(idx, sample);
                }
            }
            Some(c) if lift && !c.down && c.state != ContactState::Void => {
                warn!("second lift on slot {}", sample.slot);
                self.resolve_waiting_tap(idx);
                self.destroy(idx);
                return None;
            }
            Some(_) => {}
        }

        let c = self.contacts[idx].as_mut()?;
        c.current = sample;
        c.tracking_id = sample.tracking_id;
        let state = c.state;
        match state {
            ContactState::Initial => self.initial_state(idx),
            ContactState::Tap => self.tap_state(idx, false),
            ContactState::Pan => self.pan_state(idx),
            ContactState::Hold => self.hold_state(idx),
            ContactState::Void => self.void_state(idx),
        }
    }

    fn create_contact(&mut self, idx: usize, sample: Sample) {
        self.next_generation += 1;
        self.contacts[idx] = Some(Contact::new(self.next_generation, sample));
    }

    /// Removes the contact and cancels anything it had scheduled.
    fn destroy(&mut self, idx: usize) {
        if let Some(c) = self.contacts[idx].take() {
            self.timers.cancel_slot(c.slot);
        }
    }

    fn contact(&self, idx: usize) -> Option<&Contact> {
        self.contacts.get(idx).and_then(Option::as_ref)
    }

    fn contact_mut(&mut self, idx: usize) -> Option<&mut Contact> {
        self.contacts.get_mut(idx).and_then(Option::as_mut)
    }

    fn initial_state(&mut self, idx: usize) -> Option<GestureEvent> {
        let tap_interval = self.th.tap_interval;
        let bounce_distance = self.th.tap_bounce_distance;
        let prev = self.previous_tap[idx];
        let c = self.contact_mut(idx)?;
        if c.current.is_lift() {
            debug!("ghost lift on slot {}", c.slot);
            self.destroy(idx);
            return None;
        }
        c.begin_touch();
        let (pos, time) = (c.pos(), c.current.time);
        c.bouncing = !tap_interval.is_zero()
            && prev.is_some_and(|p| p.near(pos, time, bounce_distance, tap_interval));
        self.tap_state(idx, true)
    }

    fn tap_state(&mut self, idx: usize, new_touch: bool) -> Option<GestureEvent> {
        let hold_interval = self.th.hold_interval;
        let pan_threshold = self.th.pan_threshold;
        let c = self.contact_mut(idx)?;
        if c.current.is_lift() {
            return self.tap_lift(idx);
        }

        if new_touch {
            let (slot, generation) = (c.slot, c.generation);
            let deadline = c.initial.time + hold_interval;
            c.pending_hold_timer = true;
            let ev = (!c.bouncing).then(|| GestureEvent::new(GestureKind::Touch, c.pos(), c.current.time));
            self.timers.schedule(slot, TimerPurpose::Hold, generation, deadline);
            if ev.is_none() {
                debug!("touch on slot {slot} looks like a bounce");
            }
            return ev;
        }

        if c.distance() > pan_threshold {
            let slot = c.slot;
            c.pending_hold_timer = false;
            c.bouncing = false;
            c.state = ContactState::Pan;
            self.timers.cancel(slot, TimerPurpose::Hold);
            self.resolve_waiting_tap(idx);
            return self.pan_state(idx);
        }
        None
    }

    fn tap_lift(&mut self, idx: usize) -> Option<GestureEvent> {
        let c = self.contact_mut(idx)?;
        let slot = c.slot;
        c.pending_hold_timer = false;
        self.timers.cancel(slot, TimerPurpose::Hold);

        match self.pair_on_tap_lift(idx) {
            pairing::PairStep::Emit(ev) => Some(ev),
            pairing::PairStep::Wait => None,
            pairing::PairStep::Single => self.single_tap(idx),
        }
    }

    fn single_tap(&mut self, idx: usize) -> Option<GestureEvent> {
        let th = self.th.clone();
        let prev = self.previous_tap[idx];
        let c = self.contact_mut(idx)?;
        let cur = TapRecord::of(c);
        let (slot, generation) = (c.slot, c.generation);

        let bounced = c.bouncing
            || (!th.tap_interval.is_zero()
                && prev.is_some_and(|p| p.near(cur.pos, cur.time, th.tap_bounce_distance, th.tap_interval)));
        if bounced {
            debug!("suppressed tap bounce on slot {slot}");
            if c.pending_double_tap_timer {
                // The earlier tap still owns the double-tap timer.
                c.down = false;
                c.bouncing = false;
            } else {
                self.destroy(idx);
            }
            return None;
        }

        let tap = |r: TapRecord| GestureEvent::new(GestureKind::Tap, r.pos, r.time);

        if !th.double_tap_enabled {
            self.previous_tap[idx] = Some(cur);
            self.destroy(idx);
            return Some(tap(cur));
        }

        let deadline = cur.time + th.double_tap_interval;
        if c.pending_double_tap_timer {
            if let Some(p) = prev.filter(|p| {
                p.near(cur.pos, cur.time, th.double_tap_distance, th.double_tap_interval)
            }) {
                debug!("double tap on slot {slot} ({:?} apart)", elapsed(p.time, cur.time));
                self.previous_tap[idx] = None;
                self.destroy(idx);
                return Some(GestureEvent::new(GestureKind::DoubleTap, cur.pos, cur.time));
            }
            // Too far apart: the first tap resolves now, this one waits.
            c.down = false;
            self.previous_tap[idx] = Some(cur);
            self.timers.schedule(slot, TimerPurpose::DoubleTap, generation, deadline);
            return prev.map(tap);
        }

        c.down = false;
        c.pending_double_tap_timer = true;
        self.previous_tap[idx] = Some(cur);
        self.timers.schedule(slot, TimerPurpose::DoubleTap, generation, deadline);
        None
    }

    fn pan_state(&mut self, idx: usize) -> Option<GestureEvent> {
        if self.contact(idx)?.current.is_lift() {
            return self.pan_lift(idx);
        }
        self.pan_motion(idx, false)
    }

    /// Continuous pan bookkeeping; `held` tags the result as a hold pan.
    fn pan_motion(&mut self, idx: usize, held: bool) -> Option<GestureEvent> {
        let threshold = self.th.multiswipe_threshold;
        let c = self.contact_mut(idx)?;
        c.record_multiswipe(threshold);
        let relative = c.take_relative();
        let ev = GestureEvent::new(
            if held { GestureKind::HoldPan } else { GestureKind::Pan },
            c.pos(),
            c.current.time,
        )
        .with_direction(c.direction())
        .with_distance(c.distance())
        .with_relative(relative);

        if held {
            return Some(ev);
        }
        match self.two_finger_motion(idx) {
            Some(combined) => combined,
            None => Some(ev),
        }
    }

    fn pan_lift(&mut self, idx: usize) -> Option<GestureEvent> {
        if let Some(ev) = self.try_rotate(idx) {
            return Some(ev);
        }
        let swipe_interval = self.th.swipe_interval;
        let c = self.contact(idx)?;
        let candidate = if c.duration() < swipe_interval {
            PendingMulti::Swipe
        } else {
            PendingMulti::PanRelease
        };
        match self.pair_on_pan_lift(idx, candidate) {
            pairing::PairStep::Emit(ev) => return Some(ev),
            pairing::PairStep::Wait => return None,
            pairing::PairStep::Single => {}
        }

        let c = self.contact(idx)?;
        let ev = if candidate == PendingMulti::Swipe {
            let path = c.multiswipe_path();
            let ev = GestureEvent::new(GestureKind::Swipe, c.initial_pos(), c.current.time)
                .with_direction(c.direction())
                .with_distance(c.distance());
            if path.len() > 1 {
                GestureEvent {
                    kind: GestureKind::Multiswipe,
                    ..ev
                }
                .with_multiswipe(path)
            } else {
                ev
            }
        } else {
            GestureEvent::new(GestureKind::PanRelease, c.pos(), c.current.time)
        };
        self.destroy(idx);
        Some(ev)
    }

    fn hold_state(&mut self, idx: usize) -> Option<GestureEvent> {
        let pan_threshold = self.th.pan_threshold;
        let c = self.contact_mut(idx)?;
        if c.current.is_lift() {
            return self.hold_lift(idx);
        }
        if c.hold_panning || c.distance() > pan_threshold {
            c.hold_panning = true;
            return self.pan_motion(idx, true);
        }
        Some(GestureEvent::new(GestureKind::Hold, c.pos(), c.current.time))
    }

    fn hold_lift(&mut self, idx: usize) -> Option<GestureEvent> {
        self.drop_waiting_buddy(idx);
        let c = self.contact(idx)?;
        let ev = GestureEvent::new(GestureKind::HoldRelease, c.pos(), c.current.time);
        self.destroy(idx);
        Some(ev)
    }

    fn void_state(&mut self, idx: usize) -> Option<GestureEvent> {
        if self.contact(idx)?.current.is_lift() {
            self.destroy(idx);
        }
        None
    }

    fn on_hold_timer(&mut self, entry: TimerEntry) -> Option<GestureEvent> {
        let c = self.live_for_timer(&entry)?;
        if !c.pending_hold_timer {
            return None;
        }
        c.pending_hold_timer = false;
        if !c.down || c.state != ContactState::Tap {
            return None;
        }
        c.state = ContactState::Hold;
        c.bouncing = false;
        let ev = GestureEvent::new(GestureKind::Hold, c.pos(), entry.deadline);
        self.resolve_waiting_tap(usize::try_from(entry.slot).ok()?);
        Some(ev)
    }

    /// The touch on this contact is no longer a candidate second tap: the
    /// tap still waiting on the double-tap timer is emitted now, since
    /// whatever ends this touch may destroy the contact.
    fn resolve_waiting_tap(&mut self, idx: usize) {
        let prev = self.previous_tap[idx];
        let Some(c) = self.contact_mut(idx) else {
            return;
        };
        if !c.pending_double_tap_timer {
            return;
        }
        c.pending_double_tap_timer = false;
        let slot = c.slot;
        self.timers.cancel(slot, TimerPurpose::DoubleTap);
        if let Some(p) = prev {
            debug!("slot {slot} left the double-tap path; flushing the waiting tap");
            self.flushed.push(GestureEvent::new(GestureKind::Tap, p.pos, p.time));
        }
    }

    fn on_double_tap_timer(&mut self, entry: TimerEntry) -> Option<GestureEvent> {
        let c = self.live_for_timer(&entry)?;
        if !c.pending_double_tap_timer {
            return None;
        }
        c.pending_double_tap_timer = false;
        let still_down = c.down;
        let idx = entry.slot as usize;
        if !still_down {
            self.destroy(idx);
        }
        let prev = self.previous_tap[idx]?;
        Some(GestureEvent::new(GestureKind::Tap, prev.pos, prev.time))
    }

    /// The slot's contact, provided it is the instance that set the timer.
    fn live_for_timer(&mut self, entry: &TimerEntry) -> Option<&mut Contact> {
        let idx = usize::try_from(entry.slot).ok()?;
        match self.contact_mut(idx) {
            Some(c) if c.generation == entry.generation => Some(c),
            _ => {
                debug!("stale {:?} timer for slot {}", entry.purpose, entry.slot);
                None
            }
        }
    }
}
