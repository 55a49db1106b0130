//! Two-finger gestures across the two main slots.
//!
//! Fingers rarely lift in the same frame, so the first contact to resolve
//! parks a [`PendingMulti`] tag and goes quiet. The combined event is produced
//! once the buddy resolves with a compatible tag; both contacts die together.
//! Every check looks at both sides, so frame order between the slots does not
//! matter.

use log::debug;

use super::{Contact, ContactState, GestureEngine, PendingMulti};
use crate::event::{Direction, GestureEvent, GestureKind};

pub(super) enum PairStep {
    Emit(GestureEvent),
    /// Parked until the buddy resolves.
    Wait,
    /// Not a two-finger gesture; classify this contact alone.
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairMode {
    Motion,
    Swipe,
    Release,
}

impl GestureEngine {
    fn buddy_index(&self, idx: usize) -> Option<usize> {
        let main = usize::try_from(self.main_slot).ok()?;
        if idx == main {
            Some(main + 1)
        } else if idx == main + 1 {
            Some(main)
        } else {
            None
        }
    }

    /// The paired contact, unless it is already sunk in `Void`.
    fn buddy(&self, idx: usize) -> Option<(usize, &Contact)> {
        let b = self.buddy_index(idx)?;
        self.contact(b)
            .filter(|c| c.state != ContactState::Void)
            .map(|c| (b, c))
    }

    /// Short and still enough to count as one half of a two-finger tap.
    fn tap_in_tolerance(&self, c: &Contact) -> bool {
        let region = self.th.two_finger_tap_region;
        let (dx, dy) = c.delta();
        c.duration() < self.th.two_finger_tap_duration && dx.abs() < region && dy.abs() < region
    }

    pub(super) fn pair_on_tap_lift(&mut self, idx: usize) -> PairStep {
        let Some((b, buddy)) = self.buddy(idx) else {
            return PairStep::Single;
        };
        let Some(me) = self.contact(idx) else {
            return PairStep::Single;
        };

        let pending = buddy.pending_multi;
        let buddy_tapping = buddy.down && buddy.state == ContactState::Tap;
        let downs_close = me.initial.time.abs_diff(buddy.initial.time) < self.th.two_finger_tap_duration;
        let me_ok = self.tap_in_tolerance(me) && downs_close;
        let buddy_ok = self.tap_in_tolerance(buddy);
        let (p0, p1) = (me.initial_pos(), buddy.initial_pos());
        let time = me.current.time.max(buddy.current.time);

        match pending {
            Some(PendingMulti::Tap) if me_ok && buddy_ok => {
                self.resolve_waiting_tap(idx);
                let ev = GestureEvent::new(GestureKind::TwoFingerTap, p0.midpoint(p1), time)
                    .with_span(p0.distance(p1));
                self.destroy(idx);
                self.destroy(b);
                PairStep::Emit(ev)
            }
            Some(tag) => {
                debug!("slot {b} was waiting for a two-finger {tag:?}, tap does not match; dropping it");
                self.destroy(b);
                PairStep::Single
            }
            None if me_ok && buddy_tapping => {
                self.resolve_waiting_tap(idx);
                self.park(idx, PendingMulti::Tap);
                PairStep::Wait
            }
            None => PairStep::Single,
        }
    }

    pub(super) fn pair_on_pan_lift(&mut self, idx: usize, candidate: PendingMulti) -> PairStep {
        let Some((b, buddy)) = self.buddy(idx) else {
            return PairStep::Single;
        };
        let Some(me) = self.contact(idx) else {
            return PairStep::Single;
        };

        let pending = buddy.pending_multi;
        let buddy_panning = buddy.down && buddy.state == ContactState::Pan;

        match pending {
            Some(tag) if tag == candidate => {
                let mode = if candidate == PendingMulti::Swipe {
                    PairMode::Swipe
                } else {
                    PairMode::Release
                };
                let ev = classify_pair(me, buddy, mode);
                self.destroy(idx);
                self.destroy(b);
                PairStep::Emit(ev)
            }
            Some(tag) => {
                debug!("slot {b} waits for {tag:?}, slot {idx} resolved as {candidate:?}; classifying alone");
                self.destroy(b);
                PairStep::Single
            }
            None if buddy_panning => {
                self.park(idx, candidate);
                PairStep::Wait
            }
            None => PairStep::Single,
        }
    }

    fn park(&mut self, idx: usize, tag: PendingMulti) {
        if let Some(c) = self.contact_mut(idx) {
            c.pending_multi = Some(tag);
            c.down = false;
        }
    }

    /// Combined continuous event while both fingers pan; `Some(None)` when the
    /// pair already reported this frame.
    pub(super) fn two_finger_motion(&mut self, idx: usize) -> Option<Option<GestureEvent>> {
        let (_, buddy) = self.buddy(idx)?;
        if !(buddy.down && buddy.state == ContactState::Pan) {
            return None;
        }
        if buddy.pair_emitted_frame == Some(self.frame_seq) {
            return Some(None);
        }
        let me = self.contact(idx)?;
        let ev = classify_pair(me, buddy, PairMode::Motion);
        let frame = self.frame_seq;
        if let Some(me) = self.contact_mut(idx) {
            me.pair_emitted_frame = Some(frame);
        }
        Some(Some(ev))
    }

    /// Rotation around a held buddy, finalized on this (panning) contact's
    /// lift. The pivot is sunk into `Void` so its own lift stays silent.
    pub(super) fn try_rotate(&mut self, idx: usize) -> Option<GestureEvent> {
        let (b, pivot) = self.buddy(idx)?;
        if !(pivot.down && pivot.state == ContactState::Hold && !pivot.hold_panning) {
            return None;
        }
        let me = self.contact(idx)?;
        let center = pivot.initial_pos();
        let (start, end) = (me.initial_pos(), me.pos());
        let before = (start.y - center.y).atan2(start.x - center.x);
        let after = (end.y - center.y).atan2(end.x - center.x);
        let angle = normalize_degrees((after - before).to_degrees());
        let ev = GestureEvent::new(GestureKind::Rotate, center, me.current.time)
            .with_angle(angle)
            .with_direction(Some(if angle >= 0.0 { Direction::Cw } else { Direction::Ccw }))
            .with_distance(me.distance());

        let pivot = self.contact_mut(b)?;
        pivot.state = ContactState::Void;
        pivot.pending_multi = Some(PendingMulti::Rotate);
        self.destroy(idx);
        Some(ev)
    }

    /// A contact resolving on its own invalidates a buddy parked for a pair.
    pub(super) fn drop_waiting_buddy(&mut self, idx: usize) {
        let Some((b, buddy)) = self.buddy(idx) else {
            return;
        };
        if let Some(tag) = buddy.pending_multi {
            debug!("slot {b} was waiting for a two-finger {tag:?}; dropping it");
            self.destroy(b);
        }
    }
}

fn normalize_degrees(a: f64) -> f64 {
    let a = a % 360.0;
    if a > 180.0 {
        a - 360.0
    } else if a < -180.0 {
        a + 360.0
    } else {
        a
    }
}

/// Same compass direction on both fingers is a pan/swipe of the pair,
/// anything else is judged by whether the fingers converge or diverge.
fn classify_pair(a: &Contact, b: &Contact, mode: PairMode) -> GestureEvent {
    let (da, db) = (a.direction(), b.direction());
    let time = a.current.time.max(b.current.time);
    let mid_now = a.pos().midpoint(b.pos());

    if da.is_some() && da == db {
        let (kind, pos) = match mode {
            PairMode::Motion => (GestureKind::TwoFingerPan, mid_now),
            PairMode::Swipe => (
                GestureKind::TwoFingerSwipe,
                a.initial_pos().midpoint(b.initial_pos()),
            ),
            PairMode::Release => (GestureKind::TwoFingerPanRelease, mid_now),
        };
        return GestureEvent::new(kind, pos, time)
            .with_direction(da)
            .with_distance(a.distance() + b.distance());
    }

    let start_span = a.initial_pos().distance(b.initial_pos());
    let end_span = a.pos().distance(b.pos());
    let inward = end_span < start_span;
    let kind = match (mode, inward) {
        (PairMode::Motion, true) => GestureKind::InwardPan,
        (PairMode::Motion, false) => GestureKind::OutwardPan,
        (_, true) => GestureKind::Pinch,
        (_, false) => GestureKind::Spread,
    };
    GestureEvent::new(kind, mid_now, time)
        .with_direction(da.or(db).map(Direction::axis))
        .with_distance((start_span - end_span).abs())
        .with_span(end_span)
}
