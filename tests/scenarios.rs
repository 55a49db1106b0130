use std::time::Duration;

use gesturectl::config::GestureSettings;
use gesturectl::event::{Direction, GestureEvent, GestureKind, Point};
use gesturectl::frame::{LIFT, Sample, TouchFrame};
use gesturectl::gestures::GestureEngine;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn down(slot: i32, id: i32, x: f64, y: f64, t: u64) -> Sample {
    Sample::new(slot, id, x, y, ms(t))
}

fn up(slot: i32, x: f64, y: f64, t: u64) -> Sample {
    Sample::new(slot, LIFT, x, y, ms(t))
}

fn engine_with(tweak: impl FnOnce(&mut GestureSettings)) -> GestureEngine {
    let mut s = GestureSettings::default();
    tweak(&mut s);
    GestureEngine::new(&s).unwrap()
}

fn engine() -> GestureEngine {
    engine_with(|_| {})
}

/// Feeds frames in order, firing due timers before each one and draining
/// the rest at the end.
fn play(engine: &mut GestureEngine, frames: Vec<Vec<Sample>>) -> Vec<GestureEvent> {
    let mut out = Vec::new();
    for samples in frames {
        let frame = TouchFrame::new(samples);
        if let Some(t) = frame.time() {
            out.extend(engine.fire_timers(t));
        }
        out.extend(engine.feed_frame(&frame));
    }
    while let Some(deadline) = engine.next_deadline() {
        out.extend(engine.fire_timers(deadline));
    }
    out
}

fn kinds(events: &[GestureEvent]) -> Vec<GestureKind> {
    events.iter().map(|e| e.kind).collect()
}

fn count(events: &[GestureEvent], kind: GestureKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

#[test]
fn quick_stationary_touch_is_a_tap() {
    let mut e = engine_with(|s| s.timing.double_tap = false);
    let out = e.feed_frame(&TouchFrame::new(vec![down(0, 5, 100.0, 100.0, 0)]));
    assert_eq!(kinds(&out), vec![GestureKind::Touch]);
    assert_eq!(out[0].pos, Point::new(100.0, 100.0));

    assert!(e.feed_frame(&TouchFrame::new(vec![down(0, 5, 100.0, 100.0, 50)])).is_empty());
    assert_eq!(e.pending_timers(), 1);

    let out = e.feed_frame(&TouchFrame::new(vec![up(0, 100.0, 100.0, 80)]));
    assert_eq!(kinds(&out), vec![GestureKind::Tap]);
    assert_eq!(out[0].pos, Point::new(100.0, 100.0));
    assert!(e.fire_timers(ms(10_000)).is_empty());
}

#[test]
fn tap_is_deferred_while_double_tap_is_possible() {
    let mut e = engine();
    e.feed_frame(&TouchFrame::new(vec![down(0, 5, 100.0, 100.0, 0)]));
    assert!(e.feed_frame(&TouchFrame::new(vec![up(0, 100.0, 100.0, 80)])).is_empty());
    assert!(e.fire_timers(ms(379)).is_empty());

    let out = e.fire_timers(ms(380));
    assert_eq!(kinds(&out), vec![GestureKind::Tap]);
    assert_eq!(out[0].pos, Point::new(100.0, 100.0));
    assert_eq!(e.active_contacts(), 0);
}

#[test]
fn long_stationary_touch_is_a_hold() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 300.0, 300.0, 0)],
            vec![down(0, 1, 301.0, 300.0, 200)],
            vec![up(0, 301.0, 300.0, 700)],
        ],
    );
    assert_eq!(
        kinds(&out),
        vec![GestureKind::Touch, GestureKind::Hold, GestureKind::HoldRelease]
    );
    assert_eq!(out[1].time, ms(500));
    assert_eq!(count(&out, GestureKind::Tap), 0);
}

#[test]
fn lifting_cancels_the_hold_timer() {
    let mut e = engine_with(|s| s.timing.double_tap = false);
    let out = play(
        &mut e,
        vec![vec![down(0, 1, 300.0, 300.0, 0)], vec![up(0, 300.0, 300.0, 100)]],
    );
    assert_eq!(kinds(&out), vec![GestureKind::Touch, GestureKind::Tap]);
    assert_eq!(e.pending_timers(), 0);
    assert!(e.fire_timers(ms(60_000)).is_empty());
}

#[test]
fn two_close_taps_make_one_double_tap() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 100.0, 0)],
            vec![up(0, 100.0, 100.0, 60)],
            vec![down(0, 2, 110.0, 105.0, 150)],
            vec![up(0, 110.0, 105.0, 200)],
        ],
    );
    assert_eq!(count(&out, GestureKind::DoubleTap), 1);
    assert_eq!(count(&out, GestureKind::Tap), 0);
    let dt = out.iter().find(|ev| ev.kind == GestureKind::DoubleTap).unwrap();
    assert_eq!(dt.pos, Point::new(110.0, 105.0));
}

#[test]
fn two_distant_taps_stay_single() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 100.0, 0)],
            vec![up(0, 100.0, 100.0, 60)],
            vec![down(0, 2, 400.0, 400.0, 150)],
            vec![up(0, 400.0, 400.0, 200)],
        ],
    );
    let taps: Vec<Point> = out
        .iter()
        .filter(|ev| ev.kind == GestureKind::Tap)
        .map(|ev| ev.pos)
        .collect();
    assert_eq!(taps, vec![Point::new(100.0, 100.0), Point::new(400.0, 400.0)]);
    assert_eq!(count(&out, GestureKind::DoubleTap), 0);
}

#[test]
fn two_slow_taps_stay_single() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 100.0, 0)],
            vec![up(0, 100.0, 100.0, 60)],
            vec![down(0, 2, 100.0, 100.0, 800)],
            vec![up(0, 100.0, 100.0, 850)],
        ],
    );
    assert_eq!(count(&out, GestureKind::Tap), 2);
    assert_eq!(count(&out, GestureKind::DoubleTap), 0);
}

#[test]
fn bouncing_second_touch_is_swallowed() {
    let mut e = engine_with(|s| {
        s.timing.double_tap = false;
        s.timing.tap_interval_ms = 100;
    });
    let first = play(
        &mut e,
        vec![vec![down(0, 1, 100.0, 100.0, 0)], vec![up(0, 100.0, 100.0, 30)]],
    );
    assert_eq!(kinds(&first), vec![GestureKind::Touch, GestureKind::Tap]);

    let second = play(
        &mut e,
        vec![vec![down(0, 2, 105.0, 100.0, 60)], vec![up(0, 105.0, 100.0, 90)]],
    );
    assert!(second.is_empty(), "bounce produced {:?}", kinds(&second));
    assert_eq!(e.active_contacts(), 0);
}

#[test]
fn bounce_detection_is_off_by_default() {
    let mut e = engine_with(|s| s.timing.double_tap = false);
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 100.0, 0)],
            vec![up(0, 100.0, 100.0, 30)],
            vec![down(0, 2, 105.0, 100.0, 60)],
            vec![up(0, 105.0, 100.0, 90)],
        ],
    );
    assert_eq!(count(&out, GestureKind::Tap), 2);
}

#[test]
fn two_finger_tap_reports_midpoint_and_span() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 200.0, 0), down(1, 2, 200.0, 200.0, 10)],
            vec![up(0, 100.0, 200.0, 100), up(1, 200.0, 200.0, 110)],
        ],
    );
    assert_eq!(
        kinds(&out),
        vec![GestureKind::Touch, GestureKind::Touch, GestureKind::TwoFingerTap]
    );
    let tft = &out[2];
    assert_eq!(tft.pos, Point::new(150.0, 200.0));
    assert_eq!(tft.span, Some(100.0));
    assert_eq!(e.active_contacts(), 0);
}

#[test]
fn two_finger_tap_with_staggered_lifts() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(1, 2, 200.0, 200.0, 0)],
            vec![down(0, 1, 100.0, 200.0, 20)],
            vec![up(1, 200.0, 200.0, 90)],
            vec![up(0, 100.0, 200.0, 150)],
        ],
    );
    assert_eq!(count(&out, GestureKind::TwoFingerTap), 1);
    assert_eq!(count(&out, GestureKind::Tap), 0);
}

#[test]
fn parallel_swipe_is_one_two_finger_swipe() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 800.0, 0), down(1, 2, 300.0, 800.0, 0)],
            vec![down(0, 1, 100.0, 600.0, 50), down(1, 2, 300.0, 600.0, 50)],
            vec![down(0, 1, 100.0, 400.0, 100), down(1, 2, 300.0, 400.0, 100)],
            vec![up(0, 100.0, 400.0, 200), up(1, 300.0, 400.0, 200)],
        ],
    );
    assert_eq!(count(&out, GestureKind::TwoFingerSwipe), 1);
    assert_eq!(count(&out, GestureKind::Swipe), 0);
    let last = out.last().unwrap();
    assert_eq!(last.kind, GestureKind::TwoFingerSwipe);
    assert_eq!(last.direction, Some(Direction::North));
    assert_eq!(last.distance, Some(800.0));
    assert_eq!(last.pos, Point::new(200.0, 800.0));
}

#[test]
fn parallel_pan_reports_once_per_frame() {
    let mut e = engine();
    play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 800.0, 0), down(1, 2, 300.0, 800.0, 0)],
            vec![down(0, 1, 100.0, 600.0, 50), down(1, 2, 300.0, 600.0, 50)],
        ],
    );
    let out = e.feed_frame(&TouchFrame::new(vec![
        down(1, 2, 300.0, 400.0, 100),
        down(0, 1, 100.0, 400.0, 100),
    ]));
    assert_eq!(kinds(&out), vec![GestureKind::TwoFingerPan]);
}

#[test]
fn converging_fingers_pinch() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 500.0, 0), down(1, 2, 500.0, 500.0, 0)],
            vec![down(0, 1, 200.0, 500.0, 50), down(1, 2, 400.0, 500.0, 50)],
            vec![down(0, 1, 250.0, 500.0, 100), down(1, 2, 350.0, 500.0, 100)],
            vec![up(0, 250.0, 500.0, 150), up(1, 350.0, 500.0, 150)],
        ],
    );
    assert!(count(&out, GestureKind::InwardPan) >= 1);
    assert_eq!(count(&out, GestureKind::OutwardPan), 0);
    assert_eq!(count(&out, GestureKind::Spread), 0);
    let last = out.last().unwrap();
    assert_eq!(last.kind, GestureKind::Pinch);
    assert_eq!(last.direction, Some(Direction::Horizontal));
    assert_eq!(last.span, Some(100.0));
}

#[test]
fn diverging_fingers_spread() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 500.0, 600.0, 0), down(1, 2, 500.0, 700.0, 0)],
            vec![down(0, 1, 500.0, 500.0, 50), down(1, 2, 500.0, 800.0, 50)],
            vec![down(0, 1, 500.0, 400.0, 100), down(1, 2, 500.0, 900.0, 100)],
            vec![up(0, 500.0, 400.0, 150), up(1, 500.0, 900.0, 150)],
        ],
    );
    assert!(count(&out, GestureKind::OutwardPan) >= 1);
    assert_eq!(count(&out, GestureKind::InwardPan), 0);
    let last = out.last().unwrap();
    assert_eq!(last.kind, GestureKind::Spread);
    assert_eq!(last.direction, Some(Direction::Vertical));
}

#[test]
fn rotation_around_held_finger_has_no_trailing_release() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(1, 2, 500.0, 500.0, 0)],
            vec![down(1, 2, 500.0, 500.0, 550)],
            vec![down(0, 1, 700.0, 500.0, 600)],
            vec![down(0, 1, 500.0, 700.0, 650)],
            vec![up(0, 500.0, 700.0, 700)],
            vec![up(1, 500.0, 500.0, 800)],
        ],
    );
    assert_eq!(count(&out, GestureKind::Rotate), 1);
    assert_eq!(count(&out, GestureKind::HoldRelease), 0);
    assert_eq!(out.last().map(|ev| ev.kind), Some(GestureKind::Rotate));

    let rot = out.last().unwrap();
    assert_eq!(rot.pos, Point::new(500.0, 500.0));
    assert_eq!(rot.direction, Some(Direction::Cw));
    assert!((rot.angle.unwrap() - 90.0).abs() < 1e-9);
    assert_eq!(e.active_contacts(), 0);
}

#[test]
fn multiswipe_records_each_leg() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 500.0, 0)],
            vec![down(0, 1, 300.0, 500.0, 50)],
            vec![down(0, 1, 300.0, 300.0, 100)],
            vec![up(0, 300.0, 300.0, 150)],
        ],
    );
    let last = out.last().unwrap();
    assert_eq!(last.kind, GestureKind::Multiswipe);
    assert_eq!(last.multiswipe_path().as_deref(), Some("east north"));
    assert_eq!(last.direction, Some(Direction::NorthEast));
    assert_eq!(last.pos, Point::new(100.0, 500.0));
}

#[test]
fn straight_swipe_is_not_a_multiswipe() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 500.0, 0)],
            vec![down(0, 1, 300.0, 510.0, 50)],
            vec![up(0, 500.0, 505.0, 100)],
        ],
    );
    let last = out.last().unwrap();
    assert_eq!(last.kind, GestureKind::Swipe);
    assert_eq!(last.direction, Some(Direction::East));
    assert!(last.multiswipe.is_none());
}

fn mixed_session(orientation: u16) -> Vec<GestureEvent> {
    let mut e = engine_with(|s| s.screen.orientation = orientation);
    play(
        &mut e,
        vec![
            // swipe
            vec![down(0, 1, 100.0, 800.0, 0)],
            vec![down(0, 1, 100.0, 600.0, 50)],
            vec![up(0, 100.0, 400.0, 100)],
            // double tap
            vec![down(0, 2, 500.0, 500.0, 1000)],
            vec![up(0, 500.0, 500.0, 1050)],
            vec![down(0, 3, 505.0, 500.0, 1150)],
            vec![up(0, 505.0, 500.0, 1200)],
            // two-finger swipe
            vec![down(0, 4, 100.0, 800.0, 2000), down(1, 5, 300.0, 800.0, 2000)],
            vec![down(0, 4, 300.0, 800.0, 2050), down(1, 5, 500.0, 800.0, 2050)],
            vec![up(0, 300.0, 800.0, 2100), up(1, 500.0, 800.0, 2100)],
        ],
    )
}

#[test]
fn orientation_only_remaps_fields() {
    let upright = mixed_session(0);
    assert_eq!(count(&upright, GestureKind::Swipe), 1);
    assert_eq!(count(&upright, GestureKind::DoubleTap), 1);
    assert_eq!(count(&upright, GestureKind::TwoFingerSwipe), 1);

    for deg in [90, 180, 270] {
        let rotated = mixed_session(deg);
        assert_eq!(kinds(&rotated), kinds(&upright), "orientation {deg}");
    }

    let swipe_dir = |events: &[GestureEvent]| {
        events
            .iter()
            .find(|ev| ev.kind == GestureKind::Swipe)
            .and_then(|ev| ev.direction)
    };
    assert_eq!(swipe_dir(&upright), Some(Direction::North));
    assert_eq!(swipe_dir(&mixed_session(90)), Some(Direction::East));
    assert_eq!(swipe_dir(&mixed_session(180)), Some(Direction::South));
    assert_eq!(swipe_dir(&mixed_session(270)), Some(Direction::West));
}

#[test]
fn missed_lift_recovers_on_new_touch() {
    let mut e = engine_with(|s| s.timing.double_tap = false);
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 100.0, 0)],
            vec![down(0, 2, 600.0, 600.0, 100)],
            vec![up(0, 600.0, 600.0, 150)],
        ],
    );
    assert_eq!(
        kinds(&out),
        vec![GestureKind::Touch, GestureKind::Touch, GestureKind::Tap]
    );
    assert_eq!(out[2].pos, Point::new(600.0, 600.0));
}

#[test]
fn waiting_tap_survives_a_following_swipe() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 100.0, 0)],
            vec![up(0, 100.0, 100.0, 50)],
            vec![down(0, 2, 100.0, 300.0, 100)],
            vec![down(0, 2, 400.0, 300.0, 150)],
            vec![up(0, 400.0, 300.0, 200)],
        ],
    );
    assert_eq!(
        kinds(&out),
        vec![
            GestureKind::Touch,
            GestureKind::Touch,
            GestureKind::Tap,
            GestureKind::Pan,
            GestureKind::Swipe
        ]
    );
    assert_eq!(out[2].pos, Point::new(100.0, 100.0));
    assert_eq!(out[2].time, ms(50));
    assert_eq!(e.pending_timers(), 0);
}

#[test]
fn waiting_tap_survives_a_following_two_finger_tap() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 100.0, 0)],
            vec![up(0, 100.0, 100.0, 50)],
            vec![down(0, 2, 100.0, 100.0, 100), down(1, 3, 200.0, 100.0, 100)],
            vec![up(0, 100.0, 100.0, 150), up(1, 200.0, 100.0, 150)],
        ],
    );
    assert_eq!(
        kinds(&out),
        vec![
            GestureKind::Touch,
            GestureKind::Touch,
            GestureKind::Touch,
            GestureKind::Tap,
            GestureKind::TwoFingerTap
        ]
    );
    assert_eq!(out[3].pos, Point::new(100.0, 100.0));
    assert_eq!(count(&out, GestureKind::DoubleTap), 0);
}

#[test]
fn waiting_tap_survives_a_short_hold() {
    let mut e = engine_with(|s| s.timing.hold_interval_ms = 100);
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 100.0, 0)],
            vec![up(0, 100.0, 100.0, 50)],
            vec![down(0, 2, 100.0, 100.0, 80)],
            vec![down(0, 2, 100.0, 100.0, 200)],
            vec![up(0, 100.0, 100.0, 250)],
        ],
    );
    assert_eq!(
        kinds(&out),
        vec![
            GestureKind::Touch,
            GestureKind::Touch,
            GestureKind::Tap,
            GestureKind::Hold,
            GestureKind::Hold,
            GestureKind::HoldRelease
        ]
    );
}

#[test]
fn incompatible_pair_falls_back_to_single_release() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 800.0, 0), down(1, 2, 300.0, 800.0, 0)],
            vec![down(0, 1, 100.0, 600.0, 50), down(1, 2, 300.0, 600.0, 50)],
            // slot 0 lifts quickly and waits for a two-finger swipe
            vec![up(0, 100.0, 600.0, 100)],
            vec![down(1, 2, 300.0, 500.0, 500)],
            // slot 1 lifts too late for a swipe
            vec![up(1, 300.0, 500.0, 1000)],
        ],
    );
    assert_eq!(
        kinds(&out),
        vec![
            GestureKind::Touch,
            GestureKind::Touch,
            GestureKind::Pan,
            GestureKind::TwoFingerPan,
            GestureKind::Pan,
            GestureKind::PanRelease
        ]
    );
    assert_eq!(out[5].pos, Point::new(300.0, 500.0));
    assert_eq!(e.active_contacts(), 0);
    assert_eq!(e.pending_timers(), 0);
}

#[test]
fn repeated_lift_is_dropped_without_losing_the_tap() {
    let mut e = engine();
    let first = play(
        &mut e,
        vec![vec![down(0, 1, 100.0, 100.0, 0)], vec![up(0, 100.0, 100.0, 50)]],
    );
    assert_eq!(kinds(&first), vec![GestureKind::Touch, GestureKind::Tap]);

    let mut e = engine();
    e.feed_frame(&TouchFrame::new(vec![down(0, 1, 100.0, 100.0, 0)]));
    assert!(e.feed_frame(&TouchFrame::new(vec![up(0, 100.0, 100.0, 50)])).is_empty());
    let out = e.feed_frame(&TouchFrame::new(vec![up(0, 100.0, 100.0, 60)]));
    assert_eq!(kinds(&out), vec![GestureKind::Tap]);
    assert_eq!(e.active_contacts(), 0);
    assert_eq!(e.pending_timers(), 0);
    assert!(e.fire_timers(ms(10_000)).is_empty());
}

#[test]
fn out_of_range_slots_are_ignored() {
    let mut e = engine();
    let out = e.feed_frame(&TouchFrame::new(vec![
        down(12, 1, 100.0, 100.0, 0),
        down(-1, 2, 100.0, 100.0, 0),
        down(0, 3, 300.0, 300.0, 0),
    ]));
    assert_eq!(kinds(&out), vec![GestureKind::Touch]);
    assert_eq!(out[0].pos, Point::new(300.0, 300.0));
    assert_eq!(e.active_contacts(), 1);
    assert!(e.feed_frame(&TouchFrame::new(vec![up(12, 100.0, 100.0, 10)])).is_empty());
}

#[test]
fn backwards_clock_between_taps_gives_two_taps() {
    let mut e = engine();
    let out = play(
        &mut e,
        vec![
            vec![down(0, 1, 100.0, 100.0, 1000)],
            vec![up(0, 100.0, 100.0, 1050)],
            vec![down(0, 2, 100.0, 100.0, 500)],
            vec![up(0, 100.0, 100.0, 550)],
        ],
    );
    assert_eq!(count(&out, GestureKind::Tap), 2);
    assert_eq!(count(&out, GestureKind::DoubleTap), 0);
}
