//! Works out which kernel clock the input timestamps were taken from, so
//! timer deadlines expressed in event time can be compared against "now".

use log::{info, warn};
use nix::time::{ClockId, clock_gettime};
use std::time::{Duration, Instant};

/// Accepted distance between the first event stamp and a live clock reading.
pub const MATCH_TOLERANCE: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    Realtime,
    Monotonic,
    Boottime,
}

impl ClockSource {
    pub const ALL: [ClockSource; 3] = [
        ClockSource::Realtime,
        ClockSource::Monotonic,
        ClockSource::Boottime,
    ];
}

/// Reads the current value of a candidate clock base.
pub trait ClockReader: Send {
    fn read(&self, source: ClockSource) -> Option<Duration>;
}

/// `clock_gettime(2)` on the three clocks evdev can stamp with.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClocks;

impl ClockReader for SystemClocks {
    fn read(&self, source: ClockSource) -> Option<Duration> {
        let id = match source {
            ClockSource::Realtime => ClockId::CLOCK_REALTIME,
            ClockSource::Monotonic => ClockId::CLOCK_MONOTONIC,
            ClockSource::Boottime => ClockId::CLOCK_BOOTTIME,
        };
        let ts = clock_gettime(id).ok()?;
        let secs = u64::try_from(ts.tv_sec()).ok()?;
        let nanos = u32::try_from(ts.tv_nsec()).ok()?;
        Some(Duration::new(secs, nanos))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calibration {
    Uncalibrated,
    Detected(ClockSource),
    Inconclusive,
}

pub struct ClockCalibrator {
    reader: Box<dyn ClockReader>,
    state: Calibration,
    // last event stamp and when we saw it, for extrapolating without a source
    anchor: Option<(Duration, Instant)>,
}

impl std::fmt::Debug for ClockCalibrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockCalibrator")
            .field("state", &self.state)
            .field("anchor", &self.anchor)
            .finish()
    }
}

impl Default for ClockCalibrator {
    fn default() -> Self {
        Self::new(Box::new(SystemClocks))
    }
}

impl ClockCalibrator {
    pub fn new(reader: Box<dyn ClockReader>) -> Self {
        Self {
            reader,
            state: Calibration::Uncalibrated,
            anchor: None,
        }
    }

    pub fn calibration(&self) -> Calibration {
        self.state
    }

    /// Feeds an event timestamp; the first one after a reset triggers calibration.
    pub fn observe(&mut self, stamp: Duration) {
        if self.state == Calibration::Uncalibrated {
            self.state = self.calibrate(stamp);
        }
        self.anchor = Some((stamp, Instant::now()));
    }

    fn calibrate(&self, stamp: Duration) -> Calibration {
        let best = ClockSource::ALL
            .iter()
            .filter_map(|&src| {
                let now = self.reader.read(src)?;
                Some((src, now.abs_diff(stamp)))
            })
            .filter(|&(_, diff)| diff <= MATCH_TOLERANCE)
            .min_by_key(|&(_, diff)| diff);
        match best {
            Some((src, diff)) => {
                info!("input timestamps use {src:?} (off by {diff:?})");
                Calibration::Detected(src)
            }
            None => {
                warn!("could not match input timestamp {stamp:?} to a known clock; timers fall back to extrapolation");
                Calibration::Inconclusive
            }
        }
    }

    /// Forget the cached source, e.g. after a suspend/resume cycle where
    /// MONOTONIC and BOOTTIME diverge.
    pub fn reset(&mut self) {
        self.state = Calibration::Uncalibrated;
        self.anchor = None;
    }

    /// Current time in the event clock domain, if it can be told.
    pub fn now(&self) -> Option<Duration> {
        if let Calibration::Detected(src) = self.state {
            if let Some(t) = self.reader.read(src) {
                return Some(t);
            }
        }
        self.anchor.map(|(stamp, seen)| stamp + seen.elapsed())
    }
}
