//! Raw touch samples as delivered by the input layer, one frame per sync period.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub type Slot = i32;

/// Slots are indexed into fixed tables; anything outside is driver noise.
pub const MAX_SLOTS: usize = 10;

/// Tracking id reported for a finger-up.
pub const LIFT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub slot: Slot,
    pub tracking_id: i32,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "t_us", with = "micros")]
    pub time: Duration,
}

impl Sample {
    pub fn new(slot: Slot, tracking_id: i32, x: f64, y: f64, time: Duration) -> Self {
        Self {
            slot,
            tracking_id,
            x,
            y,
            time,
        }
    }

    pub fn is_lift(&self) -> bool {
        self.tracking_id == LIFT
    }

    pub fn slot_index(&self) -> Option<usize> {
        usize::try_from(self.slot).ok().filter(|&i| i < MAX_SLOTS)
    }
}

/// All samples belonging to one input sync period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TouchFrame {
    pub samples: Vec<Sample>,
}

impl TouchFrame {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Earliest timestamp in the frame.
    pub fn time(&self) -> Option<Duration> {
        self.samples.iter().map(|s| s.time).min()
    }

    /// One sample per slot, the last one wins, first-appearance order kept.
    pub fn deduplicated(&self) -> Vec<Sample> {
        let mut out: Vec<Sample> = Vec::with_capacity(self.samples.len());
        for s in &self.samples {
            match out.iter_mut().find(|o| o.slot == s.slot) {
                Some(existing) => *existing = *s,
                None => out.push(*s),
            }
        }
        out
    }
}

/// Time between two timestamps. A negative delta (clock jumped backwards)
/// reads as infinitely long so proximity tests fail instead of misfiring.
pub fn elapsed(from: Duration, to: Duration) -> Duration {
    to.checked_sub(from).unwrap_or(Duration::MAX)
}

pub(crate) mod micros {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_micros(u64::deserialize(de)?))
    }
}
