//! Maps events classified in the panel's native frame into the frame the
//! user currently sees.

use crate::config::ConfigError;
use crate::event::{Direction, GestureEvent, Point};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Upright,
    /// Content turned 90° clockwise relative to the panel.
    Clockwise,
    UpsideDown,
    CounterClockwise,
}

impl TryFrom<u16> for Orientation {
    type Error = ConfigError;

    fn try_from(deg: u16) -> Result<Self, Self::Error> {
        match deg {
            0 => Ok(Orientation::Upright),
            90 => Ok(Orientation::Clockwise),
            180 => Ok(Orientation::UpsideDown),
            270 => Ok(Orientation::CounterClockwise),
            other => Err(ConfigError::BadOrientation(other)),
        }
    }
}

/// Panel size in its native (upright) frame plus the current orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    pub width: f64,
    pub height: f64,
    pub orientation: Orientation,
}

use Direction::*;

const COMPASS: [Direction; 8] = [
    North, South, East, West, NorthEast, NorthWest, SouthEast, SouthWest,
];
const TURN_90: [Direction; 8] = [
    East, West, South, North, SouthEast, NorthEast, SouthWest, NorthWest,
];
const TURN_180: [Direction; 8] = [
    South, North, West, East, SouthWest, SouthEast, NorthWest, NorthEast,
];
const TURN_270: [Direction; 8] = [
    West, East, North, South, NorthWest, SouthWest, NorthEast, SouthEast,
];

fn translate(table: &[Direction; 8], quarter_turn: bool, d: Direction) -> Direction {
    match COMPASS.iter().position(|&c| c == d) {
        Some(i) => table[i],
        // Axes swap on quarter turns, rotation sense never changes.
        None if quarter_turn => match d {
            Horizontal => Vertical,
            Vertical => Horizontal,
            other => other,
        },
        None => d,
    }
}

pub fn rotate_direction(d: Direction, orientation: Orientation) -> Direction {
    match orientation {
        Orientation::Upright => d,
        Orientation::Clockwise => translate(&TURN_90, true, d),
        Orientation::UpsideDown => translate(&TURN_180, false, d),
        Orientation::CounterClockwise => translate(&TURN_270, true, d),
    }
}

fn rotate_point(p: Point, screen: &Screen) -> Point {
    match screen.orientation {
        Orientation::Upright => p,
        Orientation::Clockwise => Point::new(screen.height - p.y, p.x),
        Orientation::UpsideDown => Point::new(screen.width - p.x, screen.height - p.y),
        Orientation::CounterClockwise => Point::new(p.y, screen.width - p.x),
    }
}

fn rotate_vector(v: Point, orientation: Orientation) -> Point {
    match orientation {
        Orientation::Upright => v,
        Orientation::Clockwise => Point::new(-v.y, v.x),
        Orientation::UpsideDown => Point::new(-v.x, -v.y),
        Orientation::CounterClockwise => Point::new(v.y, -v.x),
    }
}

/// Rewrites `pos`, `relative`, `direction` and every multiswipe leg.
pub fn rotate_event(mut ev: GestureEvent, screen: &Screen) -> GestureEvent {
    let o = screen.orientation;
    if o == Orientation::Upright {
        return ev;
    }
    ev.pos = rotate_point(ev.pos, screen);
    ev.relative = ev.relative.map(|r| rotate_vector(r, o));
    ev.direction = ev.direction.map(|d| rotate_direction(d, o));
    if let Some(legs) = ev.multiswipe.as_mut() {
        for leg in legs.iter_mut() {
            *leg = rotate_direction(*leg, o);
        }
    }
    ev
}
