//! Gesture records handed to the dispatch layer.

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

// tan(30°) and tan(60°): boundaries between straight and diagonal buckets.
const TAN_30: f64 = 0.577_350_269;
const TAN_60: f64 = 1.732_050_808;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    Horizontal,
    Vertical,
    Diagonal,
    Cw,
    Ccw,
}

impl Direction {
    /// 8-way compass bucket of a screen-space delta (y grows downwards).
    pub fn from_delta(dx: f64, dy: f64) -> Option<Direction> {
        let (adx, ady) = (dx.abs(), dy.abs());
        if adx == 0.0 && ady == 0.0 {
            return None;
        }
        let dir = if ady < adx * TAN_30 {
            if dx > 0.0 { Direction::East } else { Direction::West }
        } else if ady > adx * TAN_60 {
            if dy > 0.0 { Direction::South } else { Direction::North }
        } else {
            match (dx > 0.0, dy > 0.0) {
                (true, true) => Direction::SouthEast,
                (true, false) => Direction::NorthEast,
                (false, true) => Direction::SouthWest,
                (false, false) => Direction::NorthWest,
            }
        };
        Some(dir)
    }

    /// Coarse axis used to report pinch and spread.
    pub fn axis(self) -> Direction {
        match self {
            Direction::East | Direction::West | Direction::Horizontal => Direction::Horizontal,
            Direction::North | Direction::South | Direction::Vertical => Direction::Vertical,
            _ => Direction::Diagonal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::NorthEast => "northeast",
            Direction::NorthWest => "northwest",
            Direction::SouthEast => "southeast",
            Direction::SouthWest => "southwest",
            Direction::Horizontal => "horizontal",
            Direction::Vertical => "vertical",
            Direction::Diagonal => "diagonal",
            Direction::Cw => "cw",
            Direction::Ccw => "ccw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Touch,
    Tap,
    DoubleTap,
    Hold,
    HoldRelease,
    Pan,
    PanRelease,
    HoldPan,
    Swipe,
    Multiswipe,
    TwoFingerTap,
    TwoFingerPan,
    TwoFingerPanRelease,
    TwoFingerSwipe,
    InwardPan,
    OutwardPan,
    Pinch,
    Spread,
    Rotate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub pos: Point,
    #[serde(rename = "t_us", serialize_with = "crate::frame::micros::serialize")]
    pub time: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiswipe: Option<Vec<Direction>>,
}

impl GestureEvent {
    pub fn new(kind: GestureKind, pos: Point, time: Duration) -> Self {
        Self {
            kind,
            pos,
            time,
            direction: None,
            distance: None,
            relative: None,
            angle: None,
            span: None,
            multiswipe: None,
        }
    }

    pub fn with_direction(mut self, direction: Option<Direction>) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn with_relative(mut self, relative: Point) -> Self {
        self.relative = Some(relative);
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn with_span(mut self, span: f64) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_multiswipe(mut self, path: Vec<Direction>) -> Self {
        self.multiswipe = Some(path);
        self
    }

    /// Space separated multiswipe path, e.g. `"east north"`.
    pub fn multiswipe_path(&self) -> Option<String> {
        self.multiswipe.as_ref().map(|legs| {
            legs.iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}
