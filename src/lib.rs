//! Multi-touch gesture recognition for Linux touch panels.

pub mod clock;
pub mod config;
pub mod event;
pub mod frame;
pub mod gestures;
pub mod input;
pub mod rotate;
pub mod runtime;
pub mod tracker;

pub use config::{ConfigError, GestureSettings};
pub use event::{Direction, GestureEvent, GestureKind, Point};
pub use frame::{Sample, TouchFrame};
pub use gestures::GestureEngine;
