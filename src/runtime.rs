//! Drives a [`GestureEngine`](crate::gestures::GestureEngine) from a live
//! device or a recorded trace and hands the events to a sink.

mod pipeline;
mod replay;
mod sink;

pub use pipeline::run_listen;
pub use replay::{replay, replay_file};
pub use sink::{EventSink, JsonLinesSink};
