use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::sink::EventSink;
use crate::frame::TouchFrame;
use crate::gestures::GestureEngine;

/// Replays a JSON-lines trace, one [`TouchFrame`] per line. Time is taken
/// from the samples: timers due before a frame fire ahead of it, and the
/// ones still pending after the last frame fire at their deadlines.
/// Blank lines and `#` comments are skipped. Returns the number of events.
pub fn replay<R: BufRead>(
    engine: &mut GestureEngine,
    input: R,
    sink: &mut dyn EventSink,
) -> Result<usize> {
    let mut count = 0usize;
    let mut frames = 0usize;

    for (n, line) in input.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let frame: TouchFrame =
            serde_json::from_str(line).with_context(|| format!("trace line {}", n + 1))?;
        frames += 1;

        if let Some(t) = frame.time() {
            for ev in engine.fire_timers(t) {
                sink.emit(&ev)?;
                count += 1;
            }
        }
        for ev in engine.feed_frame(&frame) {
            sink.emit(&ev)?;
            count += 1;
        }
    }

    while let Some(deadline) = engine.next_deadline() {
        debug!("draining timer due at {deadline:?}");
        for ev in engine.fire_timers(deadline) {
            sink.emit(&ev)?;
            count += 1;
        }
    }

    info!("replayed {frames} frames, {count} events");
    Ok(count)
}

pub fn replay_file(engine: &mut GestureEngine, path: &Path, sink: &mut dyn EventSink) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    replay(engine, BufReader::new(file), sink)
}
