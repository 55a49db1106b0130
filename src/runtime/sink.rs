use anyhow::Result;
use std::io::Write;

use crate::event::GestureEvent;

pub trait EventSink {
    fn emit(&mut self, ev: &GestureEvent) -> Result<()>;
}

/// One JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn emit(&mut self, ev: &GestureEvent) -> Result<()> {
        serde_json::to_writer(&mut self.out, ev)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl EventSink for Vec<GestureEvent> {
    fn emit(&mut self, ev: &GestureEvent) -> Result<()> {
        self.push(ev.clone());
        Ok(())
    }
}
