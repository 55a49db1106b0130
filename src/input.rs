//! Input device discovery and evdev event translation (evdev 0.13.2 compatible)

use anyhow::{Context, Result};
use evdev::{AbsoluteAxisCode, Device, EventType, InputEvent, SynchronizationCode};
use std::time::{Duration, UNIX_EPOCH};

use crate::frame::TouchFrame;
use crate::tracker::Tracker;

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
}

pub fn discover_multitouch() -> Vec<DeviceInfo> {
    let mut out = vec![];
    if let Ok(rd) = std::fs::read_dir("/dev/input") {
        for e in rd.flatten() {
            let p = e.path();
            let is_event_node = p
                .file_name()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.starts_with("event"));
            if !is_event_node {
                continue;
            }
            if let Ok(dev) = Device::open(&p) {
                if is_multitouch(&dev) {
                    out.push(DeviceInfo {
                        path: p.display().to_string(),
                        name: dev.name().unwrap_or("unknown").to_string(),
                    });
                }
            }
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

fn is_multitouch(dev: &Device) -> bool {
    dev.supported_events().contains(EventType::ABSOLUTE)
        && dev.supported_absolute_axes().is_some_and(|a| {
            a.contains(AbsoluteAxisCode::ABS_MT_SLOT)
                && a.contains(AbsoluteAxisCode::ABS_MT_TRACKING_ID)
                && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_X)
                && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_Y)
        })
}

/// Opens a touch device in non-blocking mode and points `tracker` at its
/// coordinate ranges.
pub fn open_touch_device(path: &str, tracker: &mut Tracker) -> Result<Device> {
    let mut dev = Device::open(path).with_context(|| format!("failed to open {path}"))?;
    if !is_multitouch(&dev) {
        anyhow::bail!("{path} is not a multitouch (type B) device");
    }
    dev.set_nonblocking(true)?;

    let (mut x, mut y) = ((0, 4096), (0, 4096));
    for (axis, info) in dev.get_absinfo()? {
        if axis == AbsoluteAxisCode::ABS_MT_POSITION_X {
            x = (info.minimum(), info.maximum());
        } else if axis == AbsoluteAxisCode::ABS_MT_POSITION_Y {
            y = (info.minimum(), info.maximum());
        }
    }
    tracker.set_ranges(x.0, x.1, y.0, y.1);
    log::info!(
        "opened {} ({path}); x {}..{}, y {}..{}",
        dev.name().unwrap_or("unknown"),
        x.0,
        x.1,
        y.0,
        y.1
    );
    Ok(dev)
}

/// Kernel stamp of an event as a plain duration in its clock domain.
pub fn event_time(ev: &InputEvent) -> Duration {
    ev.timestamp()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}

/// Feeds one evdev event to the tracker; returns a frame on `SYN_REPORT`.
pub fn apply_event(tracker: &mut Tracker, ev: &InputEvent) -> Option<TouchFrame> {
    if ev.event_type() == EventType::ABSOLUTE {
        match ev.code() {
            c if c == AbsoluteAxisCode::ABS_MT_SLOT.0 => tracker.on_slot(ev.value()),
            c if c == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 => tracker.on_tracking_id(ev.value()),
            c if c == AbsoluteAxisCode::ABS_MT_POSITION_X.0 => tracker.on_pos_x(ev.value()),
            c if c == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 => tracker.on_pos_y(ev.value()),
            _ => {}
        }
        None
    } else if ev.event_type() == EventType::SYNCHRONIZATION
        && ev.code() == SynchronizationCode::SYN_REPORT.0
    {
        Some(tracker.on_syn_report(event_time(ev)))
    } else {
        None
    }
}
