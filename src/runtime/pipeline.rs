use anyhow::{Result, anyhow};
use log::{error, info, warn};
use notify::{RecursiveMode, Watcher};
use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc,
};
use std::{thread, time::Duration};

use super::sink::EventSink;
use crate::config::ConfigState;
use crate::gestures::GestureEngine;
use crate::input;
use crate::tracker::Tracker;

const IDLE_SLEEP: Duration = Duration::from_millis(4);

/// Live loop: reads the device, fires due timers and writes events to
/// `sink` until SIGINT/SIGTERM. SIGUSR1 acts as a resume notification;
/// edits to the active profile are picked up on the fly.
pub fn run_listen(device: Option<&str>, mut cfg: ConfigState, sink: &mut dyn EventSink) -> Result<()> {
    let path = match device {
        Some(p) => p.to_string(),
        None => input::discover_multitouch()
            .into_iter()
            .next()
            .map(|d| d.path)
            .ok_or_else(|| anyhow!("no multitouch device found; try `gesturectl doctor`"))?,
    };

    let settings = &cfg.profile.settings;
    let mut tracker = Tracker::new(settings.screen.width, settings.screen.height);
    let mut dev = input::open_touch_device(&path, &mut tracker)?;
    let mut engine = GestureEngine::new(settings)?;
    info!("listening on {path} with profile '{}'", cfg.active_name);

    let stop = Arc::new(AtomicBool::new(false));
    let resumed = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&stop))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&stop))?;
    signal_hook::flag::register(SIGUSR1, Arc::clone(&resumed))?;

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(&cfg.profiles_dir, RecursiveMode::NonRecursive)?;

    while !stop.load(Ordering::Relaxed) {
        if resumed.swap(false, Ordering::Relaxed) {
            info!("resume signalled; dropping contacts and recalibrating the input clock");
            engine.reset();
            engine.reset_clock_source();
        }

        let active = cfg.active_path();
        let touched = rx
            .try_iter()
            .filter_map(|res: notify::Result<notify::Event>| res.ok())
            .filter(|ev| ev.paths.iter().any(|p| p == &active))
            .count();
        if touched > 0 {
            reload(&mut cfg, &mut engine, &mut tracker);
        }

        if let Some(now) = engine.now() {
            for ev in engine.fire_timers(now) {
                sink.emit(&ev)?;
            }
        }

        let mut any_event = false;
        match dev.fetch_events() {
            Ok(events) => {
                for ev in events {
                    any_event = true;
                    if let Some(frame) = input::apply_event(&mut tracker, &ev) {
                        for g in engine.feed_frame(&frame) {
                            sink.emit(&g)?;
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(anyhow!("reading {path}: {e}")),
        }

        if !any_event {
            thread::sleep(IDLE_SLEEP);
        }
    }

    info!("stopping");
    Ok(())
}

/// Applies an edited profile; the running one is kept if it does not load.
fn reload(cfg: &mut ConfigState, engine: &mut GestureEngine, tracker: &mut Tracker) {
    if let Err(e) = cfg.reload() {
        warn!("profile reload failed, keeping last good: {e:#}");
        return;
    }
    let settings = &cfg.profile.settings;
    match engine.reconfigure(settings) {
        Ok(()) => {
            tracker.set_screen_size(settings.screen.width, settings.screen.height);
            info!("reloaded profile '{}'", cfg.active_name);
        }
        Err(e) => error!("rejected profile '{}': {e}", cfg.active_name),
    }
}
