use anyhow::{Context, Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

use crate::frame::Slot;
use crate::rotate::{Orientation, Screen};

/// DPI the spatial base values are calibrated against.
pub const REFERENCE_DPI: f64 = 160.0;

const TAP_BOUNCE_DISTANCE_PX: f64 = 20.0;
const DOUBLE_TAP_DISTANCE_PX: f64 = 50.0;
const TWO_FINGER_TAP_REGION_PX: f64 = 20.0;
const PAN_THRESHOLD_PX: f64 = 35.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("timing.{0} must be a positive duration")]
    ZeroDuration(&'static str),
    #[error("screen.dpi must be positive, got {0}")]
    BadDpi(f64),
    #[error("screen.orientation must be one of 0, 90, 180, 270, got {0}")]
    BadOrientation(u16),
    #[error("screen size must be positive, got {0}x{1}")]
    BadScreenSize(f64, f64),
    #[error("screen.main_finger_slot {0} leaves no room for its pair")]
    BadMainSlot(Slot),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Meta {
    pub name: Option<String>,
}

/// User-facing durations, in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Timing {
    /// Tap bounce window; 0 disables bounce suppression.
    pub tap_interval_ms: u64,
    pub double_tap_interval_ms: u64,
    pub two_finger_tap_duration_ms: u64,
    pub hold_interval_ms: u64,
    pub swipe_interval_ms: u64,
    pub double_tap: bool,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tap_interval_ms: 0,
            double_tap_interval_ms: 300,
            two_finger_tap_duration_ms: 300,
            hold_interval_ms: 500,
            swipe_interval_ms: 900,
            double_tap: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScreenSettings {
    pub dpi: f64,
    /// Panel size in pixels, upright.
    pub width: f64,
    pub height: f64,
    pub orientation: u16,
    pub main_finger_slot: Slot,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            dpi: REFERENCE_DPI,
            width: 1072.0,
            height: 1448.0,
            orientation: 0,
            main_finger_slot: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GestureSettings {
    pub timing: Timing,
    pub screen: ScreenSettings,
}

impl GestureSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        for (name, v) in [
            ("double_tap_interval_ms", t.double_tap_interval_ms),
            ("two_finger_tap_duration_ms", t.two_finger_tap_duration_ms),
            ("hold_interval_ms", t.hold_interval_ms),
            ("swipe_interval_ms", t.swipe_interval_ms),
        ] {
            if v == 0 {
                return Err(ConfigError::ZeroDuration(name));
            }
        }
        let s = &self.screen;
        if !(s.dpi > 0.0) {
            return Err(ConfigError::BadDpi(s.dpi));
        }
        if !(s.width > 0.0 && s.height > 0.0) {
            return Err(ConfigError::BadScreenSize(s.width, s.height));
        }
        Orientation::try_from(s.orientation)?;
        if s.main_finger_slot < 0 || s.main_finger_slot as usize + 1 >= crate::frame::MAX_SLOTS {
            return Err(ConfigError::BadMainSlot(s.main_finger_slot));
        }
        Ok(())
    }

    pub fn screen(&self) -> Result<Screen, ConfigError> {
        Ok(Screen {
            width: self.screen.width,
            height: self.screen.height,
            orientation: Orientation::try_from(self.screen.orientation)?,
        })
    }
}

/// Recognizer thresholds, fixed for one engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub tap_interval: Duration,
    pub double_tap_interval: Duration,
    pub two_finger_tap_duration: Duration,
    pub hold_interval: Duration,
    pub swipe_interval: Duration,
    pub tap_bounce_distance: f64,
    pub double_tap_distance: f64,
    pub two_finger_tap_region: f64,
    pub pan_threshold: f64,
    pub multiswipe_threshold: f64,
    pub double_tap_enabled: bool,
}

impl Thresholds {
    pub fn derive(settings: &GestureSettings) -> Self {
        let t = &settings.timing;
        let scale = |px: f64| px * settings.screen.dpi / REFERENCE_DPI;
        let double_tap_distance = scale(DOUBLE_TAP_DISTANCE_PX);
        Self {
            tap_interval: Duration::from_millis(t.tap_interval_ms),
            double_tap_interval: Duration::from_millis(t.double_tap_interval_ms),
            two_finger_tap_duration: Duration::from_millis(t.two_finger_tap_duration_ms),
            hold_interval: Duration::from_millis(t.hold_interval_ms),
            swipe_interval: Duration::from_millis(t.swipe_interval_ms),
            tap_bounce_distance: scale(TAP_BOUNCE_DISTANCE_PX),
            double_tap_distance,
            two_finger_tap_region: scale(TWO_FINGER_TAP_REGION_PX),
            pan_threshold: scale(PAN_THRESHOLD_PX),
            multiswipe_threshold: double_tap_distance,
            double_tap_enabled: t.double_tap,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(flatten)]
    pub settings: GestureSettings,
}

#[derive(Debug, Clone)]
pub struct ConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("gesturectl"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        Self::open_at(config_dir()?)
    }

    /// Opens (and seeds, if empty) a config tree rooted at `cfgdir`.
    pub fn open_at(cfgdir: PathBuf) -> Result<Self> {
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)
            .with_context(|| format!("failed to create {}", profdir.display()))?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            fs::write(&active_ptr, b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn active_path(&self) -> PathBuf {
        self.profiles_dir.join(format!("{}.toml", self.active_name))
    }

    /// Re-reads the active profile; the last good one is kept on error.
    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.profiles_dir, &self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let devices: Vec<String> = crate::input::discover_multitouch()
            .into_iter()
            .map(|d| format!("{} ({})", d.name, d.path))
            .collect();
        serde_json::json!({
            "input_dir_readable": fs::read_dir("/dev/input").is_ok(),
            "input_group_member": check_in_input_group(),
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "devices": devices,
            "hints": {
                "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input"
            }
        })
    }
}

fn load_profile(profiles_dir: &Path, name: &str) -> Result<Profile> {
    let path = profiles_dir.join(format!("{name}.toml"));
    let txt = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let profile = parse_profile(&txt).with_context(|| format!("in {}", path.display()))?;
    Ok(profile)
}

pub fn parse_profile(txt: &str) -> Result<Profile> {
    let profile: Profile = toml::from_str(txt).map_err(|e| anyhow!("failed to parse: {e}"))?;
    profile.settings.validate()?;
    Ok(profile)
}

fn check_in_input_group() -> bool {
    let Ok(s) = fs::read_to_string("/etc/group") else {
        return false;
    };
    let user = whoami::username();
    s.lines()
        .filter(|line| line.starts_with("input:"))
        .any(|line| {
            line.split(':')
                .nth(3)
                .unwrap_or("")
                .split(',')
                .any(|u| u == user)
        })
}
