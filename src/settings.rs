//! Demo settings loaded from TOML
//!
//! Settings are read from `~/.config/minigame/settings.toml`, or from a path
//! given on the command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use minigame_core::LoopConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All demo settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Fixed-timestep parameters handed to the game loop
    #[serde(rename = "loop")]
    pub timing: LoopConfig,
    pub display: DisplaySettings,
    pub arena: ArenaSettings,
}

impl DemoSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("minigame"))
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from the user config directory, or return defaults if
    /// the file is missing or unreadable
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{:#}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit file. Unlike [`load`](Self::load), a
    /// missing or malformed file is an error.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {:?}", path))?;
        settings
            .timing
            .validate()
            .with_context(|| format!("Invalid loop settings in {:?}", path))?;
        settings
            .display
            .validate()
            .with_context(|| format!("Invalid display settings in {:?}", path))?;
        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }
}

/// Simulated display the headless demo renders to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Display refresh rate in Hz
    pub refresh_rate: f64,
    /// How long to run, in seconds of display time
    pub duration_secs: f64,
    /// When the display goes hidden, in seconds from the start (none = never)
    pub hide_at_secs: Option<f64>,
    /// How long it stays hidden before the player comes back
    pub hidden_for_secs: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            refresh_rate: 144.0,
            duration_secs: 10.0,
            hide_at_secs: Some(4.0),
            hidden_for_secs: 3.0,
        }
    }
}

impl DisplaySettings {
    /// Milliseconds between display frames
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.refresh_rate
    }

    /// Reject rates and durations that cannot drive a run
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.refresh_rate.is_finite() && self.refresh_rate > 0.0,
            "refresh rate must be a positive number of Hz, got {}",
            self.refresh_rate
        );
        anyhow::ensure!(
            self.duration_secs.is_finite() && self.duration_secs > 0.0,
            "duration must be a positive number of seconds, got {}",
            self.duration_secs
        );
        if let Some(at) = self.hide_at_secs {
            anyhow::ensure!(
                at.is_finite() && at >= 0.0,
                "hide time must be a non-negative number of seconds, got {}",
                at
            );
        }
        anyhow::ensure!(
            self.hidden_for_secs.is_finite() && self.hidden_for_secs >= 0.0,
            "hidden duration must be a non-negative number of seconds, got {}",
            self.hidden_for_secs
        );
        Ok(())
    }
}

/// Bouncing-ball arena
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    pub width: f32,
    pub height: f32,
    /// Balls alive at once
    pub balls: u32,
    /// Maximum ball speed in units per second
    pub max_speed: f32,
    /// Seconds a ball lives before being replaced
    pub ball_lifetime_secs: f64,
    /// Seed for spawn positions and velocities
    pub seed: u64,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            balls: 64,
            max_speed: 240.0,
            ball_lifetime_secs: 2.5,
            seed: 7,
        }
    }
}
