//! Time system for the minigame runtime
//!
//! Converts variable display-frame timestamps into a whole number of
//! fixed-size simulation steps, and estimates the display frame rate.

use serde::{Deserialize, Serialize};

/// Slack allowed when comparing the accumulator against the step size, as a
/// fraction of `fixed_dt`, so a delta that is an exact multiple of the step is
/// not lost to rounding.
const STEP_TOLERANCE: f64 = 1e-9;

/// Upper bound on `max_accumulator / fixed_dt` accepted by [`LoopConfig::validate`]
pub const MAX_STEPS_PER_FRAME: u32 = 10_000;

/// Errors raised when a loop configuration is unusable
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeError {
    #[error("fixed timestep must be a positive finite number of seconds, got {0}")]
    InvalidFixedDt(f64),

    #[error("max accumulator must be a positive finite number of seconds, got {0}")]
    InvalidMaxAccumulator(f64),

    #[error("fixed timestep {fixed_dt} is too small for max accumulator {max_accumulator} (more than {MAX_STEPS_PER_FRAME} steps per frame)")]
    TooManySteps { fixed_dt: f64, max_accumulator: f64 },
}

/// Configuration for the fixed-timestep loop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Simulation step size (in seconds)
    pub fixed_dt: f64,
    /// Maximum unsimulated time a single frame may add, to prevent spiral of death
    pub max_accumulator: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_accumulator: 0.2,
        }
    }
}

impl LoopConfig {
    /// Check that both durations are usable
    pub fn validate(&self) -> Result<(), TimeError> {
        if !self.fixed_dt.is_finite() || self.fixed_dt <= 0.0 {
            return Err(TimeError::InvalidFixedDt(self.fixed_dt));
        }
        if !self.max_accumulator.is_finite() || self.max_accumulator <= 0.0 {
            return Err(TimeError::InvalidMaxAccumulator(self.max_accumulator));
        }
        if self.max_accumulator / self.fixed_dt > f64::from(MAX_STEPS_PER_FRAME) {
            return Err(TimeError::TooManySteps {
                fixed_dt: self.fixed_dt,
                max_accumulator: self.max_accumulator,
            });
        }
        Ok(())
    }

    /// Most steps a single frame can ever produce
    pub fn max_steps_per_frame(&self) -> u32 {
        (self.max_accumulator / self.fixed_dt + STEP_TOLERANCE).floor() as u32
    }
}

/// Fixed-timestep accumulator driven by frame timestamps in milliseconds
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    config: LoopConfig,
    max_steps: u32,
    /// Timestamp of the previous frame; `None` right after a reset
    last_time: Option<f64>,
    /// Unsimulated time carried between frames (in seconds)
    accumulator: f64,
}

impl FixedTimestep {
    /// Create an accumulator, rejecting invalid configs
    pub fn new(config: LoopConfig) -> Result<Self, TimeError> {
        config.validate()?;
        Ok(Self {
            config,
            max_steps: config.max_steps_per_frame(),
            last_time: None,
            accumulator: 0.0,
        })
    }

    /// Feed the timestamp of a new display frame.
    ///
    /// The first frame after a reset contributes exactly one `fixed_dt`.
    /// Returns the (clamped) number of seconds added to the accumulator.
    /// Non-finite timestamps are ignored.
    pub fn advance(&mut self, timestamp_ms: f64) -> f64 {
        if !timestamp_ms.is_finite() {
            return 0.0;
        }
        let delta = match self.last_time {
            None => self.config.fixed_dt,
            Some(last) => {
                let delta = (timestamp_ms - last) / 1000.0;
                if delta.is_finite() { delta.max(0.0) } else { 0.0 }
            }
        };
        self.last_time = Some(timestamp_ms);

        let added = delta.min(self.config.max_accumulator);
        self.accumulator += added;
        added
    }

    /// Drain the accumulator, returning how many fixed steps to run this frame.
    ///
    /// Never more than [`LoopConfig::max_steps_per_frame`]; backlog beyond
    /// that is dropped, keeping only the partial step.
    pub fn fixed_steps(&mut self) -> u32 {
        let dt = self.config.fixed_dt;
        let threshold = dt * (1.0 - STEP_TOLERANCE);
        let mut steps = 0;
        while steps < self.max_steps && self.accumulator >= threshold {
            self.accumulator = (self.accumulator - dt).max(0.0);
            steps += 1;
        }
        if self.accumulator >= threshold {
            self.accumulator %= dt;
        }
        steps
    }

    /// Interpolation factor for rendering between simulation steps
    pub fn interpolation_alpha(&self) -> f64 {
        self.accumulator / self.config.fixed_dt
    }

    /// Forget the previous frame and drop any carried backlog
    pub fn reset(&mut self) {
        self.last_time = None;
        self.accumulator = 0.0;
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }

    pub fn fixed_dt(&self) -> f64 {
        self.config.fixed_dt
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }
}

/// Rolling frames-per-second estimate over one-second windows of frame timestamps
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    window_start: Option<f64>,
    frames: u32,
    fps: f64,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a displayed frame at the given timestamp (in milliseconds)
    pub fn record_frame(&mut self, timestamp_ms: f64) {
        let Some(start) = self.window_start else {
            self.window_start = Some(timestamp_ms);
            return;
        };

        self.frames += 1;
        let elapsed = timestamp_ms - start;
        if elapsed >= 1000.0 {
            self.fps = f64::from(self.frames) * 1000.0 / elapsed;
            self.frames = 0;
            self.window_start = Some(timestamp_ms);
        }
    }

    /// Start a fresh measuring window, keeping the last estimate.
    ///
    /// Used after a pause so the hidden gap is not counted as one slow frame.
    pub fn restart_window(&mut self) {
        self.window_start = None;
        self.frames = 0;
    }

    /// Clear everything, including the last estimate
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Frames per second over the last completed window (0 until one completes)
    pub fn fps(&self) -> f64 {
        self.fps
    }
}
