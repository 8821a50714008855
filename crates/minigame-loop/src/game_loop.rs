use minigame_core::{FixedTimestep, FpsCounter, LoopConfig};
use minigame_ecs::{Scheduler, World};
use tracing::{debug, info, warn};

use crate::error::LoopError;
use crate::host::{FrameHandle, FrameScheduler, Visibility, VisibilitySource, WatchHandle};

/// Called after every simulation step with the new tick count.
pub type TickCallback = Box<dyn FnMut(u64)>;

/// Lifecycle state of a [`GameLoop`].
///
/// A stopped loop is back in `Idle`; the two are the same reset state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No frame requested, tick count and timers reset.
    Idle,
    /// A frame request is outstanding.
    Running,
    /// Started, but no frame requested. Tick count and FPS are kept.
    Paused,
}

/// Builder for [`GameLoop`].
pub struct GameLoopBuilder {
    world: World,
    systems: Scheduler,
    frames: Box<dyn FrameScheduler>,
    visibility: Option<Box<dyn VisibilitySource>>,
    config: LoopConfig,
    on_tick: Option<TickCallback>,
}

impl GameLoopBuilder {
    /// Replace the whole timing configuration.
    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Simulation step size in seconds (default 1/60).
    pub fn fixed_dt(mut self, fixed_dt: f64) -> Self {
        self.config.fixed_dt = fixed_dt;
        self
    }

    /// Most unsimulated time one frame may add, in seconds (default 0.2).
    pub fn max_accumulator(mut self, max_accumulator: f64) -> Self {
        self.config.max_accumulator = max_accumulator;
        self
    }

    pub fn on_tick(mut self, callback: impl FnMut(u64) + 'static) -> Self {
        self.on_tick = Some(Box::new(callback));
        self
    }

    /// Pause automatically when this source reports the host as hidden.
    pub fn visibility(mut self, source: impl VisibilitySource + 'static) -> Self {
        self.visibility = Some(Box::new(source));
        self
    }

    pub fn build(self) -> Result<GameLoop, LoopError> {
        let timestep = FixedTimestep::new(self.config)?;
        Ok(GameLoop {
            world: self.world,
            systems: self.systems,
            timestep,
            fps: FpsCounter::new(),
            frames: self.frames,
            visibility: self.visibility,
            on_tick: self.on_tick,
            state: LoopState::Idle,
            pending_frame: None,
            visibility_watch: None,
            current_tick: 0,
        })
    }
}

/// Fixed-timestep driver for a [`World`] and its [`Scheduler`].
///
/// Each delivered frame advances an accumulator by the (clamped) time since
/// the previous frame, then runs the scheduler once per whole `fixed_dt` it
/// holds. All steps for a frame run back to back before `frame` returns.
pub struct GameLoop {
    world: World,
    systems: Scheduler,
    timestep: FixedTimestep,
    fps: FpsCounter,
    frames: Box<dyn FrameScheduler>,
    visibility: Option<Box<dyn VisibilitySource>>,
    on_tick: Option<TickCallback>,
    state: LoopState,
    pending_frame: Option<FrameHandle>,
    visibility_watch: Option<WatchHandle>,
    current_tick: u64,
}

impl GameLoop {
    /// Start building a loop over `world` and `systems`, scheduled by `frames`.
    pub fn builder(
        world: World,
        systems: Scheduler,
        frames: impl FrameScheduler + 'static,
    ) -> GameLoopBuilder {
        GameLoopBuilder {
            world,
            systems,
            frames: Box::new(frames),
            visibility: None,
            config: LoopConfig::default(),
            on_tick: None,
        }
    }

    // ---- Lifecycle ----

    /// Begin requesting frames. Does nothing if already started.
    pub fn start(&mut self) {
        if self.state != LoopState::Idle {
            return;
        }
        self.state = LoopState::Running;
        self.timestep.reset();

        if let Some(source) = self.visibility.as_mut() {
            if self.visibility_watch.is_none() {
                self.visibility_watch = Some(source.subscribe());
            }
        }

        self.request_frame();
        info!(
            fixed_dt = self.timestep.fixed_dt(),
            max_accumulator = self.timestep.config().max_accumulator,
            max_steps = self.timestep.config().max_steps_per_frame(),
            "game loop started"
        );
    }

    /// Stop requesting frames, keeping the tick count. Only acts while running.
    pub fn pause(&mut self) {
        if self.state != LoopState::Running {
            return;
        }
        self.cancel_pending_frame();
        self.state = LoopState::Paused;
        info!(tick = self.current_tick, "game loop paused");
    }

    /// Continue after [`pause`](Self::pause). Only acts while paused.
    ///
    /// Time that passed while paused is discarded: the first frame after
    /// resuming runs exactly one step.
    pub fn resume(&mut self) {
        if self.state != LoopState::Paused {
            return;
        }
        self.timestep.reset();
        self.fps.restart_window();
        self.state = LoopState::Running;
        self.request_frame();
        info!(tick = self.current_tick, "game loop resumed");
    }

    /// Return to the idle state: cancel frames, drop the visibility
    /// subscription and reset the tick count, timers and FPS.
    pub fn stop(&mut self) {
        self.cancel_pending_frame();
        if let (Some(source), Some(watch)) =
            (self.visibility.as_mut(), self.visibility_watch.take())
        {
            source.unsubscribe(watch);
        }

        let was_started = self.state != LoopState::Idle;
        self.state = LoopState::Idle;
        self.timestep.reset();
        self.fps.reset();
        self.current_tick = 0;
        if was_started {
            info!("game loop stopped");
        }
    }

    // ---- Host callbacks ----

    /// Deliver the frame requested as `handle`, displayed at `timestamp_ms`.
    ///
    /// Returns the number of simulation steps run. Frames that were cancelled,
    /// or arrive while the loop is not running, run nothing.
    pub fn frame(&mut self, handle: FrameHandle, timestamp_ms: f64) -> Result<u32, LoopError> {
        if self.state != LoopState::Running || self.pending_frame != Some(handle) {
            debug!(?handle, state = ?self.state, "ignoring stale frame");
            return Ok(0);
        }
        self.pending_frame = None;

        self.timestep.advance(timestamp_ms);
        let steps = self.timestep.fixed_steps();
        let dt = self.timestep.fixed_dt();

        for _ in 0..steps {
            if let Err(err) = self.systems.run_systems(&mut self.world, dt) {
                warn!(tick = self.current_tick, "tick aborted, pausing game loop");
                self.pause();
                return Err(err.into());
            }
            self.current_tick += 1;
            if let Some(on_tick) = self.on_tick.as_mut() {
                on_tick(self.current_tick);
            }
        }
        if steps > 1 {
            debug!(steps, tick = self.current_tick, "caught up");
        }

        self.fps.record_frame(timestamp_ms);

        if self.state == LoopState::Running {
            self.request_frame();
        }
        Ok(steps)
    }

    /// Report a visibility change. Hiding pauses the loop while it is
    /// subscribed; becoming visible never resumes it.
    pub fn visibility_changed(&mut self, visibility: Visibility) {
        if self.visibility_watch.is_none() {
            return;
        }
        if visibility == Visibility::Hidden && self.state == LoopState::Running {
            debug!("host hidden");
            self.pause();
        }
    }

    fn request_frame(&mut self) {
        self.pending_frame = Some(self.frames.request_frame());
    }

    fn cancel_pending_frame(&mut self) {
        if let Some(handle) = self.pending_frame.take() {
            self.frames.cancel_frame(handle);
        }
    }

    // ---- Diagnostics ----

    /// Whether the loop has been started and not stopped (paused counts as running).
    pub fn is_running(&self) -> bool {
        self.state != LoopState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.state == LoopState::Paused
    }

    /// Simulation steps run since the last start from idle.
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Display frames per second over the last full second of frames.
    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The frame request currently outstanding, if any.
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    /// Unsimulated time carried to the next frame, in seconds.
    pub fn accumulator(&self) -> f64 {
        self.timestep.accumulator()
    }

    /// Fraction of a step carried over, for interpolating rendered state.
    pub fn interpolation_alpha(&self) -> f64 {
        self.timestep.interpolation_alpha()
    }

    pub fn config(&self) -> &LoopConfig {
        self.timestep.config()
    }

    // ---- Access ----

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access between frames.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.systems
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.systems
    }

    /// Stop the loop and hand back the world and scheduler.
    pub fn into_parts(mut self) -> (World, Scheduler) {
        self.stop();
        (self.world, self.systems)
    }
}
