//! Minigame Loop - Fixed-timestep simulation driver
//!
//! Turns host frame callbacks into a whole number of fixed-size simulation
//! steps per frame and runs the ECS scheduler once per step. The host supplies
//! frame scheduling and visibility notifications through the traits in [`host`].

mod error;
mod game_loop;
pub mod host;

pub use error::LoopError;
pub use game_loop::{GameLoop, GameLoopBuilder, LoopState, TickCallback};
pub use host::{FrameHandle, FrameScheduler, Visibility, VisibilitySource, WatchHandle};
