//! Minigame Core - Shared types for the minigame runtime
//!
//! This crate provides the foundational pieces the ECS and the loop build on:
//! - Entity identifiers
//! - Loop timing configuration
//! - The fixed-timestep accumulator and FPS estimation

pub mod time;
pub mod types;

pub use time::{FixedTimestep, FpsCounter, LoopConfig, TimeError, MAX_STEPS_PER_FRAME};
pub use types::EntityId;
