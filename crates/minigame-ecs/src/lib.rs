//! Minigame ECS - Entity Component System
//!
//! A small ECS for single-threaded minigame simulations.
//! Component types are identified by per-call tokens rather than by Rust type,
//! entities by ids that are never reused, and components live in sparse sets.

mod component;
mod entity;
mod error;
mod query;
mod system;
mod world;

pub use component::{Component, ComponentType, ComponentTypeId, Optional};
pub use error::EcsError;
pub use minigame_core::EntityId;
pub use query::{Query, QueryIter, QueryTerms};
pub use system::{
    ErrorSink, FailurePolicy, Scheduler, System, SystemFailure, SystemId, SystemResult,
};
pub use world::World;
