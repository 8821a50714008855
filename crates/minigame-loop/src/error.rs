use minigame_core::TimeError;
use minigame_ecs::EcsError;

/// Errors surfaced by the game loop.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("invalid loop configuration: {0}")]
    Config(#[from] TimeError),

    #[error("simulation tick aborted: {0}")]
    System(#[from] EcsError),
}
