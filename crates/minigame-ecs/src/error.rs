use minigame_core::EntityId;

use crate::system::SystemFailure;

/// Errors that can occur in the ECS.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    #[error("cannot attach component '{component}' to dead entity {entity}")]
    DeadEntity {
        entity: EntityId,
        component: &'static str,
    },

    #[error("system '{}' failed: {}", .0.system, .0.message)]
    SystemFailed(SystemFailure),
}
