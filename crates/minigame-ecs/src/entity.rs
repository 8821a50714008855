use std::collections::BTreeSet;

use minigame_core::EntityId;

/// Hands out entity ids and tracks which ones are alive.
///
/// Ids come from a counter that only ever increases, so a despawned id is
/// never handed out again. The live set is ordered so iteration is in
/// ascending id order.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    next_id: u64,
    alive: BTreeSet<EntityId>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh entity id.
    pub fn allocate(&mut self) -> EntityId {
        let entity = EntityId(self.next_id);
        self.next_id += 1;
        self.alive.insert(entity);
        entity
    }

    /// Deallocate an entity. Returns `true` if it was alive.
    pub fn deallocate(&mut self, entity: EntityId) -> bool {
        self.alive.remove(&entity)
    }

    /// Check if an entity is currently alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.alive.contains(&entity)
    }

    /// Forget every live entity. The id counter is left untouched.
    pub fn clear(&mut self) {
        self.alive.clear();
    }

    /// Live entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive.iter().copied()
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    pub fn next_id(&self) -> EntityId {
        EntityId(self.next_id)
    }

    /// Number of currently alive entities.
    pub fn len(&self) -> usize {
        self.alive.len()
    }

    /// Whether there are no alive entities.
    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }
}
