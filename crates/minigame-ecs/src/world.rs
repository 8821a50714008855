use std::collections::HashMap;

use minigame_core::EntityId;
use tracing::warn;

use crate::component::{Component, ComponentStorage, ComponentType, ComponentTypeId, SparseSet};
use crate::entity::EntityAllocator;
use crate::error::EcsError;
use crate::query::{Query, QueryTerms};

/// The central ECS container. Owns all entities and their components.
///
/// Each game instance creates and owns its own `World`; there is no shared
/// default world.
#[derive(Default)]
pub struct World {
    pub(crate) entities: EntityAllocator,
    pub(crate) components: HashMap<ComponentTypeId, Box<dyn ComponentStorage>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Entity management ----

    /// Spawn a new entity with no components.
    pub fn spawn(&mut self) -> EntityId {
        self.entities.allocate()
    }

    /// Despawn an entity, removing all its components.
    ///
    /// Returns `false` (and does nothing) if the entity was not alive.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if !self.entities.deallocate(entity) {
            return false;
        }
        for storage in self.components.values_mut() {
            storage.remove_entity(entity);
        }
        true
    }

    /// Check whether an entity is alive.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Alive entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter()
    }

    /// The id the next spawned entity will receive.
    pub fn next_entity_id(&self) -> EntityId {
        self.entities.next_id()
    }

    /// Despawn every entity and drop all component data.
    ///
    /// Id allocation continues where it left off, so ids from before the clear
    /// are never handed out again.
    pub fn clear(&mut self) {
        self.entities.clear();
        for storage in self.components.values_mut() {
            storage.clear();
        }
    }

    // ---- Component management ----

    fn storage_mut<T: Component>(&mut self, ty: ComponentType<T>) -> &mut SparseSet<T> {
        self.components
            .entry(ty.id())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()))
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
            .expect("component type mismatch")
    }

    pub(crate) fn storage<T: Component>(&self, ty: ComponentType<T>) -> Option<&SparseSet<T>> {
        self.components
            .get(&ty.id())
            .and_then(|s| s.as_any().downcast_ref::<SparseSet<T>>())
    }

    fn existing_storage_mut<T: Component>(
        &mut self,
        ty: ComponentType<T>,
    ) -> Option<&mut SparseSet<T>> {
        self.components
            .get_mut(&ty.id())
            .and_then(|s| s.as_any_mut().downcast_mut::<SparseSet<T>>())
    }

    /// Attach a component to an entity, replacing any existing value of the
    /// same component type. Returns the replaced value.
    ///
    /// Attaching to an entity that is not alive stores nothing and returns
    /// [`EcsError::DeadEntity`].
    pub fn add<T: Component>(
        &mut self,
        ty: ComponentType<T>,
        entity: EntityId,
        data: T,
    ) -> Result<Option<T>, EcsError> {
        if !self.entities.is_alive(entity) {
            warn!(%entity, component = ty.name(), "attach to dead entity ignored");
            return Err(EcsError::DeadEntity {
                entity,
                component: ty.name(),
            });
        }
        Ok(self.storage_mut(ty).insert(entity, data))
    }

    /// Get an immutable reference to a component on an entity.
    pub fn get<T: Component>(&self, ty: ComponentType<T>, entity: EntityId) -> Option<&T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.storage(ty)?.get(entity)
    }

    /// Get a mutable reference to a component on an entity.
    pub fn get_mut<T: Component>(
        &mut self,
        ty: ComponentType<T>,
        entity: EntityId,
    ) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.existing_storage_mut(ty)?.get_mut(entity)
    }

    /// Check whether an entity has a component of the given type.
    pub fn has<T: Component>(&self, ty: ComponentType<T>, entity: EntityId) -> bool {
        self.get(ty, entity).is_some()
    }

    /// Detach a component from an entity, returning it if it was present.
    pub fn remove<T: Component>(&mut self, ty: ComponentType<T>, entity: EntityId) -> Option<T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.existing_storage_mut(ty)?.take(entity)
    }

    // ---- Queries ----

    /// Query live entities that match the given component terms.
    ///
    /// `terms` is a component type, an optional term, or a tuple of up to four
    /// of them. Results are yielded in ascending entity id order.
    ///
    /// # Example
    /// ```ignore
    /// for (entity, (pos, vel)) in world.query_terms((position, velocity)) {
    ///     // ...
    /// }
    /// ```
    pub fn query_terms<Q: QueryTerms>(&self, terms: Q) -> Query<'_, Q> {
        Query::new(self, terms)
    }

    /// Entities with an `A` component.
    pub fn query<A: Component>(&self, a: ComponentType<A>) -> Query<'_, ComponentType<A>> {
        self.query_terms(a)
    }

    /// Entities with both an `A` and a `B` component.
    pub fn query2<A: Component, B: Component>(
        &self,
        a: ComponentType<A>,
        b: ComponentType<B>,
    ) -> Query<'_, (ComponentType<A>, ComponentType<B>)> {
        self.query_terms((a, b))
    }

    /// Entities with `A`, `B` and `C` components.
    pub fn query3<A: Component, B: Component, C: Component>(
        &self,
        a: ComponentType<A>,
        b: ComponentType<B>,
        c: ComponentType<C>,
    ) -> Query<'_, (ComponentType<A>, ComponentType<B>, ComponentType<C>)> {
        self.query_terms((a, b, c))
    }

    /// Entities with `A`, `B`, `C` and `D` components.
    #[allow(clippy::type_complexity)]
    pub fn query4<A: Component, B: Component, C: Component, D: Component>(
        &self,
        a: ComponentType<A>,
        b: ComponentType<B>,
        c: ComponentType<C>,
        d: ComponentType<D>,
    ) -> Query<
        '_,
        (
            ComponentType<A>,
            ComponentType<B>,
            ComponentType<C>,
            ComponentType<D>,
        ),
    > {
        self.query_terms((a, b, c, d))
    }

    /// Mutable access to every live entity's `T` component, in ascending id order.
    pub fn query_mut<T: Component>(
        &mut self,
        ty: ComponentType<T>,
    ) -> impl Iterator<Item = (EntityId, &mut T)> + '_ {
        let entities = &self.entities;
        let mut items: Vec<(EntityId, &mut T)> = match self
            .components
            .get_mut(&ty.id())
            .and_then(|s| s.as_any_mut().downcast_mut::<SparseSet<T>>())
        {
            Some(set) => set
                .iter_mut()
                .filter(|(entity, _)| entities.is_alive(*entity))
                .collect(),
            None => Vec::new(),
        };
        items.sort_unstable_by_key(|(entity, _)| *entity);
        items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    #[test]
    fn spawn_and_despawn() {
        let mut world = World::new();
        let e = world.spawn();
        assert!(world.is_alive(e));
        assert_eq!(world.entity_count(), 1);
        assert!(world.despawn(e));
        assert!(!world.is_alive(e));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn despawn_is_idempotent() {
        let mut world = World::new();
        let e = world.spawn();
        assert!(world.despawn(e));
        assert!(!world.despawn(e));
        assert!(!world.despawn(EntityId(999)));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn entity_count_tracks_spawns_and_live_despawns() {
        let mut world = World::new();
        let mut live = Vec::new();
        let mut expected = 0usize;

        for round in 0..50u64 {
            live.push(world.spawn());
            expected += 1;
            if round % 3 == 0 {
                let victim = live.remove(0);
                assert!(world.despawn(victim));
                expected -= 1;
                // despawning again must not change the count
                assert!(!world.despawn(victim));
            }
            assert_eq!(world.entity_count(), expected);
        }
    }

    #[test]
    fn ids_strictly_increase() {
        let mut world = World::new();
        let a = world.spawn();
        world.despawn(a);
        let b = world.spawn();
        assert!(b > a);
        assert_eq!(world.next_entity_id(), EntityId(b.raw() + 1));
    }

    #[test]
    fn add_get_remove_component() {
        let position = ComponentType::<Position>::new("Position");
        let mut world = World::new();
        let e = world.spawn();

        assert_eq!(world.add(position, e, Position { x: 1.0, y: 2.0 }).unwrap(), None);
        assert_eq!(world.get(position, e), Some(&Position { x: 1.0, y: 2.0 }));
        assert!(world.has(position, e));
        assert_eq!(world.remove(position, e), Some(Position { x: 1.0, y: 2.0 }));
        assert!(!world.has(position, e));
        assert_eq!(world.remove(position, e), None);
    }

    #[test]
    fn add_overwrites_previous_value() {
        let position = ComponentType::<Position>::new("Position");
        let mut world = World::new();
        let e = world.spawn();

        world.add(position, e, Position { x: 1.0, y: 1.0 }).unwrap();
        let old = world.add(position, e, Position { x: 2.0, y: 2.0 }).unwrap();
        assert_eq!(old, Some(Position { x: 1.0, y: 1.0 }));
        assert_eq!(world.get(position, e), Some(&Position { x: 2.0, y: 2.0 }));
    }

    #[test]
    fn component_mutation() {
        let position = ComponentType::<Position>::new("Position");
        let mut world = World::new();
        let e = world.spawn();
        world.add(position, e, Position { x: 0.0, y: 0.0 }).unwrap();
        world.get_mut(position, e).unwrap().x = 5.0;
        assert_eq!(world.get(position, e).unwrap().x, 5.0);
    }

    #[test]
    fn same_name_types_do_not_collide() {
        let first = ComponentType::<u32>::new("Score");
        let second = ComponentType::<u32>::new("Score");
        let mut world = World::new();
        let e = world.spawn();

        world.add(first, e, 10).unwrap();
        assert!(world.has(first, e));
        assert!(!world.has(second, e));
        assert_eq!(world.get(second, e), None);
    }

    #[test]
    fn add_to_dead_entity_is_rejected() {
        let position = ComponentType::<Position>::new("Position");
        let mut world = World::new();
        let e = world.spawn();
        world.despawn(e);

        let err = world.add(position, e, Position { x: 0.0, y: 0.0 }).unwrap_err();
        assert!(matches!(err, EcsError::DeadEntity { entity, .. } if entity == e));
        assert!(!world.has(position, e));
        assert_eq!(world.query(position).count(), 0);
    }

    #[test]
    fn despawn_removes_all_components() {
        let position = ComponentType::<Position>::new("Position");
        let velocity = ComponentType::<Velocity>::new("Velocity");
        let health = ComponentType::<u32>::new("Health");
        let mut world = World::new();
        let e = world.spawn();
        let other = world.spawn();
        world.add(position, e, Position { x: 1.0, y: 0.0 }).unwrap();
        world.add(velocity, e, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
        world.add(health, e, 3).unwrap();
        world.add(health, other, 7).unwrap();

        world.despawn(e);

        assert!(!world.has(position, e));
        assert!(!world.has(velocity, e));
        assert!(!world.has(health, e));
        assert_eq!(world.get(position, e), None);
        assert_eq!(world.get(velocity, e), None);
        assert_eq!(world.get(health, e), None);
        for storage in world.components.values() {
            assert!(!storage.has(e));
        }
        assert_eq!(world.get(health, other), Some(&7));
    }

    #[test]
    fn clear_keeps_id_counter() {
        let position = ComponentType::<Position>::new("Position");
        let mut world = World::new();
        let a = world.spawn();
        world.spawn();
        world.add(position, a, Position { x: 1.0, y: 1.0 }).unwrap();

        world.clear();
        assert_eq!(world.entity_count(), 0);
        assert_eq!(world.query(position).count(), 0);

        let c = world.spawn();
        assert_eq!(c, EntityId(2));
        assert!(!world.has(position, c));
    }

    #[test]
    fn query_mut_in_ascending_order() {
        let position = ComponentType::<Position>::new("Position");
        let mut world = World::new();
        let ids: Vec<_> = (0..4).map(|_| world.spawn()).collect();
        // attach in reverse so storage order differs from id order
        for (i, &e) in ids.iter().enumerate().rev() {
            world.add(position, e, Position { x: i as f32, y: 0.0 }).unwrap();
        }
        world.despawn(ids[2]);

        let mut seen = Vec::new();
        for (entity, pos) in world.query_mut(position) {
            pos.y = 1.0;
            seen.push(entity);
        }
        assert_eq!(seen, vec![ids[0], ids[1], ids[3]]);
        assert_eq!(world.get(position, ids[3]).unwrap().y, 1.0);
    }
}
