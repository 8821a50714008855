use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use minigame_core::EntityId;

/// Marker trait for types that can be stored as ECS components.
pub trait Component: 'static + Send + Sync {}

/// Blanket implementation: any `'static + Send + Sync` type is a valid component.
impl<T: 'static + Send + Sync> Component for T {}

static NEXT_COMPONENT_TYPE: AtomicU64 = AtomicU64::new(0);

/// Untyped identity of a [`ComponentType`]. Unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeId(u64);

impl ComponentTypeId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A typed token naming one kind of component data.
///
/// Every call to [`ComponentType::new`] mints a fresh identity, so two tokens
/// created with the same name are different component types and never share
/// storage. The name is only used for diagnostics.
///
/// ```
/// use minigame_ecs::ComponentType;
///
/// struct Health(u32);
///
/// let health = ComponentType::<Health>::new("Health");
/// let other = ComponentType::<Health>::new("Health");
/// assert_ne!(health, other);
/// ```
pub struct ComponentType<T> {
    id: ComponentTypeId,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> ComponentType<T> {
    /// Define a new component type.
    pub fn new(name: &'static str) -> Self {
        let id = NEXT_COMPONENT_TYPE.fetch_add(1, Ordering::Relaxed);
        Self {
            id: ComponentTypeId(id),
            name,
            _marker: PhantomData,
        }
    }

    /// Use this type as an optional query term: matching entities are not
    /// required to have it, and the fetched value is `Option<&T>`.
    pub fn optional(self) -> Optional<T> {
        Optional(self)
    }
}

impl<T> ComponentType<T> {
    pub fn id(&self) -> ComponentTypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

// Manual impls so `T` itself needs none of these traits.
impl<T> Clone for ComponentType<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentType<T> {}

impl<T> PartialEq for ComponentType<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for ComponentType<T> {}

impl<T> Hash for ComponentType<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for ComponentType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({}#{})", self.name, self.id.0)
    }
}

/// Optional query term produced by [`ComponentType::optional`].
pub struct Optional<T>(pub(crate) ComponentType<T>);

impl<T> Clone for Optional<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Optional<T> {}

impl<T> fmt::Debug for Optional<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Optional({:?})", self.0)
    }
}

/// Type-erased component storage interface.
pub(crate) trait ComponentStorage: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Drop the entity's component, if any. Returns `true` if one was present.
    fn remove_entity(&mut self, entity: EntityId) -> bool;
    fn has(&self, entity: EntityId) -> bool;
    fn entity_ids(&self) -> &[EntityId];
    fn len(&self) -> usize;
    fn clear(&mut self);
}

/// Sparse-set storage for a single component type. Provides O(1) insert/remove/lookup
/// and dense iteration.
///
/// Entity ids are never recycled, so the sparse side is a hash map rather than
/// a `Vec` indexed by id, which would grow with every entity ever spawned.
pub(crate) struct SparseSet<T> {
    /// Maps entity id → dense index.
    sparse: HashMap<EntityId, usize>,
    /// Packed component values.
    dense: Vec<T>,
    /// Entity ids corresponding to each dense slot (for iteration).
    entities: Vec<EntityId>,
}

impl<T: Component> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: HashMap::new(),
            dense: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Insert or replace a component for the given entity. Returns the replaced value.
    pub fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        if let Some(&dense_idx) = self.sparse.get(&entity) {
            Some(std::mem::replace(&mut self.dense[dense_idx], value))
        } else {
            self.sparse.insert(entity, self.dense.len());
            self.dense.push(value);
            self.entities.push(entity);
            None
        }
    }

    /// Get an immutable reference to the component for an entity.
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.sparse.get(&entity).map(|&dense_idx| &self.dense[dense_idx])
    }

    /// Get a mutable reference to the component for an entity.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.sparse
            .get(&entity)
            .map(|&dense_idx| &mut self.dense[dense_idx])
    }

    /// Remove and return the component for an entity.
    pub fn take(&mut self, entity: EntityId) -> Option<T> {
        let dense_idx = self.sparse.remove(&entity)?;

        // Swap-remove: move the last element into the removed slot.
        let value = self.dense.swap_remove(dense_idx);
        self.entities.swap_remove(dense_idx);
        if let Some(&moved) = self.entities.get(dense_idx) {
            self.sparse.insert(moved, dense_idx);
        }
        Some(value)
    }

    /// Iterate over all (entity, &mut component) pairs in storage order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }
}

impl<T: Component> ComponentStorage for SparseSet<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.take(entity).is_some()
    }

    fn has(&self, entity: EntityId) -> bool {
        self.sparse.contains_key(&entity)
    }

    fn entity_ids(&self) -> &[EntityId] {
        &self.entities
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.entities.clear();
    }
}
