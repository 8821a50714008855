use minigame_core::EntityId;

use crate::component::{Component, ComponentStorage, ComponentType, ComponentTypeId, Optional};
use crate::world::World;

/// A set of component terms a query matches against.
///
/// Implemented for [`ComponentType`] (required, fetched as `&T`),
/// [`Optional`] (fetched as `Option<&T>`) and tuples of up to four terms.
pub trait QueryTerms: Copy {
    type Item<'w>;

    /// Push the ids of component types an entity must have to match.
    fn required(&self, out: &mut Vec<ComponentTypeId>);

    /// Fetch the item for an entity. `None` if a required component is missing.
    fn fetch<'w>(&self, world: &'w World, entity: EntityId) -> Option<Self::Item<'w>>;
}

impl<T: Component> QueryTerms for ComponentType<T> {
    type Item<'w> = &'w T;

    fn required(&self, out: &mut Vec<ComponentTypeId>) {
        out.push(self.id());
    }

    fn fetch<'w>(&self, world: &'w World, entity: EntityId) -> Option<Self::Item<'w>> {
        world.storage(*self)?.get(entity)
    }
}

impl<T: Component> QueryTerms for Optional<T> {
    type Item<'w> = Option<&'w T>;

    fn required(&self, _out: &mut Vec<ComponentTypeId>) {}

    fn fetch<'w>(&self, world: &'w World, entity: EntityId) -> Option<Self::Item<'w>> {
        Some(world.storage(self.0).and_then(|s| s.get(entity)))
    }
}

macro_rules! impl_query_terms_tuple {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: QueryTerms),+> QueryTerms for ($($name,)+) {
            type Item<'w> = ($($name::Item<'w>,)+);

            fn required(&self, out: &mut Vec<ComponentTypeId>) {
                let ($($name,)+) = self;
                $($name.required(out);)+
            }

            fn fetch<'w>(&self, world: &'w World, entity: EntityId) -> Option<Self::Item<'w>> {
                let ($($name,)+) = self;
                Some(($($name.fetch(world, entity)?,)+))
            }
        }
    };
}

impl_query_terms_tuple!(A);
impl_query_terms_tuple!(A, B);
impl_query_terms_tuple!(A, B, C);
impl_query_terms_tuple!(A, B, C, D);

/// Live entities that own every required component, in ascending id order.
fn matching_entities(world: &World, required: &[ComponentTypeId]) -> Vec<EntityId> {
    if required.is_empty() {
        return world.entities.iter().collect();
    }

    // Use the smallest required storage as the iteration base.
    let mut base: Option<&dyn ComponentStorage> = None;
    for id in required {
        let Some(storage) = world.components.get(id) else {
            // A required component type has no storage, so nothing can match.
            return Vec::new();
        };
        if base.map_or(true, |b| storage.len() < b.len()) {
            base = Some(&**storage);
        }
    }

    let mut candidates: Vec<EntityId> = base
        .map(|storage| storage.entity_ids().to_vec())
        .unwrap_or_default();
    candidates.retain(|&entity| {
        world.entities.is_alive(entity)
            && required
                .iter()
                .all(|id| world.components.get(id).is_some_and(|s| s.has(entity)))
    });
    candidates.sort_unstable();
    candidates
}

/// A read-only view of the entities matching a set of terms.
///
/// The view can be iterated any number of times; each pass yields
/// `(EntityId, Q::Item)` in ascending id order and fetches lazily.
pub struct Query<'w, Q: QueryTerms> {
    world: &'w World,
    terms: Q,
    entities: Vec<EntityId>,
}

impl<'w, Q: QueryTerms> Query<'w, Q> {
    pub(crate) fn new(world: &'w World, terms: Q) -> Self {
        let mut required = Vec::new();
        terms.required(&mut required);
        Self {
            world,
            terms,
            entities: matching_entities(world, &required),
        }
    }

    /// Start a fresh pass over the matching entities.
    pub fn iter(&self) -> QueryIter<'w, Q> {
        QueryIter {
            world: self.world,
            terms: self.terms,
            entities: self.entities.clone().into_iter(),
        }
    }

    /// Matching entity ids, without fetching component data.
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    /// Number of matching entities.
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<'q, 'w, Q: QueryTerms> IntoIterator for &'q Query<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);
    type IntoIter = QueryIter<'w, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'w, Q: QueryTerms> IntoIterator for Query<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);
    type IntoIter = QueryIter<'w, Q>;

    fn into_iter(self) -> Self::IntoIter {
        QueryIter {
            world: self.world,
            terms: self.terms,
            entities: self.entities.into_iter(),
        }
    }
}

/// Single pass over a [`Query`]. Yields `(EntityId, Q::Item)` for each matching entity.
pub struct QueryIter<'w, Q: QueryTerms> {
    world: &'w World,
    terms: Q,
    entities: std::vec::IntoIter<EntityId>,
}

impl<'w, Q: QueryTerms> Iterator for QueryIter<'w, Q> {
    type Item = (EntityId, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        for entity in self.entities.by_ref() {
            if let Some(item) = self.terms.fetch(self.world, entity) {
                return Some((entity, item));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.entities.len()))
    }
}
