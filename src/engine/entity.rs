//! # Entity Management
//!
//! This module defines entity identity and the [`EntityManager`], which owns
//! every chunk family and layout and maps entity ids to their storage
//! location.
//!
//! ## Entity Model
//! An [`EntityId`] is an opaque 64-bit value assigned monotonically from 0.
//! Each live entity occupies exactly one row of one chunk; the manager
//! records that position as an [`EntityLocation`]:
//!
//! - **family index** — which chunk family (archetype) holds the entity,
//! - **chunk index** — which chunk within the family,
//! - **line index** — which row within the chunk.
//!
//! ## Storage
//! Families are created lazily the first time an archetype is seen, along
//! with that archetype's layout. Both live for the lifetime of the manager;
//! the set of archetypes in a running simulation is tiny in practice.
//! Family lookup is a hash on the archetype bit pattern.
//!
//! ## Concurrency
//! The manager is **not internally synchronized**. Callers partitioning
//! work across threads must ensure no two threads mutate the same chunk
//! simultaneously and that nothing creates entities while another thread
//! iterates.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::engine::chunk::{compute_chunk_layout, Chunk, ChunkLayout, ColumnSet};
use crate::engine::component::{Component, ComponentSet};
use crate::engine::error::{EngineResult, InvalidEntityError};
use crate::engine::family::ChunkFamily;
use crate::engine::types::{Archetype, ChunkIndex, EntityId, FamilyIndex, LineIndex};

/// Physical storage location of an entity.
///
/// All three fields index ordered sequences: families in the manager,
/// chunks in the family, rows in the chunk.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityLocation {
    /// Index of the chunk family holding the entity.
    pub family: FamilyIndex,

    /// Index of the chunk within the family.
    pub chunk: ChunkIndex,

    /// Row index within the chunk.
    pub line: LineIndex,
}

/// Owner of all chunk families, layouts, and entity locations.
///
/// ## Invariants
/// - `entity_to_location[e]` is `Some` iff entity `e` exists.
/// - Ids are assigned monotonically from 0 and never reused; entities are
///   not destroyed.
/// - One layout exists per distinct archetype ever seen, shared by every
///   chunk of that archetype.

pub struct EntityManager {
    families: Vec<ChunkFamily>,
    family_index: HashMap<Archetype, FamilyIndex>,
    layouts: Vec<Arc<ChunkLayout>>,
    entity_to_location: Vec<Option<EntityLocation>>,
    next_entity_id: EntityId,
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            families: Vec::new(),
            family_index: HashMap::new(),
            layouts: Vec::new(),
            entity_to_location: Vec::new(),
            next_entity_id: 0,
        }
    }

    /// Returns the number of entities created so far.
    #[inline]
    pub fn entity_count(&self) -> u64 {
        self.next_entity_id
    }

    /// Returns `true` iff `entity` refers to a live entity.
    #[inline]
    pub fn is_valid(&self, entity: EntityId) -> bool {
        entity < self.next_entity_id
            && matches!(self.entity_to_location.get(entity as usize), Some(Some(_)))
    }

    /// Returns the storage location of `entity`.
    ///
    /// ## Errors
    /// [`InvalidEntityError`] if the entity does not exist.
    pub fn location_of(&self, entity: EntityId) -> EngineResult<EntityLocation> {
        self.entity_to_location
            .get(entity as usize)
            .and_then(|location| *location)
            .ok_or_else(|| InvalidEntityError { entity }.into())
    }

    /// Returns the archetype of `entity`.
    ///
    /// ## Errors
    /// [`InvalidEntityError`] if the entity does not exist.
    pub fn archetype_of(&self, entity: EntityId) -> EngineResult<Archetype> {
        let location = self.location_of(entity)?;
        Ok(self.families[location.family as usize].archetype())
    }

    fn find_or_create_family(&mut self, archetype: Archetype) -> EngineResult<FamilyIndex> {
        if let Some(&index) = self.family_index.get(&archetype) {
            return Ok(index);
        }

        let layout = Arc::new(compute_chunk_layout(archetype)?);
        debug!(
            "new chunk family for archetype {:?} (capacity {} rows)",
            archetype, layout.capacity
        );

        let index = self.families.len() as FamilyIndex;
        self.layouts.push(Arc::clone(&layout));
        self.families.push(ChunkFamily::new(layout));
        self.family_index.insert(archetype, index);
        Ok(index)
    }

    /// Creates an entity with the given archetype, leaving its components
    /// zero-initialised.
    pub fn create_entity_raw(&mut self, archetype: Archetype) -> EngineResult<EntityId> {
        let family_index = self.find_or_create_family(archetype)?;
        let (chunk, line) = self.families[family_index as usize].push_row();

        let entity = self.next_entity_id;
        self.entity_to_location.push(Some(EntityLocation {
            family: family_index,
            chunk,
            line,
        }));
        self.next_entity_id += 1;
        Ok(entity)
    }

    /// Creates an uninitialised entity carrying the components of `S`.
    ///
    /// Component values are zeroed; use [`EntityManager::set_component`]
    /// to initialise them, or [`EntityManager::create_entity_with`] to
    /// create and initialise in one call.
    pub fn create_entity<S: ComponentSet>(&mut self) -> EngineResult<EntityId> {
        self.create_entity_raw(S::archetype()?)
    }

    /// Creates an entity initialised from a tuple of component values.
    ///
    /// Equivalent to [`EntityManager::create_entity`] followed by one
    /// [`EntityManager::set_component`] call per value.
    pub fn create_entity_with<B: ComponentBundle>(&mut self, bundle: B) -> EngineResult<EntityId> {
        let entity = self.create_entity::<B::Set>()?;
        bundle.store(self, entity)?;
        Ok(entity)
    }

    #[inline]
    fn chunk_at(&self, location: EntityLocation) -> &Chunk {
        &self.families[location.family as usize].chunks()[location.chunk as usize]
    }

    #[inline]
    fn chunk_at_mut(&mut self, location: EntityLocation) -> &mut Chunk {
        &mut self.families[location.family as usize].chunks_mut()[location.chunk as usize]
    }

    /// Writes `value` into `entity`'s component `T`.
    ///
    /// ## Errors
    /// - [`InvalidEntityError`] if the entity does not exist.
    /// - [`crate::engine::error::AccessError::ComponentNotPresent`] if the
    ///   entity's archetype lacks `T`.
    pub fn set_component<T: Component>(&mut self, entity: EntityId, value: T) -> EngineResult<()> {
        let location = self.location_of(entity)?;
        self.chunk_at_mut(location).set(location.line, value)
    }

    /// Returns a reference to `entity`'s component `T`.
    ///
    /// ## Errors
    /// As [`EntityManager::set_component`].
    pub fn get_component<T: Component>(&self, entity: EntityId) -> EngineResult<&T> {
        let location = self.location_of(entity)?;
        self.chunk_at(location).get(location.line)
    }

    /// Returns a mutable reference to `entity`'s component `T`.
    ///
    /// ## Errors
    /// As [`EntityManager::set_component`].
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> EngineResult<&mut T> {
        let location = self.location_of(entity)?;
        self.chunk_at_mut(location).get_mut(location.line)
    }

    /// Calls `visit` for every chunk whose archetype contains the
    /// components of `S`.
    ///
    /// Families are visited in insertion order, chunks within a family in
    /// insertion order. Mutation through the chunk is observed by later
    /// iterations. Creating entities during iteration is not possible
    /// (`self` is mutably borrowed for the duration).
    pub fn each<S, F>(&mut self, mut visit: F) -> EngineResult<()>
    where
        S: ComponentSet,
        F: FnMut(&mut Chunk),
    {
        let requested = S::archetype()?;
        for family in &mut self.families {
            if family.archetype().contains(&requested) {
                for chunk in family.chunks_mut() {
                    visit(chunk);
                }
            }
        }
        Ok(())
    }

    /// Calls `visit` once per matching row with one mutable reference per
    /// component in `S`, across every chunk whose archetype contains the
    /// requested set.
    pub fn each_rows<S, F>(&mut self, mut visit: F) -> EngineResult<()>
    where
        S: ColumnSet,
        F: for<'a> FnMut(S::Row<'a>),
    {
        let requested = S::archetype()?;
        for family in &mut self.families {
            if family.archetype().contains(&requested) {
                for chunk in family.chunks_mut() {
                    chunk.each::<S, _>(&mut visit)?;
                }
            }
        }
        Ok(())
    }
}

/// A tuple of component values that can initialise a freshly created
/// entity.
///
/// Implemented for tuples of one to eight components; the entity's
/// archetype is that of the value types.
pub trait ComponentBundle {
    /// The component set formed by the value types.
    type Set: ComponentSet;

    /// Writes each value into `entity`'s row.
    fn store(self, manager: &mut EntityManager, entity: EntityId) -> EngineResult<()>;
}

macro_rules! impl_component_bundle {
    ($(($name:ident, $index:tt)),+) => {
        impl<$($name: Component),+> ComponentBundle for ($($name,)+) {
            type Set = ($($name,)+);

            fn store(self, manager: &mut EntityManager, entity: EntityId) -> EngineResult<()> {
                $(manager.set_component(entity, self.$index)?;)+
                Ok(())
            }
        }
    };
}

impl_component_bundle!((A, 0));
impl_component_bundle!((A, 0), (B, 1));
impl_component_bundle!((A, 0), (B, 1), (C, 2));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_component_bundle!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));
