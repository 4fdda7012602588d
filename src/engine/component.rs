//! # Component Registry
//!
//! This module provides a process-wide registry that assigns stable
//! [`ComponentId`] values to Rust component types and records the byte size
//! and alignment used for chunk column layout.
//!
//! ## Purpose
//! The registry decouples component type information (`TypeId`, name, size,
//! alignment) from storage, so archetypes and chunk layouts can work with
//! small dense integer ids instead of Rust types.
//!
//! ## Design
//! - Ids are issued **on first use**: the first call to [`component_id_of`]
//!   for a type registers it and assigns the next id in `[0, MAX_COMPONENTS)`.
//! - Subsequent calls return the same id.
//! - Metadata is stored in a [`ComponentInfo`] table indexed by id.
//!
//! ## Invariants
//! - `ComponentId` values are unique and stable for the lifetime of the
//!   process.
//! - A registered id always has a matching [`ComponentInfo`] entry whose
//!   size is non-zero.
//!
//! ## Concurrency
//! The registry is protected by `RwLock` for concurrent reads and serialized
//! writes. Concurrent first-use of distinct types cannot race the id
//! counter; concurrent first-use of the same type returns the same id.

use std::{
    any::{type_name, TypeId},
    collections::HashMap,
    mem::{align_of, size_of},
    sync::{OnceLock, RwLock},
};

use log::debug;

use crate::engine::error::{EngineResult, RegistryError};
use crate::engine::types::{Archetype, ComponentId, MAX_COMPONENTS};

/// Marker capability for component types.
///
/// Components are plain bit-patterns: chunk storage copies them byte-wise
/// and never runs destructors, so every component must be `Copy`. The trait
/// is blanket-implemented for all eligible types.
pub trait Component: Copy + Send + Sync + 'static {}

impl<T: Copy + Send + Sync + 'static> Component for T {}

/// Describes a registered component type.
///
/// ## Fields
/// - `component_id`: the runtime identifier assigned by the registry.
/// - `name`: the Rust type name (`type_name::<T>()`), for diagnostics.
/// - `size`: `size_of::<T>()` in bytes; always non-zero.
/// - `align`: `align_of::<T>()` in bytes.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Runtime identifier assigned to this component type.
    pub component_id: ComponentId,

    /// Rust type name for diagnostics.
    pub name: &'static str,

    /// Size of the component type in bytes.
    pub size: usize,

    /// Alignment of the component type in bytes.
    pub align: usize,
}

impl std::fmt::Display for ComponentInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ComponentInfo {{ id: {}, name: {}, size: {}, align: {} }}",
            self.component_id, self.name, self.size, self.align
        )
    }
}

/// Process-wide mapping between Rust component types and dense ids.
struct ComponentRegistry {
    next_id: ComponentId,
    by_type: HashMap<TypeId, ComponentId>,
    infos: Vec<Option<ComponentInfo>>,
}

static REGISTRY: OnceLock<RwLock<ComponentRegistry>> = OnceLock::new();

fn component_registry() -> &'static RwLock<ComponentRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(ComponentRegistry {
            next_id: 0,
            by_type: HashMap::new(),
            infos: vec![None; MAX_COMPONENTS],
        })
    })
}

impl ComponentRegistry {
    fn register<T: Component>(&mut self) -> Result<ComponentId, RegistryError> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Ok(existing);
        }

        if size_of::<T>() == 0 {
            return Err(RegistryError::ZeroSized { name: type_name::<T>() });
        }

        let component_id = self.next_id;
        if (component_id as usize) >= MAX_COMPONENTS {
            return Err(RegistryError::CapacityExceeded { cap: MAX_COMPONENTS });
        }
        self.next_id = component_id.wrapping_add(1);

        self.by_type.insert(type_id, component_id);
        self.infos[component_id as usize] = Some(ComponentInfo {
            component_id,
            name: type_name::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        });

        debug!(
            "registered component {} as id {} ({} bytes)",
            type_name::<T>(),
            component_id,
            size_of::<T>()
        );

        Ok(component_id)
    }
}

/// Returns the [`ComponentId`] for type `T`, registering it on first use.
///
/// ## Behavior
/// Idempotent: every call for the same type returns the same id. The first
/// call assigns the next dense id and records the type's size and
/// alignment.
///
/// ## Errors
/// - [`RegistryError::CapacityExceeded`] once `MAX_COMPONENTS` ids exist.
/// - [`RegistryError::ZeroSized`] for zero-sized types.

pub fn component_id_of<T: Component>() -> EngineResult<ComponentId> {
    let registry = component_registry();

    {
        let registry = registry.read().map_err(|_| RegistryError::PoisonedLock)?;
        if let Some(&id) = registry.by_type.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
    }

    let mut registry = registry.write().map_err(|_| RegistryError::PoisonedLock)?;
    Ok(registry.register::<T>()?)
}

/// Returns a copy of the descriptor for `component_id`.
///
/// ## Errors
/// [`RegistryError::UnknownComponent`] if the id was never issued.

pub fn component_info(component_id: ComponentId) -> EngineResult<ComponentInfo> {
    let registry = component_registry();
    let registry = registry.read().map_err(|_| RegistryError::PoisonedLock)?;
    registry
        .infos
        .get(component_id as usize)
        .and_then(|info| *info)
        .ok_or_else(|| RegistryError::UnknownComponent { component_id }.into())
}

/// Returns the byte size recorded for `component_id`.
///
/// ## Errors
/// [`RegistryError::UnknownComponent`] if the id was never issued.

pub fn component_size(component_id: ComponentId) -> EngineResult<usize> {
    Ok(component_info(component_id)?.size)
}

/// A set of component types, named as a tuple.
///
/// `ComponentSet` is the typed rendering of an [`Archetype`]: the tuple
/// `(A, B)` resolves to the archetype with the bits for `A` and `B` set.
/// Tuple order is irrelevant, `(A, B)` and `(B, A)` resolve to equal
/// archetypes. Implemented for tuples of one to eight components.
pub trait ComponentSet: 'static {
    /// Resolves the archetype of this component set, registering any
    /// components seen for the first time.
    fn archetype() -> EngineResult<Archetype>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn archetype() -> EngineResult<Archetype> {
                let mut archetype = Archetype::new();
                $(archetype.set(component_id_of::<$name>()?);)+
                Ok(archetype)
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

/// Resolves the archetype of component set `S`.
///
/// Convenience wrapper over [`ComponentSet::archetype`].
#[inline]
pub fn archetype_of<S: ComponentSet>() -> EngineResult<Archetype> {
    S::archetype()
}
