//! # Sim Engine
//!
//! Data-oriented entity storage and job scheduling for high-throughput
//! simulation.
//!
//! Two subsystems, coupled in intent but independent in machinery:
//!
//! - **Archetype chunk store** — entities grouped by the exact set of
//!   components they carry, packed into fixed-size memory chunks arranged
//!   as parallel columns for cache-friendly iteration.
//! - **Job system** — a fixed-capacity, handle-addressed task pool with
//!   parent/child aggregation and continuations, serviced by a bounded
//!   worker pool; waiting threads borrow work instead of parking.
//!
//! ## Design Goals
//! - Archetype-based storage for cache efficiency
//! - Small dense identifiers, resolved once per operation
//! - Handles that cannot outlive what they reference
//! - No parked caller threads

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod engine;
pub mod jobs;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Chunk store

pub use engine::entity::{ComponentBundle, EntityLocation, EntityManager};

pub use engine::component::{
    archetype_of,
    component_id_of,
    component_info,
    Component,
    ComponentInfo,
    ComponentSet,
};

pub use engine::chunk::{compute_chunk_layout, Chunk, ChunkLayout, ColumnSet};

pub use engine::family::ChunkFamily;

pub use engine::error::{
    AccessError,
    EngineError,
    EngineResult,
    InvalidEntityError,
    LayoutError,
    RegistryError,
};

pub use engine::types::{
    Archetype,
    ComponentId,
    EntityId,
    CHUNK_SIZE,
    MAX_COMPONENTS,
    POOL_SIZE,
};

// Job system

pub use jobs::pool::{ContinuationStatus, JobHandle, JobPool, PoolExhausted, Task};
pub use jobs::system::JobSystem;

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used types.
///
/// Import with:
/// ```rust
/// use sim_engine::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        archetype_of,
        component_id_of,
        Archetype,
        Chunk,
        EntityId,
        EntityManager,
        JobHandle,
        JobSystem,
    };
}
