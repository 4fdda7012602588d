//! Error types for the component registry, chunk layout, and entity store.
//!
//! Each error models a single failure mode and carries enough context to make
//! the failure actionable. All errors implement [`std::error::Error`] and
//! [`fmt::Display`], and provide `From<T>` conversions into the aggregate
//! [`EngineError`] so call sites can bubble failures with `?`.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

use crate::engine::types::{ComponentId, EntityId, LineIndex};

/// Result alias used across the chunk store.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the global component registry.
///
/// ## Context
/// Component ids are issued on first use and are process-wide. Registration
/// can fail when the id space is exhausted or the type is unusable as a
/// component.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// All component ids have been issued.
    CapacityExceeded {
        /// Maximum number of registrable component types.
        cap: usize,
    },

    /// The component type has zero size.
    ///
    /// Zero-sized types carry no bytes to store; tag components must carry
    /// at least one explicit byte.
    ZeroSized {
        /// Rust type name of the offending component.
        name: &'static str,
    },

    /// The component id was never issued.
    UnknownComponent {
        /// Offending id.
        component_id: ComponentId,
    },

    /// The registry lock was poisoned by a panicking thread.
    PoisonedLock,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::CapacityExceeded { cap } => {
                write!(f, "component registry full (capacity {})", cap)
            }
            RegistryError::ZeroSized { name } => {
                write!(f, "zero-sized component type: {}", name)
            }
            RegistryError::UnknownComponent { component_id } => {
                write!(f, "component id {} was never registered", component_id)
            }
            RegistryError::PoisonedLock => f.write_str("component registry lock poisoned"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors raised while computing a chunk layout.
///
/// ## Context
/// A layout partitions one fixed-size chunk buffer into per-component
/// columns. Computation is a pure function of the archetype and the
/// registered component sizes; it fails only on unusable archetypes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutError {
    /// The archetype contains no components.
    EmptyArchetype,

    /// A single row of the archetype exceeds the chunk size, so not even
    /// one entity fits in a chunk.
    RowTooLarge {
        /// Combined byte size of one row.
        row_size: usize,

        /// Byte size of a chunk buffer.
        chunk_size: usize,
    },

    /// A column offset violates its component's alignment.
    ///
    /// Columns are packed contiguously in id order, so a column's offset is
    /// the sum of the preceding column sizes. When that sum is not a
    /// multiple of the component's alignment the layout cannot hand out
    /// references soundly and is rejected.
    MisalignedColumn {
        /// Component whose column start is misaligned.
        component_id: ComponentId,

        /// Computed byte offset of the column.
        offset: usize,

        /// Required alignment of the component type.
        align: usize,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::EmptyArchetype => f.write_str("archetype contains no components"),
            LayoutError::RowTooLarge { row_size, chunk_size } => write!(
                f,
                "row of {} bytes does not fit in a {} byte chunk",
                row_size, chunk_size
            ),
            LayoutError::MisalignedColumn { component_id, offset, align } => write!(
                f,
                "column for component {} starts at offset {} (alignment {})",
                component_id, offset, align
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Errors raised by typed access into a chunk.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// The chunk's archetype does not contain the requested component.
    ComponentNotPresent {
        /// Requested component.
        component_id: ComponentId,
    },

    /// The requested line is at or past the chunk's row count.
    LineOutOfBounds {
        /// Requested row.
        line: LineIndex,

        /// Number of valid rows in the chunk.
        count: u32,
    },

    /// The same component was requested twice in one lock-step iteration,
    /// which would alias a column mutably.
    AliasedColumn {
        /// Duplicated component.
        component_id: ComponentId,
    },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::ComponentNotPresent { component_id } => {
                write!(f, "component {} not present in chunk archetype", component_id)
            }
            AccessError::LineOutOfBounds { line, count } => {
                write!(f, "line {} out of bounds (chunk holds {} rows)", line, count)
            }
            AccessError::AliasedColumn { component_id } => {
                write!(f, "component {} requested more than once", component_id)
            }
        }
    }
}

impl std::error::Error for AccessError {}

/// Returned when an [`EntityId`] does not refer to a live entity.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidEntityError {
    /// Offending entity id.
    pub entity: EntityId,
}

impl fmt::Display for InvalidEntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid entity id {}", self.entity)
    }
}

impl std::error::Error for InvalidEntityError {}

/// Aggregate error for chunk store operations.
///
/// `From<T>` conversions are implemented for all module-level errors so
/// callers can write `?` and still return a single, expressive type.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// Component registry failure.
    Registry(RegistryError),

    /// Chunk layout computation failure.
    Layout(LayoutError),

    /// Typed chunk access failure.
    Access(AccessError),

    /// Stale or unknown entity id.
    InvalidEntity(InvalidEntityError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Registry(e) => write!(f, "{e}"),
            EngineError::Layout(e) => write!(f, "{e}"),
            EngineError::Access(e) => write!(f, "{e}"),
            EngineError::InvalidEntity(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Registry(e) => Some(e),
            EngineError::Layout(e) => Some(e),
            EngineError::Access(e) => Some(e),
            EngineError::InvalidEntity(e) => Some(e),
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(e: RegistryError) -> Self {
        EngineError::Registry(e)
    }
}

impl From<LayoutError> for EngineError {
    fn from(e: LayoutError) -> Self {
        EngineError::Layout(e)
    }
}

impl From<AccessError> for EngineError {
    fn from(e: AccessError) -> Self {
        EngineError::Access(e)
    }
}

impl From<InvalidEntityError> for EngineError {
    fn from(e: InvalidEntityError) -> Self {
        EngineError::InvalidEntity(e)
    }
}
