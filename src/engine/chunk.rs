//! Chunk layout computation and the chunk buffer.
//!
//! A chunk is one fixed-size byte buffer holding up to `capacity` entities
//! of a single archetype, arranged as parallel columns: all values of
//! component *k* sit contiguously, one column after another in increasing
//! id order. The [`ChunkLayout`] records where each column starts and how
//! many rows fit; it is computed once per archetype and shared by every
//! chunk of that archetype through an `Arc`.
//!
//! ## Layout algorithm
//!
//! For an archetype with component sizes `s_k`:
//!
//! 1. `row_size = Σ s_k` over all present components,
//! 2. `capacity = CHUNK_SIZE / row_size` (at least one row must fit),
//! 3. walking ids in ascending order, column *k* starts at the running
//!    offset and occupies `capacity * s_k` bytes.
//!
//! Columns never overlap and the final column ends at or before
//! `CHUNK_SIZE`. Because columns are packed with no padding, a column
//! start must already be a multiple of its component's alignment; layouts
//! violating this are rejected rather than handing out unaligned
//! references. Chunk buffers themselves are 64-byte aligned.
//!
//! ## Data model
//!
//! Components are plain bit-patterns ([`Component`] requires `Copy`), so
//! chunk storage copies bytes and never runs destructors. Rows are
//! zero-initialised on chunk allocation; a row's contents are meaningful
//! only after the caller has written each component.

use std::sync::Arc;

use crate::engine::component::{component_id_of, component_info, Component, ComponentSet};
use crate::engine::error::{AccessError, EngineResult, LayoutError};
use crate::engine::types::{Archetype, ComponentId, LineIndex, CHUNK_SIZE, MAX_COMPONENTS};

/// Immutable description of how one archetype's components are packed into
/// a chunk buffer.
///
/// ## Invariants
/// - `column_offsets[k]` is meaningful only if bit *k* is set in
///   `archetype`.
/// - Columns are laid out in increasing-id order, contiguously from
///   offset 0.
/// - `column_offsets[k] + capacity * size(k) <= CHUNK_SIZE` for every
///   present component.

#[derive(Debug)]
pub struct ChunkLayout {
    /// The component set this layout was computed for.
    pub archetype: Archetype,

    /// Byte offset of each component's column within the chunk buffer.
    pub column_offsets: [usize; MAX_COMPONENTS],

    /// Number of entity rows that fit in one chunk.
    pub capacity: usize,
}

impl ChunkLayout {
    /// Returns the byte offset of the column for `component_id`.
    ///
    /// ## Errors
    /// [`AccessError::ComponentNotPresent`] if the archetype does not
    /// contain the component.
    #[inline]
    pub fn column_offset(&self, component_id: ComponentId) -> EngineResult<usize> {
        if !self.archetype.has(component_id) {
            return Err(AccessError::ComponentNotPresent { component_id }.into());
        }
        Ok(self.column_offsets[component_id as usize])
    }
}

/// Computes the chunk layout for `archetype`.
///
/// Pure function of the archetype and the registered component sizes;
/// deterministic and allocation-free beyond the returned record.
///
/// ## Errors
/// - [`LayoutError::EmptyArchetype`] if no component bit is set.
/// - [`LayoutError::RowTooLarge`] if a single row exceeds [`CHUNK_SIZE`].
/// - [`LayoutError::MisalignedColumn`] if a column start would violate its
///   component's alignment.

pub fn compute_chunk_layout(archetype: Archetype) -> EngineResult<ChunkLayout> {
    if archetype.is_empty() {
        return Err(LayoutError::EmptyArchetype.into());
    }

    let mut row_size = 0usize;
    for component_id in archetype.iter_ids() {
        row_size += component_info(component_id)?.size;
    }

    let capacity = CHUNK_SIZE / row_size;
    if capacity == 0 {
        return Err(LayoutError::RowTooLarge { row_size, chunk_size: CHUNK_SIZE }.into());
    }

    let mut column_offsets = [0usize; MAX_COMPONENTS];
    let mut offset = 0usize;
    for component_id in archetype.iter_ids() {
        let info = component_info(component_id)?;
        if offset % info.align != 0 {
            return Err(LayoutError::MisalignedColumn {
                component_id,
                offset,
                align: info.align,
            }
            .into());
        }
        column_offsets[component_id as usize] = offset;
        offset += capacity * info.size;
    }

    debug_assert!(offset <= CHUNK_SIZE);

    Ok(ChunkLayout { archetype, column_offsets, capacity })
}

/// Backing buffer of one chunk, aligned so every column base address is
/// aligned for any component with `align <= CHUNK_ALIGN`.
#[repr(C, align(64))]
struct ChunkMemory {
    bytes: [u8; CHUNK_SIZE],
}

/// A fixed-size columnar buffer holding rows of one archetype.
///
/// ## Purpose
/// Owns [`CHUNK_SIZE`] bytes of component data plus the current row count,
/// interpreted through the shared [`ChunkLayout`]. Typed access resolves a
/// component to its column offset and indexes by row.
///
/// ## Invariants
/// - `count <= layout.capacity`.
/// - All chunks of a family share the same layout `Arc`.

pub struct Chunk {
    layout: Arc<ChunkLayout>,
    count: u32,
    memory: Box<ChunkMemory>,
}

impl Chunk {
    /// Creates an empty, zero-initialised chunk interpreting its buffer
    /// through `layout`.
    pub fn new(layout: Arc<ChunkLayout>) -> Self {
        Self {
            layout,
            count: 0,
            memory: Box::new(ChunkMemory { bytes: [0u8; CHUNK_SIZE] }),
        }
    }

    /// Returns the current number of valid rows.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Returns the maximum number of rows this chunk can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.layout.capacity
    }

    /// Returns the archetype of this chunk.
    #[inline]
    pub fn archetype(&self) -> Archetype {
        self.layout.archetype
    }

    /// Returns the shared layout this chunk is interpreted through.
    #[inline]
    pub fn layout(&self) -> &Arc<ChunkLayout> {
        &self.layout
    }

    /// Claims the next free line, incrementing the row count.
    ///
    /// Returns `None` if the chunk is full. The claimed row is
    /// zero-initialised; the caller is expected to write each component.
    pub(crate) fn push_line(&mut self) -> Option<LineIndex> {
        if (self.count as usize) < self.layout.capacity {
            let line = self.count;
            self.count += 1;
            Some(line)
        } else {
            None
        }
    }

    #[inline]
    fn check_line(&self, line: LineIndex) -> EngineResult<()> {
        if line >= self.count {
            return Err(AccessError::LineOutOfBounds { line, count: self.count }.into());
        }
        Ok(())
    }

    #[inline]
    fn column_offset_of<T: Component>(&self) -> EngineResult<usize> {
        let component_id = component_id_of::<T>()?;
        self.layout.column_offset(component_id)
    }

    /// Returns a reference to component `T` at row `line`.
    ///
    /// ## Errors
    /// - [`AccessError::ComponentNotPresent`] if the archetype lacks `T`.
    /// - [`AccessError::LineOutOfBounds`] if `line >= count`.
    pub fn get<T: Component>(&self, line: LineIndex) -> EngineResult<&T> {
        let offset = self.column_offset_of::<T>()?;
        self.check_line(line)?;
        let pointer = unsafe {
            self.memory
                .bytes
                .as_ptr()
                .add(offset)
                .cast::<T>()
                .add(line as usize)
        };
        Ok(unsafe { &*pointer })
    }

    /// Returns a mutable reference to component `T` at row `line`.
    ///
    /// ## Errors
    /// As [`Chunk::get`].
    pub fn get_mut<T: Component>(&mut self, line: LineIndex) -> EngineResult<&mut T> {
        let offset = self.column_offset_of::<T>()?;
        self.check_line(line)?;
        let pointer = unsafe {
            self.memory
                .bytes
                .as_mut_ptr()
                .add(offset)
                .cast::<T>()
                .add(line as usize)
        };
        Ok(unsafe { &mut *pointer })
    }

    /// Writes `value` into component `T` at row `line`.
    ///
    /// ## Errors
    /// As [`Chunk::get`].
    pub fn set<T: Component>(&mut self, line: LineIndex, value: T) -> EngineResult<()> {
        *self.get_mut::<T>(line)? = value;
        Ok(())
    }

    /// Returns the whole column for `T` as a typed slice of `count`
    /// elements.
    pub fn column<T: Component>(&self) -> EngineResult<&[T]> {
        let offset = self.column_offset_of::<T>()?;
        let pointer = unsafe { self.memory.bytes.as_ptr().add(offset).cast::<T>() };
        Ok(unsafe { std::slice::from_raw_parts(pointer, self.count as usize) })
    }

    /// Returns the whole column for `T` as a mutable typed slice of
    /// `count` elements.
    pub fn column_mut<T: Component>(&mut self) -> EngineResult<&mut [T]> {
        let offset = self.column_offset_of::<T>()?;
        let pointer = unsafe { self.memory.bytes.as_mut_ptr().add(offset).cast::<T>() };
        Ok(unsafe { std::slice::from_raw_parts_mut(pointer, self.count as usize) })
    }

    /// Invokes `f` once per row with one mutable reference per component
    /// in `S`, advancing all columns in lock-step.
    ///
    /// Column base pointers are resolved once before the loop; the loop
    /// itself performs no bounds or membership checks.
    ///
    /// ## Errors
    /// - [`AccessError::ComponentNotPresent`] if the archetype lacks a
    ///   requested component.
    /// - [`AccessError::AliasedColumn`] if `S` names a component twice.
    pub fn each<S, F>(&mut self, f: F) -> EngineResult<()>
    where
        S: ColumnSet,
        F: for<'a> FnMut(S::Row<'a>),
    {
        S::visit_rows(self, f)
    }
}

/// A [`ComponentSet`] that can drive lock-step row iteration over a chunk.
///
/// Implemented for tuples of one to eight distinct components. For the
/// tuple `(A, B)` the row type is `(&mut A, &mut B)`.
pub trait ColumnSet: ComponentSet {
    /// One row of references, one per component in the set.
    type Row<'a>;

    /// Resolves column base pointers and invokes `f` for each row.
    fn visit_rows<Func: for<'a> FnMut(Self::Row<'a>)>(
        chunk: &mut Chunk,
        f: Func,
    ) -> EngineResult<()>;
}

macro_rules! impl_column_set {
    ($(($name:ident, $index:tt)),+) => {
        impl<$($name: Component),+> ColumnSet for ($($name,)+) {
            type Row<'a> = ($(&'a mut $name,)+);

            fn visit_rows<Func: for<'a> FnMut(Self::Row<'a>)>(
                chunk: &mut Chunk,
                mut f: Func,
            ) -> EngineResult<()> {
                let ids = [$(component_id_of::<$name>()?),+];
                for (i, a) in ids.iter().enumerate() {
                    if ids[i + 1..].contains(a) {
                        return Err(AccessError::AliasedColumn { component_id: *a }.into());
                    }
                }

                let count = chunk.count() as usize;
                let offsets = ($(chunk.layout.column_offset(ids[$index])?,)+);

                // Base pointers are taken last so no further borrows of the
                // chunk occur while they are live.
                let base = chunk.memory.bytes.as_mut_ptr();
                let columns = ($(unsafe { base.add(offsets.$index).cast::<$name>() },)+);

                for row in 0..count {
                    f(($(unsafe { &mut *columns.$index.add(row) },)+));
                }
                Ok(())
            }
        }
    };
}

impl_column_set!((A, 0));
impl_column_set!((A, 0), (B, 1));
impl_column_set!((A, 0), (B, 1), (C, 2));
impl_column_set!((A, 0), (B, 1), (C, 2), (D, 3));
impl_column_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4));
impl_column_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5));
impl_column_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6));
impl_column_set!((A, 0), (B, 1), (C, 2), (D, 3), (E, 4), (F, 5), (G, 6), (H, 7));
