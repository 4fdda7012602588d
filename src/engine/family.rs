//! Chunk families: all chunks sharing one archetype, in insertion order.

use std::sync::Arc;

use log::trace;

use crate::engine::chunk::{Chunk, ChunkLayout};
use crate::engine::types::{Archetype, ChunkIndex, LineIndex};

/// Ordered sequence of chunks with a common archetype.
///
/// ## Invariants
/// - Every chunk references the same layout, whose archetype equals the
///   family's.
/// - All chunks except possibly the last are full; the last chunk holds at
///   least one row (a family never ends in an empty chunk).

pub struct ChunkFamily {
    archetype: Archetype,
    layout: Arc<ChunkLayout>,
    chunks: Vec<Chunk>,
}

impl ChunkFamily {
    /// Creates a family for `layout`'s archetype with no chunks yet.
    pub fn new(layout: Arc<ChunkLayout>) -> Self {
        Self {
            archetype: layout.archetype,
            layout,
            chunks: Vec::new(),
        }
    }

    /// Returns the family's archetype.
    #[inline]
    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Returns the chunks of this family in insertion order.
    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Returns the chunks of this family mutably, in insertion order.
    #[inline]
    pub fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    /// Appends one row, allocating a new chunk when the last one is full.
    ///
    /// Returns the `(chunk, line)` position of the claimed row. The row is
    /// zero-initialised; the caller writes the component values.
    pub fn push_row(&mut self) -> (ChunkIndex, LineIndex) {
        if let Some(last) = self.chunks.last_mut() {
            if let Some(line) = last.push_line() {
                return ((self.chunks.len() - 1) as ChunkIndex, line);
            }
        }

        trace!(
            "allocating chunk {} for archetype {:?}",
            self.chunks.len(),
            self.archetype
        );

        let mut chunk = Chunk::new(Arc::clone(&self.layout));
        let line = chunk.push_line().expect("fresh chunk has capacity");
        self.chunks.push(chunk);
        ((self.chunks.len() - 1) as ChunkIndex, line)
    }
}
