//! Core identifiers, capacity constants, and the archetype bitset.
//!
//! This module defines the **fundamental types and bit layouts** shared by
//! every part of the chunk store: component identifiers, entity identifiers,
//! location indices, and the [`Archetype`] bitset that describes which
//! components an entity carries.
//!
//! ## Design Philosophy
//!
//! The store is designed around:
//!
//! - **Dense storage** — component data packed into fixed-size chunks,
//! - **Bitset-based archetypes** — set membership as pure bitwise operations,
//! - **Stable numeric identifiers** — small, copyable ids for all concepts.
//!
//! ## Capacity constants
//!
//! All capacities are compile-time constants and are validated with static
//! assertions. They are part of the system boundary and cannot be changed at
//! runtime:
//!
//! - [`CHUNK_SIZE`] — byte size of one chunk buffer,
//! - [`MAX_COMPONENTS`] — width of the archetype bitset,
//! - [`POOL_SIZE`] — number of slots in the job pool.
//!
//! ## Archetypes
//!
//! Components are identified by compact [`ComponentId`] values. An
//! [`Archetype`] is a fixed-width bitset with bit *k* set iff component *k*
//! is present. Equality and subset tests are bitwise; the order in which
//! components were named is irrelevant, so `{A, B}` and `{B, A}` produce
//! identical archetypes.

/// Unique identifier for a component type, dense from 0.
pub type ComponentId = u16;

/// Globally unique entity identifier, assigned monotonically from 0.
pub type EntityId = u64;

/// Index of a chunk family within the entity manager.
pub type FamilyIndex = u32;

/// Index of a chunk within a family.
pub type ChunkIndex = u32;

/// Row index within a chunk.
pub type LineIndex = u32;

/// Index of a slot in the job pool.
pub type JobId = u32;

/// Generation counter used to detect recycled job slots.
pub type JobVersion = u64;

/// Size in bytes of one chunk buffer.
pub const CHUNK_SIZE: usize = 16_384;

/// Maximum number of registered component types, and the width of the
/// archetype bitset.
pub const MAX_COMPONENTS: usize = 32;

/// Number of `u64` words required to represent a full archetype bitset.
pub const ARCHETYPE_WORDS: usize = (MAX_COMPONENTS + 63) / 64;

/// Alignment of every chunk buffer. Column base addresses inherit this
/// alignment, so any component with `align <= CHUNK_ALIGN` can live at an
/// aligned column offset.
pub const CHUNK_ALIGN: usize = 64;

/// Number of slots in the job pool.
pub const POOL_SIZE: usize = 65_536;

const _: [(); 1] = [(); (MAX_COMPONENTS > 0) as usize];
const _: [(); 1] = [(); (MAX_COMPONENTS <= ComponentId::MAX as usize + 1) as usize];
const _: [(); 1] = [(); (CHUNK_SIZE > 0 && CHUNK_SIZE % CHUNK_ALIGN == 0) as usize];
const _: [(); 1] = [(); (POOL_SIZE <= JobId::MAX as usize + 1) as usize];

/// Bitset over component ids of width [`MAX_COMPONENTS`].
///
/// ## Purpose
/// Describes the exact component set an entity carries. Every chunk family
/// and chunk layout is keyed by one archetype.
///
/// ## Invariants
/// - Bit *k* is set iff component id *k* is present.
/// - Bits at or above [`MAX_COMPONENTS`] are never set.
/// - Two archetypes are equal iff their bit patterns are equal, regardless
///   of the order components were added in.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Archetype {
    words: [u64; ARCHETYPE_WORDS],
}

impl Archetype {
    /// Creates an empty archetype.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bit corresponding to `component_id`.
    #[inline]
    pub fn set(&mut self, component_id: ComponentId) {
        debug_assert!((component_id as usize) < MAX_COMPONENTS);
        let index = (component_id as usize) / 64;
        let bit = (component_id as usize) % 64;
        self.words[index] |= 1u64 << bit;
    }

    /// Clears the bit corresponding to `component_id`.
    #[inline]
    pub fn clear(&mut self, component_id: ComponentId) {
        let index = (component_id as usize) / 64;
        let bit = (component_id as usize) % 64;
        self.words[index] &= !(1u64 << bit);
    }

    /// Returns `true` if `component_id` is present in this archetype.
    #[inline]
    pub fn has(&self, component_id: ComponentId) -> bool {
        let index = (component_id as usize) / 64;
        let bit = (component_id as usize) % 64;
        (self.words[index] >> bit) & 1 == 1
    }

    /// Returns `true` if every component in `other` is also present here.
    #[inline]
    pub fn contains(&self, other: &Archetype) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| (a & b) == *b)
    }

    /// Returns `true` if no component bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns the bitwise union of two archetypes.
    #[inline]
    pub fn union(&self, other: &Archetype) -> Archetype {
        let mut words = self.words;
        for (d, s) in words.iter_mut().zip(other.words.iter()) {
            *d |= *s;
        }
        Archetype { words }
    }

    /// Iterates over all component ids set in this archetype, ascending.
    pub fn iter_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * 64;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some((base + tz) as ComponentId)
            })
        })
    }
}

/// Builds an archetype from a list of component ids.
pub fn build_archetype(component_ids: &[ComponentId]) -> Archetype {
    let mut archetype = Archetype::new();
    for &component_id in component_ids {
        archetype.set(component_id);
    }
    archetype
}
