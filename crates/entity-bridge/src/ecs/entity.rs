//! # Entity — Handles Into the Entity Store
//!
//! An [`Entity`] is an opaque handle: it names a row in a
//! [`World`](super::world::World) but owns nothing. Wrapper objects hold one
//! once their creation has been requested and give it back on destruction.
//!
//! ## Generational Indices
//!
//! Every slot pairs an index with a **generation**. Despawning bumps the
//! generation, so a handle captured before the despawn no longer resolves:
//!
//! ```text
//! Entity { index: 5, generation: 0 }  ← original
//! Entity { index: 5, generation: 1 }  ← after recycle
//! ```
//!
//! ## The Null Handle
//!
//! [`Entity::NULL`] uses `u32::MAX` for both fields. The allocator never hands
//! out that index, so a wrapper that has not been created yet can carry a
//! plain `Entity` instead of an `Option<Entity>`, mirroring how the reference
//! counts and reclaim records store handles in atomics.

use std::fmt;

/// A lightweight handle to an entity in a [`World`](super::world::World).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// The sentinel "no entity" handle.
    pub const NULL: Entity = Entity {
        index: u32::MAX,
        generation: u32::MAX,
    };

    /// Returns the raw index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation. Useful for diagnostics.
    pub fn generation(self) -> u32 {
        self.generation
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// Pack into a single word so the handle can live in an `AtomicU64`.
    pub(crate) fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Entity {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}v{}", self.index, self.generation)
        }
    }
}

/// Manages entity ID allocation and recycling.
///
/// ```text
/// generations: [0, 1, 0, 2, 0]   ← one generation per slot ever allocated
/// free_list:   [1, 3]             ← slots available for reuse
/// ```
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Allocate a new [`Entity`], reusing a freed slot when one is available.
    ///
    /// # Panics
    ///
    /// Panics if the slot space would reach the index reserved for
    /// [`Entity::NULL`].
    pub fn allocate(&mut self) -> Entity {
        if let Some(index) = self.free_list.pop() {
            let generation = self.generations[index as usize];
            return Entity { index, generation };
        }
        let index = u32::try_from(self.generations.len())
            .ok()
            .filter(|&i| i != u32::MAX)
            .unwrap_or_else(|| panic!("entity index space exhausted"));
        self.generations.push(0);
        Entity {
            index,
            generation: 0,
        }
    }

    /// Free an entity slot. Returns `false` if the handle was already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = &mut self.generations[entity.index as usize];
        // Skip the sentinel generation so a recycled slot can never equal NULL.
        *slot = slot.wrapping_add(1);
        if *slot == u32::MAX {
            *slot = 0;
        }
        self.free_list.push(entity.index);
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.generations
            .get(entity.index as usize)
            .is_some_and(|&generation| generation == entity.generation)
    }

    pub fn alive_count(&self) -> usize {
        self.generations.len() - self.free_list.len()
    }

    #[cfg(any(feature = "diagnostics", test))]
    pub(crate) fn free_count(&self) -> usize {
        self.free_list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_sequential() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        let e1 = alloc.allocate();
        assert_eq!(e0.index, 0);
        assert_eq!(e1.index, 1);
        assert_eq!(e0.generation, 0);
    }

    #[test]
    fn recycle_bumps_generation() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        assert!(alloc.deallocate(e0));
        let reused = alloc.allocate();
        assert_eq!(reused.index, 0);
        assert_eq!(reused.generation, 1);
        assert!(!alloc.is_alive(e0));
    }

    #[test]
    fn double_free_returns_false() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        assert!(alloc.deallocate(e0));
        assert!(!alloc.deallocate(e0));
        assert_eq!(alloc.free_count(), 1);
    }

    #[test]
    fn null_is_never_alive() {
        let mut alloc = EntityAllocator::new();
        let _ = alloc.allocate();
        assert!(!alloc.is_alive(Entity::NULL));
        assert!(Entity::NULL.is_null());
        assert!(Entity::default().is_null());
    }

    #[test]
    fn bits_survive_packing() {
        let e = Entity {
            index: 7,
            generation: 3,
        };
        assert_eq!(Entity::from_bits(e.to_bits()), e);
        assert_eq!(Entity::from_bits(Entity::NULL.to_bits()), Entity::NULL);
    }

    #[test]
    fn alive_count_tracks_frees() {
        let mut alloc = EntityAllocator::new();
        let e0 = alloc.allocate();
        let _e1 = alloc.allocate();
        assert_eq!(alloc.alive_count(), 2);
        alloc.deallocate(e0);
        assert_eq!(alloc.alive_count(), 1);
    }
}
