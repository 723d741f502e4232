//! # Lock-Free Slab Stacks
//!
//! Both bridge queues are multi-producer / single-consumer stacks. Records
//! never move: they live in a fixed slab allocated up front, and the stacks
//! only shuffle slot *indices* around. Each slab carries two Treiber stacks
//! that share one `next` array:
//!
//! ```text
//! slots:  [ P0 ][ P1 ][ P2 ][ P3 ][ P4 ]
//! links:  [ 3  ][ NIL][ 4  ][ NIL][ 1  ]
//!
//! free    head ──► 0 ──► 3            (records available to producers)
//! pending head ──► 2 ──► 4 ──► 1      (records waiting for the consumer)
//! ```
//!
//! A slot is on at most one stack at a time. Its link is written only by
//! whichever thread just removed it from a stack, so the link is private to
//! that thread until the next push publishes it.
//!
//! ## ABA
//!
//! Each head is an `AtomicU64` packing a 32-bit tag above a 32-bit index. Every
//! successful CAS bumps the tag. A pop that read `head = 2, next = 4` and
//! was then preempted while slot 2 was popped and pushed back fails its
//! CAS, because the tag moved on even though the index is 2 again.
//!
//! ## Comparison
//!
//! - **crossbeam-epoch / Treiber on pointers**: needs deferred reclamation to
//!   free nodes safely.
//! - **here**: nodes are never freed (the slab outlives every stack operation),
//!   so indices plus tags are enough and there is no unsafe code.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Link value meaning "end of stack".
pub(crate) const NIL: u32 = u32::MAX;

fn pack(tag: u32, index: u32) -> u64 {
    ((tag as u64) << 32) | index as u64
}

fn unpack(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}

/// A tagged head index.
struct TaggedHead {
    word: AtomicU64,
}

impl TaggedHead {
    fn new(index: u32) -> Self {
        Self {
            word: AtomicU64::new(pack(0, index)),
        }
    }

    fn push(&self, links: &[AtomicU32], index: u32) {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            let (tag, top) = unpack(current);
            links[index as usize].store(top, Ordering::Relaxed);
            match self.word.compare_exchange_weak(
                current,
                pack(tag.wrapping_add(1), index),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    fn pop(&self, links: &[AtomicU32]) -> Option<u32> {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            let (tag, top) = unpack(current);
            if top == NIL {
                return None;
            }
            let next = links[top as usize].load(Ordering::Relaxed);
            match self.word.compare_exchange_weak(
                current,
                pack(tag.wrapping_add(1), next),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(top),
                Err(actual) => current = actual,
            }
        }
    }

    fn top(&self) -> u32 {
        unpack(self.word.load(Ordering::Acquire)).1
    }
}

/// A fixed slab of `P` records with a free stack and a pending stack.
///
/// `P` is expected to be made of atomics: producers fill a slot between
/// [`acquire`](Self::acquire) and [`publish`](Self::publish), the consumer
/// reads it between [`take`](Self::take) and [`release`](Self::release).
pub(crate) struct SlabStack<P> {
    slots: Box<[P]>,
    links: Box<[AtomicU32]>,
    free: TaggedHead,
    pending: TaggedHead,
    // Upper bounds: incremented before a push, decremented after a pop.
    free_len: AtomicUsize,
    pending_len: AtomicUsize,
}

impl<P> SlabStack<P> {
    /// # Panics
    ///
    /// Panics if `capacity` reaches the reserved [`NIL`] index.
    pub fn new(capacity: u32, mut init: impl FnMut() -> P) -> Self {
        assert!(capacity < NIL, "slab capacity {capacity} is too large");
        let slots: Box<[P]> = (0..capacity).map(|_| init()).collect();
        let links: Box<[AtomicU32]> = (0..capacity)
            .map(|i| AtomicU32::new(if i + 1 < capacity { i + 1 } else { NIL }))
            .collect();
        Self {
            slots,
            links,
            free: TaggedHead::new(if capacity > 0 { 0 } else { NIL }),
            pending: TaggedHead::new(NIL),
            free_len: AtomicUsize::new(capacity as usize),
            pending_len: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: u32) -> &P {
        &self.slots[index as usize]
    }

    /// Take a slot from the pool. `None` when the pool is exhausted.
    pub fn acquire(&self) -> Option<u32> {
        let index = self.free.pop(&self.links)?;
        self.free_len.fetch_sub(1, Ordering::Relaxed);
        Some(index)
    }

    /// Return a slot to the pool.
    pub fn release(&self, index: u32) {
        self.free_len.fetch_add(1, Ordering::Relaxed);
        self.free.push(&self.links, index);
    }

    /// Make a filled slot visible to the consumer.
    pub fn publish(&self, index: u32) {
        self.pending_len.fetch_add(1, Ordering::Relaxed);
        self.pending.push(&self.links, index);
    }

    /// Pop the most recently published slot.
    pub fn take(&self) -> Option<u32> {
        let index = self.pending.pop(&self.links)?;
        self.pending_len.fetch_sub(1, Ordering::Relaxed);
        Some(index)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.top() != NIL
    }

    pub fn pending_len(&self) -> usize {
        self.pending_len.load(Ordering::Relaxed)
    }

    pub fn available(&self) -> usize {
        self.free_len.load(Ordering::Relaxed)
    }

    /// Walk the pending stack from the head without removing anything.
    ///
    /// Exact when called by the consumer (nothing is popped concurrently);
    /// from any other thread it is a best-effort snapshot. The walk is
    /// bounded by the slab capacity so a concurrently recycled slot cannot
    /// make it loop.
    pub fn pending_indices(&self) -> Vec<u32> {
        let mut indices = Vec::new();
        let mut cursor = self.pending.top();
        while cursor != NIL && indices.len() < self.slots.len() {
            indices.push(cursor);
            cursor = self.links[cursor as usize].load(Ordering::Acquire);
        }
        indices
    }
}
