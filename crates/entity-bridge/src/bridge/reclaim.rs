//! # Destruction Reclaim Queue
//!
//! When a wrapper object goes away its entity usually outlives it: the
//! instance count on the origin entity still has to come down by one and the
//! cached archetype info may have to be released. That bookkeeping needs the
//! entity store, which only the driver may touch, so anything that ends an
//! object outside the update path leaves a [`ReclaimRecord`] here instead.
//!
//! ```text
//! ObjectGuard::drop (any thread)          driver, once per tick
//!   acquire slot from pool                  take newest record
//!   fill atomics                            apply count decrements
//!   publish ───────────────► pending ──────► release slot to pool
//! ```
//!
//! Records are taken strictly one at a time: a record is applied and its
//! slot returned before the next one is taken.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use super::archetype_info::InfoId;
use super::object::ObjectId;
use super::status::ObjectStatus;
use crate::ecs::Entity;
use crate::error::BridgeError;

/// Everything needed to undo one object's contribution to the entity store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReclaimRecord {
    pub object: ObjectId,
    /// Status when the record was captured.
    pub status: ObjectStatus,
    pub entity: Entity,
    pub info: Option<InfoId>,
    pub was_active: bool,
}

impl ReclaimRecord {
    /// A record that only names the object. Guards dropped off the driver
    /// thread cannot see the entity side, so the driver resolves the rest
    /// from the object when it applies the record.
    pub fn unresolved(object: ObjectId, status: ObjectStatus) -> Self {
        Self {
            object,
            status,
            entity: Entity::NULL,
            info: None,
            was_active: false,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.entity.is_null() && self.info.is_none() && !self.was_active
    }
}

const NO_INFO: u64 = u64::MAX;

struct ReclaimSlot {
    object: AtomicU64,
    status: AtomicU8,
    entity: AtomicU64,
    info: AtomicU64,
    was_active: AtomicBool,
}

impl ReclaimSlot {
    fn new() -> Self {
        Self {
            object: AtomicU64::new(0),
            status: AtomicU8::new(0),
            entity: AtomicU64::new(Entity::NULL.to_bits()),
            info: AtomicU64::new(NO_INFO),
            was_active: AtomicBool::new(false),
        }
    }

    fn store(&self, record: &ReclaimRecord) {
        self.object.store(record.object.to_bits(), Ordering::Relaxed);
        self.status.store(record.status as u8, Ordering::Relaxed);
        self.entity.store(record.entity.to_bits(), Ordering::Relaxed);
        self.info.store(
            record.info.map_or(NO_INFO, InfoId::to_bits),
            Ordering::Relaxed,
        );
        self.was_active.store(record.was_active, Ordering::Relaxed);
    }

    fn load(&self) -> ReclaimRecord {
        let info = self.info.load(Ordering::Relaxed);
        ReclaimRecord {
            object: ObjectId::from_bits(self.object.load(Ordering::Relaxed)),
            status: ObjectStatus::from_u8(self.status.load(Ordering::Relaxed)),
            entity: Entity::from_bits(self.entity.load(Ordering::Relaxed)),
            info: (info != NO_INFO).then(|| InfoId::from_bits(info)),
            was_active: self.was_active.load(Ordering::Relaxed),
        }
    }
}

pub struct DestructionReclaimQueue {
    slab: super::lockfree::SlabStack<ReclaimSlot>,
}

impl DestructionReclaimQueue {
    pub fn new(capacity: u32) -> Self {
        Self {
            slab: super::lockfree::SlabStack::new(capacity, ReclaimSlot::new),
        }
    }

    /// Queue a record. Lock-free and callable from any thread.
    pub fn schedule(&self, record: ReclaimRecord) -> Result<(), BridgeError> {
        let slot = self
            .slab
            .acquire()
            .ok_or(BridgeError::ReclaimPoolExhausted {
                capacity: self.slab.capacity(),
            })?;
        self.slab.slot(slot).store(&record);
        self.slab.publish(slot);
        Ok(())
    }

    /// Take the newest record, hand it to `apply`, then return its slot to
    /// the pool. Returns `false` when nothing was pending.
    pub fn process_next(&self, apply: impl FnOnce(ReclaimRecord)) -> bool {
        let Some(slot) = self.slab.take() else {
            return false;
        };
        let record = self.slab.slot(slot).load();
        apply(record);
        self.slab.release(slot);
        true
    }

    pub fn is_empty(&self) -> bool {
        !self.slab.has_pending()
    }

    pub fn pending_len(&self) -> usize {
        self.slab.pending_len()
    }

    /// Records currently in the pool.
    pub fn available(&self) -> usize {
        self.slab.available()
    }

    pub fn capacity(&self) -> usize {
        self.slab.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn record(index: u32) -> ReclaimRecord {
        ReclaimRecord {
            object: ObjectId::new(index, 1),
            status: ObjectStatus::Created,
            entity: Entity {
                index: index + 100,
                generation: 2,
            },
            info: Some(InfoId::new(index, 3)),
            was_active: index % 2 == 0,
        }
    }

    #[test]
    fn records_survive_the_slab() {
        let queue = DestructionReclaimQueue::new(2);
        queue.schedule(record(4)).unwrap();
        let mut applied = Vec::new();
        assert!(queue.process_next(|r| applied.push(r)));
        assert!(!queue.process_next(|r| applied.push(r)));
        assert_eq!(applied, vec![record(4)]);
        assert!(!applied[0].is_unresolved());
    }

    #[test]
    fn unresolved_record_has_no_info() {
        let queue = DestructionReclaimQueue::new(1);
        let r = ReclaimRecord::unresolved(ObjectId::new(9, 0), ObjectStatus::Deserializing);
        queue.schedule(r).unwrap();
        queue.process_next(|loaded| {
            assert!(loaded.is_unresolved());
            assert_eq!(loaded.info, None);
            assert!(loaded.entity.is_null());
            assert_eq!(loaded.status, ObjectStatus::Deserializing);
        });
    }

    #[test]
    fn exhausted_pool_is_reported() {
        let queue = DestructionReclaimQueue::new(1);
        queue.schedule(record(1)).unwrap();
        assert_eq!(
            queue.schedule(record(2)),
            Err(BridgeError::ReclaimPoolExhausted { capacity: 1 })
        );
    }

    #[test]
    fn pool_size_unchanged_after_one_cycle() {
        let queue = DestructionReclaimQueue::new(8);
        let before = queue.available();
        queue.schedule(record(1)).unwrap();
        assert_eq!(queue.pending_len(), 1);
        queue.process_next(|_| {});
        assert_eq!(queue.available(), before);
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_schedules_are_each_applied_once() {
        const THREADS: u32 = 4;
        const PER_THREAD: u32 = 250;
        let queue = Arc::new(DestructionReclaimQueue::new(THREADS * PER_THREAD));
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        queue.schedule(record(t * PER_THREAD + i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = vec![false; (THREADS * PER_THREAD) as usize];
        while queue.process_next(|r| {
            let i = r.object.index() as usize;
            assert!(!seen[i], "record {i} applied twice");
            seen[i] = true;
        }) {}
        assert!(seen.iter().all(|&s| s));
        assert_eq!(queue.available(), queue.capacity());
    }
}
