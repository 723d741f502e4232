//! The deferred creation queue: objects that finished deserializing and are
//! waiting for the next drain to create their entity.
//!
//! Producers are deserialization hooks on any thread; the consumer is the
//! driver's [`create_all_deserialized_entities`] call. Pop order is stack
//! order (most recent first) and nothing promises FIFO.
//!
//! [`create_all_deserialized_entities`]: super::context::BridgeContext::create_all_deserialized_entities

use std::sync::atomic::{AtomicU64, Ordering};

use super::lockfree::SlabStack;
use super::object::ObjectId;
use crate::error::BridgeError;

pub struct DeferredCreationQueue {
    slab: SlabStack<AtomicU64>,
}

impl DeferredCreationQueue {
    pub fn new(capacity: u32) -> Self {
        Self {
            slab: SlabStack::new(capacity, || AtomicU64::new(0)),
        }
    }

    pub fn push(&self, id: ObjectId) -> Result<(), BridgeError> {
        let slot = self.slab.acquire().ok_or(BridgeError::QueueFull {
            capacity: self.slab.capacity(),
        })?;
        self.slab.slot(slot).store(id.to_bits(), Ordering::Relaxed);
        self.slab.publish(slot);
        log::trace!("deferred creation of {id}");
        Ok(())
    }

    pub fn pop(&self) -> Option<ObjectId> {
        let slot = self.slab.take()?;
        let id = ObjectId::from_bits(self.slab.slot(slot).load(Ordering::Relaxed));
        self.slab.release(slot);
        Some(id)
    }

    /// Queued objects, head first.
    pub fn snapshot(&self) -> Vec<ObjectId> {
        self.slab
            .pending_indices()
            .into_iter()
            .map(|slot| ObjectId::from_bits(self.slab.slot(slot).load(Ordering::Relaxed)))
            .collect()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.snapshot().contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        !self.slab.has_pending()
    }

    pub fn len(&self) -> usize {
        self.slab.pending_len()
    }

    pub fn capacity(&self) -> usize {
        self.slab.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn id(index: u32) -> ObjectId {
        ObjectId::new(index, 0)
    }

    #[test]
    fn push_pop_and_contains() {
        let queue = DeferredCreationQueue::new(4);
        queue.push(id(1)).unwrap();
        queue.push(id(2)).unwrap();
        assert!(queue.contains(id(1)));
        assert!(!queue.contains(id(3)));
        assert_eq!(queue.snapshot(), vec![id(2), id(1)]);

        assert_eq!(queue.pop(), Some(id(2)));
        assert_eq!(queue.pop(), Some(id(1)));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_reports_capacity() {
        let queue = DeferredCreationQueue::new(1);
        queue.push(id(1)).unwrap();
        assert_eq!(
            queue.push(id(2)),
            Err(BridgeError::QueueFull { capacity: 1 })
        );
    }

    #[test]
    fn concurrent_pushes_then_several_drains() {
        const THREADS: u32 = 6;
        const PER_THREAD: u32 = 300;
        let queue = Arc::new(DeferredCreationQueue::new(THREADS * PER_THREAD));

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        queue.push(ObjectId::new(t * PER_THREAD + i, t)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = HashSet::new();
        // Several partial drains, as a driver would across ticks.
        for _ in 0..3 {
            for _ in 0..(THREADS * PER_THREAD / 3) {
                if let Some(popped) = queue.pop() {
                    assert!(seen.insert(popped));
                }
            }
        }
        while let Some(popped) = queue.pop() {
            assert!(seen.insert(popped));
        }
        assert_eq!(seen.len() as u32, THREADS * PER_THREAD);
        assert!(queue.is_empty());
    }
}
