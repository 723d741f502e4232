//! # Wrapper Objects
//!
//! A wrapper object is split in two:
//!
//! - a [`GameObjectEntity`] record owned by the driver inside the
//!   [`BridgeContext`](super::context::BridgeContext) arena: name, world,
//!   entity handle, cached archetype info, declaration, callbacks;
//! - an [`ObjectHeader`] in the shared [`ObjectTable`] holding the few fields
//!   other threads touch: status, generation, the queued marker and the
//!   closed flag.
//!
//! ```text
//!                 Arc<ObjectTable>
//!   Deserializer ───────┤            ├─────── ObjectGuard (drop)
//!   (any thread)        │ headers[i] │        (any thread)
//!                       └─────┬──────┘
//!                             │ same index
//!   BridgeContext ──► objects[i]: GameObjectEntity   (driver only)
//! ```
//!
//! Status and generation share one atomic word, so a hook holding a stale
//! [`ObjectId`] can never move a recycled slot's status.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

use super::archetype_info::InfoId;
use super::declaration::ComponentDeclaration;
use super::deferred::DeferredCreationQueue;
use super::reclaim::{DestructionReclaimQueue, ReclaimRecord};
use super::status::ObjectStatus;
use crate::ecs::Entity;
use crate::error::BridgeError;

/// Stable handle to a wrapper object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub const NULL: ObjectId = ObjectId {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    pub(crate) fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "ObjectId(null)")
        } else {
            write!(f, "ObjectId({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

const NOT_QUEUED: u32 = u32::MAX;

fn pack(generation: u32, status: ObjectStatus) -> u64 {
    ((generation as u64) << 32) | status as u64
}

fn unpack(word: u64) -> (u32, ObjectStatus) {
    ((word >> 32) as u32, ObjectStatus::from_u8(word as u8))
}

/// The thread-shared part of a wrapper object.
pub(crate) struct ObjectHeader {
    /// `generation << 32 | status`.
    state: AtomicU64,
    /// Generation of the id currently in the deferred queue, or `NOT_QUEUED`.
    queued: AtomicU32,
    info_valid: AtomicBool,
    is_instance: AtomicBool,
    closed: AtomicBool,
}

impl ObjectHeader {
    fn new() -> Self {
        Self {
            state: AtomicU64::new(pack(0, ObjectStatus::None)),
            queued: AtomicU32::new(NOT_QUEUED),
            info_valid: AtomicBool::new(false),
            is_instance: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    fn generation(&self) -> u32 {
        unpack(self.state.load(Ordering::Acquire)).0
    }
}

/// Fixed table of object headers, indexed by [`ObjectId::index`].
pub(crate) struct ObjectTable {
    headers: Box<[ObjectHeader]>,
    leaked: AtomicUsize,
}

impl ObjectTable {
    pub fn new(capacity: u32) -> Self {
        Self {
            headers: (0..capacity).map(|_| ObjectHeader::new()).collect(),
            leaked: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.headers.len()
    }

    /// Id for the object that will occupy slot `index` next.
    pub fn id_at(&self, index: u32) -> ObjectId {
        ObjectId::new(index, self.headers[index as usize].generation())
    }

    fn header(&self, id: ObjectId) -> Option<&ObjectHeader> {
        self.headers
            .get(id.index as usize)
            .filter(|header| header.generation() == id.generation)
    }

    /// Current status. Stale ids report [`ObjectStatus::Destroyed`].
    pub fn status(&self, id: ObjectId) -> ObjectStatus {
        match self.headers.get(id.index as usize) {
            Some(header) => {
                let (generation, status) = unpack(header.state.load(Ordering::Acquire));
                if generation == id.generation {
                    status
                } else {
                    ObjectStatus::Destroyed
                }
            }
            None => ObjectStatus::Destroyed,
        }
    }

    /// Move `id` from `from` to `to`. Fails if either the status or the
    /// generation moved on.
    pub fn transition(&self, id: ObjectId, from: ObjectStatus, to: ObjectStatus) -> bool {
        self.headers.get(id.index as usize).is_some_and(|header| {
            header
                .state
                .compare_exchange(
                    pack(id.generation, from),
                    pack(id.generation, to),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
        })
    }

    /// Driver-side status write for a live id.
    pub fn set_status(&self, id: ObjectId, status: ObjectStatus) {
        if let Some(header) = self.header(id) {
            let mut current = header.state.load(Ordering::Acquire);
            loop {
                if unpack(current).0 != id.generation {
                    return;
                }
                match header.state.compare_exchange_weak(
                    current,
                    pack(id.generation, status),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return,
                    Err(actual) => current = actual,
                }
            }
        }
    }

    /// Record that `id` is in the deferred queue. `false` if it already was.
    pub fn mark_queued(&self, id: ObjectId) -> bool {
        self.header(id)
            .is_some_and(|header| header.queued.swap(id.generation, Ordering::AcqRel) != id.generation)
    }

    pub fn clear_queued(&self, id: ObjectId) {
        if let Some(header) = self.headers.get(id.index as usize) {
            let _ = header.queued.compare_exchange(
                id.generation,
                NOT_QUEUED,
                Ordering::AcqRel,
                Ordering::Relaxed,
            );
        }
    }

    pub fn is_queued(&self, id: ObjectId) -> bool {
        self.header(id)
            .is_some_and(|header| header.queued.load(Ordering::Acquire) == id.generation)
    }

    /// Closed or stale.
    pub fn is_closed(&self, id: ObjectId) -> bool {
        self.header(id)
            .is_none_or(|header| header.closed.load(Ordering::Acquire))
    }

    /// Close `id`. Returns the status it was closed in, or `None` if it was
    /// already closed or stale.
    pub fn close(&self, id: ObjectId) -> Option<ObjectStatus> {
        let header = self.header(id)?;
        if header.closed.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(self.status(id))
    }

    pub fn set_info_valid(&self, id: ObjectId, valid: bool) {
        if let Some(header) = self.header(id) {
            header.info_valid.store(valid, Ordering::Release);
        }
    }

    pub fn is_info_valid(&self, id: ObjectId) -> bool {
        self.header(id)
            .is_some_and(|header| header.info_valid.load(Ordering::Acquire))
    }

    pub fn is_instance(&self, id: ObjectId) -> bool {
        self.header(id)
            .is_some_and(|header| header.is_instance.load(Ordering::Acquire))
    }

    fn set_instance(&self, id: ObjectId, instance: bool) {
        if let Some(header) = self.header(id) {
            header.is_instance.store(instance, Ordering::Release);
        }
    }

    /// Invalidate every outstanding id for the slot and reset it.
    pub fn retire(&self, id: ObjectId) {
        let Some(header) = self.header(id) else {
            return;
        };
        header.queued.store(NOT_QUEUED, Ordering::Release);
        header.info_valid.store(false, Ordering::Release);
        header.is_instance.store(false, Ordering::Release);
        header.closed.store(false, Ordering::Release);
        header.state.store(
            pack(id.generation.wrapping_add(1), ObjectStatus::None),
            Ordering::Release,
        );
    }

    fn record_leak(&self) {
        self.leaked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn leaked(&self) -> usize {
        self.leaked.load(Ordering::Relaxed)
    }
}

/// The world incarnation an object's entity lives in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct WorldKey {
    pub name: String,
    pub epoch: u64,
}

/// Callback run once when an object's entity is created.
pub type CreatedCallback = Box<dyn FnOnce(Entity) + Send>;

/// Driver-owned state of one wrapper object.
pub struct GameObjectEntity {
    pub(crate) id: ObjectId,
    pub(crate) name: String,
    pub(crate) world_name: String,
    pub(crate) entity: Entity,
    pub(crate) world: Option<WorldKey>,
    pub(crate) info: Option<InfoId>,
    pub(crate) is_active: bool,
    pub(crate) enabled: bool,
    pub(crate) prefab: Entity,
    pub(crate) declaration: Box<dyn ComponentDeclaration>,
    pub(crate) on_created: Vec<CreatedCallback>,
    pub(crate) created_seq: Option<u64>,
}

impl GameObjectEntity {
    pub(crate) fn new(id: ObjectId, desc: ObjectDesc) -> Self {
        Self {
            id,
            name: desc.name,
            world_name: desc.world_name,
            entity: Entity::NULL,
            world: None,
            info: None,
            is_active: false,
            enabled: desc.enabled,
            prefab: desc.prefab,
            declaration: desc.declaration,
            on_created: Vec::new(),
            created_seq: None,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The world name as configured; empty means the default world.
    pub fn world_name(&self) -> &str {
        &self.world_name
    }

    /// The entity handle without forcing a build.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn info(&self) -> Option<InfoId> {
        self.info
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn declaration(&self) -> &dyn ComponentDeclaration {
        self.declaration.as_ref()
    }
}

impl fmt::Debug for GameObjectEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObjectEntity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("world_name", &self.world_name)
            .field("entity", &self.entity)
            .field("info", &self.info)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Everything needed to spawn a wrapper object.
pub struct ObjectDesc {
    name: String,
    world_name: String,
    declaration: Box<dyn ComponentDeclaration>,
    prefab: Entity,
    enabled: bool,
}

impl ObjectDesc {
    pub fn new(name: impl Into<String>, declaration: impl ComponentDeclaration + 'static) -> Self {
        Self::from_boxed(name, Box::new(declaration))
    }

    pub fn from_boxed(name: impl Into<String>, declaration: Box<dyn ComponentDeclaration>) -> Self {
        Self {
            name: name.into(),
            world_name: String::new(),
            declaration,
            prefab: Entity::NULL,
            enabled: true,
        }
    }

    pub fn in_world(mut self, world: impl Into<String>) -> Self {
        self.world_name = world.into();
        self
    }

    /// Clone this entity when the object is created without a parent.
    pub fn with_prefab(mut self, prefab: Entity) -> Self {
        self.prefab = prefab;
        self
    }

    /// Start disabled: the entity is created but not counted as active.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Ownership token for a wrapper object.
///
/// Pass it to [`BridgeContext::destroy`](super::context::BridgeContext::destroy)
/// to end the object. Dropping it instead, from any thread, closes the
/// object and leaves a reclaim record for the driver.
pub struct ObjectGuard {
    id: ObjectId,
    table: Arc<ObjectTable>,
    reclaim: Arc<DestructionReclaimQueue>,
    armed: bool,
}

impl ObjectGuard {
    pub(crate) fn new(
        id: ObjectId,
        table: Arc<ObjectTable>,
        reclaim: Arc<DestructionReclaimQueue>,
    ) -> Self {
        Self {
            id,
            table,
            reclaim,
            armed: true,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub(crate) fn disarm(mut self) -> ObjectId {
        self.armed = false;
        self.id
    }
}

impl fmt::Debug for ObjectGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectGuard").field(&self.id).finish()
    }
}

impl Drop for ObjectGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(status) = self.table.close(self.id) else {
            return;
        };
        self.table.record_leak();
        log::warn!("object {} dropped without destroy (status {status:?})", self.id);
        if let Err(err) = self.reclaim.schedule(ReclaimRecord::unresolved(self.id, status)) {
            log::error!("leaked object {} cannot be reclaimed: {err}", self.id);
        }
    }
}

/// Thread-safe handle for deserialization hooks.
#[derive(Clone)]
pub struct Deserializer {
    table: Arc<ObjectTable>,
    deferred: Arc<DeferredCreationQueue>,
}

impl Deserializer {
    pub(crate) fn new(table: Arc<ObjectTable>, deferred: Arc<DeferredCreationQueue>) -> Self {
        Self { table, deferred }
    }

    /// Queue `id` for entity creation.
    ///
    /// Returns `Ok(true)` if this call moved the object to `Deserializing`,
    /// `Ok(false)` if it was ignored (already queued, closed, stale or past
    /// `None`). Safe to call from any thread; concurrent calls for one
    /// object succeed exactly once.
    pub fn on_after_deserialize(&self, id: ObjectId) -> Result<bool, BridgeError> {
        if self.table.status(id) != ObjectStatus::None
            || self.deferred.contains(id)
            || self.table.is_closed(id)
        {
            return Ok(false);
        }
        if !self
            .table
            .transition(id, ObjectStatus::None, ObjectStatus::Deserializing)
        {
            return Ok(false);
        }

        self.table.set_instance(id, self.table.is_info_valid(id));
        if !self.table.mark_queued(id) {
            return Err(BridgeError::DoubleEnqueue(id));
        }
        if let Err(err) = self.deferred.push(id) {
            self.table.clear_queued(id);
            self.table
                .transition(id, ObjectStatus::Deserializing, ObjectStatus::None);
            return Err(err);
        }
        log::debug!("object {id} deserialized");
        Ok(true)
    }

    pub fn status(&self, id: ObjectId) -> ObjectStatus {
        self.table.status(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn table_with(capacity: u32) -> Arc<ObjectTable> {
        Arc::new(ObjectTable::new(capacity))
    }

    #[test]
    fn null_and_display() {
        assert!(ObjectId::default().is_null());
        assert_eq!(ObjectId::new(3, 1).to_string(), "#3v1");
        assert_eq!(format!("{:?}", ObjectId::NULL), "ObjectId(null)");
        let id = ObjectId::new(5, 9);
        assert_eq!(ObjectId::from_bits(id.to_bits()), id);
    }

    #[test]
    fn stale_ids_report_destroyed_and_cannot_transition() {
        let table = table_with(2);
        let id = table.id_at(0);
        assert_eq!(table.status(id), ObjectStatus::None);
        table.retire(id);

        assert_eq!(table.status(id), ObjectStatus::Destroyed);
        assert!(!table.transition(id, ObjectStatus::None, ObjectStatus::Deserializing));
        assert!(table.is_closed(id));

        let reused = table.id_at(0);
        assert_ne!(reused, id);
        assert_eq!(table.status(reused), ObjectStatus::None);
        assert_eq!(table.status(ObjectId::NULL), ObjectStatus::Destroyed);
    }

    #[test]
    fn queued_marker_is_per_generation() {
        let table = table_with(1);
        let id = table.id_at(0);
        assert!(table.mark_queued(id));
        assert!(!table.mark_queued(id));
        table.retire(id);
        let reused = table.id_at(0);
        assert!(!table.is_queued(reused));
        table.clear_queued(id);
        assert!(table.mark_queued(reused));
    }

    #[test]
    fn deserialize_is_exactly_once() {
        let table = table_with(4);
        let deferred = Arc::new(DeferredCreationQueue::new(4));
        let hooks = Deserializer::new(Arc::clone(&table), Arc::clone(&deferred));
        let id = table.id_at(0);

        assert_eq!(hooks.on_after_deserialize(id), Ok(true));
        assert_eq!(hooks.on_after_deserialize(id), Ok(false));
        assert_eq!(hooks.status(id), ObjectStatus::Deserializing);
        assert_eq!(deferred.len(), 1);
    }

    #[test]
    fn valid_info_makes_an_instance() {
        let table = table_with(2);
        let deferred = Arc::new(DeferredCreationQueue::new(2));
        let hooks = Deserializer::new(Arc::clone(&table), Arc::clone(&deferred));
        let placed = table.id_at(0);
        let instance = table.id_at(1);
        table.set_info_valid(instance, true);

        hooks.on_after_deserialize(placed).unwrap();
        hooks.on_after_deserialize(instance).unwrap();
        assert!(!table.is_instance(placed));
        assert!(table.is_instance(instance));
    }

    #[test]
    fn full_queue_reverts_status() {
        let table = table_with(2);
        let deferred = Arc::new(DeferredCreationQueue::new(1));
        let hooks = Deserializer::new(Arc::clone(&table), Arc::clone(&deferred));
        hooks.on_after_deserialize(table.id_at(0)).unwrap();

        let second = table.id_at(1);
        assert_eq!(
            hooks.on_after_deserialize(second),
            Err(BridgeError::QueueFull { capacity: 1 })
        );
        assert_eq!(table.status(second), ObjectStatus::None);
        assert!(!table.is_queued(second));
    }

    #[test]
    fn closed_objects_are_ignored() {
        let table = table_with(1);
        let deferred = Arc::new(DeferredCreationQueue::new(1));
        let hooks = Deserializer::new(Arc::clone(&table), Arc::clone(&deferred));
        let id = table.id_at(0);
        assert_eq!(table.close(id), Some(ObjectStatus::None));
        assert_eq!(table.close(id), None);
        assert_eq!(hooks.on_after_deserialize(id), Ok(false));
        assert!(deferred.is_empty());
    }

    #[test]
    fn racing_hooks_enqueue_once() {
        const THREADS: usize = 8;
        let table = table_with(1);
        let deferred = Arc::new(DeferredCreationQueue::new(THREADS as u32));
        let hooks = Deserializer::new(Arc::clone(&table), Arc::clone(&deferred));
        let id = table.id_at(0);

        let wins: usize = (0..THREADS)
            .map(|_| {
                let hooks = hooks.clone();
                thread::spawn(move || hooks.on_after_deserialize(id) == Ok(true))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);
        assert_eq!(deferred.len(), 1);
    }

    #[test]
    fn dropped_guard_schedules_one_record() {
        let table = table_with(1);
        let reclaim = Arc::new(DestructionReclaimQueue::new(4));
        let id = table.id_at(0);
        drop(ObjectGuard::new(id, Arc::clone(&table), Arc::clone(&reclaim)));

        assert_eq!(reclaim.pending_len(), 1);
        assert_eq!(table.leaked(), 1);
        assert!(table.is_closed(id));
    }

    #[test]
    fn disarmed_guard_schedules_nothing() {
        let table = table_with(1);
        let reclaim = Arc::new(DestructionReclaimQueue::new(4));
        let guard = ObjectGuard::new(table.id_at(0), Arc::clone(&table), Arc::clone(&reclaim));
        guard.disarm();
        assert!(reclaim.is_empty());
        assert_eq!(table.leaked(), 0);
    }
}
