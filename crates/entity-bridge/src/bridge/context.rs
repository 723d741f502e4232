//! # Bridge Context — The Driver
//!
//! [`BridgeContext`] owns every wrapper object, every world and both queues.
//! All lifecycle transitions except `None → Deserializing` happen here, on
//! the driver thread, through `&mut self`.
//!
//! One tick of the driver:
//!
//! ```text
//! tick()
//!  ├─ create_all_deserialized_entities()
//!  │    pop deferred ─► scene gate ─► build archetype ─► rebuild
//!  │                                                       ├─ force parent first
//!  │                                                       ├─ create entity
//!  │                                                       └─ InstanceCount += 1
//!  ├─ dispose_all_destroyed_entities()
//!  │    take reclaim record ─► resolve ─► counts -= 1 ─► retire object
//!  └─ flush()
//!       apply batched writes ─► Creating → Created (request order)
//!                            ─► sweep entities nobody counts any more
//! ```
//!
//! ## Scene gating within one drain
//!
//! A drain samples the scene-load state once, at the first scene-placed
//! object it meets, and keeps that answer for the rest of the call
//! ([`DeserializedPass`]). Objects turned away are pushed back after the loop,
//! so a drain visits each queued object at most once and the next drain
//! starts over at [`DeserializedPass::Normal`].
//!
//! ## Failure handling
//!
//! Batch operations never stop on a per-object error. Contract violations
//! are logged at `error` and, with [`BridgeConfig::strict_contracts`], turned
//! into panics. Methods that return `Result` hand the error to the caller
//! instead.

use std::any::TypeId;
use std::sync::Arc;

use super::archetype_info::{ArchetypeInfo, ArchetypeInfoStore, InfoId};
use super::counts::{
    self, ActiveCount, EntityOrigin, EntityParent, InstanceCount, ObjectLink, Prefab,
};
use super::declaration::ComponentDeclaration;
use super::deferred::DeferredCreationQueue;
use super::object::{
    Deserializer, GameObjectEntity, ObjectDesc, ObjectGuard, ObjectId, ObjectTable, WorldKey,
};
use super::reclaim::{DestructionReclaimQueue, ReclaimRecord};
use super::scene::{SceneGraph, SceneHost};
use super::status::{DeserializedPass, ObjectStatus};
use crate::config::BridgeConfig;
use crate::ecs::{
    Buffer, BufferOption, Entity, EntityCommander, EntityCommands, EntityCommandsExt,
    WorldRegistry,
};
use crate::error::BridgeError;

fn slot(objects: &[Option<GameObjectEntity>], id: ObjectId) -> Option<&GameObjectEntity> {
    objects
        .get(id.index() as usize)
        .and_then(Option::as_ref)
        .filter(|object| object.id == id)
}

fn slot_mut(
    objects: &mut [Option<GameObjectEntity>],
    id: ObjectId,
) -> Option<&mut GameObjectEntity> {
    objects
        .get_mut(id.index() as usize)
        .and_then(Option::as_mut)
        .filter(|object| object.id == id)
}

fn commands_for<'a>(
    worlds: &'a mut WorldRegistry,
    key: Option<&WorldKey>,
) -> Option<&'a mut EntityCommander> {
    let key = key?;
    worlds.get_current_mut(&key.name, key.epoch)
}

/// Clear bookkeeping a template entity may have passed on to its clone.
fn reset_bookkeeping<C: EntityCommands + ?Sized>(commands: &mut C, entity: Entity) {
    commands.set_component(entity, InstanceCount(0));
    commands.set_component(entity, ActiveCount(0));
    commands.set_buffer::<ObjectLink>(entity, &[], BufferOption::Replace);
    if commands.has_component::<Buffer<EntityParent>>(entity) {
        commands.set_buffer::<EntityParent>(entity, &[], BufferOption::Replace);
    }
}

pub struct BridgeContext<S: SceneHost = SceneGraph> {
    config: BridgeConfig,
    table: Arc<ObjectTable>,
    objects: Vec<Option<GameObjectEntity>>,
    free_objects: Vec<u32>,
    deferred: Arc<DeferredCreationQueue>,
    reclaim: Arc<DestructionReclaimQueue>,
    worlds: WorldRegistry,
    infos: ArchetypeInfoStore,
    scenes: S,
    /// Objects in `Creating`, in request order.
    creating: Vec<ObjectId>,
    next_created_seq: u64,
}

impl<S: SceneHost> BridgeContext<S> {
    pub fn new(config: BridgeConfig, scenes: S) -> Self {
        let table = Arc::new(ObjectTable::new(config.max_objects));
        let deferred = Arc::new(DeferredCreationQueue::new(config.deferred_capacity));
        let reclaim = Arc::new(DestructionReclaimQueue::new(config.reclaim_capacity));
        let mut worlds = WorldRegistry::new();
        worlds.create(&config.default_world);
        log::info!(
            "bridge ready: {} objects, {} deferred slots, {} reclaim records",
            config.max_objects,
            config.deferred_capacity,
            config.reclaim_capacity
        );
        Self {
            config,
            table,
            objects: Vec::new(),
            free_objects: Vec::new(),
            deferred,
            reclaim,
            worlds,
            infos: ArchetypeInfoStore::new(),
            scenes,
            creating: Vec::new(),
            next_created_seq: 0,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn scenes(&self) -> &S {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut S {
        &mut self.scenes
    }

    pub fn worlds(&self) -> &WorldRegistry {
        &self.worlds
    }

    pub fn world(&self, name: &str) -> Option<&EntityCommander> {
        self.worlds.get(name)
    }

    pub fn world_mut(&mut self, name: &str) -> Option<&mut EntityCommander> {
        self.worlds.get_mut(name)
    }

    /// Create (or recreate) a world. Infos built against an earlier
    /// incarnation stop being valid.
    pub fn create_world(&mut self, name: &str) -> u64 {
        let epoch = self.worlds.create(name);
        self.refresh_info_flags();
        epoch
    }

    pub fn destroy_world(&mut self, name: &str) -> bool {
        let destroyed = self.worlds.destroy(name);
        if destroyed {
            self.refresh_info_flags();
        }
        destroyed
    }

    fn refresh_info_flags(&self) {
        for object in self.objects.iter().flatten() {
            let valid = self.is_info_valid(object.info);
            self.table.set_info_valid(object.id, valid);
        }
    }

    /// Handle for deserialization hooks on other threads.
    pub fn deserializer(&self) -> Deserializer {
        Deserializer::new(Arc::clone(&self.table), Arc::clone(&self.deferred))
    }

    // ── Objects ──────────────────────────────────────────────────────────

    pub fn spawn_object(&mut self, desc: ObjectDesc) -> Result<ObjectGuard, BridgeError> {
        let index = match self.free_objects.pop() {
            Some(index) => index,
            None => {
                let index = self.objects.len();
                if index >= self.table.capacity() {
                    return Err(BridgeError::ObjectTableFull {
                        capacity: self.table.capacity(),
                    });
                }
                self.objects.push(None);
                index as u32
            }
        };
        let id = self.table.id_at(index);
        let object = GameObjectEntity::new(id, desc);
        log::debug!("spawned object {id} '{}'", object.name);
        self.objects[index as usize] = Some(object);
        Ok(ObjectGuard::new(
            id,
            Arc::clone(&self.table),
            Arc::clone(&self.reclaim),
        ))
    }

    /// Spawn a copy of `template` that shares its archetype info.
    ///
    /// The template's info is built first if needed, so the copy is an
    /// *instance*: once deserialized it skips scene gating.
    pub fn instantiate(
        &mut self,
        template: ObjectId,
        name: impl Into<String>,
    ) -> Result<ObjectGuard, BridgeError> {
        self.build_archetype_if_need(template, true)?;
        let source = self.require(template)?;
        let info = source.info;
        let mut desc = ObjectDesc::from_boxed(name, source.declaration.box_clone())
            .in_world(source.world_name.clone());
        if !source.enabled {
            desc = desc.disabled();
        }

        let guard = self.spawn_object(desc)?;
        let id = guard.id();
        if let Some(object) = slot_mut(&mut self.objects, id) {
            object.info = info;
        }
        self.table.set_info_valid(id, self.is_info_valid(info));
        Ok(guard)
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObjectEntity> {
        slot(&self.objects, id)
    }

    fn require(&self, id: ObjectId) -> Result<&GameObjectEntity, BridgeError> {
        slot(&self.objects, id).ok_or(BridgeError::StaleObject(id))
    }

    fn require_mut(&mut self, id: ObjectId) -> Result<&mut GameObjectEntity, BridgeError> {
        slot_mut(&mut self.objects, id).ok_or(BridgeError::StaleObject(id))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len() - self.free_objects.len()
    }

    pub fn status(&self, id: ObjectId) -> ObjectStatus {
        self.table.status(id)
    }

    /// `Created` and its world still alive.
    pub fn is_created(&self, id: ObjectId) -> bool {
        self.status(id) == ObjectStatus::Created && self.entity_world_alive(id)
    }

    /// `Creating` or `Created` and its world still alive.
    pub fn is_assigned(&self, id: ObjectId) -> bool {
        self.status(id).is_assigned() && self.entity_world_alive(id)
    }

    fn entity_world_alive(&self, id: ObjectId) -> bool {
        slot(&self.objects, id)
            .and_then(|object| object.world.as_ref())
            .is_some_and(|key| self.worlds.is_current(&key.name, key.epoch))
    }

    pub fn is_instance(&self, id: ObjectId) -> bool {
        self.table.is_instance(id)
    }

    pub fn is_active(&self, id: ObjectId) -> bool {
        slot(&self.objects, id).is_some_and(|object| object.is_active)
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.scenes.parent_of(id)
    }

    /// Topmost wrapper ancestor, or `id` itself.
    pub fn root(&self, id: ObjectId) -> ObjectId {
        let mut root = id;
        for _ in 0..self.table.capacity() {
            match self.scenes.parent_of(root) {
                Some(parent) => root = parent,
                None => break,
            }
        }
        root
    }

    /// The world the object targets, falling back to the default world.
    pub fn world_name(&self, id: ObjectId) -> Option<&str> {
        slot(&self.objects, id).map(|object| self.target_world(object))
    }

    fn target_world<'a>(&'a self, object: &'a GameObjectEntity) -> &'a str {
        if object.world_name.is_empty() {
            &self.config.default_world
        } else {
            &object.world_name
        }
    }

    /// Retarget an object that has no entity yet.
    pub fn set_world_name(&mut self, id: ObjectId, name: &str) -> Result<(), BridgeError> {
        if self.status(id).is_assigned() {
            return Err(BridgeError::AlreadyCreated(id));
        }
        let object = self.require_mut(id)?;
        object.world_name = name.to_string();
        let info = object.info;
        let moved = info
            .and_then(|info| self.infos.get(info))
            .is_some_and(|info| info.world_name() != self.target_world_name(id));
        if moved {
            self.release_info(id, info);
            if let Some(object) = slot_mut(&mut self.objects, id) {
                object.info = None;
            }
            self.table.set_info_valid(id, false);
        }
        Ok(())
    }

    fn target_world_name(&self, id: ObjectId) -> &str {
        self.world_name(id).unwrap_or(&self.config.default_world)
    }

    pub fn archetype_info(&self, id: ObjectId) -> Option<&ArchetypeInfo> {
        self.infos.get(slot(&self.objects, id)?.info?)
    }

    pub fn info_id(&self, id: ObjectId) -> Option<InfoId> {
        slot(&self.objects, id)?.info
    }

    /// Replace an object's declaration. Takes effect on the next archetype
    /// rebuild.
    pub fn set_declaration(
        &mut self,
        id: ObjectId,
        declaration: Box<dyn ComponentDeclaration>,
    ) -> Result<(), BridgeError> {
        self.require_mut(id)?.declaration = declaration;
        Ok(())
    }

    /// Whether the declared shape includes `type_id`. Builds the archetype
    /// if needed.
    pub fn contains(&mut self, id: ObjectId, type_id: TypeId) -> Result<bool, BridgeError> {
        self.build_archetype_if_need(id, false)?;
        Ok(self
            .archetype_info(id)
            .and_then(ArchetypeInfo::shape)
            .is_some_and(|shape| shape.contains(type_id)))
    }

    /// Run `callback` with the entity once the object is created. Runs it
    /// right away if it already is.
    pub fn on_created(
        &mut self,
        id: ObjectId,
        callback: impl FnOnce(Entity) + Send + 'static,
    ) -> Result<(), BridgeError> {
        let created = self.is_created(id);
        let object = self.require_mut(id)?;
        if created {
            callback(object.entity);
        } else {
            object.on_created.push(Box::new(callback));
        }
        Ok(())
    }

    /// Position of the object in the global creation order.
    pub fn created_order(&self, id: ObjectId) -> Option<u64> {
        slot(&self.objects, id)?.created_seq
    }

    /// The object's entity, building it now if it is still waiting in the
    /// deferred queue.
    pub fn entity(&mut self, id: ObjectId) -> Result<Entity, BridgeError> {
        self.force_build_if_need(id)
    }

    /// Same as [`entity`](Self::entity), for callers that only need the side
    /// effect.
    pub fn awake(&mut self, id: ObjectId) -> Result<(), BridgeError> {
        self.force_build_if_need(id).map(drop)
    }

    /// Enable or disable the object. Disabled objects do not count as active.
    pub fn set_enabled(&mut self, id: ObjectId, enabled: bool) -> Result<(), BridgeError> {
        self.require_mut(id)?.enabled = enabled;
        let active = enabled && self.scenes.is_active_and_enabled(id);
        self.set_active(id, active)
    }

    fn set_active(&mut self, id: ObjectId, active: bool) -> Result<(), BridgeError> {
        let status = self.status(id);
        let object = self.require(id)?;
        if object.is_active == active || object.entity.is_null() {
            return Ok(());
        }
        let entity = object.entity;
        let key = object.world.clone();
        if let Some(commands) = commands_for(&mut self.worlds, key.as_ref()) {
            let delta = if active { 1 } else { -1 };
            counts::add_count::<ActiveCount, _>(commands, status, entity, delta)?;
        }
        self.require_mut(id)?.is_active = active;
        Ok(())
    }

    pub fn leaked_objects(&self) -> usize {
        self.table.leaked()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn reclaim_pending(&self) -> usize {
        self.reclaim.pending_len()
    }

    pub fn reclaim_available(&self) -> usize {
        self.reclaim.available()
    }

    // ── Deserialization ──────────────────────────────────────────────────

    /// Driver-thread shorthand for [`Deserializer::on_after_deserialize`].
    /// Errors are logged (and escalated when strict).
    pub fn on_after_deserialize(&self, id: ObjectId) -> bool {
        match self.deserializer().on_after_deserialize(id) {
            Ok(queued) => queued,
            Err(err) => {
                self.escalate(&err);
                false
            }
        }
    }

    /// Prepare a template: objects outside any valid scene get a template
    /// build with its own template entity.
    pub fn before_serialize(&mut self, id: ObjectId) -> Result<(), BridgeError> {
        let is_template = !self.scenes.is_scene_valid(id);
        self.build_archetype_if_need(id, is_template)
    }

    /// Drain the deferred queue once. Returns `true` if it is now empty.
    pub fn create_all_deserialized_entities(&mut self) -> bool {
        let mut pass = DeserializedPass::Normal;
        let mut redeferred = Vec::new();

        while let Some(id) = self.deferred.pop() {
            if !self.table.is_queued(id) {
                log::trace!("dropping stale queue entry {id}");
                continue;
            }
            self.table.clear_queued(id);
            if self.status(id) != ObjectStatus::Deserializing || self.table.is_closed(id) {
                log::trace!("skipping {id}: {:?}", self.status(id));
                continue;
            }
            match self.create_deserialized(id, &mut pass) {
                Ok(true) => {}
                Ok(false) => redeferred.push(id),
                Err(err) => {
                    self.escalate(&err);
                    if slot(&self.objects, id).is_some_and(|o| o.entity.is_null()) {
                        self.table.set_status(id, ObjectStatus::Invalid);
                    }
                }
            }
        }

        for id in redeferred {
            if !self.table.mark_queued(id) {
                self.escalate(&BridgeError::DoubleEnqueue(id));
                continue;
            }
            if let Err(err) = self.deferred.push(id) {
                self.table.clear_queued(id);
                self.escalate(&err);
            }
        }
        self.deferred.is_empty()
    }

    /// `Ok(false)` means "not yet": push it back.
    fn create_deserialized(
        &mut self,
        id: ObjectId,
        pass: &mut DeserializedPass,
    ) -> Result<bool, BridgeError> {
        if !self.table.is_instance(id) {
            match *pass {
                DeserializedPass::InstanceOnly => return Ok(false),
                DeserializedPass::Normal if !self.scenes.all_scenes_loaded() => {
                    log::debug!("scenes still loading, creating instances only");
                    *pass = DeserializedPass::InstanceOnly;
                    return Ok(false);
                }
                _ => *pass = DeserializedPass::IgnoreSceneLoading,
            }

            if !self.scenes.is_scene_valid(id) {
                log::warn!(
                    "object {id} '{}' is not in a valid scene, marking it invalid",
                    self.require(id)?.name
                );
                self.table.set_status(id, ObjectStatus::Invalid);
                return Ok(true);
            }
            self.build_archetype_if_need(id, false)?;
        }

        if !self.parent_chain_ready(id) {
            log::trace!("object {id} waits for its parent");
            return Ok(false);
        }
        self.rebuild(id)?;
        Ok(true)
    }

    /// `false` while some ancestor has not been deserialized yet.
    fn parent_chain_ready(&self, id: ObjectId) -> bool {
        let mut cursor = self.scenes.parent_of(id);
        for _ in 0..self.table.capacity() {
            let Some(parent) = cursor else {
                return true;
            };
            match self.status(parent) {
                ObjectStatus::None => return false,
                ObjectStatus::Deserializing => cursor = self.scenes.parent_of(parent),
                _ => return true,
            }
        }
        // A loop in the parent chain; rebuild reports it.
        true
    }

    /// `true` when nothing in the deferred queue would be created by a drain
    /// in `pass` right now.
    pub fn is_all_entities_deserialized(&self, pass: DeserializedPass) -> bool {
        let scene_loading = pass == DeserializedPass::Normal && !self.scenes.all_scenes_loaded();
        for id in self.deferred.snapshot() {
            if self.status(id) != ObjectStatus::Deserializing {
                continue;
            }
            if self.table.is_instance(id) {
                return false;
            }
            if pass != DeserializedPass::InstanceOnly
                && (!scene_loading || !self.scenes.is_scene_valid(id))
            {
                return false;
            }
        }
        true
    }

    // ── Archetypes ───────────────────────────────────────────────────────

    fn is_info_valid(&self, info: Option<InfoId>) -> bool {
        info.and_then(|info| self.infos.get(info))
            .is_some_and(|info| info.is_valid(&self.worlds))
    }

    fn build_archetype_if_need(&mut self, id: ObjectId, is_template: bool) -> Result<(), BridgeError> {
        let info = self.require(id)?.info;
        if self.is_info_valid(info) {
            return Ok(());
        }
        self.rebuild_archetype_inner(id, is_template)
    }

    /// Drop the current info if it belongs to `owner`, destroying its
    /// template entity.
    fn release_info(&mut self, owner: ObjectId, info: Option<InfoId>) {
        let Some(info_id) = info else {
            return;
        };
        if self.infos.get(info_id).is_none_or(|info| info.owner() != owner) {
            return;
        }
        if let Some(mut info) = self.infos.remove(info_id) {
            if let Some(commands) = self.worlds.get_current_mut(info.world_name(), info.world_epoch()) {
                info.release(commands);
            }
            log::debug!("archetype info '{}' of {owner} released", info.name());
        }
        // Copies sharing the info are no longer instances.
        for object in self.objects.iter().flatten() {
            if object.info == Some(info_id) {
                self.table.set_info_valid(object.id, false);
            }
        }
    }

    /// Replace the object's info with a fresh one for `world`.
    fn replace_info(&mut self, id: ObjectId, hash: u64) -> Result<InfoId, BridgeError> {
        let object = self.require(id)?;
        let old = object.info;
        let name = object.name.clone();
        let world = self.target_world(object).to_string();

        self.release_info(id, old);
        let epoch = self.worlds.get_or_create(&world);
        let info = self.infos.insert(ArchetypeInfo::new(id, name, hash, world, epoch));
        self.require_mut(id)?.info = Some(info);
        self.table.set_info_valid(id, true);
        Ok(info)
    }

    /// The object's info, replaced first if its world went away.
    fn ensure_info(&mut self, id: ObjectId) -> Result<InfoId, BridgeError> {
        let object = self.require(id)?;
        if let Some(info) = object.info.filter(|&info| self.is_info_valid(Some(info))) {
            return Ok(info);
        }
        let hash = object.declaration.component_hash();
        self.replace_info(id, hash)
    }

    fn rebuild_archetype_inner(&mut self, id: ObjectId, is_template: bool) -> Result<(), BridgeError> {
        let descriptor = self.require_mut(id)?.declaration.rebuild();
        let current = self.require(id)?.info;
        let reusable = current
            .and_then(|info| self.infos.get(info))
            .is_some_and(|info| info.is_valid(&self.worlds) && info.component_hash() == descriptor.hash);
        let info_id = match current {
            Some(info) if reusable => info,
            _ => self.replace_info(id, descriptor.hash)?,
        };

        let fixed = counts::fixed_kinds(self.scenes.parent_of(id).is_some());
        let info = self
            .infos
            .get_mut(info_id)
            .ok_or(BridgeError::StaleObject(id))?;
        let commands = self
            .worlds
            .get_current_mut(info.world_name(), info.world_epoch())
            .ok_or_else(|| BridgeError::MissingWorld(info.world_name().to_string()))?;
        info.rebuild(commands, is_template, &descriptor.shape, &fixed);
        Ok(())
    }

    /// Rebuild the object's archetype from its current declaration.
    ///
    /// A live entity stops being counted (the sweep removes it on the next
    /// flush) and a `Created` object gets a new entity with the new shape.
    /// An unchanged declaration keeps the same info.
    pub fn rebuild_archetype(&mut self, id: ObjectId) -> Result<(), BridgeError> {
        let status = self.status(id);
        if status == ObjectStatus::Creating {
            return Err(BridgeError::UnexpectedStatus {
                object: id,
                expected: ObjectStatus::Created,
                found: status,
            });
        }
        let object = self.require(id)?;
        if !object.entity.is_null() {
            let record = ReclaimRecord {
                object: id,
                status,
                entity: object.entity,
                info: None,
                was_active: object.is_active,
            };
            let key = object.world.clone();
            self.release_counts(&record, key.as_ref())?;
            let object = self.require_mut(id)?;
            object.entity = Entity::NULL;
            object.world = None;
            object.is_active = false;
        }

        self.rebuild_archetype_inner(id, true)?;
        if status == ObjectStatus::Created {
            self.rebuild(id)?;
        }
        Ok(())
    }

    // ── Entity creation ──────────────────────────────────────────────────

    fn force_build_if_need(&mut self, id: ObjectId) -> Result<Entity, BridgeError> {
        let object = self.require(id)?;
        if !object.entity.is_null() {
            return Ok(object.entity);
        }
        match self.status(id) {
            ObjectStatus::Deserializing => {
                self.build_archetype_if_need(id, false)?;
                self.rebuild(id)?;
                Ok(self.require(id)?.entity)
            }
            ObjectStatus::Creating => Err(BridgeError::ParentCycle(id)),
            found => Err(BridgeError::UnexpectedStatus {
                object: id,
                expected: ObjectStatus::Deserializing,
                found,
            }),
        }
    }

    /// Move the object to `Creating` and give it an entity. An object that
    /// fails before getting one ends up `Invalid`.
    fn rebuild(&mut self, id: ObjectId) -> Result<(), BridgeError> {
        self.table.set_status(id, ObjectStatus::Creating);
        let result = self.create_entity(id);
        if result.is_err() && slot(&self.objects, id).is_some_and(|o| o.entity.is_null()) {
            self.table.set_status(id, ObjectStatus::Invalid);
        }
        result
    }

    fn create_entity(&mut self, id: ObjectId) -> Result<(), BridgeError> {
        let info_id = self.ensure_info(id)?;
        if self.infos.get(info_id).is_some_and(|info| info.shape().is_none()) {
            self.rebuild_archetype_inner(id, false)?;
        }

        let parent = self.scenes.parent_of(id);
        let parent_entity = match parent {
            Some(parent) => Some(self.force_build_if_need(parent)?),
            None => None,
        };

        let object = self.require(id)?;
        if !object.entity.is_null() {
            return Err(BridgeError::EntityAlreadyAssigned {
                object: id,
                entity: object.entity,
            });
        }
        let info_id = object.info.ok_or(BridgeError::StaleObject(id))?;
        let info = self.infos.get(info_id).ok_or(BridgeError::StaleObject(id))?;

        let mut kinds = Vec::new();
        object.declaration.runtime_component_kinds(&mut kinds);
        kinds.extend(counts::fixed_kinds(parent.is_some()));
        let shape = info.shape().cloned().unwrap_or_default().with(&kinds);
        let template = if parent.is_none() && !object.prefab.is_null() {
            object.prefab
        } else {
            info.template()
        };
        let key = WorldKey {
            name: info.world_name().to_string(),
            epoch: info.world_epoch(),
        };
        let label = self.config.label_entities.then(|| object.name.clone());
        let active = object.enabled && self.scenes.is_active_and_enabled(id);

        let commands = commands_for(&mut self.worlds, Some(&key))
            .ok_or_else(|| BridgeError::MissingWorld(key.name.clone()))?;
        let entity = commands.create_entity(&shape, template);
        if entity.is_null() || !commands.is_alive(entity) {
            return Err(BridgeError::InvalidEntity { object: id, entity });
        }
        if let Some(object) = slot_mut(&mut self.objects, id) {
            object.entity = entity;
            object.world = Some(key);
        }
        if !template.is_null() {
            reset_bookkeeping(commands, entity);
        }
        if let Some(label) = label {
            commands.set_label(entity, label);
        }

        if active {
            counts::add_count::<ActiveCount, _>(commands, ObjectStatus::Creating, entity, 1)?;
            if let Some(object) = slot_mut(&mut self.objects, id) {
                object.is_active = true;
            }
        }
        counts::add_count::<InstanceCount, _>(commands, ObjectStatus::Creating, entity, 1)?;
        commands.set_buffer(entity, &[ObjectLink(id)], BufferOption::Append);
        commands.set_component(entity, EntityOrigin { entity });
        if let Some(parent_entity) = parent_entity {
            commands.set_buffer(
                entity,
                &[EntityParent {
                    entity: parent_entity,
                }],
                BufferOption::Append,
            );
            commands.set_component_enabled::<Buffer<EntityParent>>(entity, true);
        }

        self.creating.push(id);
        log::debug!("object {id} creating {entity}");
        Ok(())
    }

    // ── Destruction ──────────────────────────────────────────────────────

    /// End an object now: deactivate it, release its counts and info, and
    /// free its slot.
    pub fn destroy(&mut self, guard: ObjectGuard) {
        let id = guard.disarm();
        if slot(&self.objects, id).is_none() {
            log::debug!("destroy of stale object {id}");
            return;
        }
        if let Err(err) = self.set_active(id, false) {
            self.escalate(&err);
        }
        if let Some(record) = self.capture(id) {
            self.dispose(record);
        }
    }

    /// Snapshot what `id` contributes to the entity store right now.
    fn capture(&self, id: ObjectId) -> Option<ReclaimRecord> {
        let object = slot(&self.objects, id)?;
        Some(ReclaimRecord {
            object: id,
            status: self.status(id),
            entity: object.entity,
            info: object.info,
            was_active: object.is_active,
        })
    }

    /// Apply every pending reclaim record. Returns how many were applied.
    pub fn dispose_all_destroyed_entities(&mut self) -> usize {
        let reclaim = Arc::clone(&self.reclaim);
        let mut disposed = 0;
        while reclaim.process_next(|record| self.dispose(record)) {
            disposed += 1;
        }
        if disposed > 0 {
            log::debug!("reclaimed {disposed} dropped objects");
        }
        disposed
    }

    /// Undo the record's counts, release its info and retire the object.
    /// An unresolved record is filled in from the object first.
    fn dispose(&mut self, record: ReclaimRecord) {
        let id = record.object;
        let Some(key) = slot(&self.objects, id).map(|object| object.world.clone()) else {
            log::debug!("reclaim record for retired object {id}");
            return;
        };
        let record = if record.is_unresolved() {
            let Some(resolved) = self.capture(id) else {
                return;
            };
            if resolved.status != record.status {
                log::trace!("{id} moved from {:?} to {:?} before reclaim", record.status, resolved.status);
            }
            resolved
        } else {
            record
        };
        if let Err(err) = self.release_counts(&record, key.as_ref()) {
            self.escalate(&err);
        }
        self.release_info(id, record.info);
        self.retire(id);
    }

    fn release_counts(&mut self, record: &ReclaimRecord, key: Option<&WorldKey>) -> Result<(), BridgeError> {
        if record.entity.is_null() {
            return Ok(());
        }
        let Some(commands) = commands_for(&mut self.worlds, key) else {
            return Ok(());
        };
        let active = if record.was_active {
            counts::add_count::<ActiveCount, _>(commands, record.status, record.entity, -1).map(drop)
        } else {
            Ok(())
        };
        let instance =
            counts::add_count::<InstanceCount, _>(commands, record.status, record.entity, -1)
                .map(drop);
        active.and(instance)
    }

    fn retire(&mut self, id: ObjectId) {
        let Some(entry) = self.objects.get_mut(id.index() as usize) else {
            return;
        };
        if entry.as_ref().is_none_or(|object| object.id != id) {
            return;
        }
        *entry = None;
        let queued = self.table.is_queued(id);
        self.table.retire(id);
        if queued {
            self.purge_stale_entries();
        }
        self.free_objects.push(id.index());
        log::debug!("object {id} destroyed");
    }

    /// Take entries of retired objects out of the deferred queue so they do
    /// not hold slots a reused index will need. Live entries go back in
    /// their original order.
    fn purge_stale_entries(&mut self) {
        let mut live = Vec::new();
        let mut dropped = 0;
        while let Some(id) = self.deferred.pop() {
            if self.table.is_queued(id) {
                live.push(id);
            } else {
                dropped += 1;
            }
        }
        for id in live.into_iter().rev() {
            if let Err(err) = self.deferred.push(id) {
                self.table.clear_queued(id);
                self.table.transition(id, ObjectStatus::Deserializing, ObjectStatus::None);
                self.escalate(&err);
            }
        }
        log::trace!("purged {dropped} stale deferred entries");
    }

    // ── Flush ────────────────────────────────────────────────────────────

    /// Apply batched writes, complete pending creations in request order and
    /// sweep unreferenced entities.
    pub fn flush(&mut self) {
        for (name, commands) in self.worlds.iter_mut() {
            let applied = commands.flush();
            if applied > 0 {
                log::trace!("world '{name}': applied {applied} commands");
            }
        }

        for id in std::mem::take(&mut self.creating) {
            self.complete_creation(id);
        }

        if self.config.sweep_unreferenced {
            self.sweep_unreferenced();
        }
    }

    /// Run a whole driver step.
    pub fn tick(&mut self) {
        self.create_all_deserialized_entities();
        self.dispose_all_destroyed_entities();
        self.flush();
    }

    fn complete_creation(&mut self, id: ObjectId) {
        if self.status(id) != ObjectStatus::Creating {
            return;
        }
        let Some(object) = slot(&self.objects, id) else {
            return;
        };
        let entity = object.entity;
        let alive = object
            .world
            .as_ref()
            .filter(|key| self.worlds.is_current(&key.name, key.epoch))
            .and_then(|key| self.worlds.get(&key.name))
            .is_some_and(|commands| commands.is_alive(entity));
        if entity.is_null() || !alive {
            self.escalate(&BridgeError::InvalidEntity { object: id, entity });
            if let Some(object) = slot_mut(&mut self.objects, id) {
                object.entity = Entity::NULL;
                object.world = None;
                object.is_active = false;
            }
            self.table.set_status(id, ObjectStatus::Invalid);
            return;
        }

        self.table.set_status(id, ObjectStatus::Created);
        let seq = self.next_created_seq;
        self.next_created_seq += 1;
        let Some(object) = slot_mut(&mut self.objects, id) else {
            return;
        };
        object.created_seq = Some(seq);
        let callbacks = std::mem::take(&mut object.on_created);
        log::debug!("object {id} created as {entity}");
        for callback in callbacks {
            callback(entity);
        }
    }

    /// Despawn entities whose instance count changed to zero and consume the
    /// changed flags of the rest. Templates are left alone.
    fn sweep_unreferenced(&mut self) {
        let count_type = TypeId::of::<InstanceCount>();
        let active_type = TypeId::of::<ActiveCount>();
        for (name, commands) in self.worlds.iter_mut() {
            let world = commands.world_mut();
            for entity in world.entities_with(count_type) {
                if world.has(entity, TypeId::of::<Prefab>()) || !world.is_enabled(entity, count_type)
                {
                    continue;
                }
                let count = world.get::<InstanceCount>(entity).map_or(0, |count| count.0);
                if count <= 0 {
                    world.despawn(entity);
                    log::debug!("world '{name}': swept unreferenced {entity}");
                } else {
                    world.set_enabled(entity, count_type, false);
                }
            }
            for entity in world.entities_with(active_type) {
                if !world.has(entity, TypeId::of::<Prefab>()) && world.is_enabled(entity, active_type) {
                    world.set_enabled(entity, active_type, false);
                }
            }
        }
    }

    // ── Contracts ────────────────────────────────────────────────────────

    fn escalate(&self, err: &BridgeError) {
        log::error!("{err}");
        if self.config.strict_contracts && err.is_contract_violation() {
            panic!("bridge contract violated: {err}");
        }
    }

    #[cfg(feature = "diagnostics")]
    pub fn stats(&self) -> crate::diagnostics::BridgeStats {
        crate::diagnostics::BridgeStats::collect(
            self.objects
                .iter()
                .flatten()
                .map(|object| self.status(object.id)),
            self.deferred.len(),
            self.reclaim.pending_len(),
            self.reclaim.available(),
            self.table.leaked(),
            self.infos.len(),
            &self.worlds,
        )
    }
}

impl BridgeContext<SceneGraph> {
    /// A context with an empty [`SceneGraph`].
    pub fn with_config(config: BridgeConfig) -> Self {
        Self::new(config, SceneGraph::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::declaration::DeclaredComponents;
    use crate::logging::init_test_logger;
    use std::sync::Mutex;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Hull(u32);
    #[derive(Clone, Default, Debug, PartialEq)]
    struct Engine(f32);

    fn relaxed() -> BridgeConfig {
        BridgeConfig {
            strict_contracts: false,
            ..BridgeConfig::default()
        }
    }

    fn context() -> BridgeContext {
        init_test_logger();
        let mut ctx = BridgeContext::with_config(relaxed());
        ctx.scenes_mut().add_scene("Level", true);
        ctx
    }

    fn declared() -> DeclaredComponents {
        DeclaredComponents::new().with::<Hull>()
    }

    fn placed(ctx: &mut BridgeContext, name: &str) -> ObjectGuard {
        let guard = ctx.spawn_object(ObjectDesc::new(name, declared())).unwrap();
        let scene = ctx.scenes_mut().add_scene(format!("{name}-scene"), true);
        ctx.scenes_mut().place(guard.id(), scene, None);
        guard
    }

    fn count<T: counts::CountComponent>(ctx: &BridgeContext, entity: Entity) -> i32 {
        ctx.world("Default")
            .and_then(|commands| commands.try_get_component::<T>(entity))
            .map_or(0, |count| count.value())
    }

    #[test]
    fn placed_object_goes_through_every_status() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Ship");
        let id = guard.id();
        assert_eq!(ctx.status(id), ObjectStatus::None);

        assert!(ctx.on_after_deserialize(id));
        assert_eq!(ctx.status(id), ObjectStatus::Deserializing);
        assert!(!ctx.is_instance(id));

        assert!(ctx.create_all_deserialized_entities());
        assert_eq!(ctx.status(id), ObjectStatus::Creating);
        assert!(ctx.is_assigned(id));
        assert!(!ctx.is_created(id));

        ctx.flush();
        assert!(ctx.is_created(id));
        let entity = ctx.entity(id).unwrap();
        assert_eq!(count::<InstanceCount>(&ctx, entity), 1);
        assert_eq!(count::<ActiveCount>(&ctx, entity), 1);
        let world = ctx.world("Default").unwrap();
        assert_eq!(world.get_buffer::<ObjectLink>(entity), vec![ObjectLink(id)]);
        assert_eq!(world.world().label(entity), Some("Ship"));
        ctx.destroy(guard);
    }

    #[test]
    fn object_outside_any_scene_becomes_invalid() {
        let mut ctx = context();
        let guard = ctx.spawn_object(ObjectDesc::new("Loose", declared())).unwrap();
        ctx.on_after_deserialize(guard.id());
        ctx.create_all_deserialized_entities();
        assert_eq!(ctx.status(guard.id()), ObjectStatus::Invalid);
        ctx.destroy(guard);
    }

    #[test]
    fn loading_scene_holds_back_placed_objects() {
        let mut ctx = context();
        let loading = ctx.scenes_mut().add_scene("Streaming", false);
        let guard = ctx.spawn_object(ObjectDesc::new("Door", declared())).unwrap();
        ctx.scenes_mut().place(guard.id(), loading, None);
        ctx.on_after_deserialize(guard.id());

        assert!(!ctx.create_all_deserialized_entities());
        assert!(ctx.is_all_entities_deserialized(DeserializedPass::InstanceOnly));
        assert!(!ctx.is_all_entities_deserialized(DeserializedPass::IgnoreSceneLoading));
        assert_eq!(ctx.status(guard.id()), ObjectStatus::Deserializing);

        ctx.scenes_mut().set_loaded(loading, true);
        assert!(ctx.create_all_deserialized_entities());
        assert_eq!(ctx.status(guard.id()), ObjectStatus::Creating);
        ctx.destroy(guard);
    }

    #[test]
    fn entity_access_forces_the_build() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Crate");
        ctx.on_after_deserialize(guard.id());
        let entity = ctx.entity(guard.id()).unwrap();
        assert!(!entity.is_null());
        assert_eq!(ctx.status(guard.id()), ObjectStatus::Creating);

        // The queued entry is skipped once popped.
        assert!(ctx.create_all_deserialized_entities());
        ctx.flush();
        assert!(ctx.is_created(guard.id()));
        assert_eq!(ctx.entity(guard.id()).unwrap(), entity);
        ctx.destroy(guard);
    }

    #[test]
    fn entity_of_undeserialized_object_is_an_error() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Crate");
        let err = ctx.entity(guard.id()).unwrap_err();
        assert_eq!(
            err,
            BridgeError::UnexpectedStatus {
                object: guard.id(),
                expected: ObjectStatus::Deserializing,
                found: ObjectStatus::None,
            }
        );
        ctx.destroy(guard);
    }

    #[test]
    fn disabling_moves_the_active_count() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Lamp");
        let id = guard.id();
        ctx.on_after_deserialize(id);
        ctx.tick();
        let entity = ctx.entity(id).unwrap();

        ctx.set_enabled(id, false).unwrap();
        ctx.set_enabled(id, false).unwrap();
        ctx.flush();
        assert_eq!(count::<ActiveCount>(&ctx, entity), 0);
        assert!(!ctx.is_active(id));
        let world = ctx.world("Default").unwrap();
        assert!(!world.is_component_enabled::<ActiveCount>(entity));

        ctx.set_enabled(id, true).unwrap();
        ctx.flush();
        assert_eq!(count::<ActiveCount>(&ctx, entity), 1);
        ctx.destroy(guard);
    }

    #[test]
    fn disabled_object_is_not_counted_active() {
        let mut ctx = context();
        let guard = ctx
            .spawn_object(ObjectDesc::new("Ghost", declared()).disabled())
            .unwrap();
        let scene = ctx.scenes_mut().add_scene("Ghosts", true);
        ctx.scenes_mut().place(guard.id(), scene, None);
        ctx.on_after_deserialize(guard.id());
        ctx.tick();
        let entity = ctx.entity(guard.id()).unwrap();
        assert_eq!(count::<ActiveCount>(&ctx, entity), 0);
        assert_eq!(count::<InstanceCount>(&ctx, entity), 1);
        ctx.destroy(guard);
    }

    #[test]
    fn destroy_releases_counts_and_sweeps_the_entity() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Rock");
        let id = guard.id();
        ctx.on_after_deserialize(id);
        ctx.tick();
        let entity = ctx.entity(id).unwrap();

        ctx.destroy(guard);
        assert_eq!(ctx.status(id), ObjectStatus::Destroyed);
        assert!(ctx.object(id).is_none());
        ctx.flush();
        assert!(!ctx.world("Default").unwrap().world().is_alive(entity));
        assert_eq!(ctx.object_count(), 0);
    }

    #[test]
    fn callbacks_fire_once_or_immediately() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Beacon");
        let id = guard.id();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        ctx.on_created(id, move |e| sink.lock().unwrap().push(e)).unwrap();
        ctx.on_after_deserialize(id);
        ctx.tick();
        ctx.flush();
        assert_eq!(seen.lock().unwrap().len(), 1);

        let sink = Arc::clone(&seen);
        ctx.on_created(id, move |e| sink.lock().unwrap().push(e)).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
        ctx.destroy(guard);
    }

    #[test]
    fn world_name_is_fixed_once_created() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Probe");
        let id = guard.id();
        assert_eq!(ctx.world_name(id), Some("Default"));
        ctx.set_world_name(id, "Physics").unwrap();
        assert_eq!(ctx.world_name(id), Some("Physics"));

        ctx.on_after_deserialize(id);
        ctx.tick();
        assert!(ctx.worlds().epoch("Physics").is_some());
        assert_eq!(
            ctx.set_world_name(id, "Default"),
            Err(BridgeError::AlreadyCreated(id))
        );
        ctx.destroy(guard);
    }

    #[test]
    fn contains_builds_the_archetype() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Tank");
        assert!(ctx.archetype_info(guard.id()).is_none());
        assert!(ctx.contains(guard.id(), TypeId::of::<Hull>()).unwrap());
        assert!(!ctx.contains(guard.id(), TypeId::of::<Engine>()).unwrap());
        assert!(ctx.archetype_info(guard.id()).is_some());
        ctx.destroy(guard);
    }

    #[test]
    fn destroying_the_world_invalidates_the_info() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Tower");
        ctx.contains(guard.id(), TypeId::of::<Hull>()).unwrap();
        let info = ctx.archetype_info(guard.id()).unwrap();
        assert!(info.is_valid(ctx.worlds()));

        ctx.create_world("Default");
        let info = ctx.archetype_info(guard.id()).unwrap();
        assert!(!info.is_valid(ctx.worlds()));

        // Deserializing is not an instance any more: the info went stale.
        ctx.on_after_deserialize(guard.id());
        assert!(!ctx.is_instance(guard.id()));
        ctx.tick();
        assert!(ctx.is_created(guard.id()));
        ctx.destroy(guard);
    }

    #[test]
    fn rebuild_while_creating_is_rejected() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Wall");
        ctx.on_after_deserialize(guard.id());
        ctx.create_all_deserialized_entities();
        assert!(matches!(
            ctx.rebuild_archetype(guard.id()),
            Err(BridgeError::UnexpectedStatus { .. })
        ));
        ctx.destroy(guard);
    }

    #[test]
    fn prefab_entity_is_cloned_without_its_counts() {
        let mut ctx = context();
        let donor = placed(&mut ctx, "Donor");
        ctx.on_after_deserialize(donor.id());
        ctx.tick();
        let prefab = ctx.entity(donor.id()).unwrap();
        ctx.world_mut("Default")
            .unwrap()
            .set_component(prefab, Hull(77));
        ctx.flush();

        let clone = ctx
            .spawn_object(ObjectDesc::new("Clone", declared()).with_prefab(prefab))
            .unwrap();
        let scene = ctx.scenes_mut().add_scene("Clones", true);
        ctx.scenes_mut().place(clone.id(), scene, None);
        ctx.on_after_deserialize(clone.id());
        ctx.tick();

        let entity = ctx.entity(clone.id()).unwrap();
        let world = ctx.world("Default").unwrap();
        assert_eq!(world.get_component::<Hull>(entity), Hull(77));
        assert_eq!(world.get_buffer::<ObjectLink>(entity), vec![ObjectLink(clone.id())]);
        assert_eq!(count::<InstanceCount>(&ctx, entity), 1);
        ctx.destroy(clone);
        ctx.destroy(donor);
    }

    #[test]
    fn object_table_capacity_is_enforced() {
        init_test_logger();
        let mut ctx = BridgeContext::with_config(BridgeConfig {
            max_objects: 1,
            ..relaxed()
        });
        let first = ctx.spawn_object(ObjectDesc::new("A", declared())).unwrap();
        assert!(matches!(
            ctx.spawn_object(ObjectDesc::new("B", declared())),
            Err(BridgeError::ObjectTableFull { capacity: 1 })
        ));
        let first_id = first.id();
        ctx.destroy(first);
        let reused = ctx.spawn_object(ObjectDesc::new("C", declared())).unwrap();
        assert_eq!(reused.id().index(), first_id.index());
        assert_ne!(reused.id(), first_id);
        ctx.destroy(reused);
    }

    #[test]
    fn captured_record_carries_the_entity_side() {
        let mut ctx = context();
        let guard = placed(&mut ctx, "Crane");
        let id = guard.id();
        ctx.on_after_deserialize(id);
        ctx.tick();
        let entity = ctx.entity(id).unwrap();
        let info = ctx.info_id(id);

        let record = ctx.capture(id).unwrap();
        assert_eq!(record.entity, entity);
        assert_eq!(record.info, info);
        assert!(record.was_active);
        assert!(!record.is_unresolved());

        let _ = guard.disarm();
        ctx.dispose(record);
        assert!(ctx.object(id).is_none());
        assert_eq!(ctx.infos.len(), 0);
        ctx.flush();
        assert!(!ctx.world("Default").unwrap().world().is_alive(entity));
    }

    #[test]
    fn destroyed_queued_object_gives_back_its_queue_slot() {
        init_test_logger();
        let mut ctx = BridgeContext::with_config(BridgeConfig {
            max_objects: 1,
            deferred_capacity: 1,
            ..relaxed()
        });
        let first = placed(&mut ctx, "A");
        let first_id = first.id();
        assert!(ctx.on_after_deserialize(first_id));
        ctx.destroy(first);
        assert_eq!(ctx.deferred_len(), 0);

        let second = placed(&mut ctx, "B");
        let id = second.id();
        assert_eq!(id.index(), first_id.index());
        assert!(ctx.on_after_deserialize(id));
        ctx.tick();
        assert!(ctx.is_created(id));
        ctx.destroy(second);
    }

    #[test]
    fn dropped_queued_object_gives_back_its_queue_slot() {
        init_test_logger();
        let mut ctx = BridgeContext::with_config(BridgeConfig {
            max_objects: 2,
            deferred_capacity: 2,
            ..relaxed()
        });
        let kept = placed(&mut ctx, "Kept");
        let dropped = placed(&mut ctx, "Dropped");
        assert!(ctx.on_after_deserialize(kept.id()));
        assert!(ctx.on_after_deserialize(dropped.id()));
        drop(dropped);
        assert_eq!(ctx.dispose_all_destroyed_entities(), 1);
        assert_eq!(ctx.deferred_len(), 1);
        assert_eq!(ctx.status(kept.id()), ObjectStatus::Deserializing);

        ctx.tick();
        assert!(ctx.is_created(kept.id()));
        ctx.destroy(kept);
    }

    #[test]
    fn invalidated_scene_marks_its_objects_invalid() {
        let mut ctx = context();
        let guard = ctx.spawn_object(ObjectDesc::new("Stranded", declared())).unwrap();
        let id = guard.id();
        let scene = ctx.scenes_mut().add_scene("Unloaded", true);
        ctx.scenes_mut().place(id, scene, None);
        assert!(ctx.on_after_deserialize(id));

        ctx.scenes_mut().invalidate(scene);
        assert!(ctx.create_all_deserialized_entities());
        assert_eq!(ctx.status(id), ObjectStatus::Invalid);
        assert!(ctx.object(id).unwrap().entity().is_null());
        assert!(ctx.entity(id).is_err());
        assert_eq!(ctx.world("Default").unwrap().world().entity_count(), 0);
        ctx.destroy(guard);
    }

    #[test]
    #[should_panic(expected = "contract violated")]
    fn strict_mode_panics_on_contract_violations() {
        init_test_logger();
        let ctx = BridgeContext::with_config(BridgeConfig {
            strict_contracts: true,
            ..BridgeConfig::default()
        });
        ctx.escalate(&BridgeError::ParentCycle(ObjectId::new(0, 0)));
    }
}
