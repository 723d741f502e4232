//! # Archetype Info — Cached Creation Descriptors
//!
//! Working out which components an object's entity needs means asking the
//! declaration collaborator, hashing the result and, for templates, building
//! a template entity. An [`ArchetypeInfo`] caches all of that per object (or
//! per template, shared by every instance made from it).
//!
//! An info is tied to one incarnation of one world:
//!
//! ```text
//! ArchetypeInfo { world_name: "Default", world_epoch: 3, component_hash: 0x9f.. }
//!                                              │
//!        WorldRegistry.epoch("Default") == 3 ? valid : discard and rebuild
//! ```
//!
//! Infos are never repaired in place once invalid. The owner drops the old
//! one (destroying its template entity) and allocates a fresh one.

use super::counts::Prefab;
use super::object::ObjectId;
use crate::ecs::{ArchetypeShape, ComponentKind, Entity, EntityCommands, WorldRegistry};

/// Handle to an [`ArchetypeInfo`] in the context's store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InfoId {
    index: u32,
    generation: u32,
}

impl InfoId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
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

#[derive(Debug)]
pub struct ArchetypeInfo {
    owner: ObjectId,
    name: String,
    component_hash: u64,
    world_name: String,
    world_epoch: u64,
    shape: Option<ArchetypeShape>,
    is_template: bool,
    template: Entity,
    revision: u32,
}

impl ArchetypeInfo {
    pub(crate) fn new(
        owner: ObjectId,
        name: impl Into<String>,
        component_hash: u64,
        world_name: impl Into<String>,
        world_epoch: u64,
    ) -> Self {
        Self {
            owner,
            name: name.into(),
            component_hash,
            world_name: world_name.into(),
            world_epoch,
            shape: None,
            is_template: false,
            template: Entity::NULL,
            revision: 0,
        }
    }

    /// The object that allocated this info. Only the owner may destroy it.
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component_hash(&self) -> u64 {
        self.component_hash
    }

    pub fn world_name(&self) -> &str {
        &self.world_name
    }

    pub(crate) fn world_epoch(&self) -> u64 {
        self.world_epoch
    }

    /// The built shape, `None` until the first rebuild.
    pub fn shape(&self) -> Option<&ArchetypeShape> {
        self.shape.as_ref()
    }

    pub fn is_template(&self) -> bool {
        self.is_template
    }

    /// Template entity instances are cloned from, or [`Entity::NULL`].
    pub fn template(&self) -> Entity {
        self.template
    }

    /// How many times the shape has actually been (re)applied.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn is_valid(&self, worlds: &WorldRegistry) -> bool {
        worlds.is_current(&self.world_name, self.world_epoch)
    }

    /// Apply a declared shape.
    ///
    /// Template builds record the declared shape as-is and create a
    /// [`Prefab`]-tagged template entity; instance builds append `fixed`.
    /// Returns `false` without touching anything when the resulting shape and
    /// template flag are what is already cached.
    pub(crate) fn rebuild<C: EntityCommands + ?Sized>(
        &mut self,
        commands: &mut C,
        is_template: bool,
        declared: &ArchetypeShape,
        fixed: &[ComponentKind],
    ) -> bool {
        let shape = if is_template {
            declared.clone()
        } else {
            declared.with(fixed)
        };
        let template_ok = !is_template || commands.is_alive(self.template);
        if self.shape.as_ref() == Some(&shape) && self.is_template == is_template && template_ok {
            return false;
        }

        self.release(commands);
        if is_template {
            let template_shape = shape.with(&[ComponentKind::of::<Prefab>()]);
            self.template = commands.create_entity(&template_shape, Entity::NULL);
        }
        self.shape = Some(shape);
        self.is_template = is_template;
        self.revision += 1;
        log::debug!(
            "archetype '{}' rebuilt (revision {}, template: {})",
            self.name,
            self.revision,
            is_template
        );
        true
    }

    /// Destroy the template entity, if any.
    pub(crate) fn release<C: EntityCommands + ?Sized>(&mut self, commands: &mut C) {
        if !self.template.is_null() {
            commands.destroy_entity(self.template);
            self.template = Entity::NULL;
        }
    }
}

struct InfoSlot {
    generation: u32,
    info: Option<ArchetypeInfo>,
}

/// Generational storage for every live [`ArchetypeInfo`].
pub(crate) struct ArchetypeInfoStore {
    slots: Vec<InfoSlot>,
    free: Vec<u32>,
}

impl ArchetypeInfoStore {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn insert(&mut self, info: ArchetypeInfo) -> InfoId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.info = Some(info);
            return InfoId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(InfoSlot {
            generation: 0,
            info: Some(info),
        });
        InfoId::new(index, 0)
    }

    pub fn get(&self, id: InfoId) -> Option<&ArchetypeInfo> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.info.as_ref())
    }

    pub fn get_mut(&mut self, id: InfoId) -> Option<&mut ArchetypeInfo> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.info.as_mut())
    }

    pub fn remove(&mut self, id: InfoId) -> Option<ArchetypeInfo> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let info = slot.info.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(info)
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
