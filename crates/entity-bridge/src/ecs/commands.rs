//! # Commands — The Narrow Interface to the Entity Store
//!
//! The bridge never reaches into a [`World`]. Everything it needs goes
//! through [`EntityCommands`]:
//!
//! - `create_entity(shape, template)` allocates immediately and returns a live
//!   handle;
//! - component writes, enable toggles and destroys are *batched* and applied
//!   by [`EntityCommander::flush`];
//! - reads see the batch first, so a read-modify-write of a count within one
//!   tick never loses an update even though the store itself has not changed
//!   yet.
//!
//! ```text
//! bridge ──set/enable/destroy──► pending: Vec<Command> ──flush──► World
//!    ▲                                │
//!    └──────── try_get (pending first, then World) ◄──┘
//! ```
//!
//! [`EntityCommandsExt`] layers the typed helpers (`set_component::<T>`,
//! `set_buffer`, `try_get_buffer`, ...) over the object-safe core so any
//! backend only has to implement a handful of type-erased methods.

use std::any::{Any, TypeId};

use super::archetype::ArchetypeShape;
use super::component::{BoxedComponent, Buffer, Component, ComponentKind};
use super::entity::Entity;
use super::world::World;

/// Whether [`EntityCommandsExt::set_buffer`] extends or overwrites a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferOption {
    Append,
    Replace,
}

/// Type-erased command interface the bridge consumes.
pub trait EntityCommands {
    /// Allocate an entity with `shape`, cloning matching components from
    /// `template` when it is a live entity. Never returns [`Entity::NULL`].
    fn create_entity(&mut self, shape: &ArchetypeShape, template: Entity) -> Entity;

    fn set_component_raw(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
        value: Box<dyn Any + Send + Sync>,
    );

    fn set_component_enabled_raw(&mut self, entity: Entity, type_id: TypeId, enabled: bool);

    fn try_get_component_raw(&self, entity: Entity, type_id: TypeId) -> Option<&dyn Any>;

    fn has_component_raw(&self, entity: Entity, type_id: TypeId) -> bool;

    fn is_component_enabled_raw(&self, entity: Entity, type_id: TypeId) -> bool;

    fn destroy_entity(&mut self, entity: Entity);

    /// Alive in the store and not scheduled for destruction.
    fn is_alive(&self, entity: Entity) -> bool;
}

/// Typed helpers over [`EntityCommands`].
pub trait EntityCommandsExt: EntityCommands {
    fn set_component<T: Component>(&mut self, entity: Entity, value: T) {
        self.set_component_raw(entity, ComponentKind::of::<T>(), Box::new(value));
    }

    fn try_get_component<T: Component>(&self, entity: Entity) -> Option<T> {
        self.try_get_component_raw(entity, TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// # Panics
    ///
    /// Panics if the entity does not have the component.
    fn get_component<T: Component>(&self, entity: Entity) -> T {
        self.try_get_component(entity).unwrap_or_else(|| {
            panic!(
                "Component `{}` missing on {}",
                std::any::type_name::<T>(),
                entity
            )
        })
    }

    fn has_component<T: 'static>(&self, entity: Entity) -> bool {
        self.has_component_raw(entity, TypeId::of::<T>())
    }

    fn set_component_enabled<T: 'static>(&mut self, entity: Entity, enabled: bool) {
        self.set_component_enabled_raw(entity, TypeId::of::<T>(), enabled);
    }

    fn is_component_enabled<T: 'static>(&self, entity: Entity) -> bool {
        self.is_component_enabled_raw(entity, TypeId::of::<T>())
    }

    fn set_buffer<T: Clone + Send + Sync + 'static>(
        &mut self,
        entity: Entity,
        values: &[T],
        option: BufferOption,
    ) {
        let mut buffer = match option {
            BufferOption::Append => self
                .try_get_component::<Buffer<T>>(entity)
                .unwrap_or_default(),
            BufferOption::Replace => Buffer::default(),
        };
        buffer.0.extend_from_slice(values);
        self.set_component(entity, buffer);
    }

    fn try_get_buffer<T: Clone + Send + Sync + 'static>(
        &self,
        entity: Entity,
        index: usize,
    ) -> Option<T> {
        self.try_get_component_raw(entity, TypeId::of::<Buffer<T>>())
            .and_then(|value| value.downcast_ref::<Buffer<T>>())
            .and_then(|buffer| buffer.0.get(index).cloned())
    }

    /// # Panics
    ///
    /// Panics if the entity has no buffer of `T`.
    fn get_buffer<T: Clone + Send + Sync + 'static>(&self, entity: Entity) -> Vec<T> {
        self.get_component::<Buffer<T>>(entity).0
    }

    fn destroy_entities(&mut self, entities: &[Entity]) {
        for &entity in entities {
            self.destroy_entity(entity);
        }
    }
}

impl<C: EntityCommands + ?Sized> EntityCommandsExt for C {}

enum Command {
    Set {
        entity: Entity,
        kind: ComponentKind,
        value: BoxedComponent,
    },
    Enable {
        entity: Entity,
        type_id: TypeId,
        enabled: bool,
    },
    Destroy(Entity),
}

/// A [`World`] plus the batch of writes not yet applied to it.
pub struct EntityCommander {
    world: World,
    pending: Vec<Command>,
}

impl EntityCommander {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            pending: Vec::new(),
        }
    }

    /// Read-only view of the store as of the last flush.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Apply every batched command in submission order. Returns how many were
    /// applied.
    pub fn flush(&mut self) -> usize {
        let commands = std::mem::take(&mut self.pending);
        let applied = commands.len();
        for command in commands {
            match command {
                Command::Set {
                    entity,
                    kind,
                    value,
                } => {
                    if self.world.is_alive(entity) {
                        self.world.set_any(entity, kind, value);
                    } else {
                        log::debug!("dropped write of `{}` to dead {entity}", kind.short_name());
                    }
                }
                Command::Enable {
                    entity,
                    type_id,
                    enabled,
                } => {
                    if !self.world.set_enabled(entity, type_id, enabled) {
                        log::debug!("enable toggle on {entity} targets a missing component");
                    }
                }
                Command::Destroy(entity) => {
                    self.world.despawn(entity);
                }
            }
        }
        applied
    }

    pub fn set_label(&mut self, entity: Entity, label: impl Into<String>) {
        self.world.set_label(entity, label);
    }

    fn pending_destroy(&self, entity: Entity) -> bool {
        self.pending
            .iter()
            .any(|command| matches!(command, Command::Destroy(e) if *e == entity))
    }

    /// Direct world access for maintenance passes that run after a flush.
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

impl Default for EntityCommander {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityCommands for EntityCommander {
    fn create_entity(&mut self, shape: &ArchetypeShape, template: Entity) -> Entity {
        if !template.is_null() && self.world.is_alive(template) {
            self.world.spawn_from(template, shape)
        } else {
            self.world.spawn(shape)
        }
    }

    fn set_component_raw(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
        value: Box<dyn Any + Send + Sync>,
    ) {
        self.pending.push(Command::Set {
            entity,
            kind,
            value,
        });
    }

    fn set_component_enabled_raw(&mut self, entity: Entity, type_id: TypeId, enabled: bool) {
        self.pending.push(Command::Enable {
            entity,
            type_id,
            enabled,
        });
    }

    fn try_get_component_raw(&self, entity: Entity, type_id: TypeId) -> Option<&dyn Any> {
        for command in self.pending.iter().rev() {
            match command {
                Command::Destroy(e) if *e == entity => return None,
                Command::Set {
                    entity: e,
                    kind,
                    value,
                } if *e == entity && kind.type_id() == type_id => {
                    let value: &dyn Any = &**value;
                    return Some(value);
                }
                _ => {}
            }
        }
        self.world.get_any(entity, type_id)
    }

    fn has_component_raw(&self, entity: Entity, type_id: TypeId) -> bool {
        self.try_get_component_raw(entity, type_id).is_some()
    }

    fn is_component_enabled_raw(&self, entity: Entity, type_id: TypeId) -> bool {
        if !self.has_component_raw(entity, type_id) {
            return false;
        }
        for command in self.pending.iter().rev() {
            if let Command::Enable {
                entity: e,
                type_id: t,
                enabled,
            } = command
            {
                if *e == entity && *t == type_id {
                    return *enabled;
                }
            }
        }
        // Components added by a pending write start enabled.
        !self.world.has(entity, type_id) || self.world.is_enabled(entity, type_id)
    }

    fn destroy_entity(&mut self, entity: Entity) {
        if !entity.is_null() {
            self.pending.push(Command::Destroy(entity));
        }
    }

    fn is_alive(&self, entity: Entity) -> bool {
        self.world.is_alive(entity) && !self.pending_destroy(entity)
    }
}
