//! Entity access through a wrapper object.
//!
//! Gameplay code rarely holds an [`Entity`] together with the right world.
//! These helpers take an [`ObjectId`], force its entity into existence if it
//! is still waiting in the deferred queue, and forward to that entity's world.

use super::context::BridgeContext;
use super::object::ObjectId;
use super::scene::SceneHost;
use super::status::ObjectStatus;
use crate::ecs::{BufferOption, Component, Entity, EntityCommander, EntityCommands, EntityCommandsExt};
use crate::error::BridgeError;

/// Something bound to one entity in one named world.
pub trait EntityView {
    fn entity(&self) -> Entity;

    fn world_name(&self) -> &str;

    fn status(&self) -> ObjectStatus;

    fn is_bound(&self) -> bool {
        !self.entity().is_null() && self.status().is_assigned()
    }
}

/// Snapshot of an object's binding. Does not follow later changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityBinding {
    world_name: String,
    entity: Entity,
    status: ObjectStatus,
}

impl EntityBinding {
    pub fn new(world_name: impl Into<String>, entity: Entity, status: ObjectStatus) -> Self {
        Self {
            world_name: world_name.into(),
            entity,
            status,
        }
    }
}

impl EntityView for EntityBinding {
    fn entity(&self) -> Entity {
        self.entity
    }

    fn world_name(&self) -> &str {
        &self.world_name
    }

    fn status(&self) -> ObjectStatus {
        self.status
    }
}

impl<S: SceneHost> BridgeContext<S> {
    /// Current binding of `id`, without forcing a build.
    pub fn binding(&self, id: ObjectId) -> Option<EntityBinding> {
        let object = self.object(id)?;
        let world = self.world_name(id)?;
        Some(EntityBinding::new(world, object.entity(), self.status(id)))
    }

    fn bound_world(&mut self, id: ObjectId) -> Result<(Entity, &mut EntityCommander), BridgeError> {
        let entity = self.entity(id)?;
        let name = self
            .object(id)
            .and_then(|object| object.world.as_ref())
            .map(|key| key.name.clone())
            .ok_or(BridgeError::StaleObject(id))?;
        let commands = self
            .world_mut(&name)
            .ok_or(BridgeError::MissingWorld(name))?;
        Ok((entity, commands))
    }

    fn bound_world_ref(&self, id: ObjectId) -> Option<(Entity, &EntityCommander)> {
        let object = self.object(id)?;
        let key = object.world.as_ref()?;
        if !self.worlds().is_current(&key.name, key.epoch) {
            return None;
        }
        let entity = object.entity();
        let commands = self.world(&key.name)?;
        Some((entity, commands))
    }

    pub fn set_component<T: Component>(&mut self, id: ObjectId, value: T) -> Result<(), BridgeError> {
        let (entity, commands) = self.bound_world(id)?;
        commands.set_component(entity, value);
        Ok(())
    }

    pub fn set_component_enabled<T: 'static>(
        &mut self,
        id: ObjectId,
        enabled: bool,
    ) -> Result<(), BridgeError> {
        let (entity, commands) = self.bound_world(id)?;
        commands.set_component_enabled::<T>(entity, enabled);
        Ok(())
    }

    pub fn set_buffer<T: Clone + Send + Sync + 'static>(
        &mut self,
        id: ObjectId,
        values: &[T],
        option: BufferOption,
    ) -> Result<(), BridgeError> {
        let (entity, commands) = self.bound_world(id)?;
        commands.set_buffer(entity, values, option);
        Ok(())
    }

    /// `None` if the object has no entity yet or the entity lacks `T`.
    pub fn try_get_component<T: Component>(&self, id: ObjectId) -> Option<T> {
        let (entity, commands) = self.bound_world_ref(id)?;
        commands.try_get_component(entity)
    }

    /// # Panics
    ///
    /// Panics if the object has no entity or the entity lacks `T`.
    pub fn get_component<T: Component>(&self, id: ObjectId) -> T {
        match self.bound_world_ref(id) {
            Some((entity, commands)) => commands.get_component(entity),
            None => panic!(
                "object {id} has no entity to read `{}` from",
                std::any::type_name::<T>()
            ),
        }
    }

    pub fn has_component<T: 'static>(&self, id: ObjectId) -> bool {
        self.bound_world_ref(id)
            .is_some_and(|(entity, commands)| commands.has_component::<T>(entity))
    }

    pub fn try_get_buffer<T: Clone + Send + Sync + 'static>(
        &self,
        id: ObjectId,
        index: usize,
    ) -> Option<T> {
        let (entity, commands) = self.bound_world_ref(id)?;
        commands.try_get_buffer(entity, index)
    }

    /// Destroy the object's entity directly. The object itself stays; its
    /// entity handle goes stale.
    pub fn destroy_entity(&mut self, id: ObjectId) -> Result<(), BridgeError> {
        let (entity, commands) = self.bound_world(id)?;
        commands.destroy_entity(entity);
        Ok(())
    }
}
