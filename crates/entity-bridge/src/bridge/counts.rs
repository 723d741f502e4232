//! # Reference-Count Components
//!
//! Several wrapper objects can be bound to one cluster of entities. The
//! cluster's *origin* entity carries two counters:
//!
//! - [`InstanceCount`]: wrappers whose creation was requested and that have
//!   not been reclaimed yet;
//! - [`ActiveCount`]: those of them that are currently enabled.
//!
//! Both are adjusted only through [`add_count`], which resolves the origin,
//! refuses to go below zero and marks the component enabled so downstream
//! systems can spot counts that changed.
//!
//! The remaining components are the fixed set every bridged entity carries:
//! [`EntityOrigin`] (back-reference to the origin), [`ObjectLink`] (buffer of
//! wrapper objects bound to the entity) and, for children, [`EntityParent`].
//! Template entities are tagged [`Prefab`].

use super::object::ObjectId;
use super::status::ObjectStatus;
use crate::ecs::{Buffer, Component, ComponentKind, Entity, EntityCommands, EntityCommandsExt};
use crate::error::BridgeError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstanceCount(pub i32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActiveCount(pub i32);

/// Points at the entity that holds this cluster's counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityOrigin {
    pub entity: Entity,
}

/// One entry per parent link. Stored as `Buffer<EntityParent>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityParent {
    pub entity: Entity,
}

/// A wrapper object bound to the entity. Stored as `Buffer<ObjectLink>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObjectLink(pub ObjectId);

/// Marks template entities. They are never swept and never counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prefab;

/// A counter kept on origin entities.
pub trait CountComponent: Component {
    const NAME: &'static str;

    fn value(&self) -> i32;

    fn from_value(value: i32) -> Self;
}

impl CountComponent for InstanceCount {
    const NAME: &'static str = "InstanceCount";

    fn value(&self) -> i32 {
        self.0
    }

    fn from_value(value: i32) -> Self {
        InstanceCount(value)
    }
}

impl CountComponent for ActiveCount {
    const NAME: &'static str = "ActiveCount";

    fn value(&self) -> i32 {
        self.0
    }

    fn from_value(value: i32) -> Self {
        ActiveCount(value)
    }
}

/// Components appended to every live-instance archetype.
pub fn fixed_kinds(with_parent: bool) -> Vec<ComponentKind> {
    let mut kinds = vec![
        ComponentKind::of::<Buffer<ObjectLink>>(),
        ComponentKind::of::<InstanceCount>(),
        ComponentKind::of::<ActiveCount>(),
        ComponentKind::of::<EntityOrigin>(),
    ];
    if with_parent {
        kinds.push(ComponentKind::of::<Buffer<EntityParent>>());
    }
    kinds
}

/// Resolve the entity whose counts a wrapper in `status` holding `entity`
/// contributes to.
///
/// Returns `Ok(None)` for a wrapper that never got an entity: there is
/// nothing to adjust.
pub fn resolve_origin<C: EntityCommands + ?Sized>(
    commands: &C,
    status: ObjectStatus,
    entity: Entity,
    component: &'static str,
) -> Result<Option<Entity>, BridgeError> {
    match status {
        ObjectStatus::Creating => Ok(Some(entity)),
        ObjectStatus::Created => commands
            .try_get_component::<EntityOrigin>(entity)
            .map(|origin| origin.entity)
            .filter(|origin| !origin.is_null())
            .map(Some)
            .ok_or(BridgeError::MissingComponent {
                entity,
                component: "EntityOrigin",
            }),
        _ if entity.is_null() => Ok(None),
        _ => Err(BridgeError::InvalidStatus {
            entity,
            status,
            component,
        }),
    }
}

/// Add `delta` to the `T` counter of `entity`'s origin.
///
/// Returns the new value, or `None` when the wrapper had no entity. A result
/// below zero is rejected and nothing is written.
pub fn add_count<T: CountComponent, C: EntityCommands + ?Sized>(
    commands: &mut C,
    status: ObjectStatus,
    entity: Entity,
    delta: i32,
) -> Result<Option<i32>, BridgeError> {
    let Some(origin) = resolve_origin(commands, status, entity, T::NAME)? else {
        return Ok(None);
    };
    let current = commands
        .try_get_component::<T>(origin)
        .ok_or(BridgeError::MissingComponent {
            entity: origin,
            component: T::NAME,
        })?;
    let value = current.value() + delta;
    if value < 0 {
        return Err(BridgeError::CountUnderflow {
            entity: origin,
            component: T::NAME,
            value,
        });
    }
    commands.set_component(origin, T::from_value(value));
    commands.set_component_enabled::<T>(origin, true);
    log::trace!("{} on {origin} is now {value}", T::NAME);
    Ok(Some(value))
}
