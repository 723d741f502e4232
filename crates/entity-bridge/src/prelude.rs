//! Convenience re-exports — `use entity_bridge::prelude::*` for the common items.

pub use crate::bridge::{
    ActiveCount, BridgeContext, ComponentDeclaration, DeclaredComponents, DeserializedPass,
    Deserializer, EntityBinding, EntityView, InstanceCount, ObjectDesc, ObjectGuard, ObjectId,
    ObjectStatus, SceneGraph, SceneHost,
};
pub use crate::config::BridgeConfig;
pub use crate::ecs::{BufferOption, Entity, EntityCommands, EntityCommandsExt};
pub use crate::error::BridgeError;
pub use crate::logging::init_logger;

#[cfg(feature = "diagnostics")]
pub use crate::diagnostics::BridgeStats;
