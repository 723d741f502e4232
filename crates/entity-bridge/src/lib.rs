//! # Entity Bridge — Scene Objects on Top of an ECS
//!
//! Lets conventional, scene-attached objects own entities in an archetype
//! ECS. Objects are deserialized on any thread, queued, and turned into
//! entities in one batch on the driver thread, parents before children. When
//! an object goes away its contribution to the entity's reference counts is
//! undone through a second queue.
//!
//! Start with `use entity_bridge::prelude::*`, build a
//! [`BridgeContext`](bridge::BridgeContext) and call
//! [`tick`](bridge::BridgeContext::tick) once per frame.

pub mod bridge;
pub mod config;
pub mod ecs;
pub mod error;
pub mod logging;
pub mod prelude;

#[cfg(feature = "diagnostics")]
pub mod diagnostics;
