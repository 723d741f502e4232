//! # Entity Store
//!
//! A small archetype ECS that plays the role of the entity-component storage
//! engine the bridge talks to. The bridge only uses it through
//! [`EntityCommands`]; everything else here is the storage behind that trait.
//!
//! ## Module Overview
//!
//! - [`entity`] — Generational handles and the null sentinel
//! - [`component`] — Runtime component kinds, buffers, type-erased columns
//! - [`archetype`] — Shapes (component sets) and archetype tables
//! - [`world`] — Entity/component storage with enable flags
//! - [`commands`] — The batched command interface
//! - [`registry`] — Named worlds with creation epochs

pub(crate) mod archetype;
pub mod commands;
pub(crate) mod component;
pub mod entity;
pub mod registry;
pub mod world;

pub use archetype::ArchetypeShape;
pub use commands::{BufferOption, EntityCommander, EntityCommands, EntityCommandsExt};
pub use component::{Buffer, Component, ComponentKind};
pub use entity::Entity;
pub use registry::WorldRegistry;
pub use world::World;
