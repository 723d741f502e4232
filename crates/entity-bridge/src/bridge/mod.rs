//! # Bridge — Wrapper Objects Backed by Entities
//!
//! A *wrapper object* lives in a scene graph and is driven by ordinary
//! object-lifecycle hooks (deserialize, enable, disable, destroy). Each one
//! owns (or shares) a cluster of entities in a named world. This module keeps
//! the two sides in step:
//!
//! ```text
//!   any thread                         driver thread
//!   ──────────                         ─────────────
//!   Deserializer::on_after_deserialize
//!       │ None → Deserializing
//!       └──► DeferredCreationQueue ──► create_all_deserialized_entities()
//!                                          └─ entity created, counts += 1
//!   drop(ObjectGuard)
//!       └──► DestructionReclaimQueue ─► dispose_all_destroyed_entities()
//!                                          └─ counts -= 1, object retired
//! ```
//!
//! ## Module Overview
//!
//! - [`status`] — Lifecycle status and drain passes
//! - [`object`] — Object ids, shared headers, guards, the deserialization hook
//! - [`deferred`] / [`reclaim`] — The two lock-free queues
//! - [`counts`] — Reference-count components on origin entities
//! - [`declaration`] — What components an object declares
//! - [`archetype_info`] — Cached creation descriptors
//! - [`scene`] — Where objects live
//! - [`context`] — The driver that owns all of the above
//! - [`binding`] — Component access through an object

pub mod archetype_info;
pub mod binding;
pub mod context;
pub mod counts;
pub mod declaration;
pub mod deferred;
pub(crate) mod lockfree;
pub mod object;
pub mod reclaim;
pub mod scene;
pub mod status;

pub use archetype_info::{ArchetypeInfo, InfoId};
pub use binding::{EntityBinding, EntityView};
pub use context::BridgeContext;
pub use counts::{ActiveCount, EntityOrigin, EntityParent, InstanceCount, ObjectLink, Prefab};
pub use declaration::{ComponentDeclaration, DeclaredComponents, ShapeDescriptor};
pub use deferred::DeferredCreationQueue;
pub use object::{Deserializer, GameObjectEntity, ObjectDesc, ObjectGuard, ObjectId};
pub use reclaim::{DestructionReclaimQueue, ReclaimRecord};
pub use scene::{NodeId, SceneGraph, SceneHost, SceneId};
pub use status::{DeserializedPass, ObjectStatus};
