//! # Scene Host
//!
//! The bridge has to know three things about where a wrapper object lives:
//! whether scenes are still loading, whether the object's own scene is
//! valid, and which wrapper object is its nearest ancestor. [`SceneHost`] is
//! that seam. [`SceneGraph`] is a small in-memory implementation: a forest of
//! transform nodes per scene, some of which carry wrapper objects.
//!
//! ```text
//! scene "Level"
//!   node 0 (Ship)            ◄── parent_of(Turret) == Ship
//!     node 1 (no object)
//!       node 2 (Turret)
//! ```
//!
//! Nodes without an object are skipped when resolving parents, the same way
//! an intermediate plain transform would be.

use std::collections::HashMap;

use super::object::ObjectId;

pub trait SceneHost {
    /// `false` while any scene is still loading.
    fn all_scenes_loaded(&self) -> bool;

    /// Whether `object` sits in a valid scene. Objects outside every scene
    /// (templates, runtime spawns) are not.
    fn is_scene_valid(&self, object: ObjectId) -> bool;

    /// Nearest ancestor that carries a wrapper object.
    fn parent_of(&self, object: ObjectId) -> Option<ObjectId>;

    fn is_active_and_enabled(&self, _object: ObjectId) -> bool {
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneId(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

struct SceneState {
    name: String,
    loaded: bool,
    valid: bool,
}

struct Node {
    scene: SceneId,
    parent: Option<NodeId>,
    object: Option<ObjectId>,
    active: bool,
}

#[derive(Default)]
pub struct SceneGraph {
    scenes: Vec<SceneState>,
    nodes: Vec<Node>,
    objects: HashMap<ObjectId, NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scene(&mut self, name: impl Into<String>, loaded: bool) -> SceneId {
        let id = SceneId(self.scenes.len() as u32);
        self.scenes.push(SceneState {
            name: name.into(),
            loaded,
            valid: true,
        });
        id
    }

    pub fn scene_name(&self, scene: SceneId) -> Option<&str> {
        self.scenes.get(scene.0 as usize).map(|s| s.name.as_str())
    }

    pub fn set_loaded(&mut self, scene: SceneId, loaded: bool) {
        if let Some(state) = self.scenes.get_mut(scene.0 as usize) {
            state.loaded = loaded;
            log::debug!("scene '{}' loaded: {loaded}", state.name);
        }
    }

    /// Mark a scene unloaded for good. Objects in it are no longer valid.
    pub fn invalidate(&mut self, scene: SceneId) {
        if let Some(state) = self.scenes.get_mut(scene.0 as usize) {
            state.valid = false;
            state.loaded = true;
        }
    }

    /// Add a node with no object. `parent` must belong to the same scene.
    pub fn add_node(&mut self, scene: SceneId, parent: Option<NodeId>) -> NodeId {
        debug_assert!(
            parent.is_none_or(|p| self.nodes[p.0 as usize].scene == scene),
            "parent node belongs to another scene"
        );
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            scene,
            parent,
            object: None,
            active: true,
        });
        id
    }

    /// Put `object` on a new node under `parent`.
    pub fn place(&mut self, object: ObjectId, scene: SceneId, parent: Option<NodeId>) -> NodeId {
        let node = self.add_node(scene, parent);
        self.nodes[node.0 as usize].object = Some(object);
        self.objects.insert(object, node);
        node
    }

    /// Put `object` on a new node directly under `parent`'s node.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was never placed.
    pub fn place_under(&mut self, object: ObjectId, parent: ObjectId) -> NodeId {
        let parent_node = self.objects[&parent];
        let scene = self.nodes[parent_node.0 as usize].scene;
        self.place(object, scene, Some(parent_node))
    }

    pub fn node_of(&self, object: ObjectId) -> Option<NodeId> {
        self.objects.get(&object).copied()
    }

    pub fn remove(&mut self, object: ObjectId) {
        if let Some(node) = self.objects.remove(&object) {
            self.nodes[node.0 as usize].object = None;
        }
    }

    pub fn set_node_active(&mut self, node: NodeId, active: bool) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.active = active;
        }
    }

    fn ancestors(&self, node: NodeId) -> impl Iterator<Item = &Node> {
        let mut cursor = self.nodes[node.0 as usize].parent;
        // Parents are always added before children, so this terminates.
        std::iter::from_fn(move || {
            let node = &self.nodes[cursor?.0 as usize];
            cursor = node.parent;
            Some(node)
        })
    }
}

impl SceneHost for SceneGraph {
    fn all_scenes_loaded(&self) -> bool {
        self.scenes.iter().all(|s| s.loaded)
    }

    fn is_scene_valid(&self, object: ObjectId) -> bool {
        self.node_of(object)
            .map(|node| self.nodes[node.0 as usize].scene)
            .and_then(|scene| self.scenes.get(scene.0 as usize))
            .is_some_and(|s| s.valid)
    }

    fn parent_of(&self, object: ObjectId) -> Option<ObjectId> {
        let node = self.node_of(object)?;
        self.ancestors(node).find_map(|n| n.object)
    }

    fn is_active_and_enabled(&self, object: ObjectId) -> bool {
        let Some(node) = self.node_of(object) else {
            return true;
        };
        self.nodes[node.0 as usize].active && self.ancestors(node).all(|n| n.active)
    }
}
