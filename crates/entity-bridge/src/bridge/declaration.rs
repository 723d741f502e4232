//! Declared component sets.
//!
//! A wrapper object does not know its components by itself; it asks a
//! [`ComponentDeclaration`]. The bridge only needs three answers from it: the
//! declared shape with its structural hash, the hash alone (cheap, used to
//! spot stale infos) and the runtime-only kinds that are added to live
//! entities but take no part in the hash.

use crate::ecs::{ArchetypeShape, Component, ComponentKind};

/// The result of recomputing a declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeDescriptor {
    pub shape: ArchetypeShape,
    pub hash: u64,
}

impl ShapeDescriptor {
    pub fn new(shape: ArchetypeShape) -> Self {
        let hash = shape.structural_hash();
        Self { shape, hash }
    }
}

pub trait ComponentDeclaration: Send + Sync {
    /// Recompute the declared shape.
    fn rebuild(&mut self) -> ShapeDescriptor;

    /// Structural hash of the declared shape as of the last change.
    fn component_hash(&self) -> u64;

    /// Append kinds that live entities carry in addition to the declared ones.
    fn runtime_component_kinds(&self, out: &mut Vec<ComponentKind>);

    fn box_clone(&self) -> Box<dyn ComponentDeclaration>;
}

/// A plain list of declared kinds.
///
/// ```rust
/// # use entity_bridge::bridge::DeclaredComponents;
/// #[derive(Clone, Default)]
/// struct Velocity([f32; 2]);
/// #[derive(Clone, Default)]
/// struct Selected;
///
/// let declared = DeclaredComponents::new()
///     .with::<Velocity>()
///     .with_runtime::<Selected>();
/// assert_eq!(declared.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DeclaredComponents {
    declared: Vec<ComponentKind>,
    runtime: Vec<ComponentKind>,
}

impl DeclaredComponents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Component>(mut self) -> Self {
        self.add::<T>();
        self
    }

    pub fn with_runtime<T: Component>(mut self) -> Self {
        let kind = ComponentKind::of::<T>();
        if !self.runtime.contains(&kind) {
            self.runtime.push(kind);
        }
        self
    }

    pub fn add<T: Component>(&mut self) {
        let kind = ComponentKind::of::<T>();
        if !self.declared.contains(&kind) {
            self.declared.push(kind);
        }
    }

    pub fn remove<T: Component>(&mut self) -> bool {
        let kind = ComponentKind::of::<T>();
        let before = self.declared.len();
        self.declared.retain(|k| *k != kind);
        self.declared.len() != before
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    fn shape(&self) -> ArchetypeShape {
        ArchetypeShape::new(self.declared.iter().copied())
    }
}

impl ComponentDeclaration for DeclaredComponents {
    fn rebuild(&mut self) -> ShapeDescriptor {
        ShapeDescriptor::new(self.shape())
    }

    fn component_hash(&self) -> u64 {
        self.shape().structural_hash()
    }

    fn runtime_component_kinds(&self, out: &mut Vec<ComponentKind>) {
        out.extend_from_slice(&self.runtime);
    }

    fn box_clone(&self) -> Box<dyn ComponentDeclaration> {
        Box::new(self.clone())
    }
}
