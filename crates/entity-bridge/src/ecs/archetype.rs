//! # Archetype — Shapes and Tables
//!
//! An [`ArchetypeShape`] is the structural identity of an entity: the sorted,
//! deduplicated set of its [`ComponentKind`]s. Two shapes built from the same
//! kinds in any order compare equal, hash equal and report the same
//! [`structural_hash`](ArchetypeShape::structural_hash).
//!
//! All entities with the same shape share one [`Archetype`] table:
//!
//! ```text
//! Archetype { shape: [InstanceCount, EntityOrigin] }
//!
//! columns:
//!   InstanceCount: [c0, c1, c2]
//!   EntityOrigin:  [o0, o1, o2]
//! entities:        [e0, e1, e2]
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::component::{ComponentColumn, ComponentKind};
use super::entity::Entity;

/// A sorted, deduplicated set of component kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArchetypeShape {
    kinds: Vec<ComponentKind>,
}

impl ArchetypeShape {
    pub fn new(kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        let mut kinds: Vec<_> = kinds.into_iter().collect();
        kinds.sort();
        kinds.dedup();
        Self { kinds }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// This shape plus `extra`.
    pub fn with(&self, extra: &[ComponentKind]) -> Self {
        Self::new(self.kinds.iter().chain(extra).copied())
    }

    pub fn kinds(&self) -> &[ComponentKind] {
        &self.kinds
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.kinds
            .binary_search_by(|kind| kind.type_id().cmp(&type_id))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Hash of the component set, stable for the lifetime of the process.
    pub fn structural_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.kinds.len().hash(&mut hasher);
        for kind in &self.kinds {
            kind.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// A table of entities that all share the same shape.
pub(crate) struct Archetype {
    pub shape: ArchetypeShape,
    pub columns: HashMap<TypeId, ComponentColumn>,
    pub entities: Vec<Entity>,
}

impl Archetype {
    pub fn new(shape: ArchetypeShape) -> Self {
        let columns = shape
            .kinds()
            .iter()
            .map(|kind| (kind.type_id(), ComponentColumn::new()))
            .collect();
        Self {
            shape,
            columns,
            entities: Vec::new(),
        }
    }

    pub fn has_component(&self, type_id: &TypeId) -> bool {
        self.columns.contains_key(type_id)
    }

    /// Remove the row at `row` via swap-remove. Returns the entity that was
    /// moved into `row`, if any.
    pub fn swap_remove(&mut self, row: usize) -> Option<Entity> {
        for column in self.columns.values_mut() {
            column.swap_remove(row);
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct A;
    #[derive(Clone, Default)]
    struct B;

    #[test]
    fn shape_is_order_independent() {
        let ab = ArchetypeShape::new([ComponentKind::of::<A>(), ComponentKind::of::<B>()]);
        let ba = ArchetypeShape::new([
            ComponentKind::of::<B>(),
            ComponentKind::of::<A>(),
            ComponentKind::of::<B>(),
        ]);
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 2);
        assert_eq!(ab.structural_hash(), ba.structural_hash());
    }

    #[test]
    fn hash_changes_with_kinds() {
        let a = ArchetypeShape::new([ComponentKind::of::<A>()]);
        let ab = a.with(&[ComponentKind::of::<B>()]);
        assert_ne!(a.structural_hash(), ab.structural_hash());
        assert!(ab.contains(TypeId::of::<B>()));
        assert!(!a.contains(TypeId::of::<B>()));
    }

    #[test]
    fn swap_remove_reports_moved_entity() {
        let shape = ArchetypeShape::new([ComponentKind::of::<u32>()]);
        let mut arch = Archetype::new(shape);
        for i in 0..3u32 {
            arch.entities.push(Entity {
                index: i,
                generation: 0,
            });
            arch.columns
                .get_mut(&TypeId::of::<u32>())
                .unwrap()
                .push_any(Box::new(i * 10));
        }
        let moved = arch.swap_remove(0);
        assert_eq!(moved.map(Entity::index), Some(2));
        assert_eq!(*arch.columns[&TypeId::of::<u32>()].get::<u32>(0), 20);
        assert_eq!(arch.swap_remove(1), None);
    }
}
