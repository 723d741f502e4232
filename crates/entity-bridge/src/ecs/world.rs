//! # World — The Entity Store
//!
//! The [`World`] owns entities and their components, grouped into archetype
//! tables by [`ArchetypeShape`]. It is the storage engine behind
//! [`EntityCommander`](super::commands::EntityCommander); the bridge never
//! touches it directly.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ World                                               │
//! │                                                     │
//! │  EntityAllocator: generational handles              │
//! │                                                     │
//! │  archetypes: HashMap<ArchetypeShape, Archetype>     │
//! │                                                     │
//! │  entity_locations: HashMap<u32, EntityLocation>     │
//! │    maps entity index → (shape, row index)           │
//! │                                                     │
//! │  disabled: HashSet<(u32, TypeId)>                   │
//! │    components that exist but are switched off       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Enable Flags
//!
//! Adding or removing a component moves the entity to another table. Count
//! components are toggled far more often than they change structurally, so
//! each component also carries an enabled flag. A component is enabled unless
//! its `(entity, type)` pair is in `disabled`; the flag never changes the
//! entity's shape.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};

use super::archetype::{Archetype, ArchetypeShape};
use super::component::{BoxedComponent, ComponentKind};
use super::entity::{Entity, EntityAllocator};

#[derive(Clone)]
struct EntityLocation {
    shape: ArchetypeShape,
    row: usize,
}

/// Storage for entities and their components.
pub struct World {
    allocator: EntityAllocator,
    archetypes: HashMap<ArchetypeShape, Archetype>,
    entity_locations: HashMap<u32, EntityLocation>,
    disabled: HashSet<(u32, TypeId)>,
    /// Debug labels. Unlike names in a scene these need not be unique.
    labels: HashMap<u32, String>,
}

impl World {
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            archetypes: HashMap::new(),
            entity_locations: HashMap::new(),
            disabled: HashSet::new(),
            labels: HashMap::new(),
        }
    }

    // ── Spawn / Despawn ──────────────────────────────────────────────

    /// Spawn an entity with every component of `shape` set to its default.
    pub fn spawn(&mut self, shape: &ArchetypeShape) -> Entity {
        let values = shape
            .kinds()
            .iter()
            .map(|kind| (kind.type_id(), kind.make_default()))
            .collect();
        let entity = self.allocator.allocate();
        self.place(entity, shape.clone(), values);
        entity
    }

    /// Spawn an entity with `shape`, copying every component the template also
    /// has (values and enable flags). Kinds the template lacks start at their
    /// defaults. A dead template behaves like [`spawn`](Self::spawn).
    pub fn spawn_from(&mut self, template: Entity, shape: &ArchetypeShape) -> Entity {
        let mut values: HashMap<TypeId, BoxedComponent> = HashMap::new();
        let mut disabled = Vec::new();
        for kind in shape.kinds() {
            let type_id = kind.type_id();
            let copied = self
                .get_any(template, type_id)
                .and_then(|value| kind.clone_value(value));
            if copied.is_some() && self.disabled.contains(&(template.index, type_id)) {
                disabled.push(type_id);
            }
            values.insert(type_id, copied.unwrap_or_else(|| kind.make_default()));
        }
        let entity = self.allocator.allocate();
        self.place(entity, shape.clone(), values);
        for type_id in disabled {
            self.disabled.insert((entity.index, type_id));
        }
        entity
    }

    /// Despawn an entity. Returns `false` if it was already dead.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.allocator.is_alive(entity) {
            return false;
        }
        if let Some(loc) = self.entity_locations.remove(&entity.index) {
            if let Some(arch) = self.archetypes.get_mut(&loc.shape) {
                if let Some(moved) = arch.swap_remove(loc.row) {
                    if let Some(moved_loc) = self.entity_locations.get_mut(&moved.index) {
                        moved_loc.row = loc.row;
                    }
                }
            }
        }
        if let Some(label) = self.labels.remove(&entity.index) {
            log::trace!("despawned {entity} ({label})");
        }
        self.disabled.retain(|&(index, _)| index != entity.index);
        self.allocator.deallocate(entity);
        true
    }

    fn place(
        &mut self,
        entity: Entity,
        shape: ArchetypeShape,
        mut values: HashMap<TypeId, BoxedComponent>,
    ) {
        let arch = self
            .archetypes
            .entry(shape.clone())
            .or_insert_with(|| Archetype::new(shape.clone()));
        let row = arch.entities.len();
        arch.entities.push(entity);
        for (type_id, column) in arch.columns.iter_mut() {
            let value = values
                .remove(type_id)
                .unwrap_or_else(|| panic!("missing value for a component of {entity}"));
            column.push_any(value);
        }
        self.entity_locations
            .insert(entity.index, EntityLocation { shape, row });
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn shape_of(&self, entity: Entity) -> Option<&ArchetypeShape> {
        if !self.is_alive(entity) {
            return None;
        }
        self.entity_locations.get(&entity.index).map(|loc| &loc.shape)
    }

    /// Every live entity that has a component of `type_id`.
    pub fn entities_with(&self, type_id: TypeId) -> Vec<Entity> {
        let mut result = Vec::new();
        for arch in self.archetypes.values() {
            if arch.has_component(&type_id) {
                result.extend_from_slice(&arch.entities);
            }
        }
        result
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn free_slots(&self) -> usize {
        self.allocator.free_count()
    }

    // ── Per-Entity Component Access ──────────────────────────────────

    pub fn get<T: 'static>(&self, entity: Entity) -> Option<&T> {
        self.get_any(entity, TypeId::of::<T>())?.downcast_ref()
    }

    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        let loc = self.entity_locations.get(&entity.index)?;
        let arch = self.archetypes.get_mut(&loc.shape)?;
        let col = arch.columns.get_mut(&TypeId::of::<T>())?;
        Some(col.get_mut::<T>(loc.row))
    }

    pub fn get_any(&self, entity: Entity, type_id: TypeId) -> Option<&dyn Any> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        let loc = self.entity_locations.get(&entity.index)?;
        let arch = self.archetypes.get(&loc.shape)?;
        let col = arch.columns.get(&type_id)?;
        Some(col.get_any(loc.row))
    }

    pub fn has(&self, entity: Entity, type_id: TypeId) -> bool {
        self.shape_of(entity)
            .is_some_and(|shape| shape.contains(type_id))
    }

    /// Set a component, moving the entity to a wider archetype if it did not
    /// have `kind` yet.
    ///
    /// # Panics
    ///
    /// Panics if the entity is dead or `value` is not of `kind`'s type.
    pub fn set_any(&mut self, entity: Entity, kind: ComponentKind, value: BoxedComponent) {
        assert!(
            self.allocator.is_alive(entity),
            "Cannot set component `{}` on dead entity {:?}",
            kind.name(),
            entity
        );
        assert!(
            (*value).type_id() == kind.type_id(),
            "Value does not match component kind `{}`",
            kind.name()
        );
        let Some(loc) = self.entity_locations.get(&entity.index).cloned() else {
            return;
        };
        let type_id = kind.type_id();

        if loc.shape.contains(type_id) {
            if let Some(col) = self
                .archetypes
                .get_mut(&loc.shape)
                .and_then(|arch| arch.columns.get_mut(&type_id))
            {
                col.replace_any(loc.row, value);
            }
            return;
        }

        // Take the whole row out of the old table, then re-place it.
        let mut taken: HashMap<TypeId, BoxedComponent> = HashMap::new();
        if let Some(old) = self.archetypes.get_mut(&loc.shape) {
            for (&col_tid, col) in old.columns.iter_mut() {
                taken.insert(col_tid, col.take(loc.row));
            }
            old.entities.swap_remove(loc.row);
            if let Some(&moved) = old.entities.get(loc.row) {
                if let Some(moved_loc) = self.entity_locations.get_mut(&moved.index) {
                    moved_loc.row = loc.row;
                }
            }
        }
        taken.insert(type_id, value);
        let shape = loc.shape.with(&[kind]);
        self.place(entity, shape, taken);
    }

    /// Typed convenience over [`set_any`](Self::set_any).
    pub fn insert<T: crate::ecs::component::Component>(&mut self, entity: Entity, value: T) {
        self.set_any(entity, ComponentKind::of::<T>(), Box::new(value));
    }

    // ── Enable Flags ─────────────────────────────────────────────────

    /// Toggle a component's enabled flag. Returns `false` if the entity does
    /// not have the component.
    pub fn set_enabled(&mut self, entity: Entity, type_id: TypeId, enabled: bool) -> bool {
        if !self.has(entity, type_id) {
            return false;
        }
        if enabled {
            self.disabled.remove(&(entity.index, type_id));
        } else {
            self.disabled.insert((entity.index, type_id));
        }
        true
    }

    /// `true` if the entity has the component and it is not disabled.
    pub fn is_enabled(&self, entity: Entity, type_id: TypeId) -> bool {
        self.has(entity, type_id) && !self.disabled.contains(&(entity.index, type_id))
    }

    // ── Labels ───────────────────────────────────────────────────────

    pub fn set_label(&mut self, entity: Entity, label: impl Into<String>) {
        if self.is_alive(entity) {
            self.labels.insert(entity.index, label.into());
        }
    }

    pub fn label(&self, entity: Entity) -> Option<&str> {
        if !self.is_alive(entity) {
            return None;
        }
        self.labels.get(&entity.index).map(String::as_str)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    #[derive(Clone, Default, Debug, PartialEq)]
    struct Health(u32);
    #[derive(Clone, Default)]
    struct Marker;

    fn shape(kinds: &[ComponentKind]) -> ArchetypeShape {
        ArchetypeShape::new(kinds.iter().copied())
    }

    #[test]
    fn spawn_uses_defaults() {
        let mut world = World::new();
        let e = world.spawn(&shape(&[ComponentKind::of::<Health>()]));
        assert_eq!(world.get::<Health>(e), Some(&Health(0)));
        assert!(world.get::<Position>(e).is_none());
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn spawn_and_despawn() {
        let mut world = World::new();
        let s = shape(&[ComponentKind::of::<Health>()]);
        let e1 = world.spawn(&s);
        let e2 = world.spawn(&s);
        assert!(world.despawn(e1));
        assert!(!world.despawn(e1));
        assert!(!world.is_alive(e1));
        assert!(world.is_alive(e2));
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn despawn_swap_remove_preserves_data() {
        let mut world = World::new();
        let s = shape(&[ComponentKind::of::<Health>()]);
        let e0 = world.spawn(&s);
        let e1 = world.spawn(&s);
        let e2 = world.spawn(&s);
        world.insert(e1, Health(20));
        world.insert(e2, Health(30));

        world.despawn(e0);
        assert_eq!(world.get::<Health>(e1), Some(&Health(20)));
        assert_eq!(world.get::<Health>(e2), Some(&Health(30)));
    }

    #[test]
    fn set_any_migrates_archetype() {
        let mut world = World::new();
        let e = world.spawn(&shape(&[ComponentKind::of::<Health>()]));
        world.insert(e, Health(5));
        world.insert(e, Position { x: 1.0, y: 2.0 });

        assert_eq!(world.get::<Health>(e), Some(&Health(5)));
        assert_eq!(world.get::<Position>(e), Some(&Position { x: 1.0, y: 2.0 }));
        assert_eq!(world.shape_of(e).map(ArchetypeShape::len), Some(2));
        assert_eq!(world.archetype_count(), 2);
    }

    #[test]
    fn spawn_from_copies_template_values_and_flags() {
        let mut world = World::new();
        let template = world.spawn(&shape(&[
            ComponentKind::of::<Health>(),
            ComponentKind::of::<Marker>(),
        ]));
        world.insert(template, Health(77));
        world.set_enabled(template, TypeId::of::<Health>(), false);

        let clone = world.spawn_from(
            template,
            &shape(&[ComponentKind::of::<Health>(), ComponentKind::of::<Position>()]),
        );
        assert_eq!(world.get::<Health>(clone), Some(&Health(77)));
        assert_eq!(world.get::<Position>(clone), Some(&Position::default()));
        assert!(!world.has(clone, TypeId::of::<Marker>()));
        assert!(!world.is_enabled(clone, TypeId::of::<Health>()));
    }

    #[test]
    fn enable_flags_do_not_change_shape() {
        let mut world = World::new();
        let e = world.spawn(&shape(&[ComponentKind::of::<Health>()]));
        assert!(world.is_enabled(e, TypeId::of::<Health>()));
        assert!(world.set_enabled(e, TypeId::of::<Health>(), false));
        assert!(!world.is_enabled(e, TypeId::of::<Health>()));
        assert!(world.has(e, TypeId::of::<Health>()));
        assert!(!world.set_enabled(e, TypeId::of::<Position>(), true));
    }

    #[test]
    fn get_mut_and_entities_with() {
        let mut world = World::new();
        let a = world.spawn(&shape(&[ComponentKind::of::<Health>()]));
        let _b = world.spawn(&shape(&[ComponentKind::of::<Marker>()]));
        world.get_mut::<Health>(a).unwrap().0 = 9;
        assert_eq!(world.get::<Health>(a), Some(&Health(9)));
        assert_eq!(world.entities_with(TypeId::of::<Health>()), vec![a]);
    }

    #[test]
    fn labels_follow_entity_lifetime() {
        let mut world = World::new();
        let e = world.spawn(&ArchetypeShape::empty());
        world.set_label(e, "Crate");
        assert_eq!(world.label(e), Some("Crate"));
        world.despawn(e);
        assert_eq!(world.label(e), None);
    }

    #[test]
    fn dead_entity_lookups_return_none() {
        let mut world = World::new();
        let e = world.spawn(&shape(&[ComponentKind::of::<Health>()]));
        world.despawn(e);
        assert!(world.get::<Health>(e).is_none());
        assert!(world.get_mut::<Health>(e).is_none());
        assert!(!world.has(e, TypeId::of::<Health>()));
        assert!(world.get::<Health>(Entity::NULL).is_none());
    }
}
