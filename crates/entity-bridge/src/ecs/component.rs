//! # Component — Kinds and Type-Erased Columns
//!
//! Wrapper objects describe the entity they want as a *set of component
//! kinds* that is only known at runtime (it comes from a declaration
//! collaborator, not from a Rust tuple). A [`ComponentKind`] is therefore a
//! small value carrying the component's [`TypeId`] plus the two constructors
//! the store needs when it materializes a shape without seeing `T`:
//!
//! - `make_default` — build a fresh value for a newly spawned row;
//! - `clone_boxed` — copy a value out of a template entity.
//!
//! Storage stays `Vec<Box<dyn Any + Send + Sync>>` per column, accessed
//! through `downcast_ref`/`downcast_mut`. No unsafe code.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Anything that can be stored as component data.
///
/// `Default` lets a shape be spawned without per-component values and `Clone`
/// lets an entity be cloned from a template.
pub trait Component: 'static + Send + Sync + Clone + Default {}

impl<T: 'static + Send + Sync + Clone + Default> Component for T {}

pub(crate) type BoxedComponent = Box<dyn Any + Send + Sync>;

/// A runtime description of one component type.
///
/// Equality, ordering and hashing only look at the [`TypeId`].
#[derive(Clone, Copy)]
pub struct ComponentKind {
    type_id: TypeId,
    name: &'static str,
    make_default: fn() -> BoxedComponent,
    clone_boxed: fn(&dyn Any) -> Option<BoxedComponent>,
}

impl ComponentKind {
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            make_default: || Box::new(T::default()) as BoxedComponent,
            clone_boxed: |value| {
                value
                    .downcast_ref::<T>()
                    .map(|v| Box::new(v.clone()) as BoxedComponent)
            },
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Full type name, e.g. `entity_bridge::bridge::counts::InstanceCount`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without the module path.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }

    pub(crate) fn make_default(&self) -> BoxedComponent {
        (self.make_default)()
    }

    /// Clone a value of this kind. Returns `None` if `value` is not a `T`.
    pub(crate) fn clone_value(&self, value: &dyn Any) -> Option<BoxedComponent> {
        (self.clone_boxed)(value)
    }
}

impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentKind {}

impl Hash for ComponentKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl PartialOrd for ComponentKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComponentKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_id.cmp(&other.type_id)
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Strip the module path from a non-generic type name. Generic names are
/// returned unchanged.
fn short_type_name(full: &'static str) -> &'static str {
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}

/// A variable-length list attached to an entity, the analogue of a dynamic
/// buffer in larger ECS engines.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer<T>(pub Vec<T>);

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Buffer(Vec::new())
    }
}

impl<T> Buffer<T> {
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A type-erased column of components.
pub(crate) struct ComponentColumn {
    data: Vec<BoxedComponent>,
}

impl ComponentColumn {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds or the type doesn't match.
    pub fn get<T: 'static>(&self, index: usize) -> &T {
        self.data[index].downcast_ref().unwrap_or_else(|| {
            panic!(
                "Component type mismatch: expected `{}` in column",
                std::any::type_name::<T>()
            )
        })
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds or the type doesn't match.
    pub fn get_mut<T: 'static>(&mut self, index: usize) -> &mut T {
        self.data[index].downcast_mut().unwrap_or_else(|| {
            panic!(
                "Component type mismatch: expected `{}` in column",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn push_any(&mut self, value: BoxedComponent) {
        self.data.push(value);
    }

    /// Overwrite the value at `index`.
    pub fn replace_any(&mut self, index: usize, value: BoxedComponent) {
        self.data[index] = value;
    }

    /// Swap-remove the value at `index` and hand it back. Used when moving a
    /// row between archetypes.
    pub fn take(&mut self, index: usize) -> BoxedComponent {
        self.data.swap_remove(index)
    }

    pub fn swap_remove(&mut self, index: usize) {
        self.data.swap_remove(index);
    }

    pub fn get_any(&self, index: usize) -> &dyn Any {
        &*self.data[index]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default, Debug, PartialEq)]
    struct Health(u32);

    #[test]
    fn kind_identity_is_type_id() {
        let a = ComponentKind::of::<Health>();
        let b = ComponentKind::of::<Health>();
        let c = ComponentKind::of::<u32>();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.short_name(), "Health");
    }

    #[test]
    fn kind_builds_defaults_and_clones() {
        let kind = ComponentKind::of::<Health>();
        let fresh = kind.make_default();
        assert_eq!(fresh.downcast_ref::<Health>(), Some(&Health(0)));

        let source = Health(42);
        let copy = kind.clone_value(&source).unwrap();
        assert_eq!(copy.downcast_ref::<Health>(), Some(&Health(42)));
        assert!(kind.clone_value(&7u64).is_none());
    }

    #[test]
    fn column_replace_and_take() {
        let mut col = ComponentColumn::new();
        col.push_any(Box::new(10u32));
        col.push_any(Box::new(20u32));
        col.replace_any(0, Box::new(11u32));
        assert_eq!(*col.get::<u32>(0), 11);

        let taken = col.take(0);
        assert_eq!(taken.downcast_ref::<u32>(), Some(&11));
        assert_eq!(col.len(), 1);
        assert_eq!(*col.get::<u32>(0), 20);
    }

    #[test]
    fn column_get_mut() {
        let mut col = ComponentColumn::new();
        col.push_any(Box::new(Health(1)));
        col.get_mut::<Health>(0).0 += 1;
        assert_eq!(col.get::<Health>(0), &Health(2));
        col.swap_remove(0);
        assert_eq!(col.len(), 0);
    }

    #[test]
    fn buffer_defaults_empty() {
        let buffer: Buffer<Health> = Buffer::default();
        assert!(buffer.is_empty());
        assert_eq!(Buffer(vec![Health(1)]).len(), 1);
    }
}
