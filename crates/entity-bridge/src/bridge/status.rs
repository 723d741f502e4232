//! Lifecycle status and drain pass markers.

/// Where a wrapper object is in its lifecycle.
///
/// ```text
/// None ──deserialize──► Deserializing ──drain──► Creating ──flush──► Created
///                             │                      │                  │
///                             └──scene invalid──► Invalid               │
///                                                    └──────destroy─────┴──► Destroyed
/// ```
///
/// Stored as a `u8` in the object's shared header so deserialization hooks on
/// other threads can CAS it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ObjectStatus {
    None = 0,
    Deserializing = 1,
    Creating = 2,
    Created = 3,
    Destroyed = 4,
    Invalid = 5,
}

impl ObjectStatus {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ObjectStatus::None,
            1 => ObjectStatus::Deserializing,
            2 => ObjectStatus::Creating,
            3 => ObjectStatus::Created,
            4 => ObjectStatus::Destroyed,
            _ => ObjectStatus::Invalid,
        }
    }

    /// Creation has been requested: the object holds an entity handle.
    pub fn is_assigned(self) -> bool {
        matches!(self, ObjectStatus::Creating | ObjectStatus::Created)
    }
}

/// Which objects a drain call is currently willing to create.
///
/// A drain starts in `Normal`. The first scene-placed object it meets decides
/// the rest of the call: if some scene is still loading the pass narrows to
/// `InstanceOnly`, otherwise it widens to `IgnoreSceneLoading` so later
/// objects skip the check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeserializedPass {
    #[default]
    Normal,
    IgnoreSceneLoading,
    InstanceOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_round_trip() {
        for status in [
            ObjectStatus::None,
            ObjectStatus::Deserializing,
            ObjectStatus::Creating,
            ObjectStatus::Created,
            ObjectStatus::Destroyed,
            ObjectStatus::Invalid,
        ] {
            assert_eq!(ObjectStatus::from_u8(status as u8), status);
        }
    }

    #[test]
    fn predicates() {
        assert!(ObjectStatus::Creating.is_assigned());
        assert!(!ObjectStatus::Deserializing.is_assigned());
        assert_eq!(DeserializedPass::default(), DeserializedPass::Normal);
    }
}
