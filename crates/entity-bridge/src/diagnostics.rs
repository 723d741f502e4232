//! Bridge diagnostics — a serializable snapshot of queue and object state.
//!
//! Enabled by the `diagnostics` feature flag. [`BridgeContext::stats`] builds a
//! [`BridgeStats`]; [`BridgeStats::to_json`] turns it into a single JSON line
//! suitable for logging or shipping to an external viewer.
//!
//! [`BridgeContext::stats`]: crate::bridge::BridgeContext::stats

use std::collections::BTreeMap;

use serde::Serialize;

use crate::bridge::ObjectStatus;
use crate::ecs::WorldRegistry;

// ── Snapshot types (wire format) ────────────────────────────────────────

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub none: usize,
    pub deserializing: usize,
    pub creating: usize,
    pub created: usize,
    pub destroyed: usize,
    pub invalid: usize,
}

impl StatusCounts {
    fn record(&mut self, status: ObjectStatus) {
        let slot = match status {
            ObjectStatus::None => &mut self.none,
            ObjectStatus::Deserializing => &mut self.deserializing,
            ObjectStatus::Creating => &mut self.creating,
            ObjectStatus::Created => &mut self.created,
            ObjectStatus::Destroyed => &mut self.destroyed,
            ObjectStatus::Invalid => &mut self.invalid,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.none + self.deserializing + self.creating + self.created + self.destroyed + self.invalid
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WorldSnapshot {
    pub epoch: u64,
    pub entities: usize,
    pub archetypes: usize,
    /// Batched writes not yet flushed.
    pub pending_commands: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BridgeStats {
    pub objects: StatusCounts,
    pub deferred_pending: usize,
    pub reclaim_pending: usize,
    pub reclaim_available: usize,
    /// Guards dropped without an explicit destroy.
    pub leaked_guards: usize,
    pub archetype_infos: usize,
    pub worlds: BTreeMap<String, WorldSnapshot>,
}

// ── Collection ───────────────────────────────────────────────────────────

impl BridgeStats {
    pub(crate) fn collect(
        statuses: impl Iterator<Item = ObjectStatus>,
        deferred_pending: usize,
        reclaim_pending: usize,
        reclaim_available: usize,
        leaked_guards: usize,
        archetype_infos: usize,
        registry: &WorldRegistry,
    ) -> Self {
        let mut objects = StatusCounts::default();
        statuses.for_each(|status| objects.record(status));

        let worlds = registry
            .names()
            .filter_map(|name| {
                let commands = registry.get(name)?;
                let world = commands.world();
                Some((
                    name.to_string(),
                    WorldSnapshot {
                        epoch: registry.epoch(name)?,
                        entities: world.entity_count(),
                        archetypes: world.archetype_count(),
                        pending_commands: commands.pending_len(),
                    },
                ))
            })
            .collect();

        Self {
            objects,
            deferred_pending,
            reclaim_pending,
            reclaim_available,
            leaked_guards,
            archetype_infos,
            worlds,
        }
    }

    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                log::error!("failed to serialize bridge stats: {e}");
                String::from("{}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_status() {
        let registry = WorldRegistry::new();
        let stats = BridgeStats::collect(
            [
                ObjectStatus::Created,
                ObjectStatus::Created,
                ObjectStatus::Invalid,
            ]
            .into_iter(),
            1,
            0,
            8,
            0,
            2,
            &registry,
        );
        assert_eq!(stats.objects.created, 2);
        assert_eq!(stats.objects.invalid, 1);
        assert_eq!(stats.objects.total(), 3);
        assert!(stats.worlds.is_empty());
    }

    #[test]
    fn worlds_are_listed_by_name() {
        let mut registry = WorldRegistry::new();
        registry.create("Physics");
        registry.create("Default");
        let stats = BridgeStats::collect(std::iter::empty(), 0, 0, 0, 0, 0, &registry);
        let names: Vec<_> = stats.worlds.keys().map(String::as_str).collect();
        assert_eq!(names, ["Default", "Physics"]);
    }

    #[test]
    fn json_has_the_wire_field_names() {
        let registry = WorldRegistry::new();
        let stats = BridgeStats::collect(std::iter::empty(), 3, 0, 16, 1, 0, &registry);
        let json: serde_json::Value = serde_json::from_str(&stats.to_json()).unwrap();
        assert_eq!(json["deferred_pending"], 3);
        assert_eq!(json["leaked_guards"], 1);
        assert_eq!(json["objects"]["created"], 0);
    }
}
