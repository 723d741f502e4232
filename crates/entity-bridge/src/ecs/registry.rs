//! Named worlds.
//!
//! Every world gets an *epoch* when it is created. Cached archetype infos
//! remember the epoch they were built against, so recreating a world under
//! the same name invalidates them without having to visit each one.

use std::collections::HashMap;

use super::commands::EntityCommander;

struct WorldSlot {
    commands: EntityCommander,
    epoch: u64,
}

/// All live worlds, keyed by name.
pub struct WorldRegistry {
    worlds: HashMap<String, WorldSlot>,
    next_epoch: u64,
}

impl WorldRegistry {
    pub fn new() -> Self {
        Self {
            worlds: HashMap::new(),
            next_epoch: 1,
        }
    }

    /// Create a world, replacing any world of the same name. Returns its epoch.
    pub fn create(&mut self, name: &str) -> u64 {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        let previous = self.worlds.insert(
            name.to_string(),
            WorldSlot {
                commands: EntityCommander::new(),
                epoch,
            },
        );
        if previous.is_some() {
            log::info!("world '{name}' recreated (epoch {epoch})");
        } else {
            log::debug!("world '{name}' created (epoch {epoch})");
        }
        epoch
    }

    /// Epoch of the named world, creating it on first use.
    pub fn get_or_create(&mut self, name: &str) -> u64 {
        match self.worlds.get(name) {
            Some(slot) => slot.epoch,
            None => self.create(name),
        }
    }

    pub fn destroy(&mut self, name: &str) -> bool {
        let removed = self.worlds.remove(name).is_some();
        if removed {
            log::debug!("world '{name}' destroyed");
        }
        removed
    }

    pub fn epoch(&self, name: &str) -> Option<u64> {
        self.worlds.get(name).map(|slot| slot.epoch)
    }

    /// `true` if `name` exists and is still the incarnation from `epoch`.
    pub fn is_current(&self, name: &str, epoch: u64) -> bool {
        self.epoch(name) == Some(epoch)
    }

    pub fn get(&self, name: &str) -> Option<&EntityCommander> {
        self.worlds.get(name).map(|slot| &slot.commands)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut EntityCommander> {
        self.worlds.get_mut(name).map(|slot| &mut slot.commands)
    }

    /// Commands for `name` only if it is still the incarnation from `epoch`.
    pub fn get_current_mut(&mut self, name: &str, epoch: u64) -> Option<&mut EntityCommander> {
        self.worlds
            .get_mut(name)
            .filter(|slot| slot.epoch == epoch)
            .map(|slot| &mut slot.commands)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.worlds.keys().map(String::as_str)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut EntityCommander)> {
        self.worlds
            .iter_mut()
            .map(|(name, slot)| (name.as_str(), &mut slot.commands))
    }
}

impl Default for WorldRegistry {
    fn default() -> Self {
        Self::new()
    }
}
