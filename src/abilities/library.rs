//! Named collection of authored abilities, loaded from RON.

use bevy::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::{Ability, AbilityKind, FireballParams, IceSpikesParams, SlashParams};
use crate::config::ConfigError;

#[derive(Resource, Debug, Clone)]
pub struct AbilityLibrary {
    abilities: HashMap<String, Arc<Ability>>,
}

impl Default for AbilityLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AbilityLibrary {
    pub fn empty() -> Self {
        Self {
            abilities: HashMap::new(),
        }
    }

    /// Fireball, Ice Spikes and Slash with their stock tuning
    pub fn builtin() -> Self {
        let mut library = Self::empty();
        library.insert(Ability::new(
            "Fireball",
            2.0,
            AbilityKind::Fireball(FireballParams::default()),
        ));
        library.insert(Ability::new(
            "Ice Spikes",
            5.0,
            AbilityKind::IceSpikes(IceSpikesParams::default()),
        ));
        library.insert(Ability::new(
            "Slash",
            1.0,
            AbilityKind::Slash(SlashParams::default()),
        ));
        library
    }

    /// Parse a RON list of abilities. Later entries replace earlier ones with the same name.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let abilities: Vec<Ability> = ron::from_str(source)?;
        let mut library = Self::empty();
        for ability in abilities {
            if ability.base_cooldown < 0.0 || !ability.base_cooldown.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "ability '{}' has invalid cooldown {}",
                    ability.name, ability.base_cooldown
                )));
            }
            library.insert(ability);
        }
        Ok(library)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let library = Self::from_ron_str(&source)?;
        info!("Loaded {} abilities from {:?}", library.len(), path);
        Ok(library)
    }

    pub fn insert(&mut self, ability: Ability) -> Arc<Ability> {
        let ability = Arc::new(ability);
        if self
            .abilities
            .insert(ability.name.clone(), ability.clone())
            .is_some()
        {
            warn!("ability '{}' defined twice, keeping the last", ability.name);
        }
        ability
    }

    pub fn get(&self, name: &str) -> Option<Arc<Ability>> {
        self.abilities.get(name).cloned()
    }

    /// Resolve a loadout of names; unknown names become empty slots
    pub fn resolve_loadout(&self, names: &[Option<String>]) -> Vec<Option<Arc<Ability>>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_deref()?;
                let found = self.get(name);
                if found.is_none() {
                    warn!("loadout names unknown ability '{}'", name);
                }
                found
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.abilities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}
