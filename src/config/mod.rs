//! Combat configuration.
//!
//! Loaded from `config/combat.ron` (or `.json`) at startup and inserted as a
//! Bevy resource. Every field has a default so a partial file is enough.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEATH_DESPAWN_SECS, DECAL_FADE_SECS, DEFAULT_SLOT_COUNT, HEALTH_BAR_ANIM_SECS,
    MAX_POOL_PREWARM,
};
use crate::feedback::{DamageNumberSettings, EffectTemplate};
use crate::hazard::HazardTimings;
use crate::projectile::ProjectileSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level combat tuning
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub slot_count: usize,
    pub rng_seed: u64,
    /// Ability name per slot, resolved against the `AbilityLibrary`
    pub loadout: Vec<Option<String>>,
    pub projectile: ProjectileSettings,
    pub hazard: HazardTimings,
    pub damage_numbers: DamageNumberSettings,
    pub health_bar_duration: f32,
    pub death_despawn_delay: f32,
    pub decal: Option<EffectTemplate>,
    pub decal_duration: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        let mut loadout = vec![None; DEFAULT_SLOT_COUNT];
        loadout[0] = Some("Slash".to_string());
        loadout[1] = Some("Fireball".to_string());
        loadout[2] = Some("Ice Spikes".to_string());

        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            rng_seed: 42,
            loadout,
            projectile: ProjectileSettings::default(),
            hazard: HazardTimings::default(),
            damage_numbers: DamageNumberSettings::default(),
            health_bar_duration: HEALTH_BAR_ANIM_SECS,
            death_despawn_delay: DEATH_DESPAWN_SECS,
            decal: None,
            decal_duration: DECAL_FADE_SECS,
        }
    }
}

impl CombatConfig {
    /// Load from disk; the format follows the file extension (`.ron` or `.json`)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("ron") => ron::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load if the file exists, otherwise fall back to defaults.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Combat config not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_count == 0 {
            return Err(ConfigError::Invalid("slot_count must be at least 1".into()));
        }
        if self.loadout.len() > self.slot_count {
            return Err(ConfigError::Invalid(format!(
                "loadout has {} entries but only {} slots",
                self.loadout.len(),
                self.slot_count
            )));
        }
        if self.damage_numbers.initial_pool_size > MAX_POOL_PREWARM {
            return Err(ConfigError::Invalid(format!(
                "damage number pool pre-warm {} exceeds {}",
                self.damage_numbers.initial_pool_size, MAX_POOL_PREWARM
            )));
        }

        let timings = [
            ("hazard.rise", self.hazard.rise),
            ("hazard.hold", self.hazard.hold),
            ("hazard.sink", self.hazard.sink),
            ("damage_numbers.fade_duration", self.damage_numbers.fade_duration),
            ("health_bar_duration", self.health_bar_duration),
            ("death_despawn_delay", self.death_despawn_delay),
            ("decal_duration", self.decal_duration),
        ];
        for (name, value) in timings {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if self.projectile.default_speed <= 0.0 {
            return Err(ConfigError::Invalid(
                "projectile.default_speed must be positive".into(),
            ));
        }
        Ok(())
    }
}
