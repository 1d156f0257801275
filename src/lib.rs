//! Arcane Combat - Ability Combat Core Library
//!
//! Ability and combat resolution for an action game:
//! - Ability slots (per-slot cooldowns, equip/unequip, input bindings)
//! - Abilities (fireball projectile, ice spike volley, melee slash)
//! - Projectiles (constant velocity, single resolution on contact)
//! - Procedural ground hazards (spike meshes, rise/hold/sink lifecycle)
//! - Health, damage and death
//! - Pooled combat feedback (damage numbers, health bars, decals)

pub mod abilities;
pub mod config;
pub mod constants;
pub mod easing;
pub mod feedback;
pub mod hazard;
pub mod health;
pub mod logging;
pub mod pool;
pub mod projectile;
pub mod rng;
pub mod slots;

use bevy::prelude::*;

use crate::abilities::AbilityLibrary;
use crate::config::CombatConfig;
use crate::rng::CombatRng;

/// Per-frame ordering of the combat systems.
///
/// Cooldowns tick and triggers fire in `Slots`, deferred volleys and strikes
/// advance in `Spawn`, contacts resolve in `Resolve`, deaths are recorded in
/// `Damage` and presentation catches up in `Feedback`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombatSet {
    Slots,
    Spawn,
    Resolve,
    Damage,
    Feedback,
}

/// All combat plugins, ordered. Rapier and rendering are left to the app.
#[derive(Default)]
pub struct ArcaneCorePlugin {
    pub config: Option<CombatConfig>,
    pub library: Option<AbilityLibrary>,
}

impl Plugin for ArcaneCorePlugin {
    fn build(&self, app: &mut App) {
        let config = self.config.clone().unwrap_or_default();
        let library = self.library.clone().unwrap_or_default();
        info!(
            "Combat core: {} slots, {} abilities, seed {}",
            config.slot_count,
            library.len(),
            config.rng_seed
        );

        app.insert_resource(CombatRng::new(config.rng_seed))
            .insert_resource(config)
            .insert_resource(library)
            .configure_sets(
                Update,
                (
                    CombatSet::Slots,
                    CombatSet::Spawn,
                    CombatSet::Resolve,
                    CombatSet::Damage,
                    CombatSet::Feedback,
                )
                    .chain(),
            )
            .add_plugins((
                slots::SlotsPlugin,
                abilities::AbilitiesPlugin,
                projectile::ProjectilePlugin,
                hazard::HazardPlugin,
                health::HealthPlugin,
                feedback::FeedbackPlugin,
            ));
    }
}
