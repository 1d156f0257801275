//! Authored abilities and the context they act through.
//!
//! An [`Ability`] is immutable data shared between slots as `Arc<Ability>`.
//! Triggering it is purely generative: it asks its [`AbilityContext`] to spawn
//! projectiles, start hazard volleys or schedule strikes. Cooldowns belong to
//! the slot that triggered it, never to the ability.

pub mod fireball;
pub mod ice_spikes;
pub mod library;
pub mod slash;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::CombatConfig;
use crate::projectile::{spawn_projectile, ProjectileSettings, ProjectileSpawn, ProjectileVisuals};
use crate::rng::CombatRng;
use crate::CombatSet;

pub use fireball::FireballParams;
pub use ice_spikes::{planned_distance, tilt_angle, HazardPlacement, HazardSequence, IceSpikesParams};
pub use library::AbilityLibrary;
pub use slash::{PendingStrike, SlashParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub base_cooldown: f32,
    #[serde(default)]
    pub animation: Option<String>,
    pub kind: AbilityKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AbilityKind {
    Fireball(FireballParams),
    IceSpikes(IceSpikesParams),
    Slash(SlashParams),
}

impl Ability {
    pub fn new(name: impl Into<String>, base_cooldown: f32, kind: AbilityKind) -> Self {
        Self {
            name: name.into(),
            icon: None,
            base_cooldown,
            animation: None,
            kind,
        }
    }

    pub fn trigger(&self, ctx: &mut dyn AbilityContext) {
        info!("{} triggered", self.name);
        match &self.kind {
            AbilityKind::Fireball(params) => fireball::trigger(params, ctx),
            AbilityKind::IceSpikes(params) => ice_spikes::trigger(params, ctx),
            AbilityKind::Slash(params) => slash::trigger(params, ctx),
        }
    }
}

/// Where abilities emerge from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnTransform {
    pub position: Vec3,
    pub forward: Vec3,
}

/// Spawn point relative to the caster, in the caster's local space
#[derive(Component, Debug, Clone, Copy)]
pub struct SpawnPoint {
    pub offset: Vec3,
}

impl Default for SpawnPoint {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 1.0, -0.8),
        }
    }
}

impl SpawnTransform {
    pub fn from_caster(transform: &Transform, spawn_point: Option<&SpawnPoint>) -> Self {
        let offset = spawn_point.copied().unwrap_or_default().offset;
        Self {
            position: transform.translation + transform.rotation * offset,
            forward: transform.forward().as_vec3(),
        }
    }
}

/// Everything an ability may do when triggered
pub trait AbilityContext {
    fn caster(&self) -> Entity;
    /// World position of the caster itself, not the spawn point
    fn caster_position(&self) -> Vec3;
    fn spawn_transform(&self) -> SpawnTransform;
    fn rng(&mut self) -> &mut CombatRng;
    fn spawn_projectile(&mut self, spawn: ProjectileSpawn);
    fn start_hazard_sequence(&mut self, sequence: HazardSequence);
    fn schedule_strike(&mut self, strike: PendingStrike);
}

/// ECS-backed context: every request becomes a deferred spawn
pub struct CommandsAbilityContext<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub caster: Entity,
    pub caster_position: Vec3,
    pub spawn: SpawnTransform,
    pub rng: &'a mut CombatRng,
    pub projectile_settings: &'a ProjectileSettings,
    pub projectile_visuals: Option<&'a ProjectileVisuals>,
}

impl AbilityContext for CommandsAbilityContext<'_, '_, '_> {
    fn caster(&self) -> Entity {
        self.caster
    }

    fn caster_position(&self) -> Vec3 {
        self.caster_position
    }

    fn spawn_transform(&self) -> SpawnTransform {
        self.spawn
    }

    fn rng(&mut self) -> &mut CombatRng {
        &mut *self.rng
    }

    fn spawn_projectile(&mut self, spawn: ProjectileSpawn) {
        spawn_projectile(
            self.commands,
            spawn,
            self.projectile_settings,
            self.projectile_visuals,
        );
    }

    fn start_hazard_sequence(&mut self, sequence: HazardSequence) {
        self.commands.spawn((Name::new("Spike Volley"), sequence));
    }

    fn schedule_strike(&mut self, strike: PendingStrike) {
        self.commands.spawn((Name::new("Slash"), strike));
    }
}

pub struct AbilitiesPlugin;

impl Plugin for AbilitiesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CombatConfig>()
            .init_resource::<CombatRng>()
            .init_resource::<AbilityLibrary>()
            .add_systems(
                Update,
                (
                    ice_spikes::advance_hazard_sequences,
                    slash::resolve_pending_strikes,
                )
                    .in_set(CombatSet::Spawn),
            );
    }
}
