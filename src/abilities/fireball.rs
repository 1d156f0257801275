use serde::{Deserialize, Serialize};

use super::AbilityContext;
use crate::constants::DEFAULT_PROJECTILE_SPEED;
use crate::health::damage_callback;
use crate::projectile::ProjectileSpawn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireballParams {
    pub damage: f32,
    pub speed: f32,
    /// `None` flies until it hits something
    pub lifetime: Option<f32>,
}

impl Default for FireballParams {
    fn default() -> Self {
        Self {
            damage: 10.0,
            speed: DEFAULT_PROJECTILE_SPEED,
            lifetime: Some(2.0),
        }
    }
}

/// Launch one projectile from the spawn point
pub fn trigger(params: &FireballParams, ctx: &mut dyn AbilityContext) {
    let caster = ctx.caster();
    let spawn = ctx.spawn_transform();
    ctx.spawn_projectile(ProjectileSpawn {
        caster,
        position: spawn.position,
        forward: spawn.forward,
        speed: Some(params.speed),
        lifetime: params.lifetime,
        on_hit: damage_callback(params.damage, caster),
    });
}
