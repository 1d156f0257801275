//! Melee slash: a short wind-up, then everything alive in a frontal cone
//! takes a fixed amount of damage.
//!
//! Reach is a sphere around the caster. The cone is measured on the ground
//! plane, so height differences between caster and target never matter.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::AbilityContext;
use crate::constants::SLASH_STRIKE_DELAY;
use crate::health::{apply_damage_to, Dead, Health};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashParams {
    pub damage: f32,
    pub range: f32,
    /// Full cone width, degrees
    pub angle: f32,
    pub delay: f32,
}

impl Default for SlashParams {
    fn default() -> Self {
        Self {
            damage: 20.0,
            range: 2.0,
            angle: 45.0,
            delay: SLASH_STRIKE_DELAY,
        }
    }
}

/// A strike waiting for its wind-up to finish
#[derive(Component, Debug, Clone)]
pub struct PendingStrike {
    pub caster: Entity,
    /// Caster position when the slash was triggered
    pub origin: Vec3,
    /// Horizontal facing
    pub forward: Vec3,
    pub damage: f32,
    pub range: f32,
    pub half_angle: f32,
    remaining: f32,
}

impl PendingStrike {
    pub fn new(params: &SlashParams, caster: Entity, origin: Vec3, forward: Vec3) -> Self {
        Self {
            caster,
            origin,
            forward: flatten(forward).unwrap_or(Vec3::NEG_Z),
            damage: params.damage,
            range: params.range,
            half_angle: (params.angle * 0.5).to_radians(),
            remaining: params.delay,
        }
    }

    /// Returns `true` once the strike should land
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.remaining <= 0.0
    }

    pub fn in_reach(&self, target: Vec3) -> bool {
        let offset = target - self.origin;
        let distance = offset.length();
        if distance > self.range {
            return false;
        }
        // directly above or below counts as in front
        let Some(direction) = flatten(offset) else {
            return true;
        };
        self.forward.angle_between(direction) <= self.half_angle
    }
}

fn flatten(v: Vec3) -> Option<Vec3> {
    Vec3::new(v.x, 0.0, v.z).try_normalize()
}

pub fn trigger(params: &SlashParams, ctx: &mut dyn AbilityContext) {
    let forward = ctx.spawn_transform().forward;
    let strike = PendingStrike::new(params, ctx.caster(), ctx.caster_position(), forward);
    ctx.schedule_strike(strike);
}

/// Land due strikes against every living target in reach
pub fn resolve_pending_strikes(
    mut commands: Commands,
    time: Res<Time>,
    mut strikes: Query<(Entity, &mut PendingStrike)>,
    targets: Query<(Entity, &Transform), (With<Health>, Without<Dead>)>,
) {
    let dt = time.delta_secs();
    for (entity, mut strike) in &mut strikes {
        if !strike.tick(dt) {
            continue;
        }
        for (target, transform) in &targets {
            if target == strike.caster || !strike.in_reach(transform.translation) {
                continue;
            }
            let (damage, caster) = (strike.damage, strike.caster);
            debug!("slash from {:?} hit {:?}", caster, target);
            commands.queue(move |world: &mut World| {
                apply_damage_to(world, target, damage, Some(caster));
            });
        }
        commands.entity(entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::testing::RecordingContext;
    use crate::abilities::SpawnTransform;

    fn strike() -> PendingStrike {
        PendingStrike::new(&SlashParams::default(), Entity::from_raw(1), Vec3::ZERO, Vec3::NEG_Z)
    }

    #[test]
    fn test_waits_for_delay() {
        let mut s = strike();
        assert!(!s.tick(0.05));
        assert!(s.tick(0.05));
    }

    #[test]
    fn test_cone_and_range() {
        let s = strike();
        assert!(s.in_reach(Vec3::new(0.0, 0.0, -1.5)));
        // 20 degrees off axis, inside the 22.5 degree half-cone
        let inside = Quat::from_rotation_y(20f32.to_radians()) * Vec3::NEG_Z;
        assert!(s.in_reach(inside));
        let outside = Quat::from_rotation_y(30f32.to_radians()) * Vec3::NEG_Z;
        assert!(!s.in_reach(outside));
        assert!(!s.in_reach(Vec3::new(0.0, 0.0, -2.5)));
        assert!(!s.in_reach(Vec3::new(0.0, 0.0, 1.0)));
        assert!(s.in_reach(Vec3::ZERO));
    }

    #[test]
    fn test_cone_ignores_height() {
        let s = strike();
        // a meter below the caster's line of sight, still straight ahead
        assert!(s.in_reach(Vec3::new(0.0, -1.0, -1.2)));
        assert!(s.in_reach(Vec3::new(0.0, 1.0, -1.2)));
        // too far once height is counted
        assert!(!s.in_reach(Vec3::new(0.0, 1.5, -1.5)));
    }

    #[test]
    fn test_tilted_facing_is_flattened() {
        let tilted = Vec3::new(0.0, -0.8, -0.6);
        let s = PendingStrike::new(&SlashParams::default(), Entity::from_raw(1), Vec3::ZERO, tilted);
        assert!((s.forward - Vec3::NEG_Z).length() < 1e-5);
        assert!(s.in_reach(Vec3::new(0.0, 0.0, -1.5)));
    }

    #[test]
    fn test_trigger_measures_from_caster() {
        let mut ctx = RecordingContext::new();
        ctx.caster_position = Vec3::new(0.0, 0.9, 0.0);
        ctx.spawn = SpawnTransform {
            position: Vec3::new(0.0, 1.9, -0.8),
            forward: Vec3::NEG_Z,
        };
        trigger(&SlashParams::default(), &mut ctx);

        let strike = &ctx.strikes[0];
        assert_eq!(strike.origin, Vec3::new(0.0, 0.9, 0.0));
        assert!(strike.in_reach(Vec3::new(0.0, 0.9, -1.5)));
    }
}
