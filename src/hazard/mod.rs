//! Ground hazards: procedurally shaped spikes that burst out of the ground,
//! hold briefly, sink back and vanish. The first thing they touch gets hit.
//!
//! Lifecycle: Buried → Rising → Exposed → Sinking → Destroyed, with any
//! collision short-circuiting straight to Destroyed.

pub mod mesh;

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::CombatConfig;
use crate::constants::{HAZARD_HOLD_SECS, HAZARD_RISE_FRACTION, HAZARD_RISE_SECS, HAZARD_SINK_SECS};
use crate::easing::{ease_in_quad, ease_out_back};
use crate::health::{HitCallback, OnHit};
use crate::projectile::Projectile;
use crate::CombatSet;

pub use mesh::{SpikeGenerator, SpikeGeometry};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardTimings {
    pub rise: f32,
    pub hold: f32,
    pub sink: f32,
    /// Fraction of the size multiplier the hazard climbs above its buried depth
    pub rise_fraction: f32,
}

impl Default for HazardTimings {
    fn default() -> Self {
        Self {
            rise: HAZARD_RISE_SECS,
            hold: HAZARD_HOLD_SECS,
            sink: HAZARD_SINK_SECS,
            rise_fraction: HAZARD_RISE_FRACTION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HazardPhase {
    Buried,
    Rising,
    Exposed,
    Sinking,
    Destroyed,
}

impl HazardPhase {
    pub fn is_live(self) -> bool {
        self != HazardPhase::Destroyed
    }
}

#[derive(Component, Debug, Clone)]
pub struct Hazard {
    pub caster: Entity,
    pub size: f32,
    /// Ground height the hazard was planted at
    pub planted_y: f32,
    timings: HazardTimings,
    phase: HazardPhase,
    elapsed: f32,
}

impl Hazard {
    pub fn new(caster: Entity, size: f32, planted_y: f32, timings: HazardTimings) -> Self {
        Self {
            caster,
            size,
            planted_y,
            timings,
            phase: HazardPhase::Buried,
            elapsed: 0.0,
        }
    }

    pub fn phase(&self) -> HazardPhase {
        self.phase
    }

    fn phase_duration(&self) -> Option<f32> {
        match self.phase {
            HazardPhase::Rising => Some(self.timings.rise),
            HazardPhase::Exposed => Some(self.timings.hold),
            HazardPhase::Sinking => Some(self.timings.sink),
            HazardPhase::Buried | HazardPhase::Destroyed => None,
        }
    }

    fn progress(&self) -> f32 {
        match self.phase_duration() {
            Some(d) if d > 0.0 => (self.elapsed / d).clamp(0.0, 1.0),
            _ => 1.0,
        }
    }

    /// Advance the animation; leftover time spills into the next phase
    pub fn tick(&mut self, dt: f32) -> HazardPhase {
        if self.phase == HazardPhase::Buried {
            self.phase = HazardPhase::Rising;
            self.elapsed = 0.0;
        }

        let mut remaining = dt.max(0.0);
        while let Some(duration) = self.phase_duration() {
            let left = (duration - self.elapsed).max(0.0);
            if remaining < left {
                self.elapsed += remaining;
                break;
            }
            remaining -= left;
            self.elapsed = 0.0;
            self.phase = match self.phase {
                HazardPhase::Rising => HazardPhase::Exposed,
                HazardPhase::Exposed => HazardPhase::Sinking,
                _ => HazardPhase::Destroyed,
            };
        }
        self.phase
    }

    /// Vertical offset from `planted_y` for the current phase
    pub fn vertical_offset(&self) -> f32 {
        let buried = -self.size;
        let risen = buried + self.size * self.timings.rise_fraction;
        match self.phase {
            HazardPhase::Buried => buried,
            HazardPhase::Rising => buried + (risen - buried) * ease_out_back(self.progress()),
            HazardPhase::Exposed => risen,
            HazardPhase::Sinking => risen - self.size * ease_in_quad(self.progress()),
            HazardPhase::Destroyed => risen - self.size,
        }
    }

    /// Claim the hit. Any live phase accepts exactly one.
    pub fn resolve_hit(&mut self) -> bool {
        if !self.phase.is_live() {
            return false;
        }
        self.phase = HazardPhase::Destroyed;
        true
    }
}

/// Mesh and material shared by every spike of one volley
#[derive(Component, Debug, Clone)]
pub struct SpikeVisuals {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

/// Spawn one buried hazard. Its animation starts on the next tick.
#[allow(clippy::too_many_arguments)]
pub fn spawn_hazard(
    commands: &mut Commands,
    position: Vec3,
    rotation: Quat,
    size: f32,
    collider: Collider,
    visuals: Option<&SpikeVisuals>,
    timings: HazardTimings,
    caster: Entity,
    on_hit: HitCallback,
) -> Entity {
    let hazard = Hazard::new(caster, size, position.y, timings);
    let transform = Transform::from_translation(position + Vec3::Y * hazard.vertical_offset())
        .with_rotation(rotation)
        .with_scale(Vec3::splat(size));

    let mut entity = commands.spawn((
        Name::new("Ice Spike"),
        transform,
        collider,
        Sensor,
        ActiveEvents::COLLISION_EVENTS,
        ActiveCollisionTypes::default() | ActiveCollisionTypes::KINEMATIC_STATIC,
        hazard,
        OnHit::new(on_hit),
    ));
    if let Some(visuals) = visuals {
        entity.insert((
            Mesh3d(visuals.mesh.clone()),
            MeshMaterial3d(visuals.material.clone()),
        ));
    }
    entity.id()
}

pub fn animate_hazards(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut Hazard, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (entity, mut hazard, mut transform) in &mut query {
        if hazard.tick(dt) == HazardPhase::Destroyed {
            trace!("hazard {:?} finished sinking", entity);
            commands.entity(entity).despawn_recursive();
            continue;
        }
        transform.translation.y = hazard.planted_y + hazard.vertical_offset();
    }
}

/// First collision wins: fire the callback and remove the hazard
pub fn resolve_hazard_hits(
    mut commands: Commands,
    mut collision_events: EventReader<CollisionEvent>,
    mut hazards: Query<(&mut Hazard, &mut OnHit)>,
    projectiles: Query<(), With<Projectile>>,
) {
    for event in collision_events.read() {
        let CollisionEvent::Started(e1, e2, _) = event else {
            continue;
        };

        for (entity, other) in [(*e1, *e2), (*e2, *e1)] {
            // neighbouring spikes overlap and projectiles pass through
            if hazards.contains(other) || projectiles.contains(other) {
                continue;
            }
            let Ok((mut hazard, mut on_hit)) = hazards.get_mut(entity) else {
                continue;
            };
            if other == hazard.caster || !hazard.resolve_hit() {
                continue;
            }
            if let Some(callback) = on_hit.take() {
                commands.queue(move |world: &mut World| callback(world, other));
            }
            debug!("hazard {:?} hit {:?}", entity, other);
            commands.entity(entity).despawn_recursive();
        }
    }
}

pub struct HazardPlugin;

impl Plugin for HazardPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CombatConfig>()
            .add_event::<CollisionEvent>()
            .add_systems(
                Update,
                (resolve_hazard_hits, animate_hazards)
                    .chain()
                    .in_set(CombatSet::Resolve),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hazard() -> Hazard {
        Hazard::new(Entity::from_raw(0), 1.0, 0.0, HazardTimings::default())
    }

    #[test]
    fn test_starts_buried() {
        let h = hazard();
        assert_eq!(h.phase(), HazardPhase::Buried);
        assert_eq!(h.vertical_offset(), -1.0);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut h = hazard();
        assert_eq!(h.tick(0.1), HazardPhase::Rising);
        assert_eq!(h.tick(0.15), HazardPhase::Exposed);
        assert!((h.vertical_offset() - -0.1).abs() < 1e-5);
        assert_eq!(h.tick(0.2), HazardPhase::Sinking);
        assert_eq!(h.tick(0.2), HazardPhase::Destroyed);
    }

    #[test]
    fn test_large_step_skips_to_end() {
        let mut h = hazard();
        assert_eq!(h.tick(10.0), HazardPhase::Destroyed);
    }

    #[test]
    fn test_rise_overshoots() {
        let mut h = hazard();
        h.tick(0.0);
        let mut peak = f32::MIN;
        for _ in 0..19 {
            h.tick(0.01);
            peak = peak.max(h.vertical_offset());
        }
        assert_eq!(h.phase(), HazardPhase::Rising);
        assert!(peak > -0.1, "peak = {peak}");
    }

    #[test]
    fn test_sink_goes_below_start() {
        let mut h = hazard();
        h.tick(0.4);
        h.tick(0.1);
        assert_eq!(h.phase(), HazardPhase::Sinking);
        assert!(h.vertical_offset() < -0.1);
    }

    #[test]
    fn test_hit_preempts_any_phase() {
        for pre in [0.0, 0.1, 0.3, 0.5] {
            let mut h = hazard();
            if pre > 0.0 {
                h.tick(pre);
            }
            assert!(h.resolve_hit(), "phase before hit: {:?}", h.phase());
            assert_eq!(h.phase(), HazardPhase::Destroyed);
            assert!(!h.resolve_hit());
        }
    }

    #[test]
    fn test_zero_timings() {
        let timings = HazardTimings {
            rise: 0.0,
            hold: 0.0,
            sink: 0.0,
            ..Default::default()
        };
        let mut h = Hazard::new(Entity::from_raw(0), 1.0, 0.0, timings);
        assert_eq!(h.tick(0.0), HazardPhase::Destroyed);
    }
}
