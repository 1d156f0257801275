//! Ice spikes: a volley of ground hazards fanned out in a cone.
//!
//! One [`HazardSequence`] is started per trigger. It plants spike `i` at
//! `i × spawn_delay` seconds after the trigger, each further out than the
//! last and tilted less steeply, until `count` spikes exist. It cannot be
//! cancelled once started.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{AbilityContext, SpawnTransform};
use crate::config::CombatConfig;
use crate::constants::{SPIKE_BASE_RADIUS_RATIO, SPIKE_HEIGHT_JITTER, SPIKE_TILT_FAR_DEG, SPIKE_TILT_NEAR_DEG};
use crate::hazard::{spawn_hazard, SpikeGenerator, SpikeVisuals};
use crate::health::damage_callback;
use crate::rng::CombatRng;

/// Slack when comparing elapsed time against a spike's due time
const DUE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IceSpikesParams {
    pub count: u32,
    pub max_distance: f32,
    pub spawn_delay: f32,
    /// Full cone width, degrees
    pub cone_angle: f32,
    pub spike_size: f32,
    pub damage: f32,
    pub sides: u32,
    pub color: [f32; 4],
}

impl Default for IceSpikesParams {
    fn default() -> Self {
        Self {
            count: 10,
            max_distance: 9.0,
            spawn_delay: 0.05,
            cone_angle: 30.0,
            spike_size: 1.0,
            damage: 15.0,
            sides: 3,
            color: [0.6, 0.85, 1.0, 0.9],
        }
    }
}

/// Distance from the origin of spike `index`, before any lateral spread
pub fn planned_distance(index: u32, count: u32, max_distance: f32) -> f32 {
    if count == 0 {
        return 0.0;
    }
    index as f32 / count as f32 * max_distance
}

/// Forward tilt of spike `index` in degrees: steep near the caster, almost
/// upright at the far end
pub fn tilt_angle(index: u32, count: u32) -> f32 {
    if count <= 1 {
        return SPIKE_TILT_NEAR_DEG;
    }
    let t = (index as f32 / (count - 1) as f32).clamp(0.0, 1.0);
    SPIKE_TILT_NEAR_DEG + (SPIKE_TILT_FAR_DEG - SPIKE_TILT_NEAR_DEG) * t
}

/// Where and how one spike is planted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardPlacement {
    pub index: u32,
    pub position: Vec3,
    pub rotation: Quat,
    pub size: f32,
}

#[derive(Component, Debug, Clone)]
pub struct HazardSequence {
    params: IceSpikesParams,
    caster: Entity,
    /// Spawn point projected onto the ground plane
    origin: Vec3,
    facing: Quat,
    generator: SpikeGenerator,
    next: u32,
    elapsed: f32,
    started: bool,
}

impl HazardSequence {
    /// Draws the volley's spike height once; every spike shares it
    pub fn new(params: IceSpikesParams, spawn: SpawnTransform, caster: Entity, rng: &mut CombatRng) -> Self {
        let size = params.spike_size;
        let height = rng.range_f32(size, size + SPIKE_HEIGHT_JITTER);
        let generator = SpikeGenerator::new(params.sides, size * SPIKE_BASE_RADIUS_RATIO, height);

        let flat = Vec3::new(spawn.forward.x, 0.0, spawn.forward.z)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);
        let facing = Transform::IDENTITY.looking_to(flat, Vec3::Y).rotation;

        Self {
            params,
            caster,
            origin: Vec3::new(spawn.position.x, 0.0, spawn.position.z),
            facing,
            generator,
            next: 0,
            elapsed: 0.0,
            started: false,
        }
    }

    pub fn caster(&self) -> Entity {
        self.caster
    }

    pub fn params(&self) -> &IceSpikesParams {
        &self.params
    }

    pub fn generator(&self) -> &SpikeGenerator {
        &self.generator
    }

    pub fn spawned(&self) -> u32 {
        self.next
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.params.count
    }

    /// Seconds after the trigger at which spike `index` appears
    pub fn due_at(&self, index: u32) -> f32 {
        index as f32 * self.params.spawn_delay.max(0.0)
    }

    /// Advance the sequence clock and return every spike now due, in order.
    ///
    /// The first call happens in the trigger frame and does not consume `dt`,
    /// so spike 0 lands at time zero.
    pub fn advance(&mut self, dt: f32, rng: &mut CombatRng) -> Vec<HazardPlacement> {
        if self.started {
            self.elapsed += dt.max(0.0);
        } else {
            self.started = true;
        }

        let mut due = Vec::new();
        while !self.is_finished() && self.due_at(self.next) <= self.elapsed + DUE_EPSILON {
            due.push(self.place(self.next, rng));
            self.next += 1;
        }
        due
    }

    fn place(&self, index: u32, rng: &mut CombatRng) -> HazardPlacement {
        let half_cone = self.params.cone_angle * 0.5;
        let lateral = rng.range_f32(-half_cone, half_cone);
        let distance = planned_distance(index, self.params.count, self.params.max_distance);

        let heading = Quat::from_rotation_y(lateral.to_radians()) * self.facing;
        let position = self.origin + heading * Vec3::NEG_Z * distance;
        let tilt = tilt_angle(index, self.params.count).to_radians();

        HazardPlacement {
            index,
            position,
            // negative pitch leans the tip toward the heading
            rotation: heading * Quat::from_rotation_x(-tilt),
            size: self.params.spike_size,
        }
    }
}

pub fn trigger(params: &IceSpikesParams, ctx: &mut dyn AbilityContext) {
    let caster = ctx.caster();
    let spawn = ctx.spawn_transform();
    let sequence = HazardSequence::new(params.clone(), spawn, caster, ctx.rng());
    ctx.start_hazard_sequence(sequence);
}

/// Plant due spikes for every running volley
pub fn advance_hazard_sequences(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<CombatConfig>,
    mut rng: ResMut<CombatRng>,
    mut meshes: Option<ResMut<Assets<Mesh>>>,
    mut materials: Option<ResMut<Assets<StandardMaterial>>>,
    mut query: Query<(Entity, &mut HazardSequence, Option<&SpikeVisuals>)>,
) {
    let dt = time.delta_secs();
    for (entity, mut sequence, visuals) in &mut query {
        let visuals = match (visuals, meshes.as_deref_mut(), materials.as_deref_mut()) {
            (Some(v), _, _) => Some(v.clone()),
            (None, Some(meshes), Some(materials)) => {
                let [r, g, b, a] = sequence.params().color;
                let v = SpikeVisuals {
                    mesh: meshes.add(sequence.generator().generate().to_mesh()),
                    material: materials.add(StandardMaterial {
                        base_color: Color::srgba(r, g, b, a),
                        alpha_mode: AlphaMode::Blend,
                        perceptual_roughness: 0.2,
                        ..default()
                    }),
                };
                commands.entity(entity).insert(v.clone());
                Some(v)
            }
            _ => None,
        };

        for placement in sequence.advance(dt, &mut rng) {
            let caster = sequence.caster();
            spawn_hazard(
                &mut commands,
                placement.position,
                placement.rotation,
                placement.size,
                sequence.generator().collider(),
                visuals.as_ref(),
                config.hazard,
                caster,
                damage_callback(sequence.params().damage, caster),
            );
        }

        if sequence.is_finished() {
            debug!("spike volley {:?} complete", entity);
            commands.entity(entity).despawn();
        }
    }
}
