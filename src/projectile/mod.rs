//! Constant-velocity projectiles with at-most-one-hit resolution.
//!
//! A projectile flies along its forward axis until either its lifetime runs
//! out or rapier reports its first collision. The hit path spawns the impact
//! effect, detaches trails, fires the single-shot [`OnHit`] callback and
//! despawns the entity, so a second collision has nothing left to hit.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::config::CombatConfig;
use crate::constants::{DEFAULT_PROJECTILE_SPEED, PROJECTILE_COLLIDER_RADIUS, TRAIL_LINGER_SECS};
use crate::feedback::{spawn_effect, EffectTemplate, TransientEffect};
use crate::hazard::Hazard;
use crate::health::{HitCallback, OnHit};
use crate::CombatSet;

/// Tunables shared by every projectile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileSettings {
    /// Speed used when the ability supplies no positive override
    pub default_speed: f32,
    pub collider_radius: f32,
    /// Impact effect is pushed this far along the contact normal
    pub impact_offset: f32,
    /// Orient the impact effect back along the projectile's own heading
    pub use_fire_point_rotation: bool,
    /// Fixed impact rotation as Euler degrees (x, y, z); zero means unused
    pub rotation_offset: [f32; 3],
    pub flash: Option<EffectTemplate>,
    pub impact: Option<EffectTemplate>,
    pub trail: Option<EffectTemplate>,
    /// How long a detached trail survives its projectile
    pub trail_linger: f32,
}

impl Default for ProjectileSettings {
    fn default() -> Self {
        Self {
            default_speed: DEFAULT_PROJECTILE_SPEED,
            collider_radius: PROJECTILE_COLLIDER_RADIUS,
            impact_offset: 0.0,
            use_fire_point_rotation: false,
            rotation_offset: [0.0; 3],
            flash: None,
            impact: None,
            trail: None,
            trail_linger: TRAIL_LINGER_SECS,
        }
    }
}

impl ProjectileSettings {
    /// Pick the impact orientation rule. Earlier rules win.
    pub fn impact_orientation(&self) -> ImpactOrientation {
        if self.use_fire_point_rotation {
            return ImpactOrientation::ReverseHeading;
        }
        let [x, y, z] = self.rotation_offset;
        if x != 0.0 || y != 0.0 || z != 0.0 {
            return ImpactOrientation::Fixed(Quat::from_euler(
                EulerRot::YXZ,
                y.to_radians(),
                x.to_radians(),
                z.to_radians(),
            ));
        }
        ImpactOrientation::FaceNormal
    }
}

/// How the impact effect is rotated
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImpactOrientation {
    /// Projectile rotation turned 180° about its up axis
    ReverseHeading,
    Fixed(Quat),
    /// Look from the contact point along the contact normal
    FaceNormal,
}

impl ImpactOrientation {
    pub fn rotation(self, projectile_rotation: Quat, contact: Vec3, normal: Vec3) -> Quat {
        match self {
            ImpactOrientation::ReverseHeading => projectile_rotation * Quat::from_rotation_y(PI),
            ImpactOrientation::Fixed(rotation) => rotation,
            ImpactOrientation::FaceNormal => {
                Transform::from_translation(contact)
                    .looking_at(contact + normal, Vec3::Y)
                    .rotation
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileState {
    Flying,
    /// Hit something; the callback has been taken
    Resolved,
    /// Lifetime ran out before any hit
    Expired,
}

#[derive(Component, Debug, Clone)]
pub struct Projectile {
    pub owner: Entity,
    pub speed: f32,
    /// Seconds left to live; `None` flies until it hits something
    pub lifetime: Option<f32>,
    state: ProjectileState,
}

impl Projectile {
    pub fn new(owner: Entity, default_speed: f32, speed: Option<f32>, lifetime: Option<f32>) -> Self {
        let speed = match speed {
            Some(s) if s > 0.0 => s,
            _ => default_speed,
        };
        Self {
            owner,
            speed,
            lifetime: lifetime.filter(|l| l.is_finite()),
            state: ProjectileState::Flying,
        }
    }

    pub fn state(&self) -> ProjectileState {
        self.state
    }

    pub fn velocity(&self, forward: Vec3) -> Vec3 {
        match self.state {
            ProjectileState::Flying => forward * self.speed,
            _ => Vec3::ZERO,
        }
    }

    /// Count down the lifetime. Returns `true` on the tick it expires.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.state != ProjectileState::Flying {
            return false;
        }
        let Some(remaining) = self.lifetime.as_mut() else {
            return false;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            self.state = ProjectileState::Expired;
            return true;
        }
        false
    }

    /// Claim the hit. Only the first call while flying succeeds.
    pub fn resolve_hit(&mut self) -> bool {
        if self.state != ProjectileState::Flying {
            return false;
        }
        self.state = ProjectileState::Resolved;
        true
    }
}

/// Child entities carrying this survive their projectile's impact
#[derive(Component, Debug, Default)]
pub struct DetachOnImpact;

/// Everything needed to launch one projectile
pub struct ProjectileSpawn {
    pub caster: Entity,
    pub position: Vec3,
    pub forward: Vec3,
    pub speed: Option<f32>,
    pub lifetime: Option<f32>,
    pub on_hit: HitCallback,
}

/// Shared mesh and material for projectile bodies, absent in headless apps
#[derive(Resource, Debug, Clone)]
pub struct ProjectileVisuals {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

pub fn spawn_projectile(
    commands: &mut Commands,
    spawn: ProjectileSpawn,
    settings: &ProjectileSettings,
    visuals: Option<&ProjectileVisuals>,
) -> Entity {
    let forward = spawn.forward.try_normalize().unwrap_or(Vec3::NEG_Z);
    let transform = Transform::from_translation(spawn.position).looking_to(forward, Vec3::Y);
    let projectile = Projectile::new(spawn.caster, settings.default_speed, spawn.speed, spawn.lifetime);
    let velocity = projectile.velocity(forward);

    let mut entity = commands.spawn((
        Name::new("Projectile"),
        transform,
        RigidBody::KinematicVelocityBased,
        Collider::ball(settings.collider_radius),
        Velocity::linear(velocity),
        ActiveEvents::COLLISION_EVENTS,
        ActiveCollisionTypes::default()
            | ActiveCollisionTypes::KINEMATIC_KINEMATIC
            | ActiveCollisionTypes::KINEMATIC_STATIC,
        projectile,
        OnHit::new(spawn.on_hit),
    ));
    if let Some(visuals) = visuals {
        entity.insert((
            Mesh3d(visuals.mesh.clone()),
            MeshMaterial3d(visuals.material.clone()),
        ));
    }
    if let Some(trail) = &settings.trail {
        entity.with_children(|parent| {
            parent.spawn((
                Name::new(trail.name.clone()),
                Transform::default(),
                DetachOnImpact,
            ));
        });
    }
    let id = entity.id();

    if let Some(flash) = &settings.flash {
        spawn_effect(
            commands,
            flash,
            Transform::from_translation(spawn.position).looking_to(forward, Vec3::Y),
        );
    }

    debug!("projectile {:?} launched by {:?} at speed {}", id, spawn.caster, velocity.length());
    id
}

/// Create the shared projectile mesh when a renderer is present
pub fn setup_projectile_visuals(
    mut commands: Commands,
    config: Res<CombatConfig>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
) {
    let (Some(mut meshes), Some(mut materials)) = (meshes, materials) else {
        return;
    };
    commands.insert_resource(ProjectileVisuals {
        mesh: meshes.add(Sphere::new(config.projectile.collider_radius)),
        material: materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.45, 0.1),
            emissive: LinearRgba::rgb(4.0, 1.2, 0.2),
            ..default()
        }),
    });
}

/// Keep velocity locked to forward × speed
pub fn drive_projectiles(mut query: Query<(&Projectile, &Transform, &mut Velocity)>) {
    for (projectile, transform, mut velocity) in &mut query {
        velocity.linvel = projectile.velocity(transform.forward().as_vec3());
    }
}

pub fn expire_projectiles(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut Projectile)>,
) {
    let dt = time.delta_secs();
    for (entity, mut projectile) in &mut query {
        if projectile.tick(dt) {
            debug!("projectile {:?} expired", entity);
            commands.entity(entity).despawn_recursive();
        }
    }
}

/// Resolve the first collision of each projectile
pub fn resolve_projectile_hits(
    mut commands: Commands,
    config: Res<CombatConfig>,
    mut collision_events: EventReader<CollisionEvent>,
    mut projectiles: Query<(&mut Projectile, &mut OnHit, &Transform, Option<&Children>)>,
    others: Query<&Transform, Without<Projectile>>,
    hazards: Query<(), With<Hazard>>,
    detachable: Query<(), With<DetachOnImpact>>,
) {
    let settings = &config.projectile;
    for event in collision_events.read() {
        let CollisionEvent::Started(e1, e2, _) = event else {
            continue;
        };

        for (entity, other) in [(*e1, *e2), (*e2, *e1)] {
            let Ok((mut projectile, mut on_hit, transform, children)) = projectiles.get_mut(entity)
            else {
                continue;
            };
            // hazards are sensors; projectiles fly through them
            if other == projectile.owner || hazards.contains(other) {
                continue;
            }
            if !projectile.resolve_hit() {
                continue;
            }

            let forward = transform.forward().as_vec3();
            let contact = transform.translation;
            let normal = others
                .get(other)
                .ok()
                .and_then(|t| (contact - t.translation).try_normalize())
                .unwrap_or(-forward);

            if let Some(impact) = &settings.impact {
                let rotation =
                    settings
                        .impact_orientation()
                        .rotation(transform.rotation, contact, normal);
                let position = contact + normal * settings.impact_offset;
                spawn_effect(
                    &mut commands,
                    impact,
                    Transform::from_translation(position).with_rotation(rotation),
                );
            }

            if let Some(children) = children {
                for &child in children.iter().filter(|c| detachable.contains(**c)) {
                    commands
                        .entity(child)
                        .remove_parent_in_place()
                        .insert(TransientEffect::new(settings.trail_linger));
                }
            }

            if let Some(callback) = on_hit.take() {
                commands.queue(move |world: &mut World| callback(world, other));
            }
            info!("projectile {:?} hit {:?}", entity, other);
            commands.entity(entity).despawn_recursive();
        }
    }
}

pub struct ProjectilePlugin;

impl Plugin for ProjectilePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CombatConfig>()
            .add_event::<CollisionEvent>()
            .add_systems(Startup, setup_projectile_visuals)
            .add_systems(
                Update,
                (drive_projectiles, resolve_projectile_hits, expire_projectiles)
                    .chain()
                    .in_set(CombatSet::Resolve),
            );
    }
}
