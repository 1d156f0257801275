//! Damage-application capability.
//!
//! Anything with a [`Health`] component can be hurt. Hit handlers look the
//! component up on whatever they collided with; no `Health` means the hit is
//! a miss and nothing happens.

use bevy::prelude::*;

use crate::config::CombatConfig;
use crate::CombatSet;

/// Single-shot hit handler: runs once against the entity that was hit
pub type HitCallback = Box<dyn FnOnce(&mut World, Entity) + Send + Sync>;

/// Holds a pending [`HitCallback`] until the owning entity resolves its hit
#[derive(Component, Default)]
pub struct OnHit(Option<HitCallback>);

impl OnHit {
    pub fn new(callback: HitCallback) -> Self {
        Self(Some(callback))
    }

    /// Take the callback; `None` once it has fired
    pub fn take(&mut self) -> Option<HitCallback> {
        self.0.take()
    }

    pub fn is_spent(&self) -> bool {
        self.0.is_none()
    }
}

/// Integer health pool
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        let max = max.max(1);
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn fraction(&self) -> f32 {
        self.current as f32 / self.max as f32
    }

    /// Subtract `amount` rounded to the nearest integer, clamping to [0, max].
    /// Returns the rounded amount that was subtracted.
    pub fn apply_damage(&mut self, amount: f32) -> i32 {
        let rounded = amount.round() as i32;
        self.current = (self.current - rounded).clamp(0, self.max);
        rounded
    }
}

/// Tag inserted once health reaches zero
#[derive(Component, Debug)]
pub struct Dead;

/// Despawns the entity once `remaining` runs out
#[derive(Component, Debug)]
pub struct DespawnAfter {
    pub remaining: f32,
}

/// Emitted for every damage application
#[derive(Event, Debug, Clone)]
pub struct DamageDealt {
    pub target: Entity,
    pub source: Option<Entity>,
    /// Damage as authored, before rounding
    pub amount: f32,
    pub position: Vec3,
}

#[derive(Event, Debug, Clone)]
pub struct EntityDied {
    pub entity: Entity,
}

/// Hit handler applying a fixed amount of damage to the collided entity
pub fn damage_callback(amount: f32, source: Entity) -> HitCallback {
    Box::new(move |world: &mut World, target: Entity| {
        apply_damage_to(world, target, amount, Some(source));
    })
}

/// Apply damage to `target` if it has [`Health`].
///
/// Returns `false` for targets without health or already dead.
pub fn apply_damage_to(world: &mut World, target: Entity, amount: f32, source: Option<Entity>) -> bool {
    let Some(mut health) = world.get_mut::<Health>(target) else {
        debug!("hit {:?} has no health, ignoring", target);
        return false;
    };
    if !health.is_alive() {
        return false;
    }
    health.apply_damage(amount);
    debug!("{:?} took {} damage, {}/{} left", target, amount, health.current, health.max);

    let position = world
        .get::<Transform>(target)
        .map(|t| t.translation)
        .unwrap_or(Vec3::ZERO);
    world.send_event(DamageDealt {
        target,
        source,
        amount,
        position,
    });
    true
}

/// Tag newly dead entities and schedule their removal
pub fn mark_dead(
    mut commands: Commands,
    config: Res<CombatConfig>,
    query: Query<(Entity, &Health), (Changed<Health>, Without<Dead>)>,
    mut died: EventWriter<EntityDied>,
) {
    let delay = config.death_despawn_delay;
    for (entity, health) in &query {
        if health.is_alive() {
            continue;
        }
        info!("{:?} has died", entity);
        commands
            .entity(entity)
            .insert((Dead, DespawnAfter { remaining: delay }));
        died.send(EntityDied { entity });
    }
}

pub fn tick_despawn_after(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut DespawnAfter)>,
) {
    let dt = time.delta_secs();
    for (entity, mut timer) in &mut query {
        timer.remaining -= dt;
        if timer.remaining <= 0.0 {
            commands.entity(entity).despawn_recursive();
        }
    }
}

pub struct HealthPlugin;

impl Plugin for HealthPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CombatConfig>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .add_systems(
                Update,
                (mark_dead, tick_despawn_after)
                    .chain()
                    .in_set(CombatSet::Damage),
            );
    }
}
