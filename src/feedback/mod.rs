//! Short-lived hit feedback: damage numbers, health bars, decals and
//! particle-style transient effects.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use crate::config::CombatConfig;
use crate::constants::{DAMAGE_NUMBER_HEIGHT, DAMAGE_NUMBER_POOL_SIZE, HEALTH_BAR_ANIM_SECS};
use crate::easing::{ease_out_quad, inverse_lerp, linear};
use crate::health::{DamageDealt, EntityDied, Health};
use crate::pool::{EphemeralPool, PoolHandle};
use crate::rng::CombatRng;
use crate::CombatSet;

/// Authored visual effect: a name for the spawned entity and how long it lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTemplate {
    pub name: String,
    pub duration: f32,
}

/// Despawned once `remaining` reaches zero
#[derive(Component, Debug, Clone)]
pub struct TransientEffect {
    pub remaining: f32,
}

impl TransientEffect {
    pub fn new(duration: f32) -> Self {
        Self {
            remaining: duration.max(0.0),
        }
    }

    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.remaining <= 0.0
    }
}

pub fn spawn_effect(commands: &mut Commands, template: &EffectTemplate, transform: Transform) -> Entity {
    commands
        .spawn((
            Name::new(template.name.clone()),
            transform,
            TransientEffect::new(template.duration),
        ))
        .id()
}

pub fn expire_transient_effects(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut TransientEffect)>,
) {
    let dt = time.delta_secs();
    for (entity, mut effect) in &mut query {
        if effect.tick(dt) {
            commands.entity(entity).despawn_recursive();
        }
    }
}

// =====================================================
// Damage numbers
// =====================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageNumberSettings {
    pub initial_pool_size: usize,
    pub float_distance: f32,
    pub fade_duration: f32,
    /// Spawn height above the damaged entity
    pub height_offset: f32,
    pub min_damage: f32,
    pub max_damage: f32,
    /// Colour at `min_damage`
    pub low_color: [f32; 3],
    /// Colour at `max_damage`
    pub high_color: [f32; 3],
}

impl Default for DamageNumberSettings {
    fn default() -> Self {
        Self {
            initial_pool_size: DAMAGE_NUMBER_POOL_SIZE,
            float_distance: 1.0,
            fade_duration: 1.0,
            height_offset: DAMAGE_NUMBER_HEIGHT,
            min_damage: 0.0,
            max_damage: 100.0,
            low_color: [1.0, 0.95, 0.4],
            high_color: [1.0, 0.1, 0.05],
        }
    }
}

impl DamageNumberSettings {
    /// Severity gradient between `low_color` and `high_color`
    pub fn color_for(&self, damage: i32) -> Srgba {
        let t = inverse_lerp(self.min_damage, self.max_damage, damage as f32);
        let [lr, lg, lb] = self.low_color;
        let [hr, hg, hb] = self.high_color;
        Srgba::rgb(lr + (hr - lr) * t, lg + (hg - lg) * t, lb + (hb - lb) * t)
    }
}

/// One floating number
#[derive(Debug, Clone, Default)]
pub struct DamageNumber {
    pub text: String,
    pub color: Srgba,
    pub position: Vec3,
    origin: Vec3,
    elapsed: f32,
}

impl DamageNumber {
    pub fn show(&mut self, damage: f32, origin: Vec3, settings: &DamageNumberSettings) {
        let rounded = damage.round() as i32;
        self.text = rounded.to_string();
        self.color = settings.color_for(rounded);
        self.origin = origin;
        self.position = origin;
        self.elapsed = 0.0;
    }

    /// Float up and fade. Returns `true` once the animation is over.
    pub fn tick(&mut self, dt: f32, settings: &DamageNumberSettings) -> bool {
        self.elapsed += dt;
        let t = if settings.fade_duration > 0.0 {
            (self.elapsed / settings.fade_duration).min(1.0)
        } else {
            1.0
        };
        self.position = self.origin + Vec3::Y * ease_out_quad(t) * settings.float_distance;
        self.color.alpha = 1.0 - t;
        t >= 1.0
    }
}

#[derive(Resource, Debug)]
pub struct DamageNumberPool {
    pub pool: EphemeralPool<DamageNumber>,
}

impl DamageNumberPool {
    pub fn new(initial_size: usize) -> Self {
        Self {
            pool: EphemeralPool::new(initial_size, DamageNumber::default),
        }
    }

    pub fn spawn(&mut self, damage: f32, position: Vec3, settings: &DamageNumberSettings) -> PoolHandle {
        let handle = self.pool.acquire();
        if let Some(number) = self.pool.get_mut(handle) {
            number.show(damage, position + Vec3::Y * settings.height_offset, settings);
        }
        handle
    }

    /// Advance every active number, releasing the finished ones
    pub fn tick(&mut self, dt: f32, settings: &DamageNumberSettings) -> usize {
        let finished: Vec<PoolHandle> = self
            .pool
            .iter_active_mut()
            .filter_map(|(handle, number)| number.tick(dt, settings).then_some(handle))
            .collect();
        for &handle in &finished {
            self.pool.release(handle);
        }
        finished.len()
    }
}

pub fn init_damage_number_pool(mut commands: Commands, config: Res<CombatConfig>) {
    let size = config.damage_numbers.initial_pool_size;
    debug!("pre-warming {} damage numbers", size);
    commands.insert_resource(DamageNumberPool::new(size));
}

pub fn spawn_damage_numbers(
    config: Res<CombatConfig>,
    pool: Option<ResMut<DamageNumberPool>>,
    mut damage_events: EventReader<DamageDealt>,
) {
    let Some(mut pool) = pool else {
        damage_events.clear();
        return;
    };
    for event in damage_events.read() {
        pool.spawn(event.amount, event.position, &config.damage_numbers);
    }
}

pub fn animate_damage_numbers(
    time: Res<Time>,
    config: Res<CombatConfig>,
    pool: Option<ResMut<DamageNumberPool>>,
) {
    if let Some(mut pool) = pool {
        pool.tick(time.delta_secs(), &config.damage_numbers);
    }
}

/// Screen-space text mirroring one pool slot
#[derive(Component, Debug)]
pub struct DamageNumberLabel(pub PoolHandle);

/// Project active damage numbers onto the 3D camera's viewport.
///
/// Labels are created lazily, one per pool slot, and hidden while their slot
/// is idle. Without a camera there is nothing to draw.
pub fn sync_damage_number_labels(
    mut commands: Commands,
    pool: Option<Res<DamageNumberPool>>,
    camera: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    mut labels: Local<HashMap<PoolHandle, Entity>>,
    mut texts: Query<(&mut Text, &mut TextColor, &mut Node, &mut Visibility), With<DamageNumberLabel>>,
) {
    let (Some(pool), Ok((camera, camera_transform))) = (pool, camera.get_single()) else {
        return;
    };

    for (&handle, &label) in labels.iter() {
        if !pool.pool.is_active(handle) {
            if let Ok((_, _, _, mut visibility)) = texts.get_mut(label) {
                *visibility = Visibility::Hidden;
            }
        }
    }

    for (handle, number) in pool.pool.iter_active() {
        let screen = camera.world_to_viewport(camera_transform, number.position).ok();
        let color = TextColor(number.color.into());

        let existing = labels.get(&handle).and_then(|&label| texts.get_mut(label).ok());
        match (existing, screen) {
            (Some((mut text, mut text_color, mut node, mut visibility)), Some(screen)) => {
                if text.0 != number.text {
                    text.0.clone_from(&number.text);
                }
                *text_color = color;
                node.left = Val::Px(screen.x);
                node.top = Val::Px(screen.y);
                *visibility = Visibility::Inherited;
            }
            // behind the camera
            (Some((_, _, _, mut visibility)), None) => *visibility = Visibility::Hidden,
            (None, screen) => {
                let (left, top, visibility) = match screen {
                    Some(p) => (p.x, p.y, Visibility::Inherited),
                    None => (0.0, 0.0, Visibility::Hidden),
                };
                let label = commands
                    .spawn((
                        Name::new("Damage Number"),
                        DamageNumberLabel(handle),
                        Text::new(number.text.clone()),
                        TextFont {
                            font_size: 22.0,
                            ..default()
                        },
                        color,
                        Node {
                            position_type: PositionType::Absolute,
                            left: Val::Px(left),
                            top: Val::Px(top),
                            ..default()
                        },
                        visibility,
                    ))
                    .id();
                labels.insert(handle, label);
            }
        }
    }
}

// =====================================================
// Health bars
// =====================================================

/// Fill fraction that eases toward the latest health value
#[derive(Component, Debug, Clone)]
pub struct HealthBar {
    pub displayed: f32,
    from: f32,
    target: f32,
    elapsed: f32,
    duration: f32,
}

impl HealthBar {
    /// Start already showing `fraction`
    pub fn new(fraction: f32, duration: f32) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        Self {
            displayed: fraction,
            from: fraction,
            target: fraction,
            elapsed: duration,
            duration,
        }
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Restart the animation from whatever is currently displayed
    pub fn set_target(&mut self, fraction: f32) {
        self.from = self.displayed;
        self.target = fraction.clamp(0.0, 1.0);
        self.elapsed = 0.0;
    }

    pub fn tick(&mut self, dt: f32) {
        if self.elapsed >= self.duration {
            self.displayed = self.target;
            return;
        }
        self.elapsed += dt;
        self.displayed = self.from + (self.target - self.from) * linear(self.elapsed / self.duration);
    }
}

impl Default for HealthBar {
    fn default() -> Self {
        Self::new(1.0, HEALTH_BAR_ANIM_SECS)
    }
}

/// Every new `Health` gets a bar that starts full, snapped to its current value
pub fn attach_health_bars(
    mut commands: Commands,
    config: Res<CombatConfig>,
    query: Query<(Entity, &Health), (Added<Health>, Without<HealthBar>)>,
) {
    for (entity, health) in &query {
        commands
            .entity(entity)
            .insert(HealthBar::new(health.fraction(), config.health_bar_duration));
    }
}

pub fn update_health_bars(
    mut damage_events: EventReader<DamageDealt>,
    mut query: Query<(&Health, &mut HealthBar)>,
) {
    for event in damage_events.read() {
        if let Ok((health, mut bar)) = query.get_mut(event.target) {
            bar.set_target(health.fraction());
        }
    }
}

pub fn tick_health_bars(time: Res<Time>, mut query: Query<&mut HealthBar>) {
    let dt = time.delta_secs();
    for mut bar in &mut query {
        bar.tick(dt);
    }
}

pub fn remove_dead_health_bars(mut commands: Commands, mut died: EventReader<EntityDied>) {
    for event in died.read() {
        if let Some(mut entity) = commands.get_entity(event.entity) {
            entity.remove::<HealthBar>();
        }
    }
}

// =====================================================
// Blood decals
// =====================================================

#[derive(Component, Debug, Clone)]
pub struct BloodDecal {
    /// 1.0 when fresh, 0.0 when gone
    pub fade: f32,
    elapsed: f32,
    duration: f32,
}

impl BloodDecal {
    pub fn new(duration: f32) -> Self {
        Self {
            fade: 1.0,
            elapsed: 0.0,
            duration,
        }
    }

    pub fn tick(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        if self.duration <= 0.0 {
            self.fade = 0.0;
            return true;
        }
        self.fade = 1.0 - linear(self.elapsed / self.duration);
        self.elapsed >= self.duration
    }
}

/// Decal quad shared by every splat; each splat owns its material so it can fade alone
#[derive(Resource, Debug, Clone)]
pub struct DecalVisuals {
    pub mesh: Handle<Mesh>,
    pub color: Color,
}

pub fn setup_decal_visuals(mut commands: Commands, meshes: Option<ResMut<Assets<Mesh>>>) {
    let Some(mut meshes) = meshes else {
        return;
    };
    commands.insert_resource(DecalVisuals {
        mesh: meshes.add(Rectangle::new(1.0, 1.0)),
        color: Color::srgb(0.45, 0.02, 0.02),
    });
}

pub fn spawn_blood_decals(
    mut commands: Commands,
    config: Res<CombatConfig>,
    mut rng: ResMut<CombatRng>,
    visuals: Option<Res<DecalVisuals>>,
    mut materials: Option<ResMut<Assets<StandardMaterial>>>,
    mut damage_events: EventReader<DamageDealt>,
    mut warned: Local<bool>,
) {
    for event in damage_events.read() {
        let Some(template) = &config.decal else {
            if !*warned {
                warn!("blood decal template not configured, skipping decals");
                *warned = true;
            }
            continue;
        };

        let yaw = rng.range_f32(0.0, 360.0).to_radians();
        let scale = rng.range_f32(0.5, 1.0);
        let mut decal = commands.spawn((
            Name::new(template.name.clone()),
            Transform::from_translation(event.position + Vec3::Y * 0.5)
                .with_rotation(Quat::from_euler(EulerRot::YXZ, yaw, FRAC_PI_2, 0.0))
                .with_scale(Vec3::splat(scale)),
            BloodDecal::new(config.decal_duration),
        ));
        if let (Some(visuals), Some(materials)) = (visuals.as_deref(), materials.as_deref_mut()) {
            let material = materials.add(StandardMaterial {
                base_color: visuals.color,
                alpha_mode: AlphaMode::Blend,
                cull_mode: None,
                unlit: true,
                ..default()
            });
            decal.insert((Mesh3d(visuals.mesh.clone()), MeshMaterial3d(material)));
        }
    }
}

pub fn fade_blood_decals(
    mut commands: Commands,
    time: Res<Time>,
    mut materials: Option<ResMut<Assets<StandardMaterial>>>,
    mut query: Query<(Entity, &mut BloodDecal, Option<&MeshMaterial3d<StandardMaterial>>)>,
) {
    let dt = time.delta_secs();
    for (entity, mut decal, material) in &mut query {
        if decal.tick(dt) {
            commands.entity(entity).despawn_recursive();
            continue;
        }
        let (Some(materials), Some(material)) = (materials.as_deref_mut(), material) else {
            continue;
        };
        if let Some(material) = materials.get_mut(&material.0) {
            material.base_color.set_alpha(decal.fade);
        }
    }
}

pub struct FeedbackPlugin;

impl Plugin for FeedbackPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CombatConfig>()
            .init_resource::<CombatRng>()
            .add_event::<DamageDealt>()
            .add_event::<EntityDied>()
            .add_systems(Startup, (init_damage_number_pool, setup_decal_visuals))
            .add_systems(
                Update,
                (
                    (
                        spawn_damage_numbers,
                        animate_damage_numbers,
                        sync_damage_number_labels,
                    )
                        .chain(),
                    (
                        attach_health_bars,
                        update_health_bars,
                        tick_health_bars,
                        remove_dead_health_bars,
                    )
                        .chain(),
                    (spawn_blood_decals, fade_blood_decals).chain(),
                    expire_transient_effects,
                )
                    .in_set(CombatSet::Feedback),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_number_text_and_color() {
        let settings = DamageNumberSettings::default();
        let mut number = DamageNumber::default();
        number.show(14.6, Vec3::ZERO, &settings);
        assert_eq!(number.text, "15");
        assert_eq!(number.color.alpha, 1.0);

        let weak = settings.color_for(0);
        let strong = settings.color_for(100);
        let over = settings.color_for(400);
        assert!(weak.green > strong.green);
        assert_eq!(strong, over);
    }

    #[test]
    fn test_damage_number_floats_and_fades() {
        let settings = DamageNumberSettings::default();
        let mut number = DamageNumber::default();
        number.show(10.0, Vec3::new(0.0, 1.0, 0.0), &settings);

        assert!(!number.tick(0.5, &settings));
        assert!(number.position.y > 1.0 && number.position.y < 2.0);
        assert!((number.color.alpha - 0.5).abs() < 1e-5);

        assert!(number.tick(0.5, &settings));
        assert!((number.position.y - 2.0).abs() < 1e-5);
        assert_eq!(number.color.alpha, 0.0);
    }

    #[test]
    fn test_pool_self_release() {
        let settings = DamageNumberSettings::default();
        let mut pool = DamageNumberPool::new(2);
        let a = pool.spawn(10.0, Vec3::ZERO, &settings);
        let b = pool.spawn(20.0, Vec3::ZERO, &settings);
        assert_ne!(a, b);
        assert_eq!(pool.pool.get(a).unwrap().position.y, settings.height_offset);

        assert_eq!(pool.tick(0.5, &settings), 0);
        assert_eq!(pool.tick(0.6, &settings), 2);
        assert_eq!(pool.pool.active_count(), 0);
        assert_eq!(pool.pool.capacity(), 2);
    }

    #[test]
    fn test_pool_grows_under_burst() {
        let settings = DamageNumberSettings::default();
        let mut pool = DamageNumberPool::new(2);
        for _ in 0..5 {
            pool.spawn(1.0, Vec3::ZERO, &settings);
        }
        assert_eq!(pool.pool.capacity(), 5);
    }

    #[test]
    fn test_health_bar_snaps_then_animates() {
        let mut bar = HealthBar::new(1.0, 0.1);
        bar.tick(0.016);
        assert_eq!(bar.displayed, 1.0);

        bar.set_target(0.5);
        bar.tick(0.05);
        assert!((bar.displayed - 0.75).abs() < 1e-5);
        bar.tick(0.05);
        assert!((bar.displayed - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_health_bar_restarts_from_displayed() {
        let mut bar = HealthBar::new(1.0, 0.1);
        bar.set_target(0.0);
        bar.tick(0.05);
        bar.set_target(0.0);
        bar.tick(0.05);
        // halfway from 0.5 toward 0.0
        assert!((bar.displayed - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_decal_fade() {
        let mut decal = BloodDecal::new(5.0);
        assert!(!decal.tick(2.5));
        assert!((decal.fade - 0.5).abs() < 1e-5);
        assert!(decal.tick(2.5));
        assert_eq!(decal.fade, 0.0);
    }

    #[test]
    fn test_transient_effect() {
        let mut effect = TransientEffect::new(1.0);
        assert!(!effect.tick(0.4));
        assert!(effect.tick(0.6));
    }
}
