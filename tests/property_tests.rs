//! Property-based tests using proptest
//!
//! Invariants that must hold for all inputs:
//! - Spike geometry: vertex/index counts, winding bounds, apex height
//! - Ephemeral pool: no aliasing between live handles
//! - Slot cooldowns: monotonic, never negative
//! - Health: clamped to [0, max]
//! - Hazards: phases only move forward

use std::collections::HashSet;
use std::sync::Arc;

use arcane_core::abilities::{
    Ability, AbilityContext, AbilityKind, HazardSequence, PendingStrike, SlashParams,
    SpawnTransform,
};
use arcane_core::hazard::{Hazard, HazardPhase, HazardTimings, SpikeGenerator};
use arcane_core::health::Health;
use arcane_core::pool::{EphemeralPool, PoolHandle};
use arcane_core::projectile::ProjectileSpawn;
use arcane_core::rng::CombatRng;
use arcane_core::slots::{AbilitySlots, LocalAuthority};
use bevy::prelude::{Entity, Vec3};
use proptest::prelude::*;

/// Context that drops everything an ability asks for
struct Sink(CombatRng);

impl AbilityContext for Sink {
    fn caster(&self) -> Entity {
        Entity::from_raw(0)
    }
    fn caster_position(&self) -> Vec3 {
        Vec3::ZERO
    }
    fn spawn_transform(&self) -> SpawnTransform {
        SpawnTransform {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
        }
    }
    fn rng(&mut self) -> &mut CombatRng {
        &mut self.0
    }
    fn spawn_projectile(&mut self, _spawn: ProjectileSpawn) {}
    fn start_hazard_sequence(&mut self, _sequence: HazardSequence) {}
    fn schedule_strike(&mut self, _strike: PendingStrike) {}
}

fn phase_rank(phase: HazardPhase) -> u8 {
    match phase {
        HazardPhase::Buried => 0,
        HazardPhase::Rising => 1,
        HazardPhase::Exposed => 2,
        HazardPhase::Sinking => 3,
        HazardPhase::Destroyed => 4,
    }
}

// ============================================================
// Spike Geometry Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_spike_buffer_sizes(sides in 3u32..64, radius in 0.01f32..5.0, height in 0.01f32..10.0) {
        let geometry = SpikeGenerator::new(sides, radius, height).generate();
        prop_assert_eq!(geometry.vertex_count(), sides as usize + 2);
        prop_assert_eq!(geometry.normals.len(), geometry.vertex_count());
        prop_assert_eq!(geometry.indices.len(), sides as usize * 6);
        prop_assert!(geometry.indices.iter().all(|&i| (i as usize) < geometry.vertex_count()));
    }

    #[test]
    fn prop_spike_shape(sides in 3u32..64, radius in 0.01f32..5.0, height in 0.01f32..10.0) {
        let generator = SpikeGenerator::new(sides, radius, height);
        let geometry = generator.generate();

        let apex = geometry.positions[generator.apex_index() as usize];
        prop_assert_eq!(apex, [0.0, height, 0.0]);
        for p in &geometry.positions[1..=sides as usize] {
            let r = (p[0] * p[0] + p[2] * p[2]).sqrt();
            prop_assert!((r - radius).abs() < radius * 1e-4 + 1e-6, "rim vertex at radius {r}");
            prop_assert_eq!(p[1], 0.0);
        }
        for n in &geometry.normals {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            prop_assert!((len - 1.0).abs() < 1e-3, "normal length {len}");
        }
    }

    #[test]
    fn prop_degenerate_sides_clamped(sides in 0u32..3) {
        let geometry = SpikeGenerator::new(sides, 0.3, 1.0).generate();
        prop_assert_eq!(geometry.vertex_count(), 5);
        prop_assert_eq!(geometry.indices.len(), 18);
    }
}

// ============================================================
// Ephemeral Pool Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_pool_never_aliases(initial in 0usize..16, ops in prop::collection::vec(any::<(bool, u8)>(), 0..200)) {
        let mut pool = EphemeralPool::new(initial, || 0u32);
        let mut live: Vec<PoolHandle> = Vec::new();

        for (acquire, pick) in ops {
            if acquire || live.is_empty() {
                let handle = pool.acquire();
                prop_assert!(!live.contains(&handle), "handle {handle} handed out twice");
                live.push(handle);
            } else {
                let handle = live.swap_remove(pick as usize % live.len());
                prop_assert!(pool.release(handle));
                // releasing again is refused
                prop_assert!(!pool.release(handle));
            }

            prop_assert_eq!(pool.active_count(), live.len());
            prop_assert_eq!(pool.active_count() + pool.idle_count(), pool.capacity());
            prop_assert!(pool.capacity() >= initial);
        }

        let active: HashSet<PoolHandle> = pool.iter_active().map(|(h, _)| h).collect();
        let expected: HashSet<PoolHandle> = live.into_iter().collect();
        prop_assert_eq!(active, expected);
    }

    #[test]
    fn prop_pool_values_are_independent(count in 1usize..32) {
        let mut pool = EphemeralPool::new(0, || 0usize);
        let handles: Vec<PoolHandle> = (0..count).map(|_| pool.acquire()).collect();
        for (i, &h) in handles.iter().enumerate() {
            *pool.get_mut(h).unwrap() = i;
        }
        for (i, &h) in handles.iter().enumerate() {
            prop_assert_eq!(*pool.get(h).unwrap(), i);
        }
    }
}

// ============================================================
// Slot Cooldown Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_cooldown_monotonic(cooldown in 0.0f32..10.0, steps in prop::collection::vec(0.0f32..1.0, 1..100)) {
        let mut slots = AbilitySlots::new(1, LocalAuthority(true));
        let ability = Arc::new(Ability::new("Slash", cooldown, AbilityKind::Slash(SlashParams::default())));
        slots.equip(0, ability, &mut ());

        let mut ctx = Sink(CombatRng::new(0));
        prop_assert!(slots.trigger(0, &mut ctx));

        let mut previous = slots.remaining_cooldown(0);
        prop_assert_eq!(previous, cooldown);
        let mut elapsed = 0.0f32;
        for dt in steps {
            slots.tick(dt, &mut ());
            elapsed += dt;
            let remaining = slots.remaining_cooldown(0);
            prop_assert!(remaining <= previous);
            prop_assert!(remaining >= 0.0);
            // ready exactly when the cooldown has elapsed (within float slack)
            if elapsed < cooldown - 1e-3 {
                prop_assert!(!slots.is_ready(0));
            }
            previous = remaining;
        }
    }
}

// ============================================================
// Health & Hazard Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_health_stays_in_range(max in 1i32..10_000, hits in prop::collection::vec(-500.0f32..500.0, 0..50)) {
        let mut health = Health::new(max);
        for hit in hits {
            health.apply_damage(hit);
            prop_assert!(health.current >= 0 && health.current <= max);
            prop_assert!((0.0..=1.0).contains(&health.fraction()));
        }
    }

    #[test]
    fn prop_hazard_phases_advance(size in 0.1f32..5.0, steps in prop::collection::vec(0.0f32..0.3, 1..60)) {
        let mut hazard = Hazard::new(Entity::from_raw(0), size, 0.0, HazardTimings::default());
        let mut rank = phase_rank(hazard.phase());
        for dt in steps {
            let phase = hazard.tick(dt);
            prop_assert!(phase_rank(phase) >= rank);
            prop_assert!(hazard.vertical_offset().is_finite());
            rank = phase_rank(phase);
        }
    }
}
