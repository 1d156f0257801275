//! Centralized combat constants.
//!
//! Authored defaults shared by the config layer and the state machines.
//! Anything a designer is expected to tune lives in `CombatConfig`; these are
//! the values it falls back to.

// =====================================================
// Slots
// =====================================================

/// Number of ability slots on the hotbar
pub const DEFAULT_SLOT_COUNT: usize = 6;

// =====================================================
// Projectiles
// =====================================================

/// Speed a projectile keeps when no positive override is supplied
pub const DEFAULT_PROJECTILE_SPEED: f32 = 15.0;

/// Collider radius for spawned projectiles
pub const PROJECTILE_COLLIDER_RADIUS: f32 = 0.25;

/// How long detached trails linger after the projectile is gone
pub const TRAIL_LINGER_SECS: f32 = 1.0;

// =====================================================
// Ice spikes
// =====================================================

/// Random extra height added on top of the authored spike size: [size, size + JITTER)
pub const SPIKE_HEIGHT_JITTER: f32 = 0.2;

/// Spike base radius as a fraction of the authored spike size
pub const SPIKE_BASE_RADIUS_RATIO: f32 = 0.3;

/// Tilt of the nearest spike, degrees
pub const SPIKE_TILT_NEAR_DEG: f32 = 60.0;

/// Tilt of the farthest spike, degrees
pub const SPIKE_TILT_FAR_DEG: f32 = 10.0;

/// Rise duration of a hazard, seconds
pub const HAZARD_RISE_SECS: f32 = 0.2;

/// Hold duration at full height, seconds
pub const HAZARD_HOLD_SECS: f32 = 0.2;

/// Sink duration of a hazard, seconds
pub const HAZARD_SINK_SECS: f32 = 0.2;

/// Fraction of the size multiplier a hazard rises above its buried position
pub const HAZARD_RISE_FRACTION: f32 = 0.9;

// =====================================================
// Melee slash
// =====================================================

/// Delay between the slash trigger and damage resolution, seconds
pub const SLASH_STRIKE_DELAY: f32 = 0.1;

// =====================================================
// Feedback
// =====================================================

/// Damage numbers pre-created at startup
pub const DAMAGE_NUMBER_POOL_SIZE: usize = 20;

/// Upper bound accepted for the pre-warm size
pub const MAX_POOL_PREWARM: usize = 10_000;

/// Vertical offset above the target where damage numbers appear
pub const DAMAGE_NUMBER_HEIGHT: f32 = 1.0;

/// Health bar fill interpolation time, seconds
pub const HEALTH_BAR_ANIM_SECS: f32 = 0.1;

/// Delay between death and despawn, seconds
pub const DEATH_DESPAWN_SECS: f32 = 2.0;

/// Blood decal fade-out time, seconds
pub const DECAL_FADE_SECS: f32 = 5.0;
