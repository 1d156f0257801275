//! Easing curves used by the tick-driven animations.
//!
//! All functions map t ∈ [0, 1] to a progress value with f(0) = 0 and f(1) = 1.
//! Inputs outside the range are clamped.

/// Overshoot amount for [`ease_out_back`]
const BACK_OVERSHOOT: f32 = 1.70158;

pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Fast start, slow finish
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Slow start, fast finish
pub fn ease_in_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Ease-out that overshoots past 1.0 before settling
///
/// Peaks at roughly 1.1 around t = 0.6.
pub fn ease_out_back(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let c1 = BACK_OVERSHOOT;
    let c3 = c1 + 1.0;
    let u = t - 1.0;
    1.0 + c3 * u * u * u + c1 * u * u
}

/// Inverse of `lerp`: where `value` sits between `a` and `b`, clamped to [0, 1]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() <= f32::EPSILON {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        for f in [linear, ease_out_quad, ease_in_quad, ease_out_back] {
            assert!(f(0.0).abs() < 1e-6);
            assert!((f(1.0) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_out_back_overshoots() {
        let peak = (1..100)
            .map(|i| ease_out_back(i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.05, "peak = {peak}");
    }

    #[test]
    fn test_quad_shapes() {
        assert!(ease_out_quad(0.5) > 0.5);
        assert!(ease_in_quad(0.5) < 0.5);
    }

    #[test]
    fn test_clamped_inputs() {
        assert_eq!(ease_in_quad(-3.0), 0.0);
        assert_eq!(ease_out_quad(7.0), 1.0);
    }

    #[test]
    fn test_inverse_lerp() {
        assert!((inverse_lerp(0.0, 100.0, 25.0) - 0.25).abs() < 1e-6);
        assert_eq!(inverse_lerp(0.0, 100.0, 250.0), 1.0);
        assert_eq!(inverse_lerp(0.0, 100.0, -5.0), 0.0);
        assert_eq!(inverse_lerp(5.0, 5.0, 5.0), 0.0);
    }
}
