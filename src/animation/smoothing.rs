//! Exponential smoothing toward a moving target.

use glam::Vec3;

/// Frame rate the per-frame factors are tuned for.
pub const REFERENCE_FPS: f32 = 60.0;

/// Values that can step toward a target.
pub trait Smoothable: Copy {
    /// Linear interpolation; `t = 0` returns `a`, `t = 1` returns `b`.
    fn lerp(a: Self, b: Self, t: f32) -> Self;
}

impl Smoothable for f32 {
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a + (b - a) * t
    }
}

impl Smoothable for Vec3 {
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        a.lerp(b, t)
    }
}

/// One smoothing step: `current + (target - current) * factor`.
///
/// With `factor` in `(0, 1]` the result never passes the target.
pub fn approach<T: Smoothable>(current: T, target: T, factor: f32) -> T {
    T::lerp(current, target, factor)
}

/// Rescale a per-frame factor tuned at [`REFERENCE_FPS`] to a frame of `dt`
/// seconds, so the same wall-clock convergence holds at any frame rate.
///
/// Exact at `dt = 1/60`. Non-positive `dt` yields zero (no movement).
pub fn frame_rate_factor(factor: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return 0.0;
    }
    let factor = factor.clamp(0.0, 1.0);
    1.0 - (1.0 - factor).powf(dt * REFERENCE_FPS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_point() {
        assert_eq!(approach(0.3f32, 0.3, 0.05), 0.3);
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(approach(v, v, 0.4), v);
    }

    #[test]
    fn test_monotone_without_overshoot() {
        let target = 1.0f32;
        let mut current = -2.0f32;
        let mut last_gap = (target - current).abs();
        for _ in 0..500 {
            current = approach(current, target, 0.05);
            let gap = (target - current).abs();
            assert!(gap <= last_gap);
            assert!(current <= target);
            last_gap = gap;
        }
        assert!(last_gap < 1e-6);
    }

    #[test]
    fn test_frame_rate_factor_matches_reference() {
        let f = frame_rate_factor(0.05, 1.0 / 60.0);
        assert!((f - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_frame_rate_factor_compounds() {
        // One 30 fps frame equals two 60 fps frames
        let mut a = 0.0f32;
        a = approach(a, 1.0, 0.1);
        a = approach(a, 1.0, 0.1);
        let b = approach(0.0f32, 1.0, frame_rate_factor(0.1, 1.0 / 30.0));
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn test_frame_rate_factor_zero_dt() {
        assert_eq!(frame_rate_factor(0.2, 0.0), 0.0);
        assert_eq!(frame_rate_factor(0.2, -1.0), 0.0);
    }
}
