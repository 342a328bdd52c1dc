//! Grid snapping, yaw, and easing helpers.
//!
//! Free of ECS types: everything here takes plain numbers, `Vec3`, or `Quat`.

use bevy::prelude::{EulerRot, Quat, Vec2, Vec3};

/// Snaps the planar (XZ) coordinates of `pos` to the nearest multiple of `pitch`.
///
/// The vertical axis is left untouched.
///
/// # Examples
/// ```
/// # use bevy::prelude::Vec3;
/// # use convoy_grid::math::snap_to_grid;
/// assert_eq!(snap_to_grid(Vec3::new(1.4, 7.0, -0.6), 1.0), Vec3::new(1.0, 7.0, -1.0));
/// ```
pub fn snap_to_grid(pos: Vec3, pitch: f32) -> Vec3 {
    Vec3::new(
        (pos.x / pitch).round() * pitch,
        pos.y,
        (pos.z / pitch).round() * pitch,
    )
}

/// Distance between two points ignoring the vertical axis.
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x - b.x, a.z - b.z).length()
}

/// Yaw (radians about +Y) that turns +Z onto `dir`.
///
/// Matches `atan2(x, z)`, so +Z is 0, +X is a quarter turn.
pub fn yaw_of(dir: Vec3) -> f32 {
    dir.x.atan2(dir.z)
}

/// Rounds a yaw angle (radians) to the nearest quarter turn.
pub fn round_yaw_to_quarter(yaw: f32) -> f32 {
    let quarter = std::f32::consts::FRAC_PI_2;
    (yaw / quarter).round() * quarter
}

/// Extracts the yaw component of a rotation.
pub fn yaw_of_rotation(rotation: Quat) -> f32 {
    let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
    yaw
}

/// Frame-rate independent interpolation factor for `rate * dt`, clamped to `[0, 1]`.
///
/// Used for `lerp`/`slerp` style approach toward a target each frame.
pub fn approach_factor(rate: f32, dt: f32) -> f32 {
    (rate * dt).clamp(0.0, 1.0)
}

/// Cubic ease-out curve: fast start, gentle deceleration.
///
/// `t` should be in `[0, 1]`. Returns `1 - (1 - t)^3`.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    // ── snap_to_grid ────────────────────────────────────────────────

    #[test]
    fn snap_rounds_to_nearest_cell() {
        let s = snap_to_grid(Vec3::new(2.49, 0.3, -3.51), 1.0);
        assert_eq!(s, Vec3::new(2.0, 0.3, -4.0));
    }

    #[test]
    fn snap_honours_pitch() {
        let s = snap_to_grid(Vec3::new(1.1, 0.0, 2.9), 2.0);
        assert_eq!(s, Vec3::new(2.0, 0.0, 2.0));
    }

    #[test]
    fn snap_removes_accumulated_drift() {
        let mut p = Vec3::ZERO;
        for _ in 0..1000 {
            p += Vec3::X * 0.1;
        }
        let s = snap_to_grid(p, 0.5);
        assert_eq!(s.x, 100.0);
    }

    // ── planar_distance ─────────────────────────────────────────────

    #[test]
    fn planar_distance_ignores_height() {
        let d = planar_distance(Vec3::new(0.0, 5.0, 0.0), Vec3::new(3.0, -2.0, 4.0));
        assert!((d - 5.0).abs() < 1e-6);
    }

    // ── yaw helpers ─────────────────────────────────────────────────

    #[test]
    fn yaw_of_axes() {
        assert!((yaw_of(Vec3::Z) - 0.0).abs() < 1e-6);
        assert!((yaw_of(Vec3::X) - FRAC_PI_2).abs() < 1e-6);
        assert!((yaw_of(Vec3::NEG_X) + FRAC_PI_2).abs() < 1e-6);
        assert!((yaw_of(Vec3::NEG_Z).abs() - PI).abs() < 1e-6);
    }

    #[test]
    fn quarter_rounding_snaps_near_angles() {
        assert!((round_yaw_to_quarter(0.3) - 0.0).abs() < 1e-6);
        assert!((round_yaw_to_quarter(1.4) - FRAC_PI_2).abs() < 1e-6);
        assert!((round_yaw_to_quarter(-1.7) + FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn yaw_of_rotation_roundtrip() {
        let q = Quat::from_rotation_y(0.7);
        assert!((yaw_of_rotation(q) - 0.7).abs() < 1e-5);
    }

    // ── approach_factor ─────────────────────────────────────────────

    #[test]
    fn approach_factor_clamps() {
        assert_eq!(approach_factor(10.0, 1.0), 1.0);
        assert_eq!(approach_factor(10.0, -1.0), 0.0);
        assert!((approach_factor(10.0, 0.016) - 0.16).abs() < 1e-6);
    }

    // ── ease_out_cubic ──────────────────────────────────────────────

    #[test]
    fn ease_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
    }

    #[test]
    fn ease_at_half_is_above_half() {
        assert!(ease_out_cubic(0.5) > 0.5);
    }
}
