use std::f32::consts::{PI, TAU};

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Interpolates between two angles along the shortest arc, in radians.
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    let mut diff = (b - a) % TAU;
    if diff > PI {
        diff -= TAU;
    } else if diff < -PI {
        diff += TAU;
    }
    a + diff * t
}

/// Moves `current` toward `target` by at most `delta`, never overshooting.
#[inline]
pub fn approach(current: f32, target: f32, delta: f32) -> f32 {
    if current < target {
        (current + delta).min(target)
    } else {
        (current - delta).max(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn lerp_midpoint() {
        assert!((lerp(0.0, 10.0, 0.5) - 5.0).abs() < 1e-6);
        assert!((lerp(-2.0, 2.0, 0.25) - -1.0).abs() < 1e-6);
    }

    #[test]
    fn lerp_angle_takes_shortest_arc() {
        // 350deg -> 10deg should pass through 0, not wind backwards.
        let a = 350.0_f32.to_radians();
        let b = 10.0_f32.to_radians();
        let mid = lerp_angle(a, b, 0.5);
        let wrapped = mid.rem_euclid(TAU);
        assert!(wrapped < 0.01 || wrapped > TAU - 0.01);
    }

    #[test]
    fn lerp_angle_plain_case() {
        let mid = lerp_angle(0.0, FRAC_PI_4 * 2.0, 0.5);
        assert!((mid - FRAC_PI_4).abs() < 1e-6);
    }

    #[test]
    fn approach_never_overshoots() {
        assert_eq!(approach(0.0, 1.0, 10.0), 1.0);
        assert_eq!(approach(0.0, -1.0, 10.0), -1.0);
        assert!((approach(0.0, 1.0, 0.25) - 0.25).abs() < 1e-6);
    }
}
