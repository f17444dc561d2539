use glam::Vec3;

use crate::map::Aabb;

const PARALLEL_EPS: f32 = 1e-8;

/// View direction for a yaw/pitch pair. Yaw 0 looks down -Z, positive pitch
/// looks up.
pub fn direction_from_yaw_pitch(yaw: f32, pitch: f32) -> Vec3 {
    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    let (sin_pitch, cos_pitch) = pitch.sin_cos();
    Vec3::new(sin_yaw * cos_pitch, sin_pitch, -cos_yaw * cos_pitch)
}

/// Slab-method ray/AABB test. Returns the entry distance, or the exit
/// distance when the ray starts inside the box. `None` on a miss or when the
/// box is entirely behind the origin.
pub fn ray_box_intersection(origin: Vec3, dir: Vec3, aabb: &Aabb) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let lo = aabb.min[axis];
        let hi = aabb.max[axis];

        if d.abs() < PARALLEL_EPS {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (lo - o) * inv;
        let mut t2 = (hi - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    if t_min >= 0.0 {
        Some(t_min)
    } else if t_max >= 0.0 {
        Some(t_max)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn direction_basis() {
        let forward = direction_from_yaw_pitch(0.0, 0.0);
        assert!((forward - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);

        let up = direction_from_yaw_pitch(0.0, std::f32::consts::FRAC_PI_2);
        assert!((up - Vec3::Y).length() < 1e-5);

        let right = direction_from_yaw_pitch(std::f32::consts::FRAC_PI_2, 0.0);
        assert!((right - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn hits_box_head_on() {
        let dist = ray_box_intersection(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0), &unit_box());
        assert!((dist.unwrap() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn misses_offset_box() {
        let dist = ray_box_intersection(Vec3::new(3.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0), &unit_box());
        assert!(dist.is_none());
    }

    #[test]
    fn box_behind_origin_is_ignored() {
        let dist = ray_box_intersection(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, -1.0), &unit_box());
        assert!(dist.is_none());
    }

    #[test]
    fn origin_inside_returns_exit() {
        let dist = ray_box_intersection(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), &unit_box());
        assert!((dist.unwrap() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn parallel_ray_outside_slab_misses() {
        let dist = ray_box_intersection(Vec3::new(0.0, 2.0, 5.0), Vec3::new(0.0, 0.0, -1.0), &unit_box());
        assert!(dist.is_none());
    }
}
