//! Shared kinematic character integrator. The server runs it authoritatively
//! and the client runs the exact same code for prediction, so everything in
//! here must stay pure: outputs depend only on the arguments.

use glam::Vec3;

use crate::map::Aabb;
use crate::math::approach;

const INPUT_DEADZONE: f32 = 0.01;
const GROUND_PROBE: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct MovementConfig {
    pub max_speed: f32,
    pub ground_accel: f32,
    pub air_accel: f32,
    pub friction: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub step_height: f32,
    pub crouch_speed_mult: f32,
    pub player_radius: f32,
    pub player_height: f32,
    pub eye_height: f32,
    pub crouch_eye_height: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed: 6.0,
            ground_accel: 20.0,
            air_accel: 8.0,
            friction: 8.0,
            jump_speed: 7.0,
            gravity: -20.0,
            step_height: 0.6,
            crouch_speed_mult: 0.5,
            player_radius: 0.4,
            player_height: 1.8,
            eye_height: 1.6,
            crouch_eye_height: 1.0,
        }
    }
}

impl MovementConfig {
    pub fn eye_height_for(&self, crouching: bool) -> f32 {
        if crouching {
            self.crouch_eye_height
        } else {
            self.eye_height
        }
    }
}

/// Feet-anchored kinematic state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub on_ground: bool,
}

impl KinematicState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            on_ground: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MoveIntent {
    pub forward: f32,
    pub strafe: f32,
    pub jump: bool,
    pub crouch: bool,
}

/// True when the player box at `pos` overlaps any collider. Overlap is
/// strict, so resting exactly on a surface does not count.
pub fn collides_at(pos: Vec3, colliders: &[Aabb], config: &MovementConfig) -> bool {
    let r = config.player_radius;
    let h = config.player_height;
    colliders.iter().any(|b| {
        pos.x - r < b.max.x
            && pos.x + r > b.min.x
            && pos.y < b.max.y
            && pos.y + h > b.min.y
            && pos.z - r < b.max.z
            && pos.z + r > b.min.z
    })
}

/// Ground test: would the player box collide if nudged slightly down.
pub fn probe_ground(pos: Vec3, colliders: &[Aabb], config: &MovementConfig) -> bool {
    let probe = Vec3::new(pos.x, pos.y - GROUND_PROBE, pos.z);
    collides_at(probe, colliders, config)
}

fn move_axis(
    pos: Vec3,
    delta: f32,
    axis: usize,
    colliders: &[Aabb],
    config: &MovementConfig,
) -> Option<Vec3> {
    let mut next = pos;
    next[axis] += delta;
    if !collides_at(next, colliders, config) {
        return Some(next);
    }

    // Horizontal moves may step up small ledges, but only when both the
    // lifted start and the lifted destination are free.
    if axis != 1 {
        let mut lifted = pos;
        lifted.y += config.step_height;
        let mut lifted_next = lifted;
        lifted_next[axis] += delta;
        if !collides_at(lifted, colliders, config) && !collides_at(lifted_next, colliders, config) {
            return Some(lifted_next);
        }
    }

    None
}

/// Advances one simulation step. Callers are responsible for clamping `dt`
/// and the intent axes; the integrator itself never fails.
pub fn step(
    mut state: KinematicState,
    intent: &MoveIntent,
    yaw: f32,
    dt: f32,
    colliders: &[Aabb],
    config: &MovementConfig,
) -> KinematicState {
    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    let forward = Vec3::new(-sin_yaw, 0.0, -cos_yaw);
    let right = Vec3::new(cos_yaw, 0.0, -sin_yaw);

    let speed_cap = config.max_speed
        * if intent.crouch {
            config.crouch_speed_mult
        } else {
            1.0
        };

    let has_input = intent.forward.abs() > INPUT_DEADZONE || intent.strafe.abs() > INPUT_DEADZONE;
    if has_input {
        let mut wish = forward * intent.forward + right * intent.strafe;
        wish.y = 0.0;
        if wish.length_squared() > 0.0 {
            wish = wish.normalize();
        }
        let accel = if state.on_ground {
            config.ground_accel
        } else {
            config.air_accel
        };
        state.velocity.x = approach(state.velocity.x, wish.x * speed_cap, accel * dt);
        state.velocity.z = approach(state.velocity.z, wish.z * speed_cap, accel * dt);
    } else if state.on_ground {
        let drop = (1.0 - config.friction * dt).max(0.0);
        state.velocity.x *= drop;
        state.velocity.z *= drop;
    }

    let horizontal = (state.velocity.x * state.velocity.x + state.velocity.z * state.velocity.z)
        .sqrt();
    if horizontal > speed_cap {
        let scale = speed_cap / horizontal;
        state.velocity.x *= scale;
        state.velocity.z *= scale;
    }

    if intent.jump && state.on_ground {
        state.velocity.y = config.jump_speed;
    }
    state.velocity.y += config.gravity * dt;

    let mut pos = state.position;
    for axis in 0..3 {
        let delta = state.velocity[axis] * dt;
        if delta == 0.0 {
            continue;
        }
        match move_axis(pos, delta, axis, colliders, config) {
            Some(next) => pos = next,
            None => state.velocity[axis] = 0.0,
        }
    }
    state.position = pos;

    state.on_ground = probe_ground(pos, colliders, config);
    if state.on_ground && state.velocity.y < 0.0 {
        state.velocity.y = 0.0;
    }

    state
}
