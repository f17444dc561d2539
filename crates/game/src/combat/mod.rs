pub mod raycast;
pub mod weapons;

pub use raycast::{direction_from_yaw_pitch, ray_box_intersection};
pub use weapons::{GrenadeConfig, WeaponConfig, WeaponKind, WeaponSlot};
