use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    Rifle,
    Sniper,
    Shotgun,
    Pistol,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
#[serde(rename_all = "lowercase")]
pub enum WeaponSlot {
    Primary,
    Pistol,
    Grenade,
}

#[derive(Debug, Clone, Copy)]
pub struct WeaponConfig {
    pub damage: f32,
    pub fire_rate: f32,
    pub range: f32,
    pub magazine: u32,
    pub reload_time: f32,
    pub spread: f32,
    pub pellets: u32,
}

const RIFLE: WeaponConfig = WeaponConfig {
    damage: 34.0,
    fire_rate: 10.0,
    range: 80.0,
    magazine: 30,
    reload_time: 1.8,
    spread: 0.01,
    pellets: 1,
};

const SNIPER: WeaponConfig = WeaponConfig {
    damage: 80.0,
    fire_rate: 1.2,
    range: 120.0,
    magazine: 5,
    reload_time: 2.4,
    spread: 0.002,
    pellets: 1,
};

const SHOTGUN: WeaponConfig = WeaponConfig {
    damage: 10.0,
    fire_rate: 1.0,
    range: 14.0,
    magazine: 8,
    reload_time: 2.6,
    spread: 0.08,
    pellets: 8,
};

const PISTOL: WeaponConfig = WeaponConfig {
    damage: 22.0,
    fire_rate: 4.0,
    range: 50.0,
    magazine: 12,
    reload_time: 1.4,
    spread: 0.02,
    pellets: 1,
};

impl WeaponKind {
    pub fn config(self) -> &'static WeaponConfig {
        match self {
            WeaponKind::Rifle => &RIFLE,
            WeaponKind::Sniper => &SNIPER,
            WeaponKind::Shotgun => &SHOTGUN,
            WeaponKind::Pistol => &PISTOL,
        }
    }

    pub fn is_primary(self) -> bool {
        !matches!(self, WeaponKind::Pistol)
    }
}

#[derive(Debug, Clone)]
pub struct GrenadeConfig {
    pub fuse_time: f32,
    pub launch_speed: f32,
    pub up_boost: f32,
    pub blast_radius: f32,
    pub max_damage: f32,
    pub body_radius: f32,
}

impl Default for GrenadeConfig {
    fn default() -> Self {
        Self {
            fuse_time: 2.2,
            launch_speed: 12.0,
            up_boost: 4.0,
            blast_radius: 5.0,
            max_damage: 80.0,
            body_radius: 0.2,
        }
    }
}
