mod practice_arena;

pub use practice_arena::practice_arena;

use std::path::Path;

use glam::{Mat3, Vec3};
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Axis-aligned box used for all collision queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("failed to read map file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse map file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Static world geometry box. Cosmetic fields round-trip untouched so maps
/// written by the authoring tool survive a load/save cycle.
#[derive(Debug, Clone, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize)]
#[rkyv(derive(Debug))]
pub struct BoxDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub min: [f32; 3],
    pub max: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl BoxDef {
    pub fn solid(min: [f32; 3], max: [f32; 3]) -> Self {
        Self {
            id: None,
            min,
            max,
            color: None,
            texture: None,
            kind: None,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(Vec3::from(self.min), Vec3::from(self.max))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize)]
#[rkyv(derive(Debug))]
#[serde(untagged)]
pub enum ModelScale {
    Uniform(f32),
    PerAxis([f32; 3]),
}

impl ModelScale {
    fn as_vec3(self) -> Vec3 {
        match self {
            ModelScale::Uniform(s) => Vec3::splat(s),
            ModelScale::PerAxis(v) => Vec3::from(v),
        }
    }
}

/// Local-space collision box attached to a placed model.
#[derive(Debug, Clone, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize)]
#[rkyv(derive(Debug))]
pub struct ColliderDef {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize)]
#[rkyv(derive(Debug))]
pub struct ModelDef {
    pub path: String,
    pub pos: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rot: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<ModelScale>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collider: Option<ColliderDef>,
}

impl ModelDef {
    /// World-space AABB of the local collider box after scale, XYZ Euler
    /// rotation and translation. `None` when the model has no collider.
    pub fn world_collider(&self) -> Option<Aabb> {
        let collider = self.collider.as_ref()?;
        let scale = self.scale.map_or(Vec3::ONE, ModelScale::as_vec3);
        let rot = self.rot.map_or(Vec3::ZERO, Vec3::from);
        let rotation = Mat3::from_euler(glam::EulerRot::XYZ, rot.x, rot.y, rot.z);
        let pos = Vec3::from(self.pos);

        let lo = Vec3::from(collider.min);
        let hi = Vec3::from(collider.max);

        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            let world = rotation * (corner * scale) + pos;
            min = min.min(world);
            max = max.max(world);
        }
        Some(Aabb::new(min, max))
    }
}

/// Per-side spawn point pools.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize)]
#[rkyv(derive(Debug))]
pub struct SpawnSets {
    pub t: Vec<[f32; 3]>,
    pub ct: Vec<[f32; 3]>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize)]
#[rkyv(derive(Debug))]
pub struct MapData {
    pub name: String,
    pub boxes: Vec<BoxDef>,
    #[serde(default)]
    pub models: Vec<ModelDef>,
    pub spawns: SpawnSets,
}

impl MapData {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// All collision geometry: explicit boxes plus boxes derived from placed
    /// models. Computed once at match start, read-only afterwards.
    pub fn collider_boxes(&self) -> Vec<Aabb> {
        self.boxes
            .iter()
            .map(BoxDef::aabb)
            .chain(self.models.iter().filter_map(ModelDef::world_collider))
            .collect()
    }
}
