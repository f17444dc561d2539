use super::{BoxDef, MapData, SpawnSets};

const ARENA_HALF: f32 = 30.0;
const WALL_HEIGHT: f32 = 6.0;
const WALL_THICKNESS: f32 = 0.5;

/// Built-in map used as the default and as test geometry: a walled floor
/// with a handful of crates and a low ledge between the spawn pools.
pub fn practice_arena() -> MapData {
    let mut boxes = Vec::new();

    // Floor slab.
    boxes.push(BoxDef::solid(
        [-ARENA_HALF, -1.0, -ARENA_HALF],
        [ARENA_HALF, 0.0, ARENA_HALF],
    ));

    // Perimeter walls.
    boxes.push(BoxDef::solid(
        [-ARENA_HALF, 0.0, -ARENA_HALF - WALL_THICKNESS],
        [ARENA_HALF, WALL_HEIGHT, -ARENA_HALF],
    ));
    boxes.push(BoxDef::solid(
        [-ARENA_HALF, 0.0, ARENA_HALF],
        [ARENA_HALF, WALL_HEIGHT, ARENA_HALF + WALL_THICKNESS],
    ));
    boxes.push(BoxDef::solid(
        [-ARENA_HALF - WALL_THICKNESS, 0.0, -ARENA_HALF],
        [-ARENA_HALF, WALL_HEIGHT, ARENA_HALF],
    ));
    boxes.push(BoxDef::solid(
        [ARENA_HALF, 0.0, -ARENA_HALF],
        [ARENA_HALF + WALL_THICKNESS, WALL_HEIGHT, ARENA_HALF],
    ));

    // Mid cover.
    boxes.push(BoxDef::solid([-6.0, 0.0, -1.0], [-4.0, 1.8, 1.0]));
    boxes.push(BoxDef::solid([4.0, 0.0, -1.0], [6.0, 1.8, 1.0]));
    boxes.push(BoxDef::solid([-1.0, 0.0, -6.0], [1.0, 1.2, -4.0]));
    boxes.push(BoxDef::solid([-1.0, 0.0, 4.0], [1.0, 1.2, 6.0]));

    // Walkable ledge, low enough to step onto.
    boxes.push(BoxDef::solid([-12.0, 0.0, -12.0], [-8.0, 0.4, -8.0]));
    boxes.push(BoxDef::solid([8.0, 0.0, 8.0], [12.0, 0.4, 12.0]));

    MapData {
        name: "practice_arena".into(),
        boxes,
        models: Vec::new(),
        spawns: SpawnSets {
            t: vec![
                [-22.0, 0.0, -22.0],
                [-20.0, 0.0, -24.0],
                [-24.0, 0.0, -20.0],
                [-18.0, 0.0, -22.0],
                [-22.0, 0.0, -18.0],
                [-20.0, 0.0, -20.0],
            ],
            ct: vec![
                [22.0, 0.0, 22.0],
                [20.0, 0.0, 24.0],
                [24.0, 0.0, 20.0],
                [18.0, 0.0, 22.0],
                [22.0, 0.0, 18.0],
                [20.0, 0.0, 20.0],
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_has_geometry_and_spawns() {
        let map = practice_arena();
        assert!(map.boxes.len() > 5);
        assert!(!map.spawns.t.is_empty());
        assert!(!map.spawns.ct.is_empty());
        assert_eq!(map.spawns.t.len(), map.spawns.ct.len());
    }
}
