pub mod combat;
pub mod event;
pub mod map;
pub mod math;
pub mod movement;
pub mod net;
pub mod player;
pub mod round;
pub mod world;

pub use combat::{GrenadeConfig, WeaponConfig, WeaponKind, WeaponSlot};
pub use event::{GameEvent, KillInstrument};
pub use map::{Aabb, BoxDef, MapData, MapError, ModelDef, SpawnSets, practice_arena};
pub use movement::{KinematicState, MoveIntent, MovementConfig};
pub use net::{
    ClientConnection, ConnectionManager, DEFAULT_PORT, DEFAULT_TICK_RATE, GrenadeSnapshot,
    InputCommand, JoinRequest, NetworkEndpoint, NetworkStats, Packet, PacketError, PacketHeader,
    PacketType, PlayerMeta, PlayerSnapshot, RoundSnapshot, Snapshot, Welcome, avatar_is_valid,
};
pub use player::Player;
pub use round::{GameMode, MatchConfig, MatchState, Phase, Side, Team};
pub use world::{CombatConfig, World};
