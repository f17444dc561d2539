use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::combat::{WeaponKind, WeaponSlot};
use crate::event::GameEvent;
use crate::map::MapData;
use crate::round::{GameMode, Phase, Side, Team};

/// Full-state snapshots and the welcome payload (whole map) exceed a
/// conservative MTU by design; datagrams up to the UDP maximum are relied on
/// to fragment at the IP layer rather than adding a fragmentation protocol.
pub const MAX_PACKET_SIZE: usize = 65_507;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x4152_4E41;
pub const DEFAULT_PORT: u16 = 27500;
pub const DEFAULT_TICK_RATE: u32 = 30;

pub const MAX_AVATAR_BYTES: usize = 24 * 1024;
pub const MAX_NAME_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    pub sequence: u32,
}

impl PacketHeader {
    pub fn new(sequence: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            sequence,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

/// One frame of client intent. Sequence numbers strictly increase per
/// connection; the server echoes the last applied one back in the player's
/// snapshot for reconciliation.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct InputCommand {
    pub sequence: u32,
    pub dt: f32,
    pub forward: f32,
    pub strafe: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub flags: u16,
    pub slot: WeaponSlot,
}

impl InputCommand {
    pub const FLAG_JUMP: u16 = 1 << 0;
    pub const FLAG_CROUCH: u16 = 1 << 1;
    pub const FLAG_FIRE: u16 = 1 << 2;
    pub const FLAG_RELOAD: u16 = 1 << 3;
    pub const FLAG_THROW: u16 = 1 << 4;

    pub fn new(sequence: u32, dt: f32) -> Self {
        Self {
            sequence,
            dt,
            forward: 0.0,
            strafe: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            flags: 0,
            slot: WeaponSlot::Primary,
        }
    }

    #[inline]
    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: u16, value: bool) {
        if value {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }
}

#[derive(Debug, Clone, Default, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct JoinRequest {
    pub name: Option<String>,
    /// Small JPEG/PNG shown on the scoreboard. Oversized or unrecognized
    /// payloads are dropped without failing the join.
    pub avatar: Option<Vec<u8>>,
    pub primary: Option<WeaponKind>,
    pub preferred_side: Option<Side>,
    pub mode: Option<GameMode>,
    pub team_size: Option<u8>,
}

/// Accepts only payloads small enough to relay and recognizable as JPEG or
/// PNG by magic bytes.
pub fn avatar_is_valid(bytes: &[u8]) -> bool {
    if bytes.len() > MAX_AVATAR_BYTES {
        return false;
    }
    bytes.starts_with(&[0xFF, 0xD8, 0xFF]) || bytes.starts_with(&[0x89, b'P', b'N', b'G'])
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct PlayerMeta {
    pub player_id: u32,
    pub name: String,
    pub team: Team,
    pub avatar: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Welcome {
    pub player_id: u32,
    pub tick_rate: u32,
    pub map: MapData,
    pub roster: Vec<PlayerMeta>,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct PlayerSnapshot {
    pub id: u32,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub health: i32,
    pub alive: bool,
    pub crouching: bool,
    pub team: Team,
    pub slot: WeaponSlot,
    pub primary: WeaponKind,
    pub kills: u32,
    pub deaths: u32,
    /// Highest input sequence applied to this player so far.
    pub last_seq: u32,
    pub primary_ammo: u32,
    pub pistol_ammo: u32,
    pub grenades: u32,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct GrenadeSnapshot {
    pub id: u32,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct RoundSnapshot {
    pub round: u32,
    pub phase: Phase,
    pub time_left: f32,
    pub scores: [u32; 2],
    pub side_of_a: Side,
    pub mode: GameMode,
    pub team_size: u8,
    pub needed_players: u8,
    pub present_players: u8,
    pub buy_open: bool,
    /// Set during the post-round pause after a won round; `None` in post
    /// means a draw.
    pub post_winner: Option<Team>,
}

/// Full authoritative state, broadcast to every client each tick.
#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Snapshot {
    pub server_time: f64,
    pub players: Vec<PlayerSnapshot>,
    pub grenades: Vec<GrenadeSnapshot>,
    pub events: Vec<GameEvent>,
    pub round: RoundSnapshot,
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum PacketType {
    Join(JoinRequest),
    Input(InputCommand),
    Buy { primary: WeaponKind },
    Disconnect,
    Welcome(Welcome),
    Denied { reason: String },
    Snapshot(Snapshot),
    PlayerMeta(PlayerMeta),
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: PacketType,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl Packet {
    pub fn new(header: PacketHeader, payload: PacketType) -> Self {
        Self { header, payload }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        rkyv::from_bytes::<Self, rancor::Error>(data).map_err(PacketError::Deserialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_flags_set_and_clear() {
        let mut cmd = InputCommand::new(1, 1.0 / 30.0);
        cmd.set_flag(InputCommand::FLAG_FIRE, true);
        cmd.set_flag(InputCommand::FLAG_JUMP, true);
        assert!(cmd.has_flag(InputCommand::FLAG_FIRE));
        assert!(cmd.has_flag(InputCommand::FLAG_JUMP));
        assert!(!cmd.has_flag(InputCommand::FLAG_RELOAD));

        cmd.set_flag(InputCommand::FLAG_FIRE, false);
        assert!(!cmd.has_flag(InputCommand::FLAG_FIRE));
        assert!(cmd.has_flag(InputCommand::FLAG_JUMP));
    }

    #[test]
    fn input_packet_round_trip() {
        let mut cmd = InputCommand::new(42, 0.0333);
        cmd.forward = 1.0;
        cmd.yaw = 1.25;
        cmd.set_flag(InputCommand::FLAG_CROUCH, true);

        let packet = Packet::new(PacketHeader::new(7), PacketType::Input(cmd));
        let bytes = packet.serialize().unwrap();
        let back = Packet::deserialize(&bytes).unwrap();

        assert_eq!(back.header, packet.header);
        assert!(back.header.is_valid());
        match back.payload {
            PacketType::Input(cmd) => {
                assert_eq!(cmd.sequence, 42);
                assert!(cmd.has_flag(InputCommand::FLAG_CROUCH));
                assert!((cmd.forward - 1.0).abs() < f32::EPSILON);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn welcome_packet_round_trip() {
        let map = crate::map::practice_arena();
        let welcome = Welcome {
            player_id: 3,
            tick_rate: 30,
            map: map.clone(),
            roster: vec![PlayerMeta {
                player_id: 3,
                name: "alice".into(),
                team: Team::A,
                avatar: None,
            }],
        };

        let packet = Packet::new(PacketHeader::new(1), PacketType::Welcome(welcome));
        let bytes = packet.serialize().unwrap();

        // The archived view is printable: every nested wire type, the map
        // definitions included, carries an archived Debug impl.
        let archived = rkyv::access::<ArchivedPacket, rancor::Error>(&bytes).unwrap();
        assert!(!format!("{archived:?}").is_empty());

        let back = Packet::deserialize(&bytes).unwrap();
        match back.payload {
            PacketType::Welcome(welcome) => {
                assert_eq!(welcome.player_id, 3);
                assert_eq!(welcome.map.name, map.name);
                assert_eq!(welcome.map.boxes.len(), map.boxes.len());
                assert_eq!(welcome.roster.len(), 1);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn bad_magic_is_invalid() {
        let mut header = PacketHeader::new(0);
        header.magic = 0xDEAD_BEEF;
        assert!(!header.is_valid());
    }

    #[test]
    fn garbage_fails_to_deserialize() {
        assert!(Packet::deserialize(&[0x13, 0x37, 0x00, 0x01]).is_err());
    }

    #[test]
    fn avatar_validation() {
        assert!(avatar_is_valid(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]));
        assert!(avatar_is_valid(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]));
        assert!(!avatar_is_valid(&[0x00, 0x01, 0x02]));
        assert!(!avatar_is_valid(&vec![0xFF; MAX_AVATAR_BYTES + 1]));
    }
}
