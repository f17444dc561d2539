pub mod connection;
pub mod endpoint;
pub mod protocol;
pub mod stats;

pub use connection::{ClientConnection, ConnectionManager};
pub use endpoint::NetworkEndpoint;
pub use protocol::{
    DEFAULT_PORT, DEFAULT_TICK_RATE, GrenadeSnapshot, InputCommand, JoinRequest, MAX_PACKET_SIZE,
    Packet, PacketError, PacketHeader, PacketType, PlayerMeta, PlayerSnapshot, RoundSnapshot,
    Snapshot, Welcome, avatar_is_valid,
};
pub use stats::NetworkStats;
