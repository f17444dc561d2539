pub mod client;
pub mod interpolation;
pub mod prediction;

pub use client::NetClient;
pub use interpolation::{InterpolatedPlayer, ServerClock, SnapshotHistory};
pub use prediction::ClientPrediction;
