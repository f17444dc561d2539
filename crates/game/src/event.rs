//! Gameplay occurrences broadcast inside snapshots. Events are plain data:
//! the server appends them during a tick, the snapshot drains them, and
//! clients replay them for feedback (tracers, kill feed, round banners).

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

use crate::combat::WeaponKind;
use crate::round::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum KillInstrument {
    Weapon(WeaponKind),
    Grenade,
}

#[derive(Debug, Clone, PartialEq, Archive, RkyvSerialize, RkyvDeserialize)]
#[rkyv(derive(Debug))]
pub enum GameEvent {
    Hit {
        attacker: u32,
        victim: u32,
        damage: u32,
        headshot: bool,
    },
    Kill {
        attacker: u32,
        victim: u32,
        instrument: KillInstrument,
    },
    /// Emitted for every fired ray, hit or miss; `distance` is how far the
    /// tracer travels.
    Shot {
        shooter: u32,
        origin: [f32; 3],
        dir: [f32; 3],
        distance: f32,
    },
    RoundStarted {
        round: u32,
    },
    RoundEnded {
        round: u32,
        winner: Team,
    },
    RoundDrawn {
        round: u32,
    },
    MatchOver {
        /// Kill leaders, ties included.
        winners: Vec<u32>,
    },
    GrenadeExploded {
        owner: u32,
        position: [f32; 3],
    },
}
