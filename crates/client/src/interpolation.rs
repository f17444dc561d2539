//! Snapshot interpolation for remote entities. Rendering runs a fixed delay
//! behind the estimated server clock so there is almost always a pair of
//! snapshots bracketing the render time.

use std::collections::VecDeque;

use glam::Vec3;

use arena::math::{lerp, lerp_angle};
use arena::{PlayerSnapshot, Snapshot};

/// How far behind the estimated server clock rendering runs, in seconds.
pub const INTERPOLATION_DELAY: f64 = 0.1;

const MAX_BUFFERED_SNAPSHOTS: usize = 30;
const OFFSET_SMOOTHING: f64 = 0.1;

/// Smoothed estimate of `server_time - local_time`.
#[derive(Debug, Default)]
pub struct ServerClock {
    offset: Option<f64>,
}

impl ServerClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one snapshot timestamp. The first sample is adopted outright,
    /// later ones nudge the offset so jitter cannot yank the render clock.
    pub fn observe(&mut self, server_time: f64, local_time: f64) {
        let sample = server_time - local_time;
        self.offset = Some(match self.offset {
            None => sample,
            Some(offset) => offset * (1.0 - OFFSET_SMOOTHING) + sample * OFFSET_SMOOTHING,
        });
    }

    /// `None` until the first snapshot has been observed.
    pub fn render_time(&self, local_time: f64) -> Option<f64> {
        self.offset
            .map(|offset| local_time + offset - INTERPOLATION_DELAY)
    }

    pub fn offset(&self) -> Option<f64> {
        self.offset
    }
}

/// Interpolated pose of one remote player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedPlayer {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl InterpolatedPlayer {
    fn from_snapshot(p: &PlayerSnapshot) -> Self {
        Self {
            position: Vec3::from(p.position),
            yaw: p.yaw,
            pitch: p.pitch,
        }
    }
}

/// Ring of recent snapshots ordered by server time.
#[derive(Default)]
pub struct SnapshotHistory {
    snapshots: VecDeque<Snapshot>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Out-of-order arrivals (UDP) are discarded; the buffer stays sorted by
    /// construction.
    pub fn push(&mut self, snapshot: Snapshot) {
        if let Some(last) = self.snapshots.back() {
            if snapshot.server_time <= last.server_time {
                return;
            }
        }
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > MAX_BUFFERED_SNAPSHOTS {
            self.snapshots.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// Pose of `player_id` at `render_time`. Sampling beyond either end of
    /// the buffer clamps to the nearest snapshot; a player present on only
    /// one side of the bracket is returned unmodified.
    pub fn sample_player(&self, player_id: u32, render_time: f64) -> Option<InterpolatedPlayer> {
        if self.snapshots.is_empty() {
            return None;
        }

        let newer_idx = self
            .snapshots
            .iter()
            .position(|s| s.server_time >= render_time)
            .unwrap_or(self.snapshots.len() - 1);
        let older_idx = newer_idx.saturating_sub(1);

        let newer = &self.snapshots[newer_idx];
        let older = &self.snapshots[older_idx];

        let newer_state = newer.players.iter().find(|p| p.id == player_id);
        let older_state = older.players.iter().find(|p| p.id == player_id);

        match (older_state, newer_state) {
            (None, None) => None,
            (Some(only), None) | (None, Some(only)) => {
                Some(InterpolatedPlayer::from_snapshot(only))
            }
            (Some(from), Some(to)) => {
                let span = newer.server_time - older.server_time;
                if span <= 0.0 {
                    return Some(InterpolatedPlayer::from_snapshot(to));
                }
                let t = (((render_time - older.server_time) / span) as f32).clamp(0.0, 1.0);
                Some(InterpolatedPlayer {
                    position: Vec3::new(
                        lerp(from.position[0], to.position[0], t),
                        lerp(from.position[1], to.position[1], t),
                        lerp(from.position[2], to.position[2], t),
                    ),
                    yaw: lerp_angle(from.yaw, to.yaw, t),
                    pitch: lerp_angle(from.pitch, to.pitch, t),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena::{GameMode, Phase, RoundSnapshot, Side, Team, WeaponKind, WeaponSlot};
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn player(id: u32, position: [f32; 3], yaw: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            id,
            position,
            velocity: [0.0; 3],
            yaw,
            pitch: 0.0,
            health: 100,
            alive: true,
            crouching: false,
            team: Team::A,
            slot: WeaponSlot::Primary,
            primary: WeaponKind::Rifle,
            kills: 0,
            deaths: 0,
            last_seq: 0,
            primary_ammo: 30,
            pistol_ammo: 12,
            grenades: 1,
        }
    }

    fn snapshot(server_time: f64, players: Vec<PlayerSnapshot>) -> Snapshot {
        Snapshot {
            server_time,
            players,
            grenades: Vec::new(),
            events: Vec::new(),
            round: RoundSnapshot {
                round: 1,
                phase: Phase::Live,
                time_left: 60.0,
                scores: [0, 0],
                side_of_a: Side::T,
                mode: GameMode::Team,
                team_size: 1,
                needed_players: 2,
                present_players: 2,
                buy_open: false,
                post_winner: None,
            },
        }
    }

    #[test]
    fn clock_adopts_first_sample_then_smooths() {
        let mut clock = ServerClock::new();
        clock.observe(100.0, 0.0);
        assert_eq!(clock.offset(), Some(100.0));

        clock.observe(110.0, 0.0);
        let offset = clock.offset().unwrap();
        assert!((offset - 101.0).abs() < 1e-9);

        let rt = clock.render_time(1.0).unwrap();
        assert!((rt - (1.0 + offset - INTERPOLATION_DELAY)).abs() < 1e-9);
    }

    #[test]
    fn midpoint_sample_blends_position_and_yaw() {
        let mut history = SnapshotHistory::new();
        history.push(snapshot(10.0, vec![player(1, [0.0, 0.0, 0.0], 0.0)]));
        history.push(snapshot(10.2, vec![player(1, [2.0, 0.0, 0.0], FRAC_PI_2)]));

        let sampled = history.sample_player(1, 10.1).unwrap();
        assert!((sampled.position - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-4);
        assert!((sampled.yaw - FRAC_PI_4).abs() < 1e-4);
    }

    #[test]
    fn sampling_before_earliest_clamps_to_earliest() {
        let mut history = SnapshotHistory::new();
        history.push(snapshot(10.0, vec![player(1, [1.0, 0.0, 0.0], 0.5)]));
        history.push(snapshot(10.2, vec![player(1, [3.0, 0.0, 0.0], 1.0)]));

        let sampled = history.sample_player(1, 9.0).unwrap();
        assert!((sampled.position.x - 1.0).abs() < 1e-6);
        assert!((sampled.yaw - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sampling_after_latest_clamps_to_latest() {
        let mut history = SnapshotHistory::new();
        history.push(snapshot(10.0, vec![player(1, [1.0, 0.0, 0.0], 0.5)]));
        history.push(snapshot(10.2, vec![player(1, [3.0, 0.0, 0.0], 1.0)]));

        let sampled = history.sample_player(1, 99.0).unwrap();
        assert!((sampled.position.x - 3.0).abs() < 1e-6);
        assert!((sampled.yaw - 1.0).abs() < 1e-6);
    }

    #[test]
    fn exact_timestamp_returns_that_snapshot() {
        let mut history = SnapshotHistory::new();
        history.push(snapshot(10.0, vec![player(1, [1.0, 0.0, 0.0], 0.0)]));
        history.push(snapshot(10.2, vec![player(1, [3.0, 0.0, 0.0], 1.0)]));

        let sampled = history.sample_player(1, 10.2).unwrap();
        assert!((sampled.position.x - 3.0).abs() < 1e-6);
    }

    #[test]
    fn player_on_one_side_only_is_returned_unmodified() {
        let mut history = SnapshotHistory::new();
        history.push(snapshot(10.0, vec![]));
        history.push(snapshot(10.2, vec![player(7, [5.0, 0.0, 0.0], 2.0)]));

        let sampled = history.sample_player(7, 10.1).unwrap();
        assert!((sampled.position.x - 5.0).abs() < 1e-6);
        assert!((sampled.yaw - 2.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_player_yields_none() {
        let mut history = SnapshotHistory::new();
        history.push(snapshot(10.0, vec![player(1, [0.0; 3], 0.0)]));
        assert!(history.sample_player(42, 10.0).is_none());
    }

    #[test]
    fn buffer_is_bounded_and_rejects_stale_arrivals() {
        let mut history = SnapshotHistory::new();
        for i in 0..50 {
            history.push(snapshot(i as f64, vec![]));
        }
        assert_eq!(history.len(), MAX_BUFFERED_SNAPSHOTS);

        // Late out-of-order packet.
        history.push(snapshot(1.0, vec![]));
        assert_eq!(history.len(), MAX_BUFFERED_SNAPSHOTS);
        assert!((history.latest().unwrap().server_time - 49.0).abs() < 1e-9);
    }

    #[test]
    fn yaw_interpolation_crosses_the_wrap() {
        let mut history = SnapshotHistory::new();
        history.push(snapshot(0.0, vec![player(1, [0.0; 3], 3.1)]));
        history.push(snapshot(0.2, vec![player(1, [0.0; 3], -3.1)]));

        let sampled = history.sample_player(1, 0.1).unwrap();
        // Shortest arc passes through pi, not zero.
        assert!(sampled.yaw.abs() > 3.0);
    }
}
