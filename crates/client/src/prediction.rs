//! Client-side prediction. Inputs are applied locally through the shared
//! integrator the moment they are generated, then replayed on top of each
//! authoritative snapshot so the local player never waits a round trip.

use std::collections::VecDeque;

use glam::Vec3;

use arena::movement::{self, KinematicState, MoveIntent, MovementConfig};
use arena::{Aabb, InputCommand, PlayerSnapshot};

/// Cap against a stalled server; beyond this the oldest unacked inputs are
/// sacrificed rather than growing without bound.
const MAX_PENDING_INPUTS: usize = 128;

const DT_MIN: f32 = 0.001;
const DT_MAX: f32 = 0.05;

pub struct ClientPrediction {
    pending: VecDeque<InputCommand>,
    state: KinematicState,
    colliders: Vec<Aabb>,
    config: MovementConfig,
    last_acked: u32,
}

impl ClientPrediction {
    pub fn new(colliders: Vec<Aabb>, spawn: Vec3) -> Self {
        Self {
            pending: VecDeque::with_capacity(MAX_PENDING_INPUTS),
            state: KinematicState::at(spawn),
            colliders,
            config: MovementConfig::default(),
            last_acked: 0,
        }
    }

    pub fn state(&self) -> &KinematicState {
        &self.state
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Highest input sequence the server has confirmed applying.
    pub fn last_acked(&self) -> u32 {
        self.last_acked
    }

    /// Applies an input immediately and remembers it for replay.
    pub fn apply_local(&mut self, cmd: &InputCommand) {
        self.state = advance(self.state, cmd, &self.colliders, &self.config);
        self.pending.push_back(cmd.clone());
        while self.pending.len() > MAX_PENDING_INPUTS {
            self.pending.pop_front();
        }
    }

    /// Adopts the server's authoritative view of the local player, drops
    /// inputs the server has already applied and replays the rest.
    pub fn reconcile(&mut self, own: &PlayerSnapshot) {
        self.state.position = Vec3::from(own.position);
        self.state.velocity = Vec3::from(own.velocity);
        // on_ground is not on the wire; the shared probe recovers it.
        self.state.on_ground =
            movement::probe_ground(self.state.position, &self.colliders, &self.config);

        while self
            .pending
            .front()
            .is_some_and(|cmd| cmd.sequence <= own.last_seq)
        {
            self.pending.pop_front();
        }

        for cmd in &self.pending {
            self.state = advance(self.state, cmd, &self.colliders, &self.config);
        }
        self.last_acked = own.last_seq;
    }
}

/// One integrator step from a wire command, with the same clamps the server
/// applies so prediction and authority agree bit for bit.
fn advance(
    state: KinematicState,
    cmd: &InputCommand,
    colliders: &[Aabb],
    config: &MovementConfig,
) -> KinematicState {
    let intent = MoveIntent {
        forward: cmd.forward.clamp(-1.0, 1.0),
        strafe: cmd.strafe.clamp(-1.0, 1.0),
        jump: cmd.has_flag(InputCommand::FLAG_JUMP),
        crouch: cmd.has_flag(InputCommand::FLAG_CROUCH),
    };
    movement::step(
        state,
        &intent,
        cmd.yaw,
        cmd.dt.clamp(DT_MIN, DT_MAX),
        colliders,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena::{Team, WeaponKind, WeaponSlot};

    const DT: f32 = 1.0 / 30.0;

    fn floor() -> Vec<Aabb> {
        vec![Aabb::new(
            Vec3::new(-50.0, -1.0, -50.0),
            Vec3::new(50.0, 0.0, 50.0),
        )]
    }

    fn command(seq: u32, forward: f32, yaw: f32) -> InputCommand {
        let mut cmd = InputCommand::new(seq, DT);
        cmd.forward = forward;
        cmd.yaw = yaw;
        cmd
    }

    fn own_snapshot(state: &KinematicState, last_seq: u32) -> PlayerSnapshot {
        PlayerSnapshot {
            id: 1,
            position: state.position.to_array(),
            velocity: state.velocity.to_array(),
            yaw: 0.0,
            pitch: 0.0,
            health: 100,
            alive: true,
            crouching: false,
            team: Team::A,
            slot: WeaponSlot::Primary,
            primary: WeaponKind::Rifle,
            kills: 0,
            deaths: 0,
            last_seq,
            primary_ammo: 30,
            pistol_ammo: 12,
            grenades: 1,
        }
    }

    #[test]
    fn reconcile_replays_unacked_inputs_deterministically() {
        let colliders = floor();
        let config = MovementConfig::default();
        let spawn = Vec3::new(0.0, 0.0, 0.0);

        let commands: Vec<InputCommand> =
            (1..=10).map(|seq| command(seq, 1.0, 0.3)).collect();

        let mut prediction = ClientPrediction::new(colliders.clone(), spawn);
        for cmd in &commands {
            prediction.apply_local(cmd);
        }

        // Authoritative state after the first six inputs.
        let mut server = KinematicState::at(spawn);
        for cmd in &commands[..6] {
            server = advance(server, cmd, &colliders, &config);
        }
        prediction.reconcile(&own_snapshot(&server, 6));

        // Full resimulation of all ten inputs must land in the same place.
        let mut expected = KinematicState::at(spawn);
        for cmd in &commands {
            expected = advance(expected, cmd, &colliders, &config);
        }
        assert!((prediction.position() - expected.position).length() < 1e-5);
        assert_eq!(prediction.pending_count(), 4);
    }

    #[test]
    fn acked_inputs_are_dropped() {
        let mut prediction = ClientPrediction::new(floor(), Vec3::ZERO);
        for seq in 1..=5 {
            prediction.apply_local(&command(seq, 0.0, 0.0));
        }
        let snap = own_snapshot(prediction.state(), 5);
        prediction.reconcile(&snap);
        assert_eq!(prediction.pending_count(), 0);
    }

    #[test]
    fn pending_buffer_is_bounded() {
        let mut prediction = ClientPrediction::new(floor(), Vec3::ZERO);
        for seq in 1..=500 {
            prediction.apply_local(&command(seq, 0.0, 0.0));
        }
        assert_eq!(prediction.pending_count(), MAX_PENDING_INPUTS);
    }
}
