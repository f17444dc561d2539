//! Single authoritative aggregate: players, grenades, round flow, geometry
//! and the RNG all live here so a tick is one synchronous pass with no
//! cross-system locking.

use std::collections::{HashMap, VecDeque};

use glam::Vec3;
use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::combat::raycast::{direction_from_yaw_pitch, ray_box_intersection};
use crate::combat::{GrenadeConfig, WeaponConfig, WeaponKind};
use crate::event::{GameEvent, KillInstrument};
use crate::map::{Aabb, MapData};
use crate::movement::{self, MoveIntent, MovementConfig};
use crate::net::protocol::{GrenadeSnapshot, InputCommand, RoundSnapshot, Snapshot};
use crate::player::{Player, ReloadState};
use crate::round::{
    GameMode, MatchConfig, MatchState, Phase, RoundOutcome, RoundTransition, Side, Team, TeamTally,
};

const DT_MIN: f32 = 0.001;
const DT_MAX: f32 = 0.05;
const PITCH_LIMIT: f32 = 1.5;
const MAX_QUEUED_INPUTS: usize = 64;

/// Damage-model knobs, kept out of the weapon table so they can be tuned in
/// one place.
#[derive(Debug, Clone)]
pub struct CombatConfig {
    pub headshot_mult: f32,
    pub lowshot_mult: f32,
    /// Fraction of standing height above which a hit counts as a headshot.
    pub headshot_frac: f32,
    /// Fraction of standing height below which a hit is a leg shot.
    pub lowshot_frac: f32,
    /// Margin by which a victim must be nearer than world geometry.
    pub hit_epsilon: f32,
    /// Ray origin offset along the view direction, so shots clear the
    /// shooter's own bounding box.
    pub muzzle_offset: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            headshot_mult: 3.0,
            lowshot_mult: 0.75,
            headshot_frac: 0.75,
            lowshot_frac: 0.35,
            hit_epsilon: 0.01,
            muzzle_offset: 0.3,
        }
    }
}

#[derive(Debug)]
struct Grenade {
    id: u32,
    owner: u32,
    team: Team,
    position: Vec3,
    velocity: Vec3,
    explode_at: f64,
}

fn grenade_collides(pos: Vec3, radius: f32, colliders: &[Aabb]) -> bool {
    colliders.iter().any(|b| {
        pos.x - radius <= b.max.x
            && pos.x + radius >= b.min.x
            && pos.y - radius <= b.max.y
            && pos.y + radius >= b.min.y
            && pos.z - radius <= b.max.z
            && pos.z + radius >= b.min.z
    })
}

fn player_aabb(p: &Player, config: &MovementConfig) -> Aabb {
    let pos = p.kinematics.position;
    let r = config.player_radius;
    Aabb::new(
        Vec3::new(pos.x - r, pos.y, pos.z - r),
        Vec3::new(pos.x + r, pos.y + config.player_height, pos.z + r),
    )
}

pub struct World {
    map: MapData,
    colliders: Vec<Aabb>,
    players: HashMap<u32, Player>,
    input_queues: HashMap<u32, VecDeque<InputCommand>>,
    grenades: Vec<Grenade>,
    match_state: MatchState,
    game_time: f64,
    next_grenade_id: u32,
    events: Vec<GameEvent>,
    rng: SmallRng,
    movement: MovementConfig,
    combat: CombatConfig,
    grenade_cfg: GrenadeConfig,
}

impl World {
    pub fn new(map: MapData, match_config: MatchConfig) -> Self {
        Self::with_seed(map, match_config, rand::random())
    }

    pub fn with_seed(map: MapData, match_config: MatchConfig, seed: u64) -> Self {
        let colliders = map.collider_boxes();
        Self {
            map,
            colliders,
            players: HashMap::new(),
            input_queues: HashMap::new(),
            grenades: Vec::new(),
            match_state: MatchState::new(match_config),
            game_time: 0.0,
            next_grenade_id: 1,
            events: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            movement: MovementConfig::default(),
            combat: CombatConfig::default(),
            grenade_cfg: GrenadeConfig::default(),
        }
    }

    pub fn map(&self) -> &MapData {
        &self.map
    }

    pub fn match_state(&self) -> &MatchState {
        &self.match_state
    }

    pub fn movement_config(&self) -> &MovementConfig {
        &self.movement
    }

    pub fn game_time(&self) -> f64 {
        self.game_time
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Mode and team size come from the first join and stay fixed while the
    /// match is running.
    pub fn configure_match(&mut self, mode: GameMode, team_size: usize) -> bool {
        if !self.players.is_empty() {
            return false;
        }
        self.match_state.configure(mode, team_size)
    }

    /// Team with room, balancing by head count. `preferred_side` only breaks
    /// ties. `None` when the match is full.
    fn assign_team(&self, preferred_side: Option<Side>) -> Option<Team> {
        let mut counts = [0usize; 2];
        for p in self.players.values() {
            counts[p.team.index()] += 1;
        }

        if self.match_state.mode() == GameMode::Team {
            let cap = self.match_state.team_size();
            if counts[0] >= cap && counts[1] >= cap {
                return None;
            }
            if counts[0] >= cap {
                return Some(Team::B);
            }
            if counts[1] >= cap {
                return Some(Team::A);
            }
        }

        if counts[0] < counts[1] {
            Some(Team::A)
        } else if counts[1] < counts[0] {
            Some(Team::B)
        } else {
            let preferred = preferred_side.map(|side| {
                if self.match_state.side_of(Team::A) == side {
                    Team::A
                } else {
                    Team::B
                }
            });
            Some(preferred.unwrap_or(Team::A))
        }
    }

    /// Adds a player, returning the assigned team, or `None` when the match
    /// is full. Joiners arriving mid-round in team mode wait dead for the
    /// next round so they cannot tip a live fight.
    pub fn add_player(
        &mut self,
        id: u32,
        name: String,
        primary: Option<WeaponKind>,
        avatar: Option<Vec<u8>>,
        preferred_side: Option<Side>,
    ) -> Option<Team> {
        let team = self.assign_team(preferred_side)?;
        let mut player = Player::new(id, name, team, primary);
        player.avatar = avatar;

        let spawn = self.pick_spawn(team);
        player.respawn(spawn);

        let mid_round = self.match_state.mode() == GameMode::Team
            && matches!(self.match_state.phase(), Phase::Live | Phase::Post);
        if mid_round {
            player.alive = false;
            player.health = 0;
        }

        debug!("player {} ({}) joined team {:?}", id, player.name, team);
        self.input_queues.insert(id, VecDeque::new());
        self.players.insert(id, player);
        Some(team)
    }

    pub fn remove_player(&mut self, id: u32) {
        self.players.remove(&id);
        self.input_queues.remove(&id);
    }

    pub fn enqueue_input(&mut self, id: u32, cmd: InputCommand) {
        if let Some(queue) = self.input_queues.get_mut(&id) {
            if queue.len() >= MAX_QUEUED_INPUTS {
                queue.pop_front();
            }
            queue.push_back(cmd);
        }
    }

    /// Buy requests outside the window are silently ignored.
    pub fn handle_buy(&mut self, id: u32, primary: WeaponKind) {
        if !self.match_state.buy_open() {
            return;
        }
        if let Some(p) = self.players.get_mut(&id) {
            p.set_primary(primary);
        }
    }

    /// One fixed simulation step: round flow, reload completion, grenade
    /// physics, queued inputs, then FFA respawns.
    pub fn tick(&mut self, dt: f32) {
        self.game_time += dt as f64;

        let tally = self.tally();
        for transition in self.match_state.advance(dt, &tally) {
            self.apply_transition(transition);
        }

        self.update_reloads();
        self.update_grenades(dt);
        self.process_inputs();
        self.update_respawns();
    }

    fn tally(&self) -> TeamTally {
        let mut tally = TeamTally::default();
        for p in self.players.values() {
            let idx = p.team.index();
            tally.present[idx] += 1;
            if p.alive {
                tally.alive[idx] += 1;
            }
        }
        tally
    }

    fn apply_transition(&mut self, transition: RoundTransition) {
        match transition {
            RoundTransition::RoundStarted { round } => {
                self.grenades.clear();
                self.respawn_all();
                self.events.push(GameEvent::RoundStarted { round });
            }
            RoundTransition::WentLive => {
                debug!("round {} live", self.match_state.round());
            }
            RoundTransition::BuyWindowClosed => {
                let undecided: Vec<u32> = self
                    .players
                    .values()
                    .filter(|p| !p.chose_primary)
                    .map(|p| p.id)
                    .collect();
                for id in undecided {
                    if let Some(p) = self.players.get_mut(&id) {
                        p.set_primary(WeaponKind::Rifle);
                    }
                }
            }
            RoundTransition::RoundWon { round, winner } => {
                self.events.push(GameEvent::RoundEnded { round, winner });
            }
            RoundTransition::RoundDrawn { round } => {
                self.events.push(GameEvent::RoundDrawn { round });
            }
            RoundTransition::MatchEnded => {
                let winners = self.kill_leaders();
                self.events.push(GameEvent::MatchOver { winners });
            }
            RoundTransition::MatchReset => {
                self.grenades.clear();
                for p in self.players.values_mut() {
                    p.kills = 0;
                    p.deaths = 0;
                }
                self.respawn_all();
            }
        }
    }

    fn respawn_all(&mut self) {
        let roster: Vec<(u32, Team)> = self.players.values().map(|p| (p.id, p.team)).collect();
        for (id, team) in roster {
            let spawn = self.pick_spawn(team);
            if let Some(p) = self.players.get_mut(&id) {
                p.respawn(spawn);
            }
        }
    }

    fn pick_spawn(&mut self, team: Team) -> Vec3 {
        let pool: Vec<[f32; 3]> = match self.match_state.mode() {
            GameMode::Ffa => self
                .map
                .spawns
                .t
                .iter()
                .chain(self.map.spawns.ct.iter())
                .copied()
                .collect(),
            GameMode::Team => match self.match_state.side_of(team) {
                Side::T => self.map.spawns.t.clone(),
                Side::Ct => self.map.spawns.ct.clone(),
            },
        };
        if pool.is_empty() {
            return Vec3::new(0.0, 1.0, 0.0);
        }
        let idx = self.rng.gen_range(0..pool.len());
        Vec3::from(pool[idx])
    }

    fn kill_leaders(&self) -> Vec<u32> {
        let top = self.players.values().map(|p| p.kills).max().unwrap_or(0);
        let mut leaders: Vec<u32> = self
            .players
            .values()
            .filter(|p| p.kills == top)
            .map(|p| p.id)
            .collect();
        leaders.sort_unstable();
        leaders
    }

    fn update_reloads(&mut self) {
        let now = self.game_time;
        for p in self.players.values_mut() {
            let Some(reload) = p.reload else { continue };
            if now < reload.finish_at {
                continue;
            }
            if let Some(kind) = p.weapon_in(reload.slot) {
                *p.ammo_in_mut(reload.slot) = kind.config().magazine;
            }
            p.reload = None;
        }
    }

    fn update_grenades(&mut self, dt: f32) {
        let now = self.game_time;

        let mut due = Vec::new();
        let mut i = 0;
        while i < self.grenades.len() {
            if now >= self.grenades[i].explode_at {
                due.push(self.grenades.swap_remove(i));
            } else {
                i += 1;
            }
        }
        for grenade in due {
            self.explode_grenade(grenade);
        }

        let gravity = self.movement.gravity;
        let radius = self.grenade_cfg.body_radius;
        let colliders = &self.colliders;
        for g in &mut self.grenades {
            g.velocity.y += gravity * dt;
            for axis in 0..3 {
                let delta = g.velocity[axis] * dt;
                if delta == 0.0 {
                    continue;
                }
                let mut next = g.position;
                next[axis] += delta;
                if grenade_collides(next, radius, colliders) {
                    g.velocity[axis] = 0.0;
                } else {
                    g.position = next;
                }
            }
        }
    }

    fn explode_grenade(&mut self, grenade: Grenade) {
        let mode = self.match_state.mode();
        let radius = self.grenade_cfg.blast_radius;
        let max_damage = self.grenade_cfg.max_damage;
        let half_height = self.movement.player_height * 0.5;

        let mut victims = Vec::new();
        for p in self.players.values() {
            if !p.alive || p.id == grenade.owner {
                continue;
            }
            if mode == GameMode::Team && p.team == grenade.team {
                continue;
            }
            let chest = p.kinematics.position + Vec3::Y * half_height;
            let dist = chest.distance(grenade.position);
            if dist > radius {
                continue;
            }
            let damage = (max_damage * (1.0 - dist / radius)).floor() as i32;
            if damage > 0 {
                victims.push((p.id, damage as u32));
            }
        }

        self.events.push(GameEvent::GrenadeExploded {
            owner: grenade.owner,
            position: grenade.position.to_array(),
        });
        for (victim, damage) in victims {
            self.apply_damage(grenade.owner, victim, damage, false, KillInstrument::Grenade);
        }
    }

    fn apply_damage(
        &mut self,
        attacker: u32,
        victim_id: u32,
        damage: u32,
        headshot: bool,
        instrument: KillInstrument,
    ) {
        let mode = self.match_state.mode();
        let respawn_delay = self.match_state.config().ffa_respawn_delay;
        let now = self.game_time;

        let killed = {
            let Some(victim) = self.players.get_mut(&victim_id) else {
                return;
            };
            if !victim.alive {
                return;
            }
            victim.health = (victim.health - damage as i32).max(0);
            if victim.health == 0 {
                victim.alive = false;
                victim.deaths += 1;
                if mode == GameMode::Ffa {
                    victim.respawn_at = Some(now + respawn_delay as f64);
                }
                true
            } else {
                false
            }
        };

        self.events.push(GameEvent::Hit {
            attacker,
            victim: victim_id,
            damage,
            headshot,
        });

        if killed {
            if attacker != victim_id {
                if let Some(p) = self.players.get_mut(&attacker) {
                    p.kills += 1;
                }
            }
            self.events.push(GameEvent::Kill {
                attacker,
                victim: victim_id,
                instrument,
            });
        }
    }

    fn process_inputs(&mut self) {
        let mut ids: Vec<u32> = self.input_queues.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            while let Some(cmd) = self.input_queues.get_mut(&id).and_then(VecDeque::pop_front) {
                self.apply_command(id, &cmd);
            }
        }
    }

    fn apply_command(&mut self, id: u32, cmd: &InputCommand) {
        let live = self.match_state.phase() == Phase::Live;

        let Some((intent, dt, yaw)) = ({
            let Some(p) = self.players.get_mut(&id) else {
                return;
            };
            // View angles, selection and the applied-sequence marker update
            // even for dead players and outside live play, so spectating and
            // reconciliation stay coherent.
            if cmd.sequence > p.last_seq {
                p.last_seq = cmd.sequence;
            }
            p.yaw = cmd.yaw;
            p.pitch = cmd.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
            p.slot = cmd.slot;

            if !p.alive || !live {
                None
            } else {
                p.crouching = cmd.has_flag(InputCommand::FLAG_CROUCH);
                let intent = MoveIntent {
                    forward: cmd.forward.clamp(-1.0, 1.0),
                    strafe: cmd.strafe.clamp(-1.0, 1.0),
                    jump: cmd.has_flag(InputCommand::FLAG_JUMP),
                    crouch: cmd.has_flag(InputCommand::FLAG_CROUCH),
                };
                Some((intent, cmd.dt.clamp(DT_MIN, DT_MAX), p.yaw))
            }
        }) else {
            return;
        };

        if cmd.has_flag(InputCommand::FLAG_RELOAD) {
            self.try_start_reload(id);
        }
        if cmd.has_flag(InputCommand::FLAG_THROW) {
            self.try_throw_grenade(id);
        }

        {
            let colliders = &self.colliders;
            let config = &self.movement;
            if let Some(p) = self.players.get_mut(&id) {
                p.kinematics = movement::step(p.kinematics, &intent, yaw, dt, colliders, config);
            }
        }

        if cmd.has_flag(InputCommand::FLAG_FIRE) {
            self.try_fire(id);
        }
    }

    fn try_start_reload(&mut self, id: u32) {
        let now = self.game_time;
        let Some(p) = self.players.get_mut(&id) else {
            return;
        };
        if p.reload.is_some() {
            return;
        }
        let Some((_, config)) = p.current_weapon() else {
            return;
        };
        if p.ammo_in(p.slot) >= config.magazine {
            return;
        }
        p.reload = Some(ReloadState {
            slot: p.slot,
            finish_at: now + config.reload_time as f64,
        });
    }

    fn try_throw_grenade(&mut self, id: u32) {
        let now = self.game_time;
        let (origin, dir, team) = {
            let movement = &self.movement;
            let Some(p) = self.players.get_mut(&id) else {
                return;
            };
            if p.grenades == 0 {
                return;
            }
            p.grenades -= 1;
            let eye = p.kinematics.position + Vec3::Y * movement.eye_height_for(p.crouching);
            (eye, direction_from_yaw_pitch(p.yaw, p.pitch), p.team)
        };

        let id_g = self.next_grenade_id;
        self.next_grenade_id += 1;
        self.grenades.push(Grenade {
            id: id_g,
            owner: id,
            team,
            position: origin,
            velocity: dir * self.grenade_cfg.launch_speed + Vec3::Y * self.grenade_cfg.up_boost,
            explode_at: now + self.grenade_cfg.fuse_time as f64,
        });
    }

    fn try_fire(&mut self, id: u32) {
        let now = self.game_time;
        let (kind, config, eye, yaw, pitch, team) = {
            let movement = &self.movement;
            let Some(p) = self.players.get_mut(&id) else {
                return;
            };
            let Some((kind, config)) = p.current_weapon() else {
                return;
            };
            if now < p.next_fire_time || p.reload.is_some() {
                return;
            }
            let ammo = p.ammo_in_mut(p.slot);
            if *ammo == 0 {
                return;
            }
            *ammo -= 1;
            p.next_fire_time = now + (1.0 / config.fire_rate) as f64;
            let eye = p.kinematics.position + Vec3::Y * movement.eye_height_for(p.crouching);
            (kind, config, eye, p.yaw, p.pitch, p.team)
        };

        let mode = self.match_state.mode();
        for _ in 0..config.pellets {
            let dy = self.rng.gen_range(-config.spread..=config.spread);
            let dp = self.rng.gen_range(-config.spread..=config.spread);
            let dir = direction_from_yaw_pitch(yaw + dy, pitch + dp);
            self.fire_ray(id, team, mode, kind, config, eye, dir);
        }
    }

    fn fire_ray(
        &mut self,
        shooter: u32,
        team: Team,
        mode: GameMode,
        kind: WeaponKind,
        config: &WeaponConfig,
        eye: Vec3,
        dir: Vec3,
    ) {
        let origin = eye + dir * self.combat.muzzle_offset;

        // Nearest world geometry caps how far the ray can reach.
        let mut map_dist = config.range;
        for b in &self.colliders {
            if let Some(d) = ray_box_intersection(origin, dir, b) {
                map_dist = map_dist.min(d);
            }
        }

        let mut best: Option<(u32, f32, f32)> = None;
        for p in self.players.values() {
            if p.id == shooter || !p.alive {
                continue;
            }
            if mode == GameMode::Team && p.team == team {
                continue;
            }
            let bbox = player_aabb(p, &self.movement);
            if let Some(d) = ray_box_intersection(origin, dir, &bbox) {
                if best.is_none_or(|(_, bd, _)| d < bd) {
                    best = Some((p.id, d, p.kinematics.position.y));
                }
            }
        }

        let mut traveled = map_dist;
        let mut landed = None;
        if let Some((victim, dist, feet_y)) = best {
            if dist - self.combat.hit_epsilon < map_dist {
                traveled = dist;
                let rel = origin.y + dir.y * dist - feet_y;
                let height = self.movement.player_height;
                let mult = if rel > height * self.combat.headshot_frac {
                    self.combat.headshot_mult
                } else if rel < height * self.combat.lowshot_frac {
                    self.combat.lowshot_mult
                } else {
                    1.0
                };
                let damage = (config.damage * mult).floor() as i32;
                if damage > 0 {
                    landed = Some((victim, damage as u32, mult > 1.0));
                }
            }
        }

        // Tracer event fires for every ray, hit or miss.
        self.events.push(GameEvent::Shot {
            shooter,
            origin: origin.to_array(),
            dir: dir.to_array(),
            distance: traveled,
        });

        if let Some((victim, damage, headshot)) = landed {
            self.apply_damage(shooter, victim, damage, headshot, KillInstrument::Weapon(kind));
        }
    }

    fn update_respawns(&mut self) {
        if self.match_state.mode() != GameMode::Ffa || self.match_state.phase() != Phase::Live {
            return;
        }
        let now = self.game_time;
        let due: Vec<(u32, Team)> = self
            .players
            .values()
            .filter(|p| !p.alive && p.respawn_at.is_some_and(|t| now >= t))
            .map(|p| (p.id, p.team))
            .collect();
        for (id, team) in due {
            let spawn = self.pick_spawn(team);
            if let Some(p) = self.players.get_mut(&id) {
                p.respawn(spawn);
            }
        }
    }

    /// Drains pending events into a full-state snapshot.
    pub fn take_snapshot(&mut self) -> Snapshot {
        let mut players: Vec<_> = self.players.values().map(Player::snapshot).collect();
        players.sort_unstable_by_key(|p| p.id);

        let grenades = self
            .grenades
            .iter()
            .map(|g| GrenadeSnapshot {
                id: g.id,
                position: g.position.to_array(),
            })
            .collect();

        let ms = &self.match_state;
        let round = RoundSnapshot {
            round: ms.round(),
            phase: ms.phase(),
            time_left: ms.phase_left().max(0.0),
            scores: ms.scores(),
            side_of_a: ms.side_of(Team::A),
            mode: ms.mode(),
            team_size: ms.team_size() as u8,
            needed_players: ms.needed_players() as u8,
            present_players: self.players.len() as u8,
            buy_open: ms.buy_open(),
            post_winner: match ms.post_outcome() {
                Some(RoundOutcome::Won(team)) => Some(team),
                _ => None,
            },
        };

        Snapshot {
            server_time: self.game_time,
            players,
            grenades,
            events: std::mem::take(&mut self.events),
            round,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::practice_arena;

    const DT: f32 = 1.0 / 30.0;

    fn ffa_world() -> World {
        let mut world = World::with_seed(practice_arena(), MatchConfig::default(), 7);
        world.configure_match(GameMode::Ffa, 1);
        world.add_player(1, "one".into(), None, None, None);
        world.add_player(2, "two".into(), None, None, None);
        world.tick(DT); // quorum reached, FFA goes straight to live
        assert_eq!(world.match_state().phase(), Phase::Live);
        world
    }

    fn input(seq: u32, flags: u16) -> InputCommand {
        let mut cmd = InputCommand::new(seq, DT);
        cmd.flags = flags;
        cmd
    }

    #[test]
    fn rifle_sustained_fire_is_capped_by_magazine() {
        let mut world = ffa_world();
        let mut shots = 0;
        // Hold the trigger for 3 seconds: rate allows 30, mag holds 30.
        for seq in 1..=90u32 {
            world.enqueue_input(1, input(seq, InputCommand::FLAG_FIRE));
            world.tick(DT);
            let snap = world.take_snapshot();
            shots += snap
                .events
                .iter()
                .filter(|e| matches!(e, GameEvent::Shot { shooter: 1, .. }))
                .count();
        }
        assert!(shots <= 30, "fired {shots} rays from a 30-round magazine");
        assert!(shots >= 28, "cooldown should allow nearly a full magazine");
        assert_eq!(world.player(1).unwrap().primary_ammo, 0);
    }

    #[test]
    fn grenade_detonates_on_first_tick_past_fuse() {
        let mut world = ffa_world();
        let thrown_at = world.game_time();
        world.enqueue_input(1, input(1, InputCommand::FLAG_THROW));
        world.tick(DT);

        let mut exploded_at = None;
        for _ in 0..200 {
            world.tick(DT);
            let snap = world.take_snapshot();
            if snap
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::GrenadeExploded { owner: 1, .. }))
            {
                exploded_at = Some(world.game_time());
                break;
            }
        }
        let fuse = GrenadeConfig::default().fuse_time as f64;
        let at = exploded_at.expect("grenade never detonated");
        let elapsed = at - thrown_at;
        assert!(elapsed >= fuse, "detonated early: {elapsed}");
        assert!(elapsed <= fuse + 3.0 * DT as f64, "detonated late: {elapsed}");
    }

    #[test]
    fn health_clamps_at_zero_and_kill_fires_once() {
        let mut world = ffa_world();
        world.apply_damage(1, 2, 80, false, KillInstrument::Weapon(WeaponKind::Sniper));
        assert_eq!(world.player(2).unwrap().health, 20);

        world.apply_damage(1, 2, 80, false, KillInstrument::Weapon(WeaponKind::Sniper));
        let p2 = world.player(2).unwrap();
        assert_eq!(p2.health, 0);
        assert!(!p2.alive);
        assert_eq!(p2.deaths, 1);
        assert_eq!(world.player(1).unwrap().kills, 1);

        // Further damage on a corpse is a no-op.
        world.apply_damage(1, 2, 80, false, KillInstrument::Grenade);
        assert_eq!(world.player(2).unwrap().deaths, 1);
        assert_eq!(world.player(1).unwrap().kills, 1);

        let kills = world
            .take_snapshot()
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::Kill { victim: 2, .. }))
            .count();
        assert_eq!(kills, 1);
    }

    #[test]
    fn reload_restores_exactly_one_magazine() {
        let mut world = ffa_world();
        world.players.get_mut(&1).unwrap().primary_ammo = 5;

        world.enqueue_input(1, input(1, InputCommand::FLAG_RELOAD));
        world.tick(DT);
        let p = world.player(1).unwrap();
        assert!(p.reload.is_some());
        assert_eq!(p.primary_ammo, 5, "ammo untouched until the reload lands");

        let reload_ticks = (WeaponKind::Rifle.config().reload_time / DT).ceil() as usize + 2;
        for _ in 0..reload_ticks {
            world.tick(DT);
        }
        let p = world.player(1).unwrap();
        assert!(p.reload.is_none());
        assert_eq!(p.primary_ammo, WeaponKind::Rifle.config().magazine);
    }

    #[test]
    fn no_reload_starts_on_a_full_magazine() {
        let mut world = ffa_world();
        world.enqueue_input(1, input(1, InputCommand::FLAG_RELOAD));
        world.tick(DT);
        assert!(world.player(1).unwrap().reload.is_none());
    }

    #[test]
    fn ffa_victim_respawns_after_delay() {
        let mut world = ffa_world();
        world.apply_damage(1, 2, 200, false, KillInstrument::Grenade);
        assert!(!world.player(2).unwrap().alive);

        let delay = world.match_state().config().ffa_respawn_delay;
        let ticks = (delay / DT).ceil() as usize + 2;
        for _ in 0..ticks {
            world.tick(DT);
        }
        assert!(world.player(2).unwrap().alive);
        assert_eq!(world.player(2).unwrap().health, crate::player::MAX_HEALTH);
    }

    #[test]
    fn join_denied_when_team_match_is_full() {
        let mut world = World::with_seed(practice_arena(), MatchConfig::default(), 3);
        world.configure_match(GameMode::Team, 1);
        assert!(world.add_player(1, "a".into(), None, None, None).is_some());
        assert!(world.add_player(2, "b".into(), None, None, None).is_some());
        assert!(world.add_player(3, "c".into(), None, None, None).is_none());
    }

    #[test]
    fn team_assignment_balances_and_honors_preference_on_ties() {
        let mut world = World::with_seed(practice_arena(), MatchConfig::default(), 3);
        world.configure_match(GameMode::Team, 2);
        // Empty match, preference decides: round 0 keeps A on T.
        let first = world
            .add_player(1, "a".into(), None, None, Some(Side::Ct))
            .unwrap();
        assert_eq!(first, Team::B);
        // Now B outnumbers A, so balance overrides preference.
        let second = world
            .add_player(2, "b".into(), None, None, Some(Side::Ct))
            .unwrap();
        assert_eq!(second, Team::A);
    }

    #[test]
    fn buy_after_window_close_is_ignored_and_default_is_rifle() {
        let mut world = World::with_seed(practice_arena(), MatchConfig::default(), 9);
        world.configure_match(GameMode::Team, 1);
        world.add_player(1, "a".into(), None, None, None);
        world.add_player(2, "b".into(), Some(WeaponKind::Sniper), None, None);
        world.tick(DT);
        assert!(world.match_state().buy_open());

        world.handle_buy(1, WeaponKind::Shotgun);
        assert_eq!(world.player(1).unwrap().primary, WeaponKind::Shotgun);

        let window = world.match_state().config().buy_window;
        let ticks = (window / DT).ceil() as usize + 2;
        for _ in 0..ticks {
            world.tick(DT);
        }
        assert!(!world.match_state().buy_open());

        world.handle_buy(1, WeaponKind::Sniper);
        assert_eq!(world.player(1).unwrap().primary, WeaponKind::Shotgun);
        assert_eq!(world.player(2).unwrap().primary, WeaponKind::Sniper);
    }

    #[test]
    fn input_updates_view_angles_even_while_dead() {
        let mut world = ffa_world();
        world.apply_damage(1, 2, 200, false, KillInstrument::Grenade);

        let mut cmd = input(9, 0);
        cmd.yaw = 1.0;
        cmd.pitch = 3.0; // out of range, must clamp
        world.enqueue_input(2, cmd);
        world.tick(DT);

        let p = world.player(2).unwrap();
        assert_eq!(p.last_seq, 9);
        assert!((p.yaw - 1.0).abs() < 1e-6);
        assert!((p.pitch - 1.5).abs() < 1e-6);
    }
}
