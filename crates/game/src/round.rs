//! Round and match flow. The state machine is deliberately ignorant of
//! players and geometry: each tick it receives a head count tally and
//! answers with the transitions the world has to act on.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
#[serde(rename_all = "lowercase")]
pub enum Team {
    A,
    B,
}

impl Team {
    pub fn index(self) -> usize {
        match self {
            Team::A => 0,
            Team::B => 1,
        }
    }
}

/// Spawn-side identity. Sides swap between teams at the match halfway point.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
#[serde(rename_all = "lowercase")]
pub enum Side {
    T,
    Ct,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Team,
    Ffa,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Freeze,
    Live,
    /// Pause after every finished round, won or drawn; the snapshot's
    /// `post_winner` tells the two apart.
    Post,
    MatchOver,
}

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub freeze_time: f32,
    pub round_time: f32,
    pub total_rounds: u32,
    pub buy_window: f32,
    pub post_time: f32,
    pub over_time: f32,
    pub ffa_round_time: f32,
    pub ffa_respawn_delay: f32,
    pub ffa_min_players: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            freeze_time: 10.0,
            round_time: 115.0,
            total_rounds: 8,
            buy_window: 15.0,
            post_time: 4.0,
            over_time: 5.0,
            ffa_round_time: 300.0,
            ffa_respawn_delay: 3.0,
            ffa_min_players: 2,
        }
    }
}

/// Head counts fed into `advance` each tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeamTally {
    pub present: [usize; 2],
    pub alive: [usize; 2],
}

impl TeamTally {
    pub fn total_present(&self) -> usize {
        self.present[0] + self.present[1]
    }
}

/// What the world has to act on after a tick of round time.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundTransition {
    /// A new round begins (freeze in team mode, straight to live in FFA);
    /// everyone respawns.
    RoundStarted { round: u32 },
    /// Freeze ended.
    WentLive,
    /// Buy window just closed; players without a chosen primary get the
    /// default.
    BuyWindowClosed,
    RoundWon { round: u32, winner: Team },
    RoundDrawn { round: u32 },
    /// All rounds played (or the FFA timer ran out).
    MatchEnded,
    /// Post-match linger expired or the server emptied; everything resets.
    MatchReset,
}

/// Why the current post-round pause is running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoundOutcome {
    Won(Team),
    Drawn,
}

#[derive(Debug)]
pub struct MatchState {
    config: MatchConfig,
    mode: GameMode,
    team_size: usize,
    phase: Phase,
    round: u32,
    phase_left: f32,
    round_age: f32,
    scores: [u32; 2],
    buy_open: bool,
    pending_outcome: Option<RoundOutcome>,
}

impl MatchState {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            mode: GameMode::Team,
            team_size: 3,
            phase: Phase::Waiting,
            round: 0,
            phase_left: 0.0,
            round_age: 0.0,
            scores: [0, 0],
            buy_open: false,
            pending_outcome: None,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn team_size(&self) -> usize {
        self.team_size
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn phase_left(&self) -> f32 {
        self.phase_left
    }

    pub fn score(&self, team: Team) -> u32 {
        self.scores[team.index()]
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    pub fn buy_open(&self) -> bool {
        self.buy_open
    }

    pub fn post_outcome(&self) -> Option<RoundOutcome> {
        self.pending_outcome
    }

    /// Mode and team size are negotiable only before anyone has joined a
    /// running match.
    pub fn configure(&mut self, mode: GameMode, team_size: usize) -> bool {
        if self.phase != Phase::Waiting {
            return false;
        }
        self.mode = mode;
        self.team_size = team_size.max(1);
        true
    }

    pub fn needed_players(&self) -> usize {
        match self.mode {
            GameMode::Team => self.team_size * 2,
            GameMode::Ffa => self.config.ffa_min_players,
        }
    }

    /// Which spawn side a team currently plays from.
    pub fn side_of(&self, team: Team) -> Side {
        let first_half = self.round <= self.config.total_rounds / 2;
        match (team, first_half) {
            (Team::A, true) | (Team::B, false) => Side::T,
            (Team::A, false) | (Team::B, true) => Side::Ct,
        }
    }

    pub fn advance(&mut self, dt: f32, tally: &TeamTally) -> Vec<RoundTransition> {
        let mut out = Vec::new();

        if self.phase != Phase::Waiting && tally.total_present() == 0 {
            self.reset();
            out.push(RoundTransition::MatchReset);
            return out;
        }

        match self.phase {
            Phase::Waiting => {
                if tally.total_present() >= self.needed_players() {
                    self.round = 1;
                    self.begin_round(&mut out);
                }
            }
            Phase::Freeze => {
                self.tick_buy_window(dt, &mut out);
                self.phase_left -= dt;
                if self.phase_left <= 0.0 {
                    self.phase = Phase::Live;
                    self.phase_left = self.config.round_time;
                    out.push(RoundTransition::WentLive);
                }
            }
            Phase::Live => {
                self.tick_buy_window(dt, &mut out);
                self.phase_left -= dt;

                if self.mode == GameMode::Ffa {
                    if self.phase_left <= 0.0 {
                        self.phase = Phase::MatchOver;
                        self.phase_left = self.config.over_time;
                        out.push(RoundTransition::MatchEnded);
                    }
                    return out;
                }

                // Elimination only counts once both teams are represented.
                let contested = tally.present[0] > 0 && tally.present[1] > 0;
                let outcome = if contested && tally.alive[0] == 0 && tally.alive[1] == 0 {
                    Some(RoundOutcome::Drawn)
                } else if contested && tally.alive[1] == 0 {
                    Some(RoundOutcome::Won(Team::A))
                } else if contested && tally.alive[0] == 0 {
                    Some(RoundOutcome::Won(Team::B))
                } else if self.phase_left <= 0.0 {
                    Some(RoundOutcome::Drawn)
                } else {
                    None
                };

                if let Some(outcome) = outcome {
                    match outcome {
                        RoundOutcome::Won(winner) => {
                            self.scores[winner.index()] += 1;
                            out.push(RoundTransition::RoundWon {
                                round: self.round,
                                winner,
                            });
                        }
                        RoundOutcome::Drawn => {
                            out.push(RoundTransition::RoundDrawn { round: self.round });
                        }
                    }
                    self.pending_outcome = Some(outcome);
                    self.phase = Phase::Post;
                    self.phase_left = self.config.post_time;
                }
            }
            Phase::Post => {
                self.phase_left -= dt;
                if self.phase_left <= 0.0 {
                    self.pending_outcome = None;
                    self.round += 1;
                    if self.round > self.config.total_rounds {
                        self.phase = Phase::MatchOver;
                        self.phase_left = self.config.over_time;
                        out.push(RoundTransition::MatchEnded);
                    } else {
                        self.begin_round(&mut out);
                    }
                }
            }
            Phase::MatchOver => {
                self.phase_left -= dt;
                if self.phase_left <= 0.0 {
                    self.reset();
                    out.push(RoundTransition::MatchReset);
                }
            }
        }

        out
    }

    fn begin_round(&mut self, out: &mut Vec<RoundTransition>) {
        self.round_age = 0.0;
        self.buy_open = true;
        match self.mode {
            GameMode::Team => {
                self.phase = Phase::Freeze;
                self.phase_left = self.config.freeze_time;
            }
            GameMode::Ffa => {
                self.phase = Phase::Live;
                self.phase_left = self.config.ffa_round_time;
            }
        }
        out.push(RoundTransition::RoundStarted { round: self.round });
    }

    fn tick_buy_window(&mut self, dt: f32, out: &mut Vec<RoundTransition>) {
        self.round_age += dt;
        if self.buy_open && self.round_age > self.config.buy_window {
            self.buy_open = false;
            out.push(RoundTransition::BuyWindowClosed);
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Waiting;
        self.round = 0;
        self.phase_left = 0.0;
        self.round_age = 0.0;
        self.scores = [0, 0];
        self.buy_open = false;
        self.pending_outcome = None;
    }
}
