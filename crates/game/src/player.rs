use glam::Vec3;

use crate::combat::{WeaponConfig, WeaponKind, WeaponSlot};
use crate::movement::KinematicState;
use crate::net::protocol::PlayerSnapshot;
use crate::round::Team;

pub const MAX_HEALTH: i32 = 100;
pub const GRENADES_PER_ROUND: u32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct ReloadState {
    pub slot: WeaponSlot,
    pub finish_at: f64,
}

/// Authoritative per-player state. Everything the simulation needs lives
/// here; connection bookkeeping stays in the net layer.
#[derive(Debug)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub team: Team,
    pub kinematics: KinematicState,
    pub yaw: f32,
    pub pitch: f32,
    pub crouching: bool,
    pub alive: bool,
    pub health: i32,
    pub kills: u32,
    pub deaths: u32,
    pub last_seq: u32,
    pub slot: WeaponSlot,
    pub primary: WeaponKind,
    /// Whether the player ever picked a primary; defaulted at buy close.
    pub chose_primary: bool,
    pub primary_ammo: u32,
    pub pistol_ammo: u32,
    pub grenades: u32,
    pub next_fire_time: f64,
    pub reload: Option<ReloadState>,
    pub respawn_at: Option<f64>,
    pub avatar: Option<Vec<u8>>,
}

impl Player {
    pub fn new(id: u32, name: String, team: Team, primary: Option<WeaponKind>) -> Self {
        let primary_kind = primary
            .filter(|w| w.is_primary())
            .unwrap_or(WeaponKind::Rifle);
        Self {
            id,
            name,
            team,
            kinematics: KinematicState::at(Vec3::ZERO),
            yaw: 0.0,
            pitch: 0.0,
            crouching: false,
            alive: true,
            health: MAX_HEALTH,
            kills: 0,
            deaths: 0,
            last_seq: 0,
            slot: WeaponSlot::Primary,
            primary: primary_kind,
            chose_primary: primary.is_some_and(WeaponKind::is_primary),
            primary_ammo: primary_kind.config().magazine,
            pistol_ammo: WeaponKind::Pistol.config().magazine,
            grenades: GRENADES_PER_ROUND,
            next_fire_time: 0.0,
            reload: None,
            respawn_at: None,
            avatar: None,
        }
    }

    /// Fresh round state at a spawn point. Score and loadout choice persist.
    pub fn respawn(&mut self, position: Vec3) {
        self.kinematics = KinematicState::at(position);
        self.alive = true;
        self.health = MAX_HEALTH;
        self.crouching = false;
        self.slot = WeaponSlot::Primary;
        self.primary_ammo = self.primary.config().magazine;
        self.pistol_ammo = WeaponKind::Pistol.config().magazine;
        self.grenades = GRENADES_PER_ROUND;
        self.next_fire_time = 0.0;
        self.reload = None;
        self.respawn_at = None;
    }

    pub fn set_primary(&mut self, weapon: WeaponKind) {
        if !weapon.is_primary() {
            return;
        }
        self.primary = weapon;
        self.chose_primary = true;
        self.primary_ammo = weapon.config().magazine;
        if let Some(reload) = self.reload {
            if reload.slot == WeaponSlot::Primary {
                self.reload = None;
            }
        }
    }

    /// Weapon behind a slot; `None` for the grenade slot.
    pub fn weapon_in(&self, slot: WeaponSlot) -> Option<WeaponKind> {
        match slot {
            WeaponSlot::Primary => Some(self.primary),
            WeaponSlot::Pistol => Some(WeaponKind::Pistol),
            WeaponSlot::Grenade => None,
        }
    }

    pub fn current_weapon(&self) -> Option<(WeaponKind, &'static WeaponConfig)> {
        self.weapon_in(self.slot).map(|kind| (kind, kind.config()))
    }

    pub fn ammo_in(&self, slot: WeaponSlot) -> u32 {
        match slot {
            WeaponSlot::Primary => self.primary_ammo,
            WeaponSlot::Pistol => self.pistol_ammo,
            WeaponSlot::Grenade => self.grenades,
        }
    }

    pub fn ammo_in_mut(&mut self, slot: WeaponSlot) -> &mut u32 {
        match slot {
            WeaponSlot::Primary => &mut self.primary_ammo,
            WeaponSlot::Pistol => &mut self.pistol_ammo,
            WeaponSlot::Grenade => &mut self.grenades,
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            position: self.kinematics.position.to_array(),
            velocity: self.kinematics.velocity.to_array(),
            yaw: self.yaw,
            pitch: self.pitch,
            health: self.health,
            alive: self.alive,
            crouching: self.crouching,
            team: self.team,
            slot: self.slot,
            primary: self.primary,
            kills: self.kills,
            deaths: self.deaths,
            last_seq: self.last_seq,
            primary_ammo: self.primary_ammo,
            pistol_ammo: self.pistol_ammo,
            grenades: self.grenades,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pistol_request_as_primary_falls_back_to_rifle() {
        let p = Player::new(1, "p".into(), Team::A, Some(WeaponKind::Pistol));
        assert_eq!(p.primary, WeaponKind::Rifle);
        assert!(!p.chose_primary);
    }

    #[test]
    fn respawn_restores_round_state_but_keeps_score() {
        let mut p = Player::new(1, "p".into(), Team::A, Some(WeaponKind::Sniper));
        p.health = 10;
        p.alive = false;
        p.kills = 3;
        p.deaths = 2;
        p.primary_ammo = 0;
        p.grenades = 0;

        p.respawn(Vec3::new(1.0, 0.0, 1.0));
        assert!(p.alive);
        assert_eq!(p.health, MAX_HEALTH);
        assert_eq!(p.primary_ammo, WeaponKind::Sniper.config().magazine);
        assert_eq!(p.grenades, GRENADES_PER_ROUND);
        assert_eq!(p.kills, 3);
        assert_eq!(p.deaths, 2);
    }

    #[test]
    fn buying_a_primary_cancels_its_reload() {
        let mut p = Player::new(1, "p".into(), Team::A, None);
        p.reload = Some(ReloadState {
            slot: WeaponSlot::Primary,
            finish_at: 5.0,
        });
        p.set_primary(WeaponKind::Shotgun);
        assert!(p.reload.is_none());
        assert_eq!(p.primary_ammo, WeaponKind::Shotgun.config().magazine);
    }
}
