use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use arena::net::protocol::MAX_NAME_LEN;
use arena::{
    ConnectionManager, InputCommand, JoinRequest, MapData, MatchConfig, NetworkEndpoint, Packet,
    PacketHeader, PacketType, PlayerMeta, Welcome, World, avatar_is_valid,
};

use crate::config::ServerConfig;

pub struct GameServer {
    endpoint: NetworkEndpoint,
    connections: ConnectionManager,
    world: World,
    config: ServerConfig,
    tick_duration: Duration,
    last_tick_time: Instant,
    accumulator: Duration,
    running: Arc<AtomicBool>,
}

impl GameServer {
    pub fn new(bind_addr: &str, config: ServerConfig, map: MapData) -> io::Result<Self> {
        let endpoint = NetworkEndpoint::bind(bind_addr)?;
        let running = endpoint.running();
        let tick_duration = Duration::from_secs_f64(1.0 / config.tick_rate as f64);

        Ok(Self {
            endpoint,
            connections: ConnectionManager::with_timeout(config.max_clients, config.timeout_secs),
            world: World::new(map, MatchConfig::default()),
            tick_duration,
            last_tick_time: Instant::now(),
            accumulator: Duration::ZERO,
            running,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            std::thread::sleep(Duration::from_millis(1));
        }
        info!("server loop stopped");
    }

    /// Drains the socket, then converts accumulated wall time into fixed
    /// simulation steps.
    pub fn tick_once(&mut self) {
        let now = Instant::now();
        self.accumulator += now - self.last_tick_time;
        self.last_tick_time = now;

        if let Err(e) = self.process_network() {
            warn!("network receive error: {e}");
        }

        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            self.tick();
        }
    }

    fn tick(&mut self) {
        for player_id in self.connections.cleanup_timed_out() {
            self.world.remove_player(player_id);
            info!("player {player_id} timed out");
        }

        let dt = 1.0 / self.config.tick_rate as f32;
        self.world.tick(dt);
        self.broadcast_snapshots();
    }

    fn process_network(&mut self) -> io::Result<()> {
        for (packet, addr) in self.endpoint.receive()? {
            self.handle_packet(packet, addr)?;
            if let Some(conn) = self.connections.get_by_addr_mut(&addr) {
                conn.touch();
            }
        }
        Ok(())
    }

    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) -> io::Result<()> {
        match packet.payload {
            PacketType::Join(request) => self.handle_join(addr, request)?,
            PacketType::Input(command) => self.handle_input(addr, command),
            PacketType::Buy { primary } => {
                if let Some(conn) = self.connections.get_by_addr(&addr) {
                    self.world.handle_buy(conn.player_id, primary);
                }
            }
            PacketType::Disconnect => self.handle_disconnect(addr),
            // Server-bound traffic only; anything else is a confused client.
            _ => {}
        }
        Ok(())
    }

    fn handle_join(&mut self, addr: SocketAddr, request: JoinRequest) -> io::Result<()> {
        // The first join fixes mode and team size for the whole match.
        if self.connections.count() == 0 {
            if let Some(mode) = request.mode {
                let team_size = request.team_size.unwrap_or(3) as usize;
                self.world.configure_match(mode, team_size);
            }
        }

        let player_id = match self.connections.register(addr) {
            Ok(conn) => conn.player_id,
            Err(reason) => {
                warn!("join denied for {addr}: {reason}");
                return self.send_denied(addr, reason);
            }
        };

        if self.world.player(player_id).is_some() {
            // Duplicate join from a live connection: resend the welcome.
            return self.send_welcome(addr, player_id);
        }

        let mut name = request.name.unwrap_or_else(|| format!("player{player_id}"));
        name.truncate(MAX_NAME_LEN);
        let avatar = request.avatar.filter(|bytes| avatar_is_valid(bytes));

        let Some(team) = self.world.add_player(
            player_id,
            name.clone(),
            request.primary,
            avatar.clone(),
            request.preferred_side,
        ) else {
            self.connections.remove(player_id);
            warn!("join denied for {addr}: match full");
            return self.send_denied(addr, "match full");
        };

        info!(
            "player {player_id} ({name}) joined from {addr} on team {team:?} ({} connected)",
            self.world.player_count()
        );
        self.send_welcome(addr, player_id)?;

        let meta = PlayerMeta {
            player_id,
            name,
            team,
            avatar,
        };
        self.broadcast_except(player_id, &PacketType::PlayerMeta(meta));
        Ok(())
    }

    fn send_welcome(&mut self, addr: SocketAddr, player_id: u32) -> io::Result<()> {
        let roster = self
            .world
            .players()
            .map(|p| PlayerMeta {
                player_id: p.id,
                name: p.name.clone(),
                team: p.team,
                avatar: p.avatar.clone(),
            })
            .collect();

        let welcome = Welcome {
            player_id,
            tick_rate: self.config.tick_rate,
            map: self.world.map().clone(),
            roster,
        };

        let sequence = self
            .connections
            .get_by_addr_mut(&addr)
            .map(|c| c.next_sequence())
            .unwrap_or(0);
        let packet = Packet::new(PacketHeader::new(sequence), PacketType::Welcome(welcome));
        self.endpoint.send_to(&packet, addr)?;
        Ok(())
    }

    fn send_denied(&mut self, addr: SocketAddr, reason: &str) -> io::Result<()> {
        let packet = Packet::new(
            PacketHeader::new(0),
            PacketType::Denied {
                reason: reason.to_string(),
            },
        );
        self.endpoint.send_to(&packet, addr)?;
        Ok(())
    }

    fn handle_input(&mut self, addr: SocketAddr, command: InputCommand) {
        if let Some(conn) = self.connections.get_by_addr(&addr) {
            self.world.enqueue_input(conn.player_id, command);
        }
    }

    fn handle_disconnect(&mut self, addr: SocketAddr) {
        if let Some(conn) = self.connections.remove_by_addr(&addr) {
            self.world.remove_player(conn.player_id);
            info!("player {} disconnected", conn.player_id);
        }
    }

    fn broadcast_snapshots(&mut self) {
        let snapshot = self.world.take_snapshot();

        let targets: Vec<(SocketAddr, u32)> = self
            .connections
            .iter_mut()
            .map(|c| (c.addr, c.next_sequence()))
            .collect();

        for (addr, sequence) in targets {
            let packet = Packet::new(
                PacketHeader::new(sequence),
                PacketType::Snapshot(snapshot.clone()),
            );
            if let Err(e) = self.endpoint.send_to(&packet, addr) {
                // Next tick supersedes this snapshot anyway.
                debug!("failed to send snapshot to {addr}: {e}");
            }
        }
    }

    fn broadcast_except(&mut self, skip_player: u32, payload: &PacketType) {
        let targets: Vec<(SocketAddr, u32)> = self
            .connections
            .iter_mut()
            .filter(|c| c.player_id != skip_player)
            .map(|c| (c.addr, c.next_sequence()))
            .collect();

        for (addr, sequence) in targets {
            let packet = Packet::new(PacketHeader::new(sequence), payload.clone());
            if let Err(e) = self.endpoint.send_to(&packet, addr) {
                debug!("failed to send to {addr}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena::practice_arena;
    use std::time::Duration;

    #[test]
    fn run_stops_when_the_running_flag_clears() {
        let mut server =
            GameServer::new("127.0.0.1:0", ServerConfig::default(), practice_arena()).unwrap();
        let running = server.running();

        let handle = std::thread::spawn(move || server.run());
        std::thread::sleep(Duration::from_millis(50));
        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();
    }
}
