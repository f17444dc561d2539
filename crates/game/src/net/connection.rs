use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Transport-side bookkeeping for one joined client. Gameplay state lives
/// with the player entity, keyed by the same id.
#[derive(Debug)]
pub struct ClientConnection {
    pub addr: SocketAddr,
    pub player_id: u32,
    pub last_receive_time: Instant,
    pub send_sequence: u32,
}

impl ClientConnection {
    pub fn new(addr: SocketAddr, player_id: u32) -> Self {
        Self {
            addr,
            player_id,
            last_receive_time: Instant::now(),
            send_sequence: 0,
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_receive_time.elapsed() > timeout
    }

    pub fn touch(&mut self) {
        self.last_receive_time = Instant::now();
    }

    pub fn next_sequence(&mut self) -> u32 {
        let seq = self.send_sequence;
        self.send_sequence = self.send_sequence.wrapping_add(1);
        seq
    }
}

#[derive(Debug)]
pub struct ConnectionManager {
    clients_by_addr: HashMap<SocketAddr, u32>,
    clients: HashMap<u32, ClientConnection>,
    next_player_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl ConnectionManager {
    pub fn new(max_clients: usize) -> Self {
        Self::with_timeout(max_clients, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(max_clients: usize, timeout_secs: u64) -> Self {
        Self {
            clients_by_addr: HashMap::new(),
            clients: HashMap::new(),
            next_player_id: 1,
            max_clients,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Registers a joining address. Re-joins from a known address return the
    /// existing connection instead of a duplicate.
    pub fn register(&mut self, addr: SocketAddr) -> Result<&mut ClientConnection, &'static str> {
        if let Some(&player_id) = self.clients_by_addr.get(&addr) {
            return Ok(self.clients.get_mut(&player_id).unwrap());
        }

        if self.clients.len() >= self.max_clients {
            return Err("server full");
        }

        let player_id = self.next_player_id;
        self.next_player_id += 1;

        self.clients
            .insert(player_id, ClientConnection::new(addr, player_id));
        self.clients_by_addr.insert(addr, player_id);
        Ok(self.clients.get_mut(&player_id).unwrap())
    }

    pub fn get_by_addr(&self, addr: &SocketAddr) -> Option<&ClientConnection> {
        self.clients_by_addr
            .get(addr)
            .and_then(|id| self.clients.get(id))
    }

    pub fn get_by_addr_mut(&mut self, addr: &SocketAddr) -> Option<&mut ClientConnection> {
        if let Some(&id) = self.clients_by_addr.get(addr) {
            self.clients.get_mut(&id)
        } else {
            None
        }
    }

    pub fn remove(&mut self, player_id: u32) -> Option<ClientConnection> {
        let conn = self.clients.remove(&player_id)?;
        self.clients_by_addr.remove(&conn.addr);
        Some(conn)
    }

    pub fn remove_by_addr(&mut self, addr: &SocketAddr) -> Option<ClientConnection> {
        let player_id = self.clients_by_addr.remove(addr)?;
        self.clients.remove(&player_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientConnection> {
        self.clients.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ClientConnection> {
        self.clients.values_mut()
    }

    pub fn cleanup_timed_out(&mut self) -> Vec<u32> {
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, c)| c.is_timed_out(self.timeout))
            .map(|(&id, _)| id)
            .collect();

        for id in &timed_out {
            self.remove(*id);
        }
        timed_out
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }
}
