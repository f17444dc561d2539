use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::protocol::{MAX_PACKET_SIZE, Packet};
use super::stats::NetworkStats;

/// Non-blocking UDP endpoint shared by server and client. Malformed or
/// short datagrams and bad magic/version headers are dropped on receive
/// without disturbing anything else.
pub struct NetworkEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote_addr: Option<SocketAddr>,
    stats: NetworkStats,
    recv_buffer: Box<[u8; MAX_PACKET_SIZE]>,
    running: Arc<AtomicBool>,
}

impl NetworkEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            remote_addr: None,
            stats: NetworkStats::default(),
            recv_buffer: Box::new([0u8; MAX_PACKET_SIZE]),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn set_remote(&mut self, addr: SocketAddr) {
        self.remote_addr = Some(addr);
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn send_to(&mut self, packet: &Packet, addr: SocketAddr) -> io::Result<usize> {
        let data = packet.serialize().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("serialization error: {e}"))
        })?;

        if data.len() > MAX_PACKET_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "packet exceeds datagram limit",
            ));
        }

        let bytes = self.socket.send_to(&data, addr)?;
        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes as u64;
        Ok(bytes)
    }

    pub fn send(&mut self, packet: &Packet) -> io::Result<usize> {
        let addr = self
            .remote_addr
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no remote address set"))?;
        self.send_to(packet, addr)
    }

    /// Drains every pending datagram. Unparseable data never surfaces as an
    /// error here; only socket failures do.
    pub fn receive(&mut self) -> io::Result<Vec<(Packet, SocketAddr)>> {
        let mut packets = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer[..]) {
                Ok((size, addr)) => {
                    if size < std::mem::size_of::<u32>() * 3 {
                        continue;
                    }
                    match Packet::deserialize(&self.recv_buffer[..size]) {
                        Ok(packet) if packet.header.is_valid() => {
                            self.stats.packets_received += 1;
                            self.stats.bytes_received += size as u64;
                            packets.push((packet, addr));
                        }
                        _ => continue,
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }

        Ok(packets)
    }

    /// Shared stop flag; clearing it ends any loop polling this endpoint.
    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::protocol::{PacketHeader, PacketType};

    #[test]
    fn loopback_round_trip_and_garbage_drop() {
        let mut server = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
        let mut client = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
        client.set_remote(server.local_addr());

        let packet = Packet::new(PacketHeader::new(1), PacketType::Disconnect);
        client.send(&packet).unwrap();

        // Raw garbage on the same socket must vanish silently.
        let raw = UdpSocket::bind("127.0.0.1:0").unwrap();
        raw.send_to(&[0xAB; 16], server.local_addr()).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(50));
        let received = server.receive().unwrap();
        assert_eq!(received.len(), 1);
        assert!(matches!(received[0].0.payload, PacketType::Disconnect));
    }
}
