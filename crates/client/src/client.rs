use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use arena::{
    InputCommand, JoinRequest, NetworkEndpoint, Packet, PacketHeader, PacketType, WeaponKind,
};

/// Thin connection wrapper: owns the socket, the outgoing sequence counter
/// and the id assigned by the welcome message.
pub struct NetClient {
    endpoint: NetworkEndpoint,
    send_sequence: u32,
    player_id: Option<u32>,
}

impl NetClient {
    pub fn connect<A: ToSocketAddrs>(server: A) -> io::Result<Self> {
        let server_addr = server
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no server address"))?;

        let mut endpoint = NetworkEndpoint::bind("0.0.0.0:0")?;
        endpoint.set_remote(server_addr);

        Ok(Self {
            endpoint,
            send_sequence: 0,
            player_id: None,
        })
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.endpoint.remote_addr()
    }

    pub fn player_id(&self) -> Option<u32> {
        self.player_id
    }

    pub fn join(&mut self, request: JoinRequest) -> io::Result<()> {
        self.send(PacketType::Join(request))
    }

    pub fn send_input(&mut self, command: InputCommand) -> io::Result<()> {
        self.send(PacketType::Input(command))
    }

    pub fn send_buy(&mut self, primary: WeaponKind) -> io::Result<()> {
        self.send(PacketType::Buy { primary })
    }

    pub fn disconnect(&mut self) -> io::Result<()> {
        self.send(PacketType::Disconnect)
    }

    /// Drains server traffic, capturing the assigned player id from the
    /// welcome on the way through.
    pub fn poll(&mut self) -> io::Result<Vec<PacketType>> {
        let server = self.endpoint.remote_addr();
        let mut payloads = Vec::new();
        for (packet, addr) in self.endpoint.receive()? {
            if server.is_some_and(|s| s != addr) {
                continue;
            }
            if let PacketType::Welcome(welcome) = &packet.payload {
                self.player_id = Some(welcome.player_id);
            }
            payloads.push(packet.payload);
        }
        Ok(payloads)
    }

    fn send(&mut self, payload: PacketType) -> io::Result<()> {
        let header = PacketHeader::new(self.send_sequence);
        self.send_sequence = self.send_sequence.wrapping_add(1);
        self.endpoint.send(&Packet::new(header, payload))?;
        Ok(())
    }
}
