//! Netcode UDP endpoint for the party server.
//!
//! Clients authenticate with unsecure connect tokens whose user data carries
//! their character identity; see [`ClientIdentity`].

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use party_protocol::WireError;
use renet::RenetServer;
use renet_netcode::{
    NetcodeServerTransport, ServerAuthentication, ServerConfig as NetcodeConfig,
    NETCODE_USER_DATA_BYTES,
};
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::session::ClientIdentity;

/// Protocol ID shared with party clients
pub const PROTOCOL_ID: u64 = 0x9A27_0001;

/// Where to listen and how many clients to admit.
#[derive(Clone, Copy, Debug)]
pub struct TransportConfig {
    pub bind_address: SocketAddr,
    pub max_clients: usize,
}

impl From<&ServerConfig> for TransportConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            bind_address: config.bind_address,
            max_clients: config.max_clients,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot bind party socket on {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    #[error("party socket setup failed: {0}")]
    Socket(std::io::Error),

    #[error("netcode transport rejected its config: {0}")]
    Netcode(String),

    #[error("client {0} connected without user data")]
    MissingIdentity(u64),

    #[error("client {client_id} sent a malformed identity: {source}")]
    BadIdentity {
        client_id: u64,
        #[source]
        source: WireError,
    },
}

/// Decode the identity a client put in its connect token.
pub fn identity_from_user_data(
    client_id: u64,
    user_data: Option<[u8; NETCODE_USER_DATA_BYTES]>,
) -> Result<ClientIdentity, TransportError> {
    let data = user_data.ok_or(TransportError::MissingIdentity(client_id))?;
    ClientIdentity::from_user_data(&data)
        .map_err(|source| TransportError::BadIdentity { client_id, source })
}

/// Owns the UDP socket and moves packets between it and renet.
pub struct ServerRunner {
    transport: NetcodeServerTransport,
}

impl ServerRunner {
    pub fn bind(config: TransportConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(config.bind_address)
            .map_err(|e| TransportError::Bind(config.bind_address, e))?;
        socket.set_nonblocking(true).map_err(TransportError::Socket)?;
        let public_address = socket.local_addr().map_err(TransportError::Socket)?;

        let netcode = NetcodeConfig {
            current_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default(),
            max_clients: config.max_clients,
            protocol_id: PROTOCOL_ID,
            public_addresses: vec![public_address],
            authentication: ServerAuthentication::Unsecure,
        };
        let transport = NetcodeServerTransport::new(netcode, socket)
            .map_err(|e| TransportError::Netcode(e.to_string()))?;

        info!(
            address = %public_address,
            max_clients = config.max_clients,
            "party transport bound"
        );
        Ok(Self { transport })
    }

    /// Advance renet and pull inbound datagrams into it.
    pub fn receive(&mut self, renet: &mut RenetServer, delta: Duration) {
        renet.update(delta);
        if let Err(e) = self.transport.update(delta, renet) {
            error!(error = %e, "transport update failed");
        }
    }

    /// Flush everything renet queued this tick.
    pub fn send(&mut self, renet: &mut RenetServer) {
        self.transport.send_packets(renet);
    }

    pub fn identity(&self, client_id: u64) -> Result<ClientIdentity, TransportError> {
        identity_from_user_data(client_id, self.transport.user_data(client_id))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.addresses().first().copied()
    }
}
