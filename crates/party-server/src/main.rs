//! Party Server
//!
//! Hosts the party handler behind a renet endpoint. Each client's identity
//! comes from its connect-token user data.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use party_protocol::{opcode, MemberView, PacketReader};
use renet::{ConnectionConfig, RenetServer, ServerEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use party_server::{
    channel_id, create_channel_configs,
    session::{self, Outbox},
    ClientIdentity, Outbound, PartyHandler, PartyManager, Player, PlayerDirectory, RenetSession,
    ServerConfig, ServerRunner, SessionDirectory, TransportConfig,
};

#[derive(Parser)]
#[command(name = "party-server")]
#[command(about = "Party membership server", version)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, default_value = "party-server.yaml")]
    config: PathBuf,

    /// Override the bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

struct Client {
    player: Arc<Player>,
    session: Arc<RenetSession>,
}

/// Server state
struct Server {
    renet: RenetServer,
    handler: PartyHandler,
    directory: Arc<SessionDirectory>,
    /// Connected clients by renet client id
    clients: HashMap<u64, Client>,
    outbox: Outbox,
    outbound: UnboundedReceiver<Outbound>,
}

impl Server {
    fn new(config: &ServerConfig) -> Self {
        let connection_config = ConnectionConfig {
            available_bytes_per_tick: 60_000,
            server_channels_config: create_channel_configs(),
            client_channels_config: create_channel_configs(),
        };

        let directory = Arc::new(SessionDirectory::new());
        let parties = Arc::new(PartyManager::new(config.party.max_size));
        let handler = PartyHandler::new(parties, directory.clone());
        let (outbox, outbound) = session::outbox();

        Self {
            renet: RenetServer::new(connection_config),
            handler,
            directory,
            clients: HashMap::new(),
            outbox,
            outbound,
        }
    }

    fn update(&mut self, runner: &ServerRunner) {
        while let Some(event) = self.renet.get_event() {
            self.handle_server_event(runner, event);
        }

        for client_id in self.renet.clients_id() {
            while let Some(message) = self.renet.receive_message(client_id, channel_id::PARTY) {
                self.handle_client_message(client_id, &message);
            }
        }

        self.flush_outbox();
    }

    fn handle_server_event(&mut self, runner: &ServerRunner, event: ServerEvent) {
        match event {
            ServerEvent::ClientConnected { client_id } => {
                match runner.identity(client_id) {
                    Ok(identity) => self.register(client_id, identity),
                    Err(e) => {
                        warn!("{}", e);
                        self.renet.disconnect(client_id);
                    }
                }
            }
            ServerEvent::ClientDisconnected { client_id, reason } => {
                info!("Client {} disconnected: {:?}", client_id, reason);
                if let Some(client) = self.clients.remove(&client_id) {
                    client.session.mark_disconnected();
                    self.handler.player_disconnected(&client.player);
                    // A newer login for the same character keeps its entry.
                    let id = client.player.character_id();
                    let current = self.directory.player_by_id(id);
                    if current.is_some_and(|p| Arc::ptr_eq(&p, &client.player)) {
                        self.directory.remove(id);
                    }
                }
            }
        }
    }

    fn register(&mut self, client_id: u64, identity: ClientIdentity) {
        let session = Arc::new(RenetSession::new(client_id, self.outbox.clone()));
        let player = Arc::new(Player::new(
            identity.character_id,
            identity.account_id,
            identity.name,
            session.clone(),
        ));

        info!(
            "Client {} connected as {} ({})",
            client_id,
            player.name(),
            player.character_id().0
        );

        if self.directory.insert(player.clone()).is_some() {
            debug!("Replaced an older session for {}", player.name());
        }
        self.handler.player_connected(&player);
        self.clients.insert(client_id, Client { player, session });
    }

    fn handle_client_message(&mut self, client_id: u64, data: &[u8]) {
        let Some(client) = self.clients.get(&client_id) else {
            debug!("Dropping message from unregistered client {}", client_id);
            return;
        };

        let mut reader = PacketReader::new(data);
        if let Err(e) = reader.expect_opcode(opcode::RECV_PARTY) {
            warn!("Client {} sent a non-party packet: {}", client_id, e);
            return;
        }
        self.handler.handle(&client.player, &mut reader);
    }

    fn flush_outbox(&mut self) {
        while let Ok(outbound) = self.outbound.try_recv() {
            if !self.renet.is_connected(outbound.client_id) {
                continue;
            }
            self.renet
                .send_message(outbound.client_id, outbound.channel, outbound.data);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::load_or_default(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("party_server=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
    };
    fmt().with_env_filter(filter).init();

    let mut server = Server::new(&config);

    let mut runner = ServerRunner::bind(TransportConfig::from(&config))?;

    info!("Party Server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Listening on {}",
        runner.local_addr().unwrap_or(config.bind_address)
    );
    info!("Max party size: {}", config.party.max_size);

    // Main server loop
    let tick_duration = config.tick_duration();
    loop {
        let start = Instant::now();

        runner.receive(&mut server.renet, tick_duration);
        server.update(&runner);
        runner.send(&mut server.renet);

        let elapsed = start.elapsed();
        if let Some(sleep_time) = tick_duration.checked_sub(elapsed) {
            std::thread::sleep(sleep_time);
        }
    }
}
