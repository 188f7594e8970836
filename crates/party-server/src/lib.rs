//! Party Server
//!
//! Group membership for the game server: party state, the party registry and
//! the dispatcher for the party opcode. Renet carries the packets.

pub mod channels;
pub mod config;
pub mod directory;
pub mod handler;
pub mod party;
pub mod party_manager;
pub mod player;
pub mod session;
pub mod transport;

pub use channels::*;
pub use config::{PartyConfig, ServerConfig};
pub use directory::{PlayerDirectory, SessionDirectory};
pub use handler::PartyHandler;
pub use party::{Party, ReadyResponse};
pub use party_manager::{lock_party, JoinTarget, PartyManager, SharedParty};
pub use player::{NoticeKind, Player, Session};
pub use session::{ClientIdentity, Outbound, RenetSession};
pub use transport::{ServerRunner, TransportConfig, TransportError, PROTOCOL_ID};
