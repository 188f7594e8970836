//! Renet-backed sessions.
//!
//! Handlers never touch the renet server directly: packets go into an
//! unbounded outbox that the tick loop flushes, so a send never blocks a
//! party mutation.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use party_protocol::{AccountId, CharacterId, Packet, PacketReader, PacketWriter, WireError};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::channels::channel_id;
use crate::player::{NoticeKind, Session};

/// Chat opcode used for notices until the chat subsystem takes them over.
const SEND_CHAT: u16 = 0x0011;

/// A packet waiting to be handed to renet.
#[derive(Clone, Debug)]
pub struct Outbound {
    pub client_id: u64,
    pub channel: u8,
    pub data: Bytes,
}

pub type Outbox = UnboundedSender<Outbound>;

pub fn outbox() -> (Outbox, UnboundedReceiver<Outbound>) {
    tokio::sync::mpsc::unbounded_channel()
}

pub struct RenetSession {
    client_id: u64,
    outbox: Outbox,
    connected: AtomicBool,
}

impl RenetSession {
    pub fn new(client_id: u64, outbox: Outbox) -> Self {
        Self {
            client_id,
            outbox,
            connected: AtomicBool::new(true),
        }
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    fn push(&self, channel: u8, data: Bytes) {
        let outbound = Outbound {
            client_id: self.client_id,
            channel,
            data,
        };
        if self.outbox.send(outbound).is_err() {
            trace!(client_id = self.client_id, "outbox closed, dropping packet");
        }
    }
}

impl Session for RenetSession {
    fn send(&self, packet: Packet) {
        self.push(channel_id::PARTY, packet);
    }

    fn send_notice(&self, kind: NoticeKind, message: &str) {
        self.push(channel_id::NOTICE, notice_packet(kind, message));
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

pub fn notice_packet(kind: NoticeKind, message: &str) -> Packet {
    let style = match kind {
        NoticeKind::Alert2 => 2,
        NoticeKind::Alert3 => 3,
    };
    let mut w = PacketWriter::of(SEND_CHAT);
    w.write_byte(style).write_unicode_string(message);
    w.build()
}

/// Who a client is, taken from its connect-token user data.
///
/// Layout: character id (long), account id (long), name (unicode string).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIdentity {
    pub character_id: CharacterId,
    pub account_id: AccountId,
    pub name: String,
}

impl ClientIdentity {
    pub fn from_user_data(data: &[u8]) -> Result<Self, WireError> {
        let mut reader = PacketReader::new(data);
        Ok(Self {
            character_id: CharacterId(reader.read_long()?),
            account_id: AccountId(reader.read_long()?),
            name: reader.read_unicode_string()?,
        })
    }

    pub fn to_user_data(&self) -> Vec<u8> {
        let mut w = PacketWriter::raw();
        w.write_long(self.character_id.0)
            .write_long(self.account_id.0)
            .write_unicode_string(&self.name);
        w.build().to_vec()
    }
}
