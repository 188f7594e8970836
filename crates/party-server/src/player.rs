//! Connected players as the party subsystem sees them.
//!
//! Players are owned by the session layer. Parties hold `Arc<Player>` handles and
//! keep the `party_id` back-reference in sync; the party's member list is the
//! canonical record.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use party_protocol::{
    AccountId, CharacterId, HitPoints, MemberView, Packet, PacketWriter, PartyId, SkillTab,
};

/// Chat notice styles the party subsystem emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    /// Inviter-facing failures and declines.
    Alert2,
    /// Party-wide vote-kick notices.
    Alert3,
}

/// Outbound side of a client connection. Delivery is fire-and-forget.
pub trait Session: Send + Sync {
    fn send(&self, packet: Packet);
    /// Chat notices are encoded by the chat subsystem behind this seam.
    fn send_notice(&self, kind: NoticeKind, message: &str);
    fn is_connected(&self) -> bool;
}

pub struct Player {
    character_id: CharacterId,
    account_id: AccountId,
    name: String,
    party_id: AtomicI32,
    max_hp: AtomicI32,
    current_hp: AtomicI32,
    skills: SkillTab,
    /// Pre-encoded character-list block, spliced into roster packets.
    character_block: Bytes,
    session: Arc<dyn Session>,
}

impl Player {
    pub fn new(
        character_id: CharacterId,
        account_id: AccountId,
        name: impl Into<String>,
        session: Arc<dyn Session>,
    ) -> Self {
        Self {
            character_id,
            account_id,
            name: name.into(),
            party_id: AtomicI32::new(PartyId::NONE.0),
            max_hp: AtomicI32::new(0),
            current_hp: AtomicI32::new(0),
            skills: SkillTab::default(),
            character_block: Bytes::new(),
            session,
        }
    }

    pub fn with_skills(mut self, skills: SkillTab) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_character_block(mut self, block: Bytes) -> Self {
        self.character_block = block;
        self
    }

    pub fn with_hit_points(self, hp: HitPoints) -> Self {
        self.set_hit_points(hp);
        self
    }

    pub fn party_id(&self) -> PartyId {
        PartyId(self.party_id.load(Ordering::Acquire))
    }

    pub fn set_party_id(&self, id: PartyId) {
        self.party_id.store(id.0, Ordering::Release);
    }

    /// Clear the back-reference only if it still points at `id`.
    pub fn clear_party_id(&self, id: PartyId) {
        let _ = self.party_id.compare_exchange(
            id.0,
            PartyId::NONE.0,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub fn set_hit_points(&self, hp: HitPoints) {
        self.max_hp.store(hp.max, Ordering::Relaxed);
        self.current_hp.store(hp.current, Ordering::Relaxed);
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Send to this player's client; a disconnected session is skipped.
    pub fn send(&self, packet: Packet) {
        if self.session.is_connected() {
            self.session.send(packet);
        }
    }

    pub fn send_notice(&self, kind: NoticeKind, message: &str) {
        if self.session.is_connected() {
            self.session.send_notice(kind, message);
        }
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("character_id", &self.character_id)
            .field("name", &self.name)
            .field("party_id", &self.party_id())
            .finish()
    }
}

impl MemberView for Player {
    fn character_id(&self) -> CharacterId {
        self.character_id
    }

    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn hit_points(&self) -> HitPoints {
        HitPoints {
            max: self.max_hp.load(Ordering::Relaxed),
            current: self.current_hp.load(Ordering::Relaxed),
        }
    }

    fn skill_tab(&self) -> &SkillTab {
        &self.skills
    }

    fn write_character(&self, writer: &mut PacketWriter) {
        writer.write_bytes(&self.character_block);
    }
}
