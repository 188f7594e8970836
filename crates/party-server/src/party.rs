//! Party aggregate: ordered roster, leader and ready-check counters.
//!
//! A `Party` is always reached through `PartyManager`, wrapped in a mutex, so
//! every method here runs with the party exclusively locked.

use std::sync::Arc;

use party_protocol::{CharacterId, MemberView, Packet, PartyId};

use crate::player::{NoticeKind, Player};

/// Outcome of a ready-check response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyResponse {
    /// Sequence mismatch or no check in flight; nothing changed.
    Ignored,
    /// Response counted; `finished` when it was the last one outstanding.
    Counted { finished: bool },
}

#[derive(Debug)]
pub struct Party {
    id: PartyId,
    leader: Arc<Player>,
    /// Position 0 is the leader whenever leadership changes hands.
    members: Vec<Arc<Player>>,
    max_size: usize,
    /// Bumped on each check start; always one ahead of the number clients echo.
    ready_checks: i32,
    remaining_members: i32,
}

impl Party {
    /// A new two-member party led by `leader`.
    ///
    /// Player back-references are left untouched; the join flow sets them.
    pub fn new(id: PartyId, max_size: usize, leader: Arc<Player>, joiner: Arc<Player>) -> Self {
        Self {
            id,
            members: vec![leader.clone(), joiner],
            leader,
            max_size,
            ready_checks: 0,
            remaining_members: 0,
        }
    }

    pub fn id(&self) -> PartyId {
        self.id
    }

    pub fn leader(&self) -> &Arc<Player> {
        &self.leader
    }

    pub fn members(&self) -> &[Arc<Player>] {
        &self.members
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_size
    }

    pub fn is_leader(&self, id: CharacterId) -> bool {
        !self.members.is_empty() && self.leader.character_id() == id
    }

    pub fn is_member(&self, id: CharacterId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: CharacterId) -> Option<usize> {
        self.members.iter().position(|m| m.character_id() == id)
    }

    /// Append a member and point its back-reference at this party.
    pub fn add_member(&mut self, player: Arc<Player>) {
        player.set_party_id(self.id);
        self.members.push(player);
    }

    /// Drop a member. Returns false if the player was not in the roster.
    ///
    /// The back-reference is cleared only while it still names this party; the
    /// leave flow has usually cleared it already.
    pub fn remove_member(&mut self, player: &Player) -> bool {
        let Some(idx) = self.position(player.character_id()) else {
            return false;
        };
        self.members.remove(idx);
        player.clear_party_id(self.id);
        true
    }

    /// Hand leadership to a current member, moving them to the front.
    pub fn set_leader(&mut self, new_leader: &Arc<Player>) -> bool {
        let Some(idx) = self.position(new_leader.character_id()) else {
            return false;
        };
        let member = self.members.remove(idx);
        self.members.insert(0, member);
        self.leader = new_leader.clone();
        true
    }

    /// Failover: the first remaining member becomes leader.
    pub fn find_new_leader(&mut self) -> Option<Arc<Player>> {
        let first = self.members.first()?.clone();
        self.leader = first.clone();
        Some(first)
    }

    /// Swap the roster entry for a returning character's new handle, keeping
    /// its position and leadership. Returns the stale handle.
    pub fn replace_member(&mut self, player: &Arc<Player>) -> Option<Arc<Player>> {
        let idx = self.position(player.character_id())?;
        let stale = std::mem::replace(&mut self.members[idx], player.clone());
        if self.leader.character_id() == player.character_id() {
            self.leader = player.clone();
        }
        stale.clear_party_id(self.id);
        player.set_party_id(self.id);
        Some(stale)
    }

    /// No member has a live session left.
    pub fn is_abandoned(&self) -> bool {
        !self
            .members
            .iter()
            .any(|member| member.session().is_connected())
    }

    /// Deliver a packet to every connected member.
    pub fn broadcast(&self, packet: &Packet) {
        for member in &self.members {
            member.send(packet.clone());
        }
    }

    pub fn broadcast_notice(&self, kind: NoticeKind, message: &str) {
        for member in &self.members {
            member.send_notice(kind, message);
        }
    }

    /// Open a new ready check. Returns the check number to put on the wire.
    pub fn start_ready_check(&mut self) -> i32 {
        let check_number = self.ready_checks;
        self.ready_checks = self.ready_checks.wrapping_add(1);
        self.remaining_members = self.members.len() as i32 - 1;
        check_number
    }

    /// The current sequence; a response must carry this value to count.
    pub fn ready_check_sequence(&self) -> i32 {
        self.ready_checks
    }

    pub fn remaining_responders(&self) -> i32 {
        self.remaining_members
    }

    /// Count a response for `sequence` (the echoed check number plus one).
    pub fn record_ready_response(&mut self, sequence: i32) -> ReadyResponse {
        if sequence != self.ready_checks || self.remaining_members <= 0 {
            return ReadyResponse::Ignored;
        }
        self.remaining_members -= 1;
        ReadyResponse::Counted {
            finished: self.remaining_members == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use party_protocol::AccountId;

    use super::*;
    use crate::player::Session;

    struct Null;

    impl Session for Null {
        fn send(&self, _packet: Packet) {}
        fn send_notice(&self, _kind: NoticeKind, _message: &str) {}
        fn is_connected(&self) -> bool {
            true
        }
    }

    fn player(id: i64) -> Arc<Player> {
        Arc::new(Player::new(
            CharacterId(id),
            AccountId(id),
            format!("p{id}"),
            Arc::new(Null),
        ))
    }

    fn ids(party: &Party) -> Vec<i64> {
        party.members().iter().map(|m| m.character_id().0).collect()
    }

    fn party_of(n: i64) -> (Party, Vec<Arc<Player>>) {
        let players: Vec<_> = (1..=n).map(player).collect();
        let mut party = Party::new(PartyId(9), 10, players[0].clone(), players[1].clone());
        for p in &players[2..] {
            party.add_member(p.clone());
        }
        (party, players)
    }

    #[test]
    fn new_party_leads_with_inviter() {
        let (party, _) = party_of(2);
        assert_eq!(ids(&party), vec![1, 2]);
        assert!(party.is_leader(CharacterId(1)));
        assert!(!party.is_leader(CharacterId(2)));
    }

    #[test]
    fn add_member_sets_back_reference() {
        let (party, players) = party_of(3);
        assert_eq!(players[2].party_id(), PartyId(9));
        assert_eq!(party.len(), 3);
    }

    #[test]
    fn set_leader_moves_member_to_front() {
        let (mut party, players) = party_of(3);
        assert!(party.set_leader(&players[2]));
        assert_eq!(ids(&party), vec![3, 1, 2]);
        assert!(party.is_leader(CharacterId(3)));

        let stranger = player(99);
        assert!(!party.set_leader(&stranger));
        assert!(party.is_leader(CharacterId(3)));
    }

    #[test]
    fn failover_promotes_first_remaining_member() {
        let (mut party, players) = party_of(3);
        assert!(party.remove_member(&players[0]));
        let new_leader = party.find_new_leader().unwrap().character_id();
        assert_eq!(new_leader, CharacterId(2));
        assert!(party.members().iter().any(|m| m.character_id() == new_leader));
    }

    #[test]
    fn removing_everyone_empties_the_party() {
        let (mut party, players) = party_of(2);
        for p in &players {
            p.set_party_id(party.id());
            assert!(party.remove_member(p));
            assert_eq!(p.party_id(), PartyId::NONE);
        }
        assert!(party.is_empty());
        assert!(party.find_new_leader().is_none());
        assert!(!party.is_leader(CharacterId(1)));
        assert!(!party.remove_member(&players[0]));
    }

    #[test]
    fn replace_member_keeps_slot_and_leadership() {
        let (mut party, players) = party_of(3);
        for p in &players {
            p.set_party_id(party.id());
        }
        let returning = player(1);

        let stale = party.replace_member(&returning).unwrap();
        assert!(Arc::ptr_eq(&stale, &players[0]));
        assert_eq!(ids(&party), vec![1, 2, 3]);
        assert!(Arc::ptr_eq(&party.members()[0], &returning));
        assert!(Arc::ptr_eq(party.leader(), &returning));
        assert_eq!(returning.party_id(), PartyId(9));
        assert_eq!(players[0].party_id(), PartyId::NONE);

        assert!(party.replace_member(&player(42)).is_none());
    }

    #[test]
    fn capacity() {
        let players: Vec<_> = (1..=3).map(player).collect();
        let mut party = Party::new(PartyId(1), 3, players[0].clone(), players[1].clone());
        assert!(!party.is_full());
        party.add_member(players[2].clone());
        assert!(party.is_full());
    }

    #[test]
    fn ready_check_sequence_and_stale_responses() {
        let (mut party, _) = party_of(3);

        assert_eq!(party.start_ready_check(), 0);
        assert_eq!(party.ready_check_sequence(), 1);
        assert_eq!(party.remaining_responders(), 2);

        assert_eq!(
            party.record_ready_response(1),
            ReadyResponse::Counted { finished: false }
        );
        assert_eq!(party.remaining_responders(), 1);

        assert_eq!(party.record_ready_response(0), ReadyResponse::Ignored);
        assert_eq!(party.remaining_responders(), 1);

        assert_eq!(
            party.record_ready_response(1),
            ReadyResponse::Counted { finished: true }
        );
        assert_eq!(party.remaining_responders(), 0);

        // Late duplicate after the check finished.
        assert_eq!(party.record_ready_response(1), ReadyResponse::Ignored);
    }

    #[test]
    fn restarting_a_check_resets_remaining() {
        let (mut party, _) = party_of(4);
        party.start_ready_check();
        party.record_ready_response(1);
        assert_eq!(party.start_ready_check(), 1);
        assert_eq!(party.remaining_responders(), 3);
        assert_eq!(party.record_ready_response(1), ReadyResponse::Ignored);
        assert_eq!(
            party.record_ready_response(2),
            ReadyResponse::Counted { finished: false }
        );
    }
}
