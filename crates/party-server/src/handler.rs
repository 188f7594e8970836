//! Party request dispatcher.
//!
//! Decodes the mode byte, applies the state transition and fans the resulting
//! packets out. Unresolvable targets, non-leaders and stale ready-check
//! responses are dropped without a reply; the client tolerates missing
//! responses but desyncs on unexpected error frames.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use party_protocol::{
    party_packet, CharacterId, LeaveKind, MemberView, PacketReader, PartyId, PartyRequest,
};
use tracing::{debug, info, warn};

use crate::directory::PlayerDirectory;
use crate::party::{Party, ReadyResponse};
use crate::party_manager::{lock_party, JoinTarget, PartyManager};
use crate::player::{NoticeKind, Player};

pub struct PartyHandler {
    parties: Arc<PartyManager>,
    directory: Arc<dyn PlayerDirectory>,
    started: Instant,
}

impl PartyHandler {
    pub fn new(parties: Arc<PartyManager>, directory: Arc<dyn PlayerDirectory>) -> Self {
        Self {
            parties,
            directory,
            started: Instant::now(),
        }
    }

    pub fn parties(&self) -> &Arc<PartyManager> {
        &self.parties
    }

    /// Handle one party packet body (opcode already consumed).
    pub fn handle(&self, caller: &Arc<Player>, packet: &mut PacketReader<'_>) {
        match PartyRequest::decode(packet) {
            Ok(request) => self.dispatch(caller, request),
            Err(err) => warn!(
                player = %caller.character_id(),
                error = %err,
                "dropping malformed party request"
            ),
        }
    }

    pub fn dispatch(&self, caller: &Arc<Player>, request: PartyRequest) {
        match request {
            PartyRequest::Invite { target } => self.handle_invite(caller, &target),
            PartyRequest::Join {
                inviter, accept, ..
            } => self.handle_join(caller, &inviter, accept),
            PartyRequest::Leave => self.handle_leave(caller),
            PartyRequest::Kick { target } => self.handle_kick(caller, target),
            PartyRequest::SetLeader { target } => self.handle_set_leader(caller, &target),
            PartyRequest::VoteKick { target } => self.handle_vote_kick(caller, target),
            PartyRequest::StartReadyCheck => self.handle_start_ready_check(caller),
            PartyRequest::ReadyCheckUpdate {
                check_number,
                accept,
            } => self.handle_ready_check_update(caller, check_number, accept),
        }
    }

    fn handle_invite(&self, caller: &Arc<Player>, target: &str) {
        let Some(other) = self.directory.player_by_name(target) else {
            debug!(target, "invite target not found");
            return;
        };

        if other.party_id().is_none() {
            other.send(party_packet::invite(caller));
            if caller.party_id().is_none() {
                caller.send(party_packet::create(caller));
            }
        } else {
            caller.send_notice(
                NoticeKind::Alert2,
                &format!("{} is already in a party.", other.name()),
            );
        }
    }

    fn handle_join(&self, caller: &Arc<Player>, inviter: &str, accept: bool) {
        let Some(party_leader) = self.directory.player_by_name(inviter) else {
            debug!(inviter, "inviter not found");
            return;
        };

        if !accept {
            party_leader.send_notice(
                NoticeKind::Alert2,
                &format!("{} declined the invitation.", caller.name()),
            );
            return;
        }

        if !caller.party_id().is_none() {
            debug!(player = %caller.character_id(), "joiner already in a party");
            return;
        }

        match self.parties.get_or_create_for_leader(&party_leader, caller) {
            JoinTarget::Existing(shared) => {
                let mut party = lock_party(&shared);
                if party.is_empty() || !party.is_leader(party_leader.character_id()) {
                    debug!(party = %party.id(), "party changed before join");
                    return;
                }
                if party.is_full() {
                    caller.send_notice(NoticeKind::Alert2, "The party is full.");
                    return;
                }
                // Existing party: introduce the joiner to everyone already there.
                party.broadcast(&party_packet::join(caller));
                party.broadcast(&party_packet::update_player(caller));
                party.broadcast(&party_packet::update_hitpoints(caller));
                party.add_member(caller.clone());

                self.replay_roster(caller, &party_leader, &party);
            }
            JoinTarget::Created(shared) => {
                let party = lock_party(&shared);
                party_leader.send(party_packet::join(caller));
                party_leader.send(party_packet::update_player(caller));
                party_leader.send(party_packet::update_hitpoints(caller));
                party_leader.send(party_packet::update_hitpoints(&party_leader));

                // The inviter is only marked here, in the new-party branch.
                if !party_leader.party_id().is_none() {
                    warn!(
                        player = %party_leader.character_id(),
                        previous = %party_leader.party_id(),
                        "inviter moved out of a party it does not lead"
                    );
                }
                party_leader.set_party_id(party.id());

                self.replay_roster(caller, &party_leader, &party);
            }
        }
    }

    /// Bring a joiner's client up to date with the whole roster.
    fn replay_roster(&self, caller: &Arc<Player>, party_leader: &Arc<Player>, party: &Party) {
        caller.set_party_id(party.id());

        caller.send(party_packet::create_existing(party_leader, party.members()));
        caller.send(party_packet::update_player(caller));
        let first = party.members().first().map(|m| m.character_id());
        for member in party.members() {
            // Compatibility shim: the create packet already drew the first roster
            // entry, and a second join for it breaks the client UI.
            if Some(member.character_id()) != first {
                caller.send(party_packet::join(member));
            }
            caller.send(party_packet::update_hitpoints(member));
        }
        info!(
            party = %party.id(),
            player = %caller.character_id(),
            members = party.len(),
            "player joined party"
        );
    }

    fn handle_leave(&self, caller: &Arc<Player>) {
        let party = self.parties.get_party_by_id(caller.party_id());
        caller.send(party_packet::leave(caller, LeaveKind::Itself));
        caller.set_party_id(PartyId::NONE);
        let Some(shared) = party else {
            return;
        };

        let id = {
            let mut party = lock_party(&shared);
            party.remove_member(caller);
            party.broadcast(&party_packet::leave(caller, LeaveKind::Other));
            if party.leader().character_id() == caller.character_id() {
                if let Some(leader) = party.find_new_leader() {
                    info!(party = %party.id(), leader = %leader.character_id(), "leader failover");
                }
            }
            party.id()
        };
        self.parties.remove_if_empty(id);
    }

    fn handle_kick(&self, caller: &Arc<Player>, target: CharacterId) {
        let Some(shared) = self.parties.get_party_by_leader(caller.character_id()) else {
            debug!(player = %caller.character_id(), "kick from non-leader");
            return;
        };
        let Some(kicked) = self.directory.player_by_id(target) else {
            debug!(target = %target, "kick target not found");
            return;
        };

        let id = {
            let mut party = lock_party(&shared);
            if !party.is_leader(caller.character_id()) || !party.is_member(target) {
                return;
            }
            party.broadcast(&party_packet::kick(&kicked));
            party.remove_member(&kicked);
            kicked.clear_party_id(party.id());

            if party.leader().character_id() == kicked.character_id() {
                if let Some(leader) = party.find_new_leader() {
                    info!(party = %party.id(), leader = %leader.character_id(), "leader failover");
                }
            }
            party.id()
        };
        self.parties.remove_if_empty(id);
    }

    fn handle_set_leader(&self, caller: &Arc<Player>, target: &str) {
        let Some(new_leader) = self.directory.player_by_name(target) else {
            debug!(target, "new leader not found");
            return;
        };
        let Some(shared) = self.parties.get_party_by_leader(caller.character_id()) else {
            debug!(player = %caller.character_id(), "set-leader from non-leader");
            return;
        };

        let mut party = lock_party(&shared);
        if !party.is_leader(caller.character_id()) || !party.is_member(new_leader.character_id())
        {
            return;
        }
        party.broadcast(&party_packet::set_leader(&new_leader));
        party.set_leader(&new_leader);
        info!(party = %party.id(), leader = %new_leader.character_id(), "leadership transferred");
    }

    fn handle_vote_kick(&self, caller: &Arc<Player>, target: CharacterId) {
        let Some(shared) = self.parties.get_party_by_id(caller.party_id()) else {
            return;
        };
        let Some(kicked) = self.directory.player_by_id(target) else {
            debug!(target = %target, "vote-kick target not found");
            return;
        };

        // Signal only; votes are not counted.
        lock_party(&shared).broadcast_notice(
            NoticeKind::Alert3,
            &format!("{} voted to kick {}", caller.name(), kicked.name()),
        );
    }

    fn handle_start_ready_check(&self, caller: &Arc<Player>) {
        let Some(shared) = self.parties.get_party_by_leader(caller.character_id()) else {
            debug!(player = %caller.character_id(), "ready check from non-leader");
            return;
        };

        let mut party = lock_party(&shared);
        if !party.is_leader(caller.character_id()) {
            return;
        }
        let check_number = party.start_ready_check();
        let packet = party_packet::start_ready_check(
            caller,
            party.members(),
            check_number,
            self.ready_check_timestamp(),
        );
        party.broadcast(&packet);
        debug!(party = %party.id(), check_number, "ready check started");
    }

    fn handle_ready_check_update(&self, caller: &Arc<Player>, check_number: i32, accept: u8) {
        // Clients echo the number from the start packet, one behind the counter.
        let sequence = check_number.wrapping_add(1);

        let Some(shared) = self.parties.get_party_by_id(caller.party_id()) else {
            return;
        };

        let mut party = lock_party(&shared);
        match party.record_ready_response(sequence) {
            ReadyResponse::Ignored => {
                debug!(party = %party.id(), check_number, "stale ready check response");
            }
            ReadyResponse::Counted { finished } => {
                party.broadcast(&party_packet::ready_check(caller, accept));
                if finished {
                    party.broadcast(&party_packet::end_ready_check());
                }
            }
        }
    }

    /// A character signed in. If its previous session left it on a roster,
    /// the new handle takes that slot and the client gets the roster again.
    pub fn player_connected(&self, player: &Arc<Player>) -> Option<PartyId> {
        let shared = self.parties.get_party_by_member(player.character_id())?;
        let mut party = lock_party(&shared);
        party.replace_member(player)?;

        let leader = party.leader().clone();
        self.replay_roster(player, &leader, &party);
        party.broadcast(&party_packet::update_player(player));
        info!(party = %party.id(), player = %player.character_id(), "member reattached");
        Some(party.id())
    }

    /// A session went away. Membership is kept for a reconnect unless nobody in
    /// the party is still online, in which case the party is disbanded.
    pub fn player_disconnected(&self, player: &Arc<Player>) {
        let Some(shared) = self.parties.get_party_by_id(player.party_id()) else {
            return;
        };

        let id = {
            let mut party = lock_party(&shared);
            if !party.is_abandoned() {
                return;
            }
            for member in party.members().to_vec() {
                party.remove_member(&member);
            }
            party.id()
        };
        self.parties.remove_if_empty(id);
    }

    /// Push a fresh player-update to the player's party after a status change.
    pub fn broadcast_player_update(&self, player: &Arc<Player>) {
        if let Some(shared) = self.parties.get_party_by_id(player.party_id()) {
            lock_party(&shared).broadcast(&party_packet::update_player(player));
        }
    }

    /// Push the player's current hit points to their party.
    pub fn broadcast_hitpoints(&self, player: &Arc<Player>) {
        if let Some(shared) = self.parties.get_party_by_id(player.party_id()) {
            lock_party(&shared).broadcast(&party_packet::update_hitpoints(player));
        }
    }

    fn ready_check_timestamp(&self) -> i64 {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        unix + self.started.elapsed().as_millis() as i64
    }
}
