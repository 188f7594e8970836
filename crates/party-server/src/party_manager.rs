//! Process-wide party registry.
//!
//! Lock order is registry → party. Nothing may take the registry lock while
//! holding a party lock, which is why disbanding goes through
//! [`PartyManager::remove_if_empty`] after the caller has released its guard.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use party_protocol::{CharacterId, MemberView, PartyId};
use rand::Rng;
use tracing::info;

use crate::party::Party;
use crate::player::Player;

pub type SharedParty = Arc<Mutex<Party>>;

/// Lock a party, recovering the guard if a previous holder panicked.
pub fn lock_party(party: &SharedParty) -> MutexGuard<'_, Party> {
    match party.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Result of resolving the party an accepted invitation joins.
pub enum JoinTarget {
    /// The inviter already leads this party.
    Existing(SharedParty),
    /// A fresh two-member party was registered for inviter and joiner.
    Created(SharedParty),
}

pub struct PartyManager {
    parties: RwLock<HashMap<PartyId, SharedParty>>,
    max_party_size: usize,
}

impl PartyManager {
    pub fn new(max_party_size: usize) -> Self {
        Self {
            parties: RwLock::new(HashMap::new()),
            max_party_size,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<PartyId, SharedParty>> {
        match self.parties.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PartyId, SharedParty>> {
        match self.parties.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn max_party_size(&self) -> usize {
        self.max_party_size
    }

    /// Register a party under its id.
    pub fn add_party(&self, party: Party) -> SharedParty {
        let id = party.id();
        let shared = Arc::new(Mutex::new(party));
        self.write().insert(id, shared.clone());
        info!(party = %id, "party registered");
        shared
    }

    /// `PartyId::NONE` never resolves.
    pub fn get_party_by_id(&self, id: PartyId) -> Option<SharedParty> {
        if id.is_none() {
            return None;
        }
        self.read().get(&id).cloned()
    }

    /// The party currently led by `leader`.
    ///
    /// The answer can go stale as soon as it is returned; leader-gated callers
    /// re-check under the party lock.
    pub fn get_party_by_leader(&self, leader: CharacterId) -> Option<SharedParty> {
        let candidates: Vec<SharedParty> = self.read().values().cloned().collect();
        candidates
            .into_iter()
            .find(|party| lock_party(party).is_leader(leader))
    }

    /// The party whose roster holds `member`, whatever its back-reference says.
    pub fn get_party_by_member(&self, member: CharacterId) -> Option<SharedParty> {
        let candidates: Vec<SharedParty> = self.read().values().cloned().collect();
        candidates
            .into_iter()
            .find(|party| lock_party(party).is_member(member))
    }

    /// Find the inviter's party, or atomically create one with both players.
    ///
    /// Runs under the registry write lock so two concurrent accepts against the
    /// same unpartied inviter cannot create two parties.
    pub fn get_or_create_for_leader(&self, leader: &Arc<Player>, joiner: &Arc<Player>) -> JoinTarget {
        let mut parties = self.write();

        let existing = parties
            .values()
            .find(|party| lock_party(party).is_leader(leader.character_id()))
            .cloned();
        if let Some(party) = existing {
            return JoinTarget::Existing(party);
        }

        let id = Self::generate_id(&parties);
        let party = Party::new(id, self.max_party_size, leader.clone(), joiner.clone());
        let shared = Arc::new(Mutex::new(party));
        parties.insert(id, shared.clone());
        info!(
            party = %id,
            leader = %leader.character_id(),
            member = %joiner.character_id(),
            "party created"
        );
        JoinTarget::Created(shared)
    }

    pub fn remove_party(&self, id: PartyId) -> Option<SharedParty> {
        let removed = self.write().remove(&id);
        if removed.is_some() {
            info!(party = %id, "party disbanded");
        }
        removed
    }

    /// Disband check: drop the party if its roster is empty.
    ///
    /// Must be called without holding the party's lock.
    pub fn remove_if_empty(&self, id: PartyId) -> bool {
        let mut parties = self.write();
        let empty = match parties.get(&id) {
            Some(party) => lock_party(party).is_empty(),
            None => return false,
        };
        if empty {
            parties.remove(&id);
            info!(party = %id, "party disbanded");
        }
        empty
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn party_ids(&self) -> Vec<PartyId> {
        self.read().keys().copied().collect()
    }

    /// Random positive id, never `PartyId::NONE`, never one already in use.
    fn generate_id(parties: &HashMap<PartyId, SharedParty>) -> PartyId {
        let mut rng = rand::thread_rng();
        loop {
            let id = PartyId(rng.gen_range(1..=i32::MAX));
            if !parties.contains_key(&id) {
                return id;
            }
        }
    }
}
