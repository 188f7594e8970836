//! Player directory: resolves display names and character ids to live players.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use party_protocol::{CharacterId, MemberView};

use crate::player::Player;

/// Lookup seam consumed by the party dispatcher.
pub trait PlayerDirectory: Send + Sync {
    fn player_by_name(&self, name: &str) -> Option<Arc<Player>>;
    fn player_by_id(&self, id: CharacterId) -> Option<Arc<Player>>;
}

#[derive(Default)]
struct Tables {
    players: HashMap<CharacterId, Arc<Player>>,
    names: HashMap<String, CharacterId>,
}

/// In-memory directory of connected players, fed by the session layer.
#[derive(Default)]
pub struct SessionDirectory {
    tables: RwLock<Tables>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        match self.tables.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a player. Returns the previous entry for the same character, if any.
    pub fn insert(&self, player: Arc<Player>) -> Option<Arc<Player>> {
        let mut tables = self.write();
        let id = player.character_id();
        tables.names.insert(player.name().to_string(), id);
        let previous = tables.players.insert(id, player);
        if let Some(old) = &previous {
            if old.name() != tables.players[&id].name() {
                let old_name = old.name().to_string();
                tables.names.remove(&old_name);
            }
        }
        previous
    }

    pub fn remove(&self, id: CharacterId) -> Option<Arc<Player>> {
        let mut tables = self.write();
        let player = tables.players.remove(&id)?;
        if tables.names.get(player.name()) == Some(&id) {
            tables.names.remove(player.name());
        }
        Some(player)
    }

    pub fn len(&self) -> usize {
        self.read().players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().players.is_empty()
    }
}

impl PlayerDirectory for SessionDirectory {
    fn player_by_name(&self, name: &str) -> Option<Arc<Player>> {
        let tables = self.read();
        let id = tables.names.get(name)?;
        tables.players.get(id).cloned()
    }

    fn player_by_id(&self, id: CharacterId) -> Option<Arc<Player>> {
        self.read().players.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use party_protocol::{AccountId, Packet};

    use super::*;
    use crate::player::{NoticeKind, Session};

    struct Null;

    impl Session for Null {
        fn send(&self, _packet: Packet) {}
        fn send_notice(&self, _kind: NoticeKind, _message: &str) {}
        fn is_connected(&self) -> bool {
            true
        }
    }

    fn player(id: i64, name: &str) -> Arc<Player> {
        Arc::new(Player::new(CharacterId(id), AccountId(id), name, Arc::new(Null)))
    }

    #[test]
    fn lookup_by_name_and_id() {
        let dir = SessionDirectory::new();
        dir.insert(player(1, "Alice"));
        dir.insert(player(2, "Bob"));

        assert_eq!(dir.player_by_name("Bob").unwrap().character_id(), CharacterId(2));
        assert_eq!(dir.player_by_id(CharacterId(1)).unwrap().name(), "Alice");
        assert!(dir.player_by_name("alice").is_none());
        assert!(dir.player_by_id(CharacterId(3)).is_none());
    }

    #[test]
    fn remove_drops_both_keys() {
        let dir = SessionDirectory::new();
        dir.insert(player(1, "Alice"));
        assert!(dir.remove(CharacterId(1)).is_some());
        assert!(dir.player_by_name("Alice").is_none());
        assert!(dir.is_empty());
    }

    #[test]
    fn reinsert_with_new_name_forgets_old_name() {
        let dir = SessionDirectory::new();
        dir.insert(player(1, "Alice"));
        assert!(dir.insert(player(1, "Alicia")).is_some());
        assert!(dir.player_by_name("Alice").is_none());
        assert_eq!(dir.player_by_name("Alicia").unwrap().character_id(), CharacterId(1));
        assert_eq!(dir.len(), 1);
    }
}
