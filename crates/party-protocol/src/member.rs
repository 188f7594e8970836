use std::sync::Arc;

use crate::ids::{AccountId, CharacterId};
use crate::packet::PacketWriter;
use crate::skills::SkillTab;

/// Display-only hit point snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HitPoints {
    pub max: i32,
    pub current: i32,
}

/// What the party packets need to know about a player.
///
/// The character block is owned by the character-list codec elsewhere in the
/// server; party packets only splice it in.
pub trait MemberView {
    fn character_id(&self) -> CharacterId;
    fn account_id(&self) -> AccountId;
    fn name(&self) -> &str;
    fn hit_points(&self) -> HitPoints;
    fn skill_tab(&self) -> &SkillTab;
    fn write_character(&self, writer: &mut PacketWriter);
}

impl<T: MemberView + ?Sized> MemberView for Arc<T> {
    fn character_id(&self) -> CharacterId {
        (**self).character_id()
    }

    fn account_id(&self) -> AccountId {
        (**self).account_id()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn hit_points(&self) -> HitPoints {
        (**self).hit_points()
    }

    fn skill_tab(&self) -> &SkillTab {
        (**self).skill_tab()
    }

    fn write_character(&self, writer: &mut PacketWriter) {
        (**self).write_character(writer)
    }
}
