//! Skill-tab block appended after character data in join, create,
//! create-existing and player-update packets.

use std::collections::HashMap;

use crate::packet::PacketWriter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Skill {
    pub learned: u8,
    pub level: i32,
}

/// The first skill tab of a character: skill ids in client order plus the
/// number of trailing "overflow" entries that follow the split marker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SkillTab {
    pub order: Vec<i32>,
    pub split: u8,
    pub skills: HashMap<i32, Skill>,
}

impl SkillTab {
    pub fn new(order: Vec<i32>, split: u8) -> Self {
        Self {
            order,
            split,
            skills: HashMap::new(),
        }
    }

    pub fn with_skill(mut self, id: i32, learned: u8, level: i32) -> Self {
        self.skills.insert(id, Skill { learned, level });
        self
    }

    /// Index in `order` in front of which the split marker is written, if any.
    fn split_index(&self) -> Option<usize> {
        let split = self.split as usize;
        if split == 0 || split > self.order.len() {
            return None;
        }
        Some(self.order.len() - split)
    }

    /// Write the block: head count, then `(0, learned, id, level, 0)` per skill
    /// with the `split` byte in front of the first overflow entry.
    pub fn write(&self, writer: &mut PacketWriter) {
        let split_index = self.split_index();
        let split_id = split_index.map(|idx| self.order[idx]);
        let head = split_index.unwrap_or(self.order.len());
        writer.write_byte(head as u8);

        for &id in &self.order {
            if Some(id) == split_id {
                writer.write_byte(self.split);
            }
            let skill = self.skills.get(&id).copied().unwrap_or_default();
            writer
                .write_byte(0)
                .write_byte(skill.learned)
                .write_int(id)
                .write_int(skill.level)
                .write_byte(0);
        }
    }
}
