//! Server → client party packets.
//!
//! Layouts are fixed by the client and reproduced byte for byte, including the
//! fields nobody has decoded yet.

use crate::member::MemberView;
use crate::packet::{opcode, Packet, PacketWriter};

/// Leading sub-type byte of each outbound party packet.
pub mod mode {
    pub const JOIN: u8 = 0x02;
    pub const LEAVE: u8 = 0x03;
    pub const KICK: u8 = 0x04;
    pub const DISBAND: u8 = 0x07;
    pub const SET_LEADER: u8 = 0x08;
    pub const CREATE: u8 = 0x09;
    pub const INVITE: u8 = 0x0B;
    pub const UPDATE_PLAYER: u8 = 0x0D;
    pub const UPDATE_HITPOINTS: u8 = 0x13;
    pub const READY_CHECK_START: u8 = 0x2F;
    pub const READY_CHECK: u8 = 0x30;
    pub const READY_CHECK_END: u8 = 0x31;
}

/// Trailing flag of the leave packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LeaveKind {
    Other = 0,
    Itself = 1,
}

fn party_writer(sub_type: u8) -> PacketWriter {
    let mut writer = PacketWriter::of(opcode::SEND_PARTY);
    writer.write_byte(sub_type);
    writer
}

pub fn invite(sender: &impl MemberView) -> Packet {
    let mut w = party_writer(mode::INVITE);
    w.write_unicode_string(sender.name())
        .write_short(3843)
        .write_byte(0)
        .write_byte(0);
    w.build()
}

// The member count field is always 1 regardless of roster size; the client
// builds the rest of the UI from the member blocks that follow.
fn write_create_header(w: &mut PacketWriter, leader: &impl MemberView) {
    w.write_byte(0)
        .write_int(0)
        .write_long(leader.character_id().0)
        .write_short(1);
}

fn write_roster_entry(w: &mut PacketWriter, member: &impl MemberView) {
    member.write_character(w);
    w.write_long(0).write_int(0).write_short(0).write_byte(0);
    member.skill_tab().write(w);
}

/// Fresh single-member party view for an inviter that has no party yet.
pub fn create(leader: &impl MemberView) -> Packet {
    let mut w = party_writer(mode::CREATE);
    write_create_header(&mut w, leader);
    write_roster_entry(&mut w, leader);
    w.write_long(0);
    w.build()
}

/// Full roster replay for a player joining an existing party.
pub fn create_existing<M: MemberView>(leader: &impl MemberView, members: &[M]) -> Packet {
    let mut w = party_writer(mode::CREATE);
    write_create_header(&mut w, leader);
    for member in members {
        write_roster_entry(&mut w, member);
        w.write_byte(15);
    }
    w.write_long(0);
    w.build()
}

/// Adds a player to the party UI.
pub fn join(player: &impl MemberView) -> Packet {
    let mut w = party_writer(mode::JOIN);
    player.write_character(&mut w);
    w.write_int(0);
    player.skill_tab().write(&mut w);
    w.write_long(0);
    w.build()
}

/// Refreshes a member's location, status and character data.
pub fn update_player(player: &impl MemberView) -> Packet {
    let mut w = party_writer(mode::UPDATE_PLAYER);
    w.write_long(player.character_id().0);
    player.write_character(&mut w);
    w.write_int(0);
    player.skill_tab().write(&mut w);
    w.write_long(0);
    w.build()
}

pub fn update_hitpoints(player: &impl MemberView) -> Packet {
    let hp = player.hit_points();
    let mut w = party_writer(mode::UPDATE_HITPOINTS);
    w.write_long(player.character_id().0)
        .write_long(player.account_id().0)
        .write_int(hp.max)
        .write_int(hp.current)
        .write_short(0);
    w.build()
}

pub fn set_leader(player: &impl MemberView) -> Packet {
    let mut w = party_writer(mode::SET_LEADER);
    w.write_long(player.character_id().0);
    w.build()
}

pub fn disband() -> Packet {
    party_writer(mode::DISBAND).build()
}

pub fn leave(player: &impl MemberView, kind: LeaveKind) -> Packet {
    let mut w = party_writer(mode::LEAVE);
    w.write_long(player.character_id().0).write_byte(kind as u8);
    w.build()
}

pub fn kick(player: &impl MemberView) -> Packet {
    let mut w = party_writer(mode::KICK);
    w.write_long(player.character_id().0);
    w.build()
}

/// `check_number` is the value clients echo back in their responses.
pub fn start_ready_check<M: MemberView>(
    leader: &impl MemberView,
    members: &[M],
    check_number: i32,
    timestamp: i64,
) -> Packet {
    let mut w = party_writer(mode::READY_CHECK_START);
    w.write_byte(2)
        .write_int(check_number)
        .write_long(timestamp)
        .write_int(members.len() as i32);
    for member in members {
        w.write_long(member.character_id().0);
    }
    w.write_int(1).write_long(leader.character_id().0).write_int(0);
    w.build()
}

pub fn ready_check(player: &impl MemberView, accept: u8) -> Packet {
    let mut w = party_writer(mode::READY_CHECK);
    w.write_long(player.character_id().0).write_byte(accept);
    w.build()
}

pub fn end_ready_check() -> Packet {
    party_writer(mode::READY_CHECK_END).build()
}
