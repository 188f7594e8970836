//! Client → server party requests, multiplexed under one opcode by a leading
//! mode byte.

use crate::ids::CharacterId;
use crate::packet::{opcode, Packet, PacketReader, PacketWriter};
use crate::wire::WireError;

pub mod mode {
    pub const INVITE: u8 = 0x01;
    pub const JOIN: u8 = 0x02;
    pub const LEAVE: u8 = 0x03;
    pub const KICK: u8 = 0x04;
    pub const SET_LEADER: u8 = 0x11;
    pub const VOTE_KICK: u8 = 0x2D;
    pub const START_READY_CHECK: u8 = 0x2E;
    pub const READY_CHECK_UPDATE: u8 = 0x30;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartyRequest {
    Invite {
        target: String,
    },
    /// Answer to an invitation from `inviter`.
    Join {
        inviter: String,
        accept: bool,
        /// Dungeon-related field; carried through untouched.
        unknown: i32,
    },
    Leave,
    Kick {
        target: CharacterId,
    },
    SetLeader {
        target: String,
    },
    VoteKick {
        target: CharacterId,
    },
    StartReadyCheck,
    /// `check_number` is the number the client saw in the start packet.
    ReadyCheckUpdate {
        check_number: i32,
        accept: u8,
    },
}

impl PartyRequest {
    /// Decode a request body (opcode already stripped).
    pub fn decode(reader: &mut PacketReader<'_>) -> Result<Self, WireError> {
        let request = match reader.read_byte()? {
            mode::INVITE => PartyRequest::Invite {
                target: reader.read_unicode_string()?,
            },
            mode::JOIN => PartyRequest::Join {
                inviter: reader.read_unicode_string()?,
                accept: reader.read_byte()? == 1,
                unknown: reader.read_int()?,
            },
            mode::LEAVE => PartyRequest::Leave,
            mode::KICK => PartyRequest::Kick {
                target: CharacterId(reader.read_long()?),
            },
            mode::SET_LEADER => PartyRequest::SetLeader {
                target: reader.read_unicode_string()?,
            },
            mode::VOTE_KICK => PartyRequest::VoteKick {
                target: CharacterId(reader.read_long()?),
            },
            mode::START_READY_CHECK => PartyRequest::StartReadyCheck,
            mode::READY_CHECK_UPDATE => PartyRequest::ReadyCheckUpdate {
                check_number: reader.read_int()?,
                accept: reader.read_byte()?,
            },
            other => return Err(WireError::UnknownMode(other)),
        };
        Ok(request)
    }

    pub fn mode(&self) -> u8 {
        match self {
            PartyRequest::Invite { .. } => mode::INVITE,
            PartyRequest::Join { .. } => mode::JOIN,
            PartyRequest::Leave => mode::LEAVE,
            PartyRequest::Kick { .. } => mode::KICK,
            PartyRequest::SetLeader { .. } => mode::SET_LEADER,
            PartyRequest::VoteKick { .. } => mode::VOTE_KICK,
            PartyRequest::StartReadyCheck => mode::START_READY_CHECK,
            PartyRequest::ReadyCheckUpdate { .. } => mode::READY_CHECK_UPDATE,
        }
    }

    /// Client-side encoding, opcode included. Used by bots and tests.
    pub fn encode(&self) -> Packet {
        let mut w = PacketWriter::of(opcode::RECV_PARTY);
        w.write_byte(self.mode());
        match self {
            PartyRequest::Invite { target } | PartyRequest::SetLeader { target } => {
                w.write_unicode_string(target);
            }
            PartyRequest::Join {
                inviter,
                accept,
                unknown,
            } => {
                w.write_unicode_string(inviter)
                    .write_byte(u8::from(*accept))
                    .write_int(*unknown);
            }
            PartyRequest::Kick { target } | PartyRequest::VoteKick { target } => {
                w.write_long(target.0);
            }
            PartyRequest::ReadyCheckUpdate {
                check_number,
                accept,
            } => {
                w.write_int(*check_number).write_byte(*accept);
            }
            PartyRequest::Leave | PartyRequest::StartReadyCheck => {}
        }
        w.build()
    }
}
