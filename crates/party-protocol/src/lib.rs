//! Party protocol: the wire format of the party opcode.
//!
//! Pure codec. Holds no state and knows nothing about sessions; the server
//! crate decides who receives which packet.

pub mod ids;
pub mod member;
pub mod packet;
pub mod party_packet;
pub mod request;
pub mod skills;
pub mod wire;

pub use ids::{AccountId, CharacterId, PartyId};
pub use member::{HitPoints, MemberView};
pub use packet::{opcode, Packet, PacketReader, PacketWriter};
pub use party_packet::LeaveKind;
pub use request::PartyRequest;
pub use skills::{Skill, SkillTab};
pub use wire::WireError;
