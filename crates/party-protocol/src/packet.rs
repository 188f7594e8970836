//! Little-endian packet primitives shared by every party message.
//!
//! Text is written as a 16-bit count of UTF-16 code units followed by the
//! units themselves, which is what the client expects for names.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::wire::WireError;

/// A finished, immutable outbound packet (opcode included).
pub type Packet = Bytes;

/// Opcodes the party subsystem sends and receives on.
pub mod opcode {
    /// Client → server party requests.
    pub const RECV_PARTY: u16 = 0x0020;
    /// Server → client party messages.
    pub const SEND_PARTY: u16 = 0x004E;
}

#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    /// Start a packet with its 16-bit opcode.
    pub fn of(opcode: u16) -> Self {
        let mut writer = Self {
            buf: BytesMut::with_capacity(64),
        };
        writer.buf.put_u16_le(opcode);
        writer
    }

    /// A writer with no opcode, for request bodies and nested blocks.
    pub fn raw() -> Self {
        Self::default()
    }

    pub fn write_byte(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn write_short(&mut self, value: i16) -> &mut Self {
        self.buf.put_i16_le(value);
        self
    }

    pub fn write_int(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32_le(value);
        self
    }

    pub fn write_long(&mut self, value: i64) -> &mut Self {
        self.buf.put_i64_le(value);
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    pub fn write_unicode_string(&mut self, value: &str) -> &mut Self {
        let units: Vec<u16> = value.encode_utf16().collect();
        // Names are bounded well below u16::MAX by the client; clamp rather than wrap.
        let len = units.len().min(u16::MAX as usize);
        self.buf.put_u16_le(len as u16);
        for unit in &units[..len] {
            self.buf.put_u16_le(*unit);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn build(self) -> Packet {
        self.buf.freeze()
    }
}

/// Cursor over an inbound payload. Every read is bounds-checked.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < needed {
            return Err(WireError::Truncated {
                offset: self.offset,
                needed,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    pub fn read_byte(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?.get_u8())
    }

    pub fn read_short(&mut self) -> Result<i16, WireError> {
        Ok(self.take(2)?.get_i16_le())
    }

    pub fn read_ushort(&mut self) -> Result<u16, WireError> {
        Ok(self.take(2)?.get_u16_le())
    }

    pub fn read_int(&mut self) -> Result<i32, WireError> {
        Ok(self.take(4)?.get_i32_le())
    }

    pub fn read_long(&mut self) -> Result<i64, WireError> {
        Ok(self.take(8)?.get_i64_le())
    }

    pub fn read_unicode_string(&mut self) -> Result<String, WireError> {
        let start = self.offset;
        let len = self.read_ushort()? as usize;
        let mut raw = self.take(len * 2)?;
        let mut units = Vec::with_capacity(len);
        while raw.has_remaining() {
            units.push(raw.get_u16_le());
        }
        String::from_utf16(&units).map_err(|_| WireError::InvalidString(start))
    }

    /// Consume and check the leading opcode.
    pub fn expect_opcode(&mut self, expected: u16) -> Result<(), WireError> {
        let found = self.read_ushort()?;
        if found != expected {
            return Err(WireError::UnexpectedOpcode { expected, found });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_is_little_endian() {
        let mut w = PacketWriter::of(0x1234);
        w.write_byte(0xAB).write_short(-2).write_int(1).write_long(0x0102030405060708);
        assert_eq!(
            &w.build()[..],
            &[
                0x34, 0x12, 0xAB, 0xFE, 0xFF, 0x01, 0x00, 0x00, 0x00, 0x08, 0x07, 0x06, 0x05,
                0x04, 0x03, 0x02, 0x01
            ]
        );
    }

    #[test]
    fn unicode_string_is_length_prefixed_utf16() {
        let mut w = PacketWriter::raw();
        w.write_unicode_string("Hé");
        let bytes = w.build();
        assert_eq!(&bytes[..], &[0x02, 0x00, b'H', 0x00, 0xE9, 0x00]);

        let mut r = PacketReader::new(&bytes);
        assert_eq!(r.read_unicode_string().unwrap(), "Hé");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn reader_reports_truncation() {
        let data = [0x01, 0x02];
        let mut r = PacketReader::new(&data);
        assert_eq!(
            r.read_int(),
            Err(WireError::Truncated {
                offset: 0,
                needed: 4,
                remaining: 2
            })
        );
        // A failed read does not advance the cursor.
        assert_eq!(r.read_short().unwrap(), 0x0201);
    }

    #[test]
    fn string_longer_than_payload_is_truncated() {
        let data = [0x05, 0x00, b'a', 0x00];
        let mut r = PacketReader::new(&data);
        assert!(matches!(
            r.read_unicode_string(),
            Err(WireError::Truncated { .. })
        ));
    }

    #[test]
    fn unpaired_surrogate_is_rejected() {
        let data = [0x01, 0x00, 0x00, 0xD8];
        let mut r = PacketReader::new(&data);
        assert_eq!(r.read_unicode_string(), Err(WireError::InvalidString(0)));
    }

    #[test]
    fn opcode_mismatch() {
        let data = [0x21, 0x00];
        let mut r = PacketReader::new(&data);
        assert_eq!(
            r.expect_opcode(opcode::RECV_PARTY),
            Err(WireError::UnexpectedOpcode {
                expected: opcode::RECV_PARTY,
                found: 0x0021
            })
        );
    }
}
