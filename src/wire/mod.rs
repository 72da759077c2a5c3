//! Binary Wire Codec Plumbing
//!
//! Little-endian primitive reads/writes for the rule sync protocol. The wire
//! form is produced only by a matching encoder, so every decode failure is a
//! protocol desynchronization: callers abort the sync, nothing is retried.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

/// Protocol-fatal wire decoding errors
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("Wire read failed: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid {what} tag: {tag}")]
    UnknownTag { what: &'static str, tag: u8 },
    #[error("Invalid UTF-8 in wire string")]
    InvalidUtf8,
    #[error("Unknown rule type on the wire: {0}")]
    UnknownRuleType(String),
    #[error("Encoded rule is not a `{expected}`")]
    WrongRuleType { expected: &'static str },
    #[error("Malformed formula on the wire: {0}")]
    Formula(#[from] crate::formula::FormulaError),
}

/// Accumulates the encoded form of a rule. Writes are infallible.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// u16 byte length prefix + UTF-8 bytes
    pub fn write_str(&mut self, s: &str) {
        debug_assert!(s.len() <= u16::MAX as usize, "wire string too long");
        self.write_u16(s.len() as u16);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Reads a rule back from its encoded form, in exactly the order it was written.
#[derive(Debug)]
pub struct WireReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> WireReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        match self.cursor.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(WireError::UnknownTag { what: "bool", tag }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32, WireError> {
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    pub fn read_str(&mut self) -> Result<String, WireError> {
        let len = self.read_u16()? as usize;
        let mut bytes = vec![0u8; len];
        self.cursor.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8)
    }

    /// Bytes not yet consumed (a clean decode ends at 0)
    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len() - self.cursor.position() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_roundtrip() {
        let mut w = WireWriter::new();
        w.write_bool(true);
        w.write_bool(false);
        w.write_u8(7);
        w.write_u16(513);
        w.write_u32(70_000);
        w.write_f32(1.5);
        w.write_str("quarry:stone");

        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert!(r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16().unwrap(), 513);
        assert_eq!(r.read_u32().unwrap(), 70_000);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_str().unwrap(), "quarry:stone");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_is_io_error() {
        let mut w = WireWriter::new();
        w.write_u16(3); // claims 3 string bytes, provides none
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert!(matches!(r.read_str(), Err(WireError::Io(_))));
    }

    #[test]
    fn test_bad_bool_tag() {
        let bytes = [9u8];
        let mut r = WireReader::new(&bytes);
        assert!(matches!(
            r.read_bool(),
            Err(WireError::UnknownTag { what: "bool", tag: 9 })
        ));
    }

    #[test]
    fn test_empty_string_roundtrip() {
        let mut w = WireWriter::new();
        w.write_str("");
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_str().unwrap(), "");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut w = WireWriter::new();
        w.write_u16(2);
        // raw invalid UTF-8 payload
        let mut bytes = w.into_bytes();
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        let mut r = WireReader::new(&bytes);
        assert!(matches!(r.read_str(), Err(WireError::InvalidUtf8)));
    }
}
