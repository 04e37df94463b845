//! Decoder for the bytes `RawFormatter` produces — the inverse of
//! `raw::RawFormatter::process`, used by external consumers (and by this
//! crate's own round-trip tests) to recover a record from captured wire
//! bytes.

use thiserror::Error;

use ringlog_core::{ArgTag, NARGS};

use crate::raw::WireVersion;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    Truncated,
    #[error("ring/area/section name is not valid utf8")]
    InvalidString,
}

/// One decoded argument. Compound payloads are owned copies of the wire
/// bytes; `Xdump`'s format descriptor isn't carried on the wire (the
/// formatter drops it), so it decodes to a bare byte blob like `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedWireArg {
    Uint32(u32),
    Int32(i32),
    Uint64(u64),
    Int64(i64),
    Pointer(u64),
    Double(f64),
    Cstr(Vec<u8>),
    Gstr(Vec<u8>),
    Xdump(Vec<u8>),
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub timestamp: u64,
    pub seqnum: u64,
    pub ring_name: String,
    pub area_name: String,
    pub section_name: String,
    pub args: Vec<DecodedWireArg>,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(DecodeError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32_le(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64_le(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn u8_str(&mut self) -> Result<String, DecodeError> {
        let len = self.u8()? as usize;
        String::from_utf8(self.take(len)?.to_vec()).map_err(|_| DecodeError::InvalidString)
    }

    fn compound(&mut self, version: WireVersion) -> Result<Vec<u8>, DecodeError> {
        let len = match version {
            WireVersion::V1_0 => u32::from(self.u16_le()?),
            WireVersion::V1_1 => self.u32_le()?,
        } as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn u16_le(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }
}

/// Decode one record from bytes produced by `RawFormatter::process` at the
/// given wire version.
pub fn decode(version: WireVersion, bytes: &[u8]) -> Result<DecodedRecord, DecodeError> {
    let mut cur = Cursor::new(bytes);

    let timestamp = cur.u64_le()?;
    let seqnum = cur.u64_le()?;
    let ring_name = cur.u8_str()?;
    let area_name = cur.u8_str()?;
    let section_name = cur.u8_str()?;

    let argtype = cur.u64_le()?;
    let mut args = Vec::new();
    for i in 0..NARGS {
        let tag = ArgTag::from_nibble(((argtype >> (i * 4)) & 0xF) as u8);
        if tag == ArgTag::None {
            break;
        }
        args.push(match tag {
            ArgTag::None => unreachable!(),
            ArgTag::Uint32 => DecodedWireArg::Uint32(cur.u32_le()?),
            ArgTag::Int32 => DecodedWireArg::Int32(cur.u32_le()? as i32),
            ArgTag::Uint64 => DecodedWireArg::Uint64(cur.u64_le()?),
            ArgTag::Int64 => DecodedWireArg::Int64(cur.u64_le()? as i64),
            ArgTag::Pointer => DecodedWireArg::Pointer(cur.u64_le()?),
            ArgTag::Double => DecodedWireArg::Double(f64::from_bits(cur.u64_le()?)),
            ArgTag::Cstr => DecodedWireArg::Cstr(cur.compound(version)?),
            ArgTag::Gstr => DecodedWireArg::Gstr(cur.compound(version)?),
            ArgTag::Xdump => DecodedWireArg::Xdump(cur.compound(version)?),
            ArgTag::Raw => DecodedWireArg::Raw(cur.compound(version)?),
        });
    }

    Ok(DecodedRecord { timestamp, seqnum, ring_name, area_name, section_name, args })
}
