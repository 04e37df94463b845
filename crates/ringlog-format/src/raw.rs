//! Raw wire formatter: a byte-exact encoding meant for external decoders,
//! grounded on the original's `format_raw`/`raw_packer`. Two wire versions
//! exist because `XDUMP`/`RAW` length prefixes widened from `u16` to `u32`
//! between them; `WireVersion` selects which one a given output speaks.

use ringlog_core::{DecodedArg, Record};
use ringlog_sink::Sink;

use crate::{area_and_section_names, FormatData, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireVersion {
    V1_0,
    V1_1,
}

pub struct RawFormatter {
    version: WireVersion,
    /// Scratch buffer reused across `process` calls to avoid a per-record
    /// allocation.
    scratch: Vec<u8>,
}

impl RawFormatter {
    #[must_use]
    pub fn new(version: WireVersion) -> Self {
        Self { version, scratch: Vec::with_capacity(256) }
    }

    fn add_u8_str(&mut self, s: &str) {
        let bytes = s.as_bytes();
        let len = bytes.len().min(u8::MAX as usize) as u8;
        self.scratch.push(len);
        self.scratch.extend_from_slice(&bytes[..len as usize]);
    }

    fn add_compound(&mut self, bytes: &[u8]) {
        match self.version {
            WireVersion::V1_0 => {
                let len = bytes.len().min(u16::MAX as usize) as u16;
                self.scratch.extend_from_slice(&len.to_le_bytes());
                self.scratch.extend_from_slice(&bytes[..len as usize]);
            }
            WireVersion::V1_1 => {
                let len = bytes.len() as u32;
                self.scratch.extend_from_slice(&len.to_le_bytes());
                self.scratch.extend_from_slice(bytes);
            }
        }
    }

    fn add_args(&mut self, record: &Record) {
        self.scratch.extend_from_slice(&record.argtype().to_le_bytes());
        for i in 0..record.arg_count() {
            match record.decode_arg(i) {
                DecodedArg::None => break,
                DecodedArg::Cstr(b) | DecodedArg::Xdump(b, _) | DecodedArg::Raw(b) => self.add_compound(b),
                DecodedArg::Gstr(cstr) => self.add_compound(cstr.to_bytes()),
                DecodedArg::Int32(v) => self.scratch.extend_from_slice(&v.to_le_bytes()),
                DecodedArg::Uint32(v) => self.scratch.extend_from_slice(&v.to_le_bytes()),
                DecodedArg::Uint64(v) => self.scratch.extend_from_slice(&v.to_le_bytes()),
                DecodedArg::Int64(v) => self.scratch.extend_from_slice(&v.to_le_bytes()),
                DecodedArg::Pointer(v) => self.scratch.extend_from_slice(&(v as u64).to_le_bytes()),
                DecodedArg::Double(v) => self.scratch.extend_from_slice(&v.to_bits().to_le_bytes()),
            }
        }
    }
}

impl Formatter for RawFormatter {
    fn process(&mut self, sink: &mut dyn Sink, data: &FormatData<'_>) {
        self.scratch.clear();
        let (area_name, section_name) = area_and_section_names(data.record);

        self.scratch.extend_from_slice(&data.record.timestamp.to_le_bytes());
        self.scratch.extend_from_slice(&data.record.seqnum().to_le_bytes());
        self.add_u8_str(data.ring_name);
        self.add_u8_str(area_name);
        self.add_u8_str(section_name);
        self.add_args(data.record);

        sink.push(&self.scratch);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    use ringlog_core::{Arg, Ring, RingFlags, RingOptions};
    use ringlog_sink::FdSink;

    use super::*;

    #[test]
    fn encodes_ring_name_and_scalar_argument() {
        let ring = Ring::new("r1", RingOptions::new(8, 0, RingFlags::empty(), 32), Arc::new(AtomicBool::new(false)));
        let mut g = ring.push_begin().unwrap();
        g.begin(None, 123, 9, 0);
        g.set_arg(0, &Arg::Uint32(0xDEAD_BEEF));
        g.commit();

        let (head, _) = ring.consumer_snapshot();
        let record = ring.record_at(head);

        let mut out = Vec::new();
        let mut sink = FdSink::new(&mut out, 256);
        let mut fmt = RawFormatter::new(WireVersion::V1_1);
        fmt.process(&mut sink, &FormatData { ring_name: "r1", record });
        sink.flush();

        assert_eq!(&out[0..8], &123u64.to_le_bytes());
        assert_eq!(&out[8..16], &9u64.to_le_bytes());
        assert_eq!(out[16], 2); // "r1" length prefix
        assert_eq!(&out[17..19], b"r1");
    }

    #[test]
    fn xdump_length_prefix_widens_between_wire_versions() {
        let ring = Ring::new("r", RingOptions::new(8, 0, RingFlags::empty(), 64), Arc::new(AtomicBool::new(false)));
        let mut g = ring.push_begin().unwrap();
        g.begin(None, 1, 1, 0);
        g.set_arg(
            0,
            &Arg::Xdump(b"\x01\x02\x03", ringlog_core::XdumpDescriptor { elem_width: 1, type_id: 0 }),
        );
        g.commit();
        let (head, _) = ring.consumer_snapshot();
        let record = ring.record_at(head);

        let mut out_v10 = Vec::new();
        let mut sink = FdSink::new(&mut out_v10, 256);
        RawFormatter::new(WireVersion::V1_0).process(&mut sink, &FormatData { ring_name: "r", record });
        sink.flush();

        let mut out_v11 = Vec::new();
        let mut sink = FdSink::new(&mut out_v11, 256);
        RawFormatter::new(WireVersion::V1_1).process(&mut sink, &FormatData { ring_name: "r", record });
        sink.flush();

        assert!(out_v11.len() > out_v10.len(), "v1.1 uses a wider length prefix");
    }

    #[test]
    fn mixed_argument_record_round_trips_through_the_wire_encoding() {
        let ring = Ring::new("r", RingOptions::new(8, 0, RingFlags::empty(), 64), Arc::new(AtomicBool::new(false)));
        let mut g = ring.push_begin().unwrap();
        g.begin(None, 1, 1, 0);
        g.set_args(&[
            Arg::Cstr(b"hello"),
            Arg::Uint32(42),
            Arg::Double(3.5),
            Arg::Raw(&[0xDE, 0xAD, 0xBE, 0xEF]),
        ]);
        g.commit();
        let (head, _) = ring.consumer_snapshot();
        let record = ring.record_at(head);

        match record.decode_arg(0) {
            DecodedArg::Cstr(b) => assert_eq!(b, b"hello"),
            other => panic!("expected Cstr, got {other:?}"),
        }
        match record.decode_arg(1) {
            DecodedArg::Uint32(v) => assert_eq!(v, 42),
            other => panic!("expected Uint32, got {other:?}"),
        }
        match record.decode_arg(2) {
            DecodedArg::Double(v) => assert_eq!(v, 3.5),
            other => panic!("expected Double, got {other:?}"),
        }
        match record.decode_arg(3) {
            DecodedArg::Raw(b) => assert_eq!(b, &[0xDE, 0xAD, 0xBE, 0xEF]),
            other => panic!("expected Raw, got {other:?}"),
        }

        let mut out = Vec::new();
        let mut sink = FdSink::new(&mut out, 256);
        RawFormatter::new(WireVersion::V1_1).process(&mut sink, &FormatData { ring_name: "r", record });
        sink.flush();

        let decoded = crate::decode(WireVersion::V1_1, &out).unwrap();
        assert_eq!(decoded.timestamp, 1);
        assert_eq!(decoded.seqnum, 1);
        assert_eq!(decoded.ring_name, "r");
        assert_eq!(
            decoded.args,
            vec![
                crate::DecodedWireArg::Cstr(b"hello".to_vec()),
                crate::DecodedWireArg::Uint32(42),
                crate::DecodedWireArg::Double(3.5),
                crate::DecodedWireArg::Raw(vec![0xDE, 0xAD, 0xBE, 0xEF]),
            ]
        );
    }
}
