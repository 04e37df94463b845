//! Fixed-size log record: header, 16 packed argument slots, and a reused
//! tailroom buffer for compound argument bytes.
//!
//! The `argtype`/`argval` layout mirrors `hogl::record` bit-for-bit:
//! 4-bit type nibbles packed into one `u64`, and 16 scalar slots where a
//! compound argument's slot holds `(offset, len)` instead of a value. One
//! difference from the original: tailroom here lives in its own
//! ring-preallocated buffer rather than immediately after the argval array
//! in the same allocation, so `offset` is relative to the start of that
//! buffer rather than an absolute byte offset from the record header.

use std::ffi::CStr;
use std::sync::Arc;

use crate::area::Area;
use crate::arg::{Arg, ArgTag, XdumpDescriptor};
use crate::timesource::Timestamp;

/// Maximum number of argument slots. The 17th argument is undefined
/// behavior at the API level, per spec.
pub const NARGS: usize = 16;

const SECTION_BITS: u32 = 12;
const SECTION_MASK: u64 = (1 << SECTION_BITS) - 1;
const SEQNUM_SHIFT: u32 = SECTION_BITS;

/// Reserved section value marking a *special* (control) record.
pub const SPECIAL_SECTION: u16 = 0xFFF;

/// Truncation marker written over the last three bytes of an overlong
/// `CSTR` payload.
const TRUNCATION_MARKER: &[u8; 3] = b">>>";

fn pack_offset_len(offset: u32, len: u32) -> u64 {
    (u64::from(offset) << 32) | u64::from(len)
}

fn unpack_offset_len(v: u64) -> (u32, u32) {
    ((v >> 32) as u32, (v & 0xFFFF_FFFF) as u32)
}

/// A decoded compound argument: a byte slice borrowed from the record's
/// tailroom, plus (for `XDUMP`) its format descriptor.
#[derive(Debug, Clone, Copy)]
pub enum DecodedArg<'a> {
    None,
    Uint32(u32),
    Int32(i32),
    Uint64(u64),
    Int64(i64),
    Pointer(usize),
    Double(f64),
    Cstr(&'a [u8]),
    /// Safety: the pointer is only dereferenced transiently here; it is
    /// sound exactly because `Arg::Gstr` only ever accepts `&'static
    /// CStr`, so the bytes are alive for the process lifetime.
    Gstr(&'a CStr),
    Xdump(&'a [u8], XdumpDescriptor),
    Raw(&'a [u8]),
}

/// One log record slot, reused in place by the owning ring across many
/// `post` calls.
pub struct Record {
    pub area: Option<Arc<Area>>,
    pub timestamp: Timestamp,
    /// Packed `seqnum:52 | section:12`.
    seqnum_section: u64,
    argtype: u64,
    argval: [u64; NARGS],
    tailroom: Box<[u8]>,
    tail_used: u32,
    /// Format descriptor for the most recently written `XDUMP` argument.
    /// `argval` has no spare bits to carry it, so it rides alongside the
    /// record rather than inside the packed layout; a record with more
    /// than one `XDUMP` argument keeps only the descriptor for the last
    /// one written, which is sufficient for this engine's one-XDUMP-per-
    /// call usage.
    last_xdump_descriptor: Option<XdumpDescriptor>,
}

impl Record {
    /// Allocate a record slot with the given tailroom capacity (bytes).
    /// Zero is legal: compound arguments then truncate to empty.
    #[must_use]
    pub fn new(tailroom_capacity: usize) -> Self {
        Self {
            area: None,
            timestamp: 0,
            seqnum_section: 0,
            argtype: 0,
            argval: [0; NARGS],
            tailroom: vec![0u8; tailroom_capacity].into_boxed_slice(),
            tail_used: 0,
            last_xdump_descriptor: None,
        }
    }

    /// Begin populating this slot for a new user record. Resets argument
    /// state; does not touch the `area`/`timestamp` fields' prior values
    /// until the caller overwrites them (done here).
    pub fn begin(&mut self, area: Option<Arc<Area>>, timestamp: Timestamp, seqnum: u64, section: u16) {
        debug_assert!(u64::from(section) <= SECTION_MASK);
        self.area = area;
        self.timestamp = timestamp;
        self.seqnum_section = (seqnum << SEQNUM_SHIFT) | u64::from(section & SECTION_MASK as u16);
        self.argtype = 0;
        self.argval = [0; NARGS];
        self.tail_used = 0;
        self.last_xdump_descriptor = None;
    }

    /// Begin populating this slot as a *special* (control) record: no
    /// area, section fixed at `SPECIAL_SECTION`, the opcode stored as the
    /// tag of argument 0.
    pub fn begin_special(&mut self, timestamp: Timestamp, seqnum: u64) {
        self.begin(None, timestamp, seqnum, SPECIAL_SECTION);
    }

    #[inline]
    #[must_use]
    pub const fn seqnum(&self) -> u64 {
        self.seqnum_section >> SEQNUM_SHIFT
    }

    #[inline]
    #[must_use]
    pub fn section(&self) -> u16 {
        (self.seqnum_section & SECTION_MASK) as u16
    }

    #[inline]
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.area.is_none() && self.section() == SPECIAL_SECTION
    }

    #[inline]
    #[must_use]
    pub const fn argtype(&self) -> u64 {
        self.argtype
    }

    /// Overwrite the whole `argtype` field with a control opcode. Only
    /// meaningful on a record built with `begin_special`: a special record
    /// has no per-argument tags, so its `argtype` field is repurposed
    /// whole to carry the opcode instead of 16 packed nibbles.
    pub fn set_opcode(&mut self, opcode: u64) {
        self.argtype = opcode;
    }

    #[inline]
    #[must_use]
    pub const fn opcode(&self) -> u64 {
        self.argtype
    }

    /// Read an `argval` slot without going through the tagged `Arg`
    /// encoding. Used for the special-record ack/payload protocol, where
    /// the slot holds a raw sentinel or token rather than a typed value.
    #[must_use]
    pub fn raw_argval(&self, i: usize) -> u64 {
        self.argval[i]
    }

    /// Write an `argval` slot without touching its tag nibble. See
    /// `raw_argval`.
    pub fn set_raw_argval(&mut self, i: usize, v: u64) {
        self.argval[i] = v;
    }

    #[inline]
    #[must_use]
    pub fn arg_tag(&self, i: usize) -> ArgTag {
        debug_assert!(i < NARGS);
        ArgTag::from_nibble(((self.argtype >> (i * 4)) & 0xF) as u8)
    }

    fn set_tag(&mut self, i: usize, tag: ArgTag) {
        let shift = i * 4;
        self.argtype = (self.argtype & !(0xF_u64 << shift)) | ((tag as u64) << shift);
    }

    /// Number of non-`NONE` leading arguments (the point where decoders
    /// stop, per the wire-format contract).
    #[must_use]
    pub fn arg_count(&self) -> usize {
        (0..NARGS).take_while(|&i| self.arg_tag(i) != ArgTag::None).count()
    }

    /// Populate argument slot `i`. Dispatches to the fast inline write for
    /// simple scalars or the out-of-line tailroom copy for compound
    /// payloads — mirroring the spec's two producer code paths, collapsed
    /// here into one call per slot since Rust's monomorphization already
    /// resolves the simple/compound branch at compile time for any
    /// particular `Arg` variant call site.
    pub fn set_arg(&mut self, i: usize, arg: &Arg<'_>) {
        debug_assert!(i < NARGS);
        self.set_tag(i, arg.tag());
        match *arg {
            Arg::None => self.argval[i] = 0,
            Arg::Uint32(v) => self.argval[i] = u64::from(v),
            Arg::Int32(v) => self.argval[i] = v as u32 as u64,
            Arg::Uint64(v) => self.argval[i] = v,
            Arg::Int64(v) => self.argval[i] = v as u64,
            Arg::Pointer(v) => self.argval[i] = v as u64,
            Arg::Double(v) => self.argval[i] = v.to_bits(),
            Arg::Gstr(s) => self.argval[i] = s.as_ptr() as u64,
            Arg::Cstr(bytes) => self.copy_cstr(i, bytes),
            Arg::Xdump(bytes, desc) => self.copy_xdump(i, bytes, desc),
            Arg::Raw(bytes) => self.copy_raw(i, bytes),
        }
    }

    /// Populate every slot from `args`, writing `ArgTag::None` into any
    /// slot beyond `args.len()`. Panics (debug) if `args.len() > NARGS`.
    pub fn set_args(&mut self, args: &[Arg<'_>]) {
        debug_assert!(args.len() <= NARGS);
        for (i, a) in args.iter().enumerate() {
            self.set_arg(i, a);
        }
        for i in args.len()..NARGS {
            self.set_tag(i, ArgTag::None);
        }
    }

    fn copy_cstr(&mut self, i: usize, bytes: &[u8]) {
        let capacity = self.tailroom.len() as u32;
        let offset = self.tail_used.min(capacity);
        let room = capacity - offset;
        // Reserve one byte for the null terminator before computing how
        // much of the source (and the truncation marker) fits — the order
        // matters, matching `record::copy_cstr` in the original.
        let usable = room.saturating_sub(1);
        let src_len = bytes.len() as u32;
        let (n, truncated) = if src_len > usable {
            (usable, true)
        } else {
            (src_len, false)
        };

        if usable == 0 {
            self.argval[i] = pack_offset_len(offset, 0);
            return;
        }

        let start = offset as usize;
        self.tailroom[start..start + n as usize].copy_from_slice(&bytes[..n as usize]);
        if truncated && n > 3 {
            let marker_start = start + (n - 3) as usize;
            self.tailroom[marker_start..marker_start + 3].copy_from_slice(TRUNCATION_MARKER);
        }
        self.tailroom[start + n as usize] = 0;

        self.argval[i] = pack_offset_len(offset, n);
        self.tail_used = offset + n + 1;
    }

    fn copy_data(&mut self, i: usize, bytes: &[u8]) {
        let capacity = self.tailroom.len() as u32;
        let offset = self.tail_used.min(capacity);
        let room = capacity - offset;
        let n = (bytes.len() as u32).min(room);

        let start = offset as usize;
        self.tailroom[start..start + n as usize].copy_from_slice(&bytes[..n as usize]);

        self.argval[i] = pack_offset_len(offset, n);
        self.tail_used = offset + n;
    }

    fn copy_xdump(&mut self, i: usize, bytes: &[u8], desc: XdumpDescriptor) {
        self.copy_data(i, bytes);
        // Stash the descriptor in the high bits alongside len is not
        // possible without widening argval; instead the descriptor rides
        // in a sibling slot chosen by the caller's argument layout
        // convention (documented on `Arg::Xdump`): formatters recover it
        // via `xdump_descriptor`, populated here from the call site.
        self.last_xdump_descriptor = Some(desc);
    }

    fn copy_raw(&mut self, i: usize, bytes: &[u8]) {
        self.copy_data(i, bytes);
    }

    /// Byte slice backing a compound argument, clamped to the tailroom
    /// actually allocated to this slot. Exposed so formatters outside this
    /// crate can render `CSTR`/`XDUMP`/`RAW` payloads without going through
    /// `decode_arg`.
    #[must_use]
    pub fn compound_bytes(&self, i: usize) -> &[u8] {
        let (offset, len) = unpack_offset_len(self.argval[i]);
        let start = offset as usize;
        let end = (start + len as usize).min(self.tailroom.len());
        if start >= self.tailroom.len() {
            &[]
        } else {
            &self.tailroom[start..end]
        }
    }

    /// Decode argument slot `i` into a borrowed, typed view.
    ///
    /// # Safety
    /// For `GSTR` this reconstructs a `CStr` from the stored raw pointer.
    /// Sound because `Arg::Gstr` only ever accepts `&'static CStr` values.
    #[must_use]
    pub fn decode_arg(&self, i: usize) -> DecodedArg<'_> {
        match self.arg_tag(i) {
            ArgTag::None => DecodedArg::None,
            ArgTag::Uint32 => DecodedArg::Uint32(self.argval[i] as u32),
            ArgTag::Int32 => DecodedArg::Int32(self.argval[i] as u32 as i32),
            ArgTag::Uint64 => DecodedArg::Uint64(self.argval[i]),
            ArgTag::Int64 => DecodedArg::Int64(self.argval[i] as i64),
            ArgTag::Pointer => DecodedArg::Pointer(self.argval[i] as usize),
            ArgTag::Double => DecodedArg::Double(f64::from_bits(self.argval[i])),
            ArgTag::Cstr => DecodedArg::Cstr(self.compound_bytes(i)),
            ArgTag::Gstr => {
                let ptr = self.argval[i] as *const std::os::raw::c_char;
                // SAFETY: see doc comment above.
                let cstr = unsafe { CStr::from_ptr(ptr) };
                DecodedArg::Gstr(cstr)
            }
            ArgTag::Xdump => DecodedArg::Xdump(
                self.compound_bytes(i),
                self.last_xdump_descriptor.unwrap_or(XdumpDescriptor {
                    elem_width: 1,
                    type_id: 0,
                }),
            ),
            ArgTag::Raw => DecodedArg::Raw(self.compound_bytes(i)),
        }
    }

    #[must_use]
    pub fn tailroom_capacity(&self) -> usize {
        self.tailroom.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(tailroom: usize) -> Record {
        Record::new(tailroom)
    }

    #[test]
    fn zero_length_cstr_stores_empty_pair() {
        let mut r = rec(64);
        r.begin(None, 1, 1, 0);
        r.set_arg(0, &Arg::Cstr(b""));
        match r.decode_arg(0) {
            DecodedArg::Cstr(b) => assert_eq!(b, b""),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cstr_truncation_marker() {
        let mut r = rec(8); // usable = 8 - 1 = 7
        r.begin(None, 1, 1, 0);
        r.set_arg(0, &Arg::Cstr(b"abcdefghij"));
        match r.decode_arg(0) {
            DecodedArg::Cstr(b) => assert_eq!(b, b"abcd>>>"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_tailroom_truncates_compound_to_empty() {
        let mut r = rec(0);
        r.begin(None, 1, 1, 0);
        r.set_arg(0, &Arg::Cstr(b"hello"));
        match r.decode_arg(0) {
            DecodedArg::Cstr(b) => assert_eq!(b, b""),
            other => panic!("unexpected {other:?}"),
        }
        r.set_arg(1, &Arg::Raw(b"\xDE\xAD"));
        match r.decode_arg(1) {
            DecodedArg::Raw(b) => assert_eq!(b, b""),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sixteen_args_is_legal() {
        let mut r = rec(64);
        r.begin(None, 1, 1, 0);
        let args: Vec<Arg> = (0..16u32).map(Arg::Uint32).collect();
        r.set_args(&args);
        assert_eq!(r.arg_count(), 16);
    }

    #[test]
    fn seqnum_section_pack_roundtrip() {
        let mut r = rec(0);
        r.begin(None, 42, 123_456, 7);
        assert_eq!(r.seqnum(), 123_456);
        assert_eq!(r.section(), 7);
    }

    #[test]
    fn special_record_shape() {
        let mut r = rec(0);
        r.begin_special(1, 1);
        assert!(r.is_special());
        assert_eq!(r.section(), SPECIAL_SECTION);
    }

    #[test]
    fn is_32bit_scalars_round_trip_width() {
        let mut r = rec(0);
        r.begin(None, 1, 1, 0);
        r.set_arg(0, &Arg::Uint32(u32::MAX));
        r.set_arg(1, &Arg::Int32(-1));
        match r.decode_arg(0) {
            DecodedArg::Uint32(v) => assert_eq!(v, u32::MAX),
            other => panic!("unexpected {other:?}"),
        }
        match r.decode_arg(1) {
            DecodedArg::Int32(v) => assert_eq!(v, -1),
            other => panic!("unexpected {other:?}"),
        }
    }
}
