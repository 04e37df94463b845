//! Typed variadic log arguments and their on-record type tag.
//!
//! `ArgTag` is the 4-bit nibble packed into `Record::argtype`; `Arg` is the
//! producer-facing value a caller passes to `post`. Simple tags (`None`
//! through `Double`, and `Gstr`) carry only a scalar and are written
//! in-place by the fast inline path (`ringlog-core::record::Record::
//! set_simple_arg`). Compound tags (`Cstr`, `Xdump`, `Raw`) carry bytes
//! that must be copied into a record's tailroom by the out-of-line argpack
//! helper (`Record::set_compound_arg`).

use std::ffi::CStr;

/// On-record 4-bit type tag. Frozen at 11 variants; values above `Raw` are
/// reserved and never produced by this crate.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgTag {
    None = 0,
    Uint32 = 1,
    Int32 = 2,
    Uint64 = 3,
    Int64 = 4,
    Pointer = 5,
    Double = 6,
    Cstr = 7,
    Gstr = 8,
    Xdump = 9,
    Raw = 10,
}

impl ArgTag {
    pub const MAX: u8 = 10;

    /// Frozen classification: `UINT32`/`INT32` are 32-bit, everything else
    /// is 64-bit, regardless of target pointer width. The original
    /// implementation conditions this on `sizeof(void*)`; this port
    /// deliberately does not (see DESIGN.md Open Question resolutions).
    #[must_use]
    pub const fn is_32bit(self) -> bool {
        matches!(self, Self::Uint32 | Self::Int32)
    }

    /// Simple arguments carry only a scalar in `argval[i]`. Compound
    /// arguments (`Cstr`, `Xdump`, `Raw`) carry bytes copied into tailroom.
    #[must_use]
    pub const fn is_simple(self) -> bool {
        !matches!(self, Self::Cstr | Self::Xdump | Self::Raw)
    }

    #[must_use]
    pub const fn is_compound(self) -> bool {
        !self.is_simple()
    }

    /// Reconstruct a tag from its packed nibble. Returns `None` (the tag,
    /// not an `Option::None`) for any value outside the frozen range —
    /// decoders must treat this as the argument-list terminator, same as
    /// the literal `ArgTag::None`.
    #[must_use]
    pub const fn from_nibble(v: u8) -> Self {
        match v {
            1 => Self::Uint32,
            2 => Self::Int32,
            3 => Self::Uint64,
            4 => Self::Int64,
            5 => Self::Pointer,
            6 => Self::Double,
            7 => Self::Cstr,
            8 => Self::Gstr,
            9 => Self::Xdump,
            10 => Self::Raw,
            _ => Self::None,
        }
    }
}

/// A format descriptor for `XDUMP` arguments, telling the formatter how to
/// render the binary blob (element width and an opaque type id the
/// formatter may interpret, e.g. "render as hex-dumped u32s").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XdumpDescriptor {
    pub elem_width: u8,
    pub type_id: u32,
}

/// Producer-facing argument value.
///
/// `Gstr` borrows a `'static` C string: the spec requires its storage to
/// outlive the engine, and the consumer thread reads it well after the
/// producer call returns, so only a `'static` reference can be stored
/// safely without the record itself carrying a lifetime.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    None,
    Uint32(u32),
    Int32(i32),
    Uint64(u64),
    Int64(i64),
    Pointer(usize),
    Double(f64),
    Cstr(&'a [u8]),
    Gstr(&'static CStr),
    Xdump(&'a [u8], XdumpDescriptor),
    Raw(&'a [u8]),
}

impl Arg<'_> {
    #[must_use]
    pub const fn tag(&self) -> ArgTag {
        match self {
            Self::None => ArgTag::None,
            Self::Uint32(_) => ArgTag::Uint32,
            Self::Int32(_) => ArgTag::Int32,
            Self::Uint64(_) => ArgTag::Uint64,
            Self::Int64(_) => ArgTag::Int64,
            Self::Pointer(_) => ArgTag::Pointer,
            Self::Double(_) => ArgTag::Double,
            Self::Cstr(_) => ArgTag::Cstr,
            Self::Gstr(_) => ArgTag::Gstr,
            Self::Xdump(..) => ArgTag::Xdump,
            Self::Raw(_) => ArgTag::Raw,
        }
    }
}

impl From<u32> for Arg<'static> {
    fn from(v: u32) -> Self {
        Self::Uint32(v)
    }
}
impl From<i32> for Arg<'static> {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}
impl From<u64> for Arg<'static> {
    fn from(v: u64) -> Self {
        Self::Uint64(v)
    }
}
impl From<i64> for Arg<'static> {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}
impl From<f64> for Arg<'static> {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}
impl<'a> From<&'a str> for Arg<'a> {
    fn from(v: &'a str) -> Self {
        Self::Cstr(v.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_32bit_is_frozen_regardless_of_tag_value() {
        assert!(ArgTag::Uint32.is_32bit());
        assert!(ArgTag::Int32.is_32bit());
        assert!(!ArgTag::Uint64.is_32bit());
        assert!(!ArgTag::Pointer.is_32bit());
        assert!(!ArgTag::Double.is_32bit());
    }

    #[test]
    fn simple_vs_compound_classification() {
        assert!(ArgTag::Gstr.is_simple());
        assert!(ArgTag::Double.is_simple());
        assert!(ArgTag::Cstr.is_compound());
        assert!(ArgTag::Xdump.is_compound());
        assert!(ArgTag::Raw.is_compound());
    }

    #[test]
    fn nibble_round_trip() {
        for tag in [
            ArgTag::None,
            ArgTag::Uint32,
            ArgTag::Int32,
            ArgTag::Uint64,
            ArgTag::Int64,
            ArgTag::Pointer,
            ArgTag::Double,
            ArgTag::Cstr,
            ArgTag::Gstr,
            ArgTag::Xdump,
            ArgTag::Raw,
        ] {
            assert_eq!(ArgTag::from_nibble(tag as u8), tag);
        }
    }
}
