//! Control-record opcodes and the ack protocol, grounded on
//! `internal::SPR_FLUSH` / `internal::SPR_TIMESOURCE_CHANGE` in
//! `engine.cc::flush_record`.
//!
//! A special record's `argtype` field carries one of these opcodes
//! instead of packed argument-tag nibbles (see `Record::set_opcode`). The
//! original stashes a raw `timesource*` in `argval[1]` for
//! `TIMESOURCE_CHANGE`; an `Arc<dyn Timesource>` is a fat pointer and
//! doesn't fit in one `u64`, and round-tripping it through a raw pointer
//! would need unsafe refcount bookkeeping this port has no reason to
//! take on. Instead the payload rides in `Shared::pending_timesource`
//! and the record's `argtype` opcode alone is the signal to go read it.

pub const OPCODE_FLUSH: u64 = 1;
pub const OPCODE_TIMESOURCE_CHANGE: u64 = 2;

/// Written into `argval[0]` once the engine has processed a special
/// record; callers busy-poll for this value.
pub const ACK_SENTINEL: u64 = 0x52_4e_47_4c_41_434b;
