//! Record formatters: turn a `Record` plus its ring's name into bytes pushed
//! into a `ringlog_sink::Sink`.
//!
//! Mirrors the original library's `format` abstraction — `process` renders
//! one record, `header`/`footer` bracket an output chunk (called once per
//! file on open and once per rotation).

mod raw;
mod raw_decode;
mod text;

pub use raw::{RawFormatter, WireVersion};
pub use raw_decode::{decode, DecodeError, DecodedRecord, DecodedWireArg};
pub use text::TextFormatter;

use ringlog_core::Record;
use ringlog_sink::Sink;

/// What a formatter needs to render one record: the record itself plus the
/// name of the ring it came from (the record's own `area`/`section` are
/// reachable through the record).
pub struct FormatData<'a> {
    pub ring_name: &'a str,
    pub record: &'a Record,
}

/// A pluggable record-to-bytes renderer.
pub trait Formatter: Send {
    /// Render one record into `sink`.
    fn process(&mut self, sink: &mut dyn Sink, data: &FormatData<'_>);

    /// Called once when a new output chunk opens (a fresh file, a new pipe
    /// connection). `first` is true only for the very first chunk of the
    /// output's lifetime.
    fn header(&mut self, _sink: &mut dyn Sink, _name: &str, _first: bool) {}

    /// Called once when an output chunk closes. `next_name` is `None` for
    /// the last chunk (final shutdown), `Some` for a mid-stream rotation.
    fn footer(&mut self, _sink: &mut dyn Sink, _next_name: Option<&str>) {}
}

pub(crate) fn area_and_section_names(record: &Record) -> (&str, &str) {
    match &record.area {
        Some(area) => {
            let section = record.section();
            let name = area.sections().get(section as usize).map_or("INVALID", String::as_str);
            (area.name(), name)
        }
        None => ("INVALID", "INVALID"),
    }
}
