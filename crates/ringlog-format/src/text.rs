//! Human-readable line formatter, grounded on the original's
//! `format_basic` default/fast header plus its `output_without_fmt` arg
//! rendering. The printf-style "first arg is a format string" path
//! (`output_with_fmt`) is intentionally not reproduced — it existed only to
//! drive libffi's `fprintf`, which has no idiomatic Rust analogue; instead
//! a leading `CSTR`/`GSTR` argument is rendered as a plain literal and any
//! remaining arguments are appended space-separated, same as every other
//! argument.

use std::fmt::Write as _;

use ringlog_core::{DecodedArg, Record};
use ringlog_sink::Sink;

use crate::{area_and_section_names, FormatData, Formatter};

/// Renders one record per line: `<secs>.<nsecs> <ring>:<seqnum>
/// <area>:<section> <args...>\n`.
#[derive(Default)]
pub struct TextFormatter {
    line: String,
}

impl TextFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self { line: String::with_capacity(256) }
    }

    fn render_header(&mut self, ring_name: &str, record: &Record) {
        let (area_name, section_name) = area_and_section_names(record);
        let secs = record.timestamp / 1_000_000_000;
        let nsecs = record.timestamp % 1_000_000_000;
        let _ = write!(
            self.line,
            "{secs}.{nsecs:09} {ring_name}:{seqnum} {area_name}:{section_name} ",
            seqnum = record.seqnum()
        );
    }

    fn render_args(&mut self, record: &Record) {
        for i in 0..record.arg_count() {
            if i > 0 {
                self.line.push(' ');
            }
            match record.decode_arg(i) {
                DecodedArg::None => {}
                DecodedArg::Uint32(v) => {
                    let _ = write!(self.line, "{v}");
                }
                DecodedArg::Int32(v) => {
                    let _ = write!(self.line, "{v}");
                }
                DecodedArg::Uint64(v) => {
                    let _ = write!(self.line, "{v}");
                }
                DecodedArg::Int64(v) => {
                    let _ = write!(self.line, "{v}");
                }
                DecodedArg::Pointer(v) => {
                    let _ = write!(self.line, "{v:#x}");
                }
                DecodedArg::Double(v) => {
                    let _ = write!(self.line, "{v}");
                }
                DecodedArg::Cstr(bytes) => {
                    if bytes.is_empty() {
                        self.line.push_str("(null)");
                    } else {
                        self.line.push_str(&String::from_utf8_lossy(bytes));
                    }
                }
                DecodedArg::Gstr(cstr) => {
                    self.line.push_str(&cstr.to_string_lossy());
                }
                DecodedArg::Xdump(bytes, _desc) => {
                    self.render_hexdump(bytes);
                }
                DecodedArg::Raw(bytes) => {
                    let _ = write!(self.line, "rawdata {} bytes", bytes.len());
                }
            }
        }
    }

    fn render_hexdump(&mut self, bytes: &[u8]) {
        self.line.push('\n');
        for (row_idx, row) in bytes.chunks(16).enumerate() {
            let _ = write!(self.line, "\t{:03}: ", row_idx * 16);
            for i in 0..16 {
                match row.get(i) {
                    Some(b) => {
                        let _ = write!(self.line, "{b:02x} ");
                    }
                    None => self.line.push_str("   "),
                }
            }
            self.line.push_str("  ");
            for &b in row {
                self.line.push(if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' });
            }
            self.line.push('\n');
        }
    }
}

impl Formatter for TextFormatter {
    fn process(&mut self, sink: &mut dyn Sink, data: &FormatData<'_>) {
        self.line.clear();
        self.render_header(data.ring_name, data.record);
        self.render_args(data.record);
        self.line.push('\n');
        sink.push(self.line.as_bytes());
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
    fn renders_a_scalar_record_as_one_line() {
        let ring = Ring::new("r", RingOptions::new(8, 0, RingFlags::empty(), 32), Arc::new(AtomicBool::new(false)));
        let mut g = ring.push_begin().unwrap();
        g.begin(None, 5_000_000_000, 7, 0);
        g.set_arg(0, &Arg::Uint32(42));
        g.commit();

        let (head, _) = ring.consumer_snapshot();
        let record = ring.record_at(head);

        let mut out = Vec::new();
        let mut sink = FdSink::new(&mut out, 256);
        let mut fmt = TextFormatter::new();
        fmt.process(&mut sink, &FormatData { ring_name: "r", record });
        sink.flush();

        let line = String::from_utf8(out).unwrap();
        assert!(line.starts_with("5.000000000 r:7 INVALID:INVALID 42\n"), "got {line:?}");
    }
}
