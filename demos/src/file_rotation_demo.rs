//! Walkthrough of `FileOutput`'s size-triggered chunk rotation.
//!
//! Run with: `cargo run -p ringlog-demo --bin file_rotation_demo`

use anyhow::Result;
use ringlog::{Arg, FileOutput, FileOutputOptions, FormatData, Record, TextFormatter};

fn main() -> Result<()> {
    let dir = std::env::temp_dir().join("ringlog-demo-rotation");
    std::fs::create_dir_all(&dir)?;
    let pattern = dir.join("log.#.txt");
    let pattern = pattern.to_str().expect("demo path is valid UTF-8");

    let options = FileOutputOptions { max_size: 1024, max_count: 3, ..FileOutputOptions::default() };
    let output = FileOutput::open(pattern, Box::new(TextFormatter::new()), options)?;

    let payload = b"rotation demo payload padded to push the chunk past its size limit quickly";
    for i in 0..200u64 {
        let mut record = Record::new(128);
        record.begin(None, i, i, 0);
        record.set_args(&[Arg::Uint64(i), Arg::Cstr(payload)]);
        output.write_record(&FormatData { ring_name: "demo", record: &record });
    }

    println!("wrote 200 records to {pattern}");
    println!("current chunk size: {} bytes", output.current_size());
    println!("symlink + chunks live under {}", dir.display());

    Ok(())
}
