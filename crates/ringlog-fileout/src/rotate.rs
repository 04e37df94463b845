//! `FileOutput`: the write path, size-triggered rotation signaling, and the
//! background rotation worker thread. Grounded on `output_file::{writev,
//! do_rotate, thread_loop}` in the original.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Arc, Condvar, Mutex};

use thiserror::Error;

use ringlog_core::FileOutputOptions;
use ringlog_format::{FormatData, Formatter};
use ringlog_sink::{FdSink, Sink};

use crate::naming::NameTemplate;

#[derive(Debug, Error)]
pub enum RotateError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: io::Error },
}

struct Shared {
    file: File,
    size: u64,
    index: u32,
    error: Option<String>,
}

struct RotateState {
    pending: bool,
    killed: bool,
}

/// Rotating file output. One background thread performs the actual
/// open/header/footer/close dance; the write path only ever appends to the
/// currently-open file and flips a `pending` flag when the chunk is full.
pub struct FileOutput {
    template: NameTemplate,
    max_size: u64,
    max_count: u32,
    perms: u32,
    shared: Mutex<Shared>,
    rotate: Mutex<RotateState>,
    rotate_cvar: Condvar,
    format: Mutex<Box<dyn Formatter>>,
    worker: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl FileOutput {
    /// Open (or resume) a rotating file output at `pattern` (e.g.
    /// `/var/log/app.#.log`), writing the format's header immediately and
    /// spawning the rotation helper thread.
    pub fn open(
        pattern: &str,
        mut format: Box<dyn Formatter>,
        options: FileOutputOptions,
    ) -> Result<Arc<Self>, RotateError> {
        let template = NameTemplate::new(pattern, options.max_count);
        let index = template.resume_index(options.max_count);
        let name = template.chunk_name(index);

        let file = open_chunk(&name, options.perms)?;

        let mut header = Vec::new();
        {
            let mut sink = FdSink::new(&mut header, 256);
            format.header(&mut sink, &name, true);
            sink.flush();
        }

        let this = Arc::new(Self {
            template,
            max_size: options.max_size,
            max_count: options.max_count,
            perms: options.perms,
            shared: Mutex::new(Shared { file, size: 0, index, error: None }),
            rotate: Mutex::new(RotateState { pending: false, killed: false }),
            rotate_cvar: Condvar::new(),
            format: Mutex::new(format),
            worker: Mutex::new(None),
        });

        this.write_locked(&header)?;
        this.template.update_link(&name);

        let handle = {
            let this = Arc::clone(&this);
            std::thread::spawn(move || this.rotation_loop())
        };
        *this.worker.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(handle);

        Ok(this)
    }

    fn rotation_loop(&self) {
        let mut guard = self.rotate.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        loop {
            guard = self.rotate_cvar.wait(guard).unwrap_or_else(std::sync::PoisonError::into_inner);
            if guard.killed {
                break;
            }
            if guard.pending {
                guard.pending = false;
                drop(guard);
                self.do_rotate();
                guard = self.rotate.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            }
        }
    }

    fn do_rotate(&self) {
        let next_index = {
            let shared = self.shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            (shared.index + 1) % self.max_count.max(1)
        };
        let next_name = self.template.chunk_name(next_index);

        let Ok(new_file) = open_chunk(&next_name, self.perms) else {
            // Retry on the next write-triggered wakeup, per spec §7.
            return;
        };

        let mut header_bytes = Vec::new();
        {
            let mut fmt = self.format.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut sink = FdSink::new(&mut header_bytes, 128);
            fmt.header(&mut sink, &next_name, false);
            sink.flush();
            if sink.failed() {
                return;
            }
        }

        let old_file = {
            let mut shared = self.shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut new_file = new_file;
            if new_file.write_all(&header_bytes).is_err() {
                return;
            }
            let old = std::mem::replace(&mut shared.file, new_file);
            shared.size = 0;
            shared.index = next_index;
            old
        };

        self.template.update_link(&next_name);

        let mut footer_bytes = Vec::new();
        {
            let mut fmt = self.format.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut sink = FdSink::new(&mut footer_bytes, 128);
            fmt.footer(&mut sink, Some(next_name.as_str()));
            sink.flush();
        }
        let mut old_file = old_file;
        let _ = old_file.write_all(&footer_bytes);
    }

    /// Write to the current chunk. Latches on the first failure — every
    /// write after that is a no-op, per spec: a failed file output never
    /// unlatches; callers construct a new one to resume.
    fn write_locked(&self, data: &[u8]) -> Result<(), RotateError> {
        let mut shared = self.shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if shared.error.is_some() {
            return Ok(());
        }
        if let Err(e) = shared.file.write_all(data) {
            shared.error = Some(e.to_string());
            return Err(RotateError::Open { path: "current chunk".to_string(), source: e });
        }
        shared.size += data.len() as u64;
        let over_size = shared.size >= self.max_size;
        drop(shared);

        if over_size {
            if let Ok(mut guard) = self.rotate.try_lock() {
                if !guard.pending {
                    guard.pending = true;
                    self.rotate_cvar.notify_all();
                }
            }
            // If the lock is held, the rotation thread is already busy;
            // we'll ask again on the next write that crosses max_size.
        }
        Ok(())
    }

    /// Format `record` and write the result to the current chunk.
    pub fn write_record(&self, data: &FormatData<'_>) {
        let mut buf = Vec::new();
        {
            let mut fmt = self.format.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut sink = FdSink::new(&mut buf, 512);
            fmt.process(&mut sink, data);
            sink.flush();
        }
        let _ = self.write_locked(&buf);
    }

    /// Current chunk's byte size (best-effort, may be stale by the time the
    /// caller observes it).
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner).size
    }

    /// True once a write to the current chunk has failed. Never unlatches;
    /// construct a new `FileOutput` to resume.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner).error.is_some()
    }

    /// Cause of the failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.shared.lock().unwrap_or_else(std::sync::PoisonError::into_inner).error.clone()
    }
}

impl Drop for FileOutput {
    fn drop(&mut self) {
        {
            let mut guard = self.rotate.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            guard.killed = true;
            self.rotate_cvar.notify_all();
        }
        let handle = self.worker.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }

        let mut footer = Vec::new();
        {
            let mut fmt = self.format.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut sink = FdSink::new(&mut footer, 128);
            fmt.footer(&mut sink, None);
            sink.flush();
        }
        let _ = self.write_locked(&footer);
    }
}

fn open_chunk(path: &str, perms: u32) -> Result<File, RotateError> {
    let mut opts = OpenOptions::new();
    // No O_APPEND: each chunk is only ever written sequentially by this
    // process from a fresh open, so a plain write cursor starting at 0
    // (after truncating any stale file left over from index wraparound)
    // is equivalent and avoids the platform-specific append+truncate
    // interaction.
    opts.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(perms);
    }
    #[cfg(not(unix))]
    {
        let _ = perms;
    }
    opts.open(path).map_err(|e| RotateError::Open { path: path.to_string(), source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringlog_format::TextFormatter;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("ringlog-fileout-{tag}-{}", std::process::id()));
        let _ = std::fs::create_dir_all(&dir);
        dir
    }

    #[test]
    fn open_creates_the_first_chunk_and_symlink() {
        let dir = temp_dir("open");
        let pattern = dir.join("app.#.log");
        let out = FileOutput::open(
            pattern.to_str().unwrap(),
            Box::new(TextFormatter::new()),
            FileOutputOptions { max_size: 1024, max_count: 4, ..FileOutputOptions::default() },
        )
        .unwrap();
        assert!(std::path::Path::new(&dir.join("app.0.log")).exists());
        assert!(std::path::Path::new(&dir.join("app.log")).exists());
        drop(out);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_record_appends_bytes_to_the_current_chunk() {
        let dir = temp_dir("write");
        let pattern = dir.join("w.#.log");
        let ring = ringlog_core::Ring::new(
            "r",
            ringlog_core::RingOptions::new(8, 0, ringlog_core::RingFlags::empty(), 32),
            Arc::new(std::sync::atomic::AtomicBool::new(false)),
        );
        let mut g = ring.push_begin().unwrap();
        g.begin(None, 1, 1, 0);
        g.set_arg(0, &ringlog_core::Arg::Uint32(7));
        g.commit();
        let (head, _) = ring.consumer_snapshot();
        let record = ring.record_at(head);

        let out = FileOutput::open(
            pattern.to_str().unwrap(),
            Box::new(TextFormatter::new()),
            FileOutputOptions { max_size: 1 << 30, max_count: 4, ..FileOutputOptions::default() },
        )
        .unwrap();
        out.write_record(&FormatData { ring_name: "r", record });
        assert!(out.current_size() > 0);
        drop(out);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn crossing_max_size_rotates_through_every_chunk_slot() {
        let dir = temp_dir("rotate");
        let pattern = dir.join("log.#.txt");
        let ring = ringlog_core::Ring::new(
            "r",
            ringlog_core::RingOptions::new(8, 0, ringlog_core::RingFlags::empty(), 128),
            Arc::new(std::sync::atomic::AtomicBool::new(false)),
        );

        let out = FileOutput::open(
            pattern.to_str().unwrap(),
            Box::new(TextFormatter::new()),
            FileOutputOptions { max_size: 1024, max_count: 3, ..FileOutputOptions::default() },
        )
        .unwrap();

        let payload = b"rotation test payload padded out to push the chunk past its size limit quickly";
        for i in 0..200u64 {
            let mut g = ring.push_begin().unwrap();
            g.begin(None, i, i, 0);
            g.set_args(&[ringlog_core::Arg::Uint64(i), ringlog_core::Arg::Cstr(payload)]);
            g.commit();
            let (head, _) = ring.consumer_snapshot();
            out.write_record(&FormatData { ring_name: "r", record: ring.record_at(head) });
        }

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        while std::time::Instant::now() < deadline {
            if dir.join("log.2.txt").exists() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        assert!(dir.join("log.0.txt").exists());
        assert!(dir.join("log.1.txt").exists());
        assert!(dir.join("log.2.txt").exists(), "rotation should have cycled through every chunk slot");
        assert!(dir.join("log.txt").exists(), "stable symlink should still resolve after rotation");

        drop(out);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
