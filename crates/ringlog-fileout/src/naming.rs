//! File-name splitting and index bookkeeping for `prefix.#.suffix`-style
//! rotating names, grounded on `output_file::{output_file, update_name,
//! read_link}` in the original.

use std::path::Path;

/// Split a pattern like `/var/log/app.#.log` into a prefix/suffix pair and
/// the stable symlink name. A pattern with no `#` gets an implicit
/// `prefix.` / empty-suffix split and the symlink is the pattern itself.
pub struct NameTemplate {
    prefix: String,
    suffix: String,
    symlink: String,
    index_width: usize,
}

impl NameTemplate {
    #[must_use]
    pub fn new(pattern: &str, max_count: u32) -> Self {
        let index_width = index_width_for(max_count);

        if let Some(split) = pattern.find('#') {
            let prefix = pattern[..split].to_string();
            let suffix = pattern[split + 1..].to_string();

            // Collapse a duplicated separator character so
            // "app.#.log" doesn't produce a symlink "app..log".
            let mut symlink_end = split;
            if split > 0 {
                let before = pattern.as_bytes()[split - 1];
                if let Some(&after) = suffix.as_bytes().first() {
                    if before == after {
                        symlink_end = split - 1;
                    }
                }
            }
            let symlink = format!("{}{}", &pattern[..symlink_end], suffix);
            Self { prefix, suffix, symlink, index_width }
        } else {
            Self { prefix: format!("{pattern}."), suffix: String::new(), symlink: pattern.to_string(), index_width }
        }
    }

    #[must_use]
    pub fn symlink_path(&self) -> &str {
        &self.symlink
    }

    /// Render the chunk file name for `index`.
    #[must_use]
    pub fn chunk_name(&self, index: u32) -> String {
        format!("{}{:0width$}{}", self.prefix, index, self.suffix, width = self.index_width)
    }

    /// Recover the resume index from an existing symlink target, per
    /// `output_file::read_link`: strip the known prefix/suffix, parse the
    /// remaining digits, advance by one (we resume into the *next* chunk),
    /// wrapping at `max_count`. Any parse failure or out-of-range index
    /// restarts numbering at zero.
    #[must_use]
    pub fn resume_index(&self, max_count: u32) -> u32 {
        let Ok(target) = std::fs::read_link(&self.symlink) else {
            return 0;
        };
        self.parse_resume_index(&target, max_count)
    }

    fn parse_resume_index(&self, target: &Path, max_count: u32) -> u32 {
        let target = target.to_string_lossy();
        let Some(rest) = target.strip_prefix(self.prefix.as_str()) else {
            return 0;
        };
        let digits = if self.suffix.is_empty() {
            rest
        } else {
            match rest.find(self.suffix.as_str()) {
                Some(pos) => &rest[..pos],
                None => return 0,
            }
        };
        let Ok(mut index) = digits.parse::<u32>() else {
            return 0;
        };
        if index >= max_count {
            return 0;
        }
        index += 1;
        if index >= max_count {
            index = 0;
        }
        index
    }

    /// Swap in a temporary symlink pointing at `target`, then atomically
    /// rename it over the stable symlink path. Errors are logged, not
    /// propagated: a failed symlink update is cosmetic, the file output
    /// itself keeps working.
    pub fn update_link(&self, target: &str) {
        let tmp = format!("{}$", self.symlink);
        let _ = std::fs::remove_file(&tmp);
        if let Err(e) = symlink(target, &tmp) {
            eprintln!("ringlog-fileout: failed to create symlink {target} -> {tmp}: {e}");
            return;
        }
        if let Err(e) = std::fs::rename(&tmp, &self.symlink) {
            eprintln!("ringlog-fileout: failed to install symlink {}: {e}", self.symlink);
        }
    }
}

#[cfg(unix)]
fn symlink(target: &str, link: &str) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(target: &str, link: &str) -> std::io::Result<()> {
    std::fs::copy(target, link).map(|_| ())
}

fn index_width_for(max_count: u32) -> usize {
    let mut width = 1usize;
    let mut step: u64 = 10;
    while step < u64::from(max_count) {
        step *= 10;
        width += 1;
    }
    width
}
