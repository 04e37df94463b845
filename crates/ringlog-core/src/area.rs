//! Named filter unit: an ordered list of sections with a bitmap of enable
//! bits. `Area::test(section)` is the entire producer-side filter path and
//! must stay a single bit test — no locks, no allocation.

use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Hard ceiling on section count (256K), per spec.
pub const MAX_SECTIONS: usize = 256 * 1024;

/// The six sections every area starts with, in this exact discriminant
/// order (mirrors `hogl::default_section_ids`).
pub const DEFAULT_SECTIONS: &[&str] = &["INFO", "WARN", "ERROR", "FATAL", "DEBUG", "TRACE"];

/// Internal-area sections used for engine marker records: drop markers,
/// TSO-full markers, and the engine's own diagnostics.
pub const INTERNAL_SECTIONS: &[&str] =
    &["INFO", "WARN", "ERROR", "DROPMARK", "TSOFULLMARK"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AreaError {
    #[error("area {name:?} already exists with a different section list")]
    StructuralMismatch { name: String },
    #[error("area {name:?} would exceed {MAX_SECTIONS} sections")]
    TooManySections { name: String },
    #[error("unknown section {0:?}")]
    UnknownSection(String),
}

/// Bitmap words are 64 bits; index a bit by `section / 64` / `section % 64`.
fn word_count(sections: usize) -> usize {
    sections.div_ceil(64).max(1)
}

/// A named filter unit with an ordered section-name list and a bitmap of
/// enable bits, one per section.
///
/// Section names and the name itself are immutable after construction; the
/// bitmap is the only mutable state, touched only via `set`/`reset`/mask
/// application.
#[derive(Debug)]
pub struct Area {
    name: String,
    sections: Vec<String>,
    bits: Vec<AtomicU64>,
}

impl Area {
    /// Create a new area with the given section names (plus the default
    /// six, de-duplicated, always present and first).
    pub fn new(name: impl Into<String>, extra_sections: &[&str]) -> Result<Self, AreaError> {
        let name = name.into();
        let mut sections: Vec<String> = DEFAULT_SECTIONS.iter().map(|s| (*s).to_string()).collect();
        for s in extra_sections {
            if !sections.iter().any(|existing| existing == s) {
                sections.push((*s).to_string());
            }
        }
        if sections.len() > MAX_SECTIONS {
            return Err(AreaError::TooManySections { name });
        }
        let bits = (0..word_count(sections.len())).map(|_| AtomicU64::new(0)).collect();
        Ok(Self { name, sections, bits })
    }

    /// Build the engine's internal area used for marker/diagnostic
    /// records, with `DROPMARK`/`TSOFULLMARK` pre-enabled.
    pub fn internal(name: impl Into<String>) -> Self {
        let area = Self::new(name, INTERNAL_SECTIONS).expect("internal area section count is fixed and small");
        for s in INTERNAL_SECTIONS {
            if let Some(idx) = area.section_index(s) {
                area.set(idx);
            }
        }
        area
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    #[must_use]
    pub fn section_index(&self, name: &str) -> Option<u16> {
        self.sections.iter().position(|s| s == name).map(|i| i as u16)
    }

    /// Constant-time bit test — the entire producer-side filter path.
    #[inline]
    #[must_use]
    pub fn test(&self, section: u16) -> bool {
        let (word, bit) = Self::locate(section);
        match self.bits.get(word) {
            Some(w) => (w.load(Ordering::Relaxed) >> bit) & 1 != 0,
            None => false,
        }
    }

    #[inline]
    fn locate(section: u16) -> (usize, u32) {
        ((section as usize) / 64, (section as u32) % 64)
    }

    pub fn set(&self, section: u16) {
        self.set_to(section, true);
    }

    pub fn reset(&self, section: u16) {
        self.set_to(section, false);
    }

    pub fn set_to(&self, section: u16, value: bool) {
        let (word, bit) = Self::locate(section);
        let Some(w) = self.bits.get(word) else { return };
        if value {
            w.fetch_or(1 << bit, Ordering::Relaxed);
        } else {
            w.fetch_and(!(1 << bit), Ordering::Relaxed);
        }
    }

    /// Two areas compare equal iff names and section-name sequences match.
    #[must_use]
    pub fn structurally_eq(&self, name: &str, extra_sections: &[&str]) -> bool {
        if self.name != name {
            return false;
        }
        let mut expected: Vec<String> = DEFAULT_SECTIONS.iter().map(|s| (*s).to_string()).collect();
        for s in extra_sections {
            if !expected.iter().any(|existing| existing == s) {
                expected.push((*s).to_string());
            }
        }
        self.sections == expected
    }
}

impl PartialEq for Area {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.sections == other.sections
    }
}
impl Eq for Area {}
