//! Ordered regex mask applied to areas to toggle section enable bits.
//!
//! Entries apply in list order; later entries override earlier ones for
//! any section they also match. A leading `!` in the literal form flips
//! polarity; an empty area or section regex means `.*`.

use regex::Regex;
use thiserror::Error;

use crate::area::Area;

#[derive(Debug, Error)]
pub enum MaskError {
    #[error("invalid area regex {0:?}: {1}")]
    BadAreaRegex(String, regex::Error),
    #[error("invalid section regex {0:?}: {1}")]
    BadSectionRegex(String, regex::Error),
}

#[derive(Clone)]
struct Entry {
    area_re: Regex,
    section_re: Regex,
    polarity: bool,
}

/// An ordered list of `(area-regex, section-regex, polarity)` entries.
#[derive(Default, Clone)]
pub struct Mask {
    entries: Vec<Entry>,
}

impl Mask {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Parse `"[!]area-regex:section-regex"` and append it to the mask.
    /// Missing area or section (empty string on either side of `:`, or no
    /// `:` at all meaning the whole literal is the area part) defaults to
    /// `.*`.
    pub fn add(&mut self, literal: &str) -> Result<(), MaskError> {
        let (polarity, rest) = literal.strip_prefix('!').map_or((true, literal), |r| (false, r));

        let (area_part, section_part) = rest.split_once(':').unwrap_or((rest, ""));
        let area_part = if area_part.is_empty() { ".*" } else { area_part };
        let section_part = if section_part.is_empty() { ".*" } else { section_part };

        let area_re = Regex::new(area_part).map_err(|e| MaskError::BadAreaRegex(area_part.to_string(), e))?;
        let section_re =
            Regex::new(section_part).map_err(|e| MaskError::BadSectionRegex(section_part.to_string(), e))?;

        self.entries.push(Entry { area_re, section_re, polarity });
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Apply every matching entry, in order, to `area`'s section bits.
    /// Idempotent: applying the same mask to the same area twice leaves
    /// the bitmap unchanged the second time.
    pub fn apply(&self, area: &Area) {
        for entry in &self.entries {
            if !entry.area_re.is_match(area.name()) {
                continue;
            }
            for (idx, section_name) in area.sections().iter().enumerate() {
                if entry.section_re.is_match(section_name) {
                    area.set_to(idx as u16, entry.polarity);
                }
            }
        }
    }

    /// Append every entry of `other` after this mask's own entries,
    /// preserving relative order — applying `self` then `other` is
    /// equivalent to applying their concatenation.
    pub fn extend(&mut self, other: Mask) {
        self.entries.extend(other.entries);
    }
}
