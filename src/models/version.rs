//! Schema version descriptors and compatibility resolution
//!
//! A settings object declares one `(tag, revision)` pair per game release it
//! supports. Tags follow an `[edition]major.minor[.patch...]` grammar where the
//! edition marker is an optional alphabetic prefix distinguishing release
//! lines (`e1.4.0`). The revision disambiguates internal layouts that share a
//! tag. Resolution picks the maximum declaration under the total order defined
//! here.

use crate::{ModConfError, Result};
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

/// Immutable descriptor of one settings schema revision
#[derive(Debug, Clone)]
pub struct VersionInfo {
    tag: String,
    edition: String,
    segments: Vec<u32>,
    revision: i32,
}

impl VersionInfo {
    /// Parse a version tag into its edition marker and numeric segments
    pub fn parse(tag: &str, revision: i32) -> Result<Self> {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(ModConfError::MalformedVersionTag(tag.to_string()).into());
        }

        let marker_len = trimmed
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(trimmed.len());
        let (edition, numeric) = trimmed.split_at(marker_len);
        if numeric.is_empty() {
            return Err(ModConfError::MalformedVersionTag(tag.to_string()).into());
        }

        let mut segments = Vec::new();
        for part in numeric.split('.') {
            let value: u32 = part
                .parse()
                .map_err(|_| ModConfError::MalformedVersionTag(tag.to_string()))?;
            segments.push(value);
        }

        Ok(Self {
            tag: trimmed.to_string(),
            edition: edition.to_ascii_lowercase(),
            segments,
            revision,
        })
    }

    /// Resolve the single effective version from every declared `(tag, revision)`
    /// pair attached to a settings object.
    ///
    /// Malformed tags are treated as absent: they are logged and skipped so one
    /// bad declaration never poisons the rest. Resolution fails only when tags
    /// were declared but none of them parse. With no declarations at all the
    /// default version is used.
    pub fn resolve(declared: &[(String, i32)]) -> Result<Self> {
        if declared.is_empty() {
            return Ok(Self::default());
        }

        let mut best: Option<VersionInfo> = None;
        for (tag, revision) in declared {
            match Self::parse(tag, *revision) {
                Ok(candidate) => {
                    best = match best {
                        Some(current) if current >= candidate => Some(current),
                        _ => Some(candidate),
                    };
                }
                Err(_) => {
                    warn!("Skipping malformed version tag '{}'", tag);
                }
            }
        }

        best.ok_or_else(|| ModConfError::MalformedVersionTag(declared[0].0.clone()).into())
    }

    /// The original tag string as declared
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The alphabetic edition marker, lowercased; empty when absent
    pub fn edition(&self) -> &str {
        &self.edition
    }

    /// The parsed dotted numeric segments
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// The implementation revision tie-breaker
    pub fn revision(&self) -> i32 {
        self.revision
    }
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            tag: "1.0.0".to_string(),
            edition: String::new(),
            segments: vec![1, 0, 0],
            revision: 0,
        }
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.edition
            .cmp(&other.edition)
            .then_with(|| {
                // missing segments compare as zero, so "1.4" == "1.4.0"
                let len = self.segments.len().max(other.segments.len());
                for index in 0..len {
                    let left = self.segments.get(index).copied().unwrap_or(0);
                    let right = other.segments.get(index).copied().unwrap_or(0);
                    match left.cmp(&right) {
                        Ordering::Equal => continue,
                        unequal => return unequal,
                    }
                }
                Ordering::Equal
            })
            .then_with(|| self.revision.cmp(&other.revision))
    }
}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionInfo {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionInfo {}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (rev {})", self.tag, self.revision)
    }
}
