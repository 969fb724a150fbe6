use crate::error::{AnnotateError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A character position inside a document part: the `char_offset`-th
/// character of the `run_index`-th run of the `paragraph_index`-th paragraph.
///
/// Offsets count Unicode scalar values. An offset equal to the run's length
/// addresses the point just after that run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawAnchor")]
pub struct Anchor {
    pub part: String,
    pub paragraph_index: usize,
    pub run_index: usize,
    pub char_offset: usize,
}

/// Result of [`compare`]: anchors in different parts have no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorOrdering {
    Before,
    Equal,
    After,
    Incomparable,
}

/// The two ends of a captured selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorPair {
    pub start: Anchor,
    pub end: Anchor,
}

impl Anchor {
    pub fn new(part: impl Into<String>, paragraph_index: usize, run_index: usize, char_offset: usize) -> Self {
        Self {
            part: part.into(),
            paragraph_index,
            run_index,
            char_offset,
        }
    }

    /// Index fields are unsigned by construction; only the part can be blank.
    pub fn is_valid(&self) -> bool {
        !self.part.trim().is_empty()
    }

    /// Validate an untyped anchor received from storage or the UI.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        Anchor::deserialize(value).map_err(|e| AnnotateError::InvalidAnchor(e.to_string()))
    }

    pub(crate) fn key(&self) -> (usize, usize, usize) {
        (self.paragraph_index, self.run_index, self.char_offset)
    }
}

impl PartialOrd for Anchor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.part != other.part {
            return None;
        }
        Some(self.key().cmp(&other.key()))
    }
}

pub fn compare(a: &Anchor, b: &Anchor) -> AnchorOrdering {
    match a.partial_cmp(b) {
        Some(Ordering::Less) => AnchorOrdering::Before,
        Some(Ordering::Equal) => AnchorOrdering::Equal,
        Some(Ordering::Greater) => AnchorOrdering::After,
        None => AnchorOrdering::Incomparable,
    }
}

/// Put a pair into document order. `None` when the ends live in different parts.
pub fn ordered(start: &Anchor, end: &Anchor) -> Option<(Anchor, Anchor)> {
    match compare(start, end) {
        AnchorOrdering::Incomparable => None,
        AnchorOrdering::After => Some((end.clone(), start.clone())),
        _ => Some((start.clone(), end.clone())),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnchor {
    part: String,
    paragraph_index: i64,
    run_index: i64,
    char_offset: i64,
}

impl TryFrom<RawAnchor> for Anchor {
    type Error = String;

    fn try_from(raw: RawAnchor) -> std::result::Result<Self, Self::Error> {
        let part = raw.part.trim();
        if part.is_empty() {
            return Err("anchor part must be a non-empty string".to_string());
        }
        let index = |name: &str, value: i64| {
            usize::try_from(value).map_err(|_| format!("{name} must be a non-negative integer, got {value}"))
        };
        Ok(Anchor {
            part: part.to_string(),
            paragraph_index: index("paragraphIndex", raw.paragraph_index)?,
            run_index: index("runIndex", raw.run_index)?,
            char_offset: index("charOffset", raw.char_offset)?,
        })
    }
}
