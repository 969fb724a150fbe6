use crate::core::anchor::Anchor;
use serde::{Deserialize, Serialize};

/// One run's contribution to the map.
///
/// `global_start`/`global_end` count characters across the whole part, with a
/// one-character gap between paragraphs. They exist for preview slicing only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextUnit {
    pub part: String,
    pub paragraph_index: usize,
    pub run_index: usize,
    pub text: String,
    pub global_start: usize,
    pub global_end: usize,
}

impl TextUnit {
    pub fn len(&self) -> usize {
        self.global_end - self.global_start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphUnit {
    pub part: String,
    pub paragraph_index: usize,
    pub text: String,
    pub units: Vec<TextUnit>,
    pub total_length: usize,
}

/// Run-granular text of one document part, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMap {
    pub part: String,
    pub paragraphs: Vec<ParagraphUnit>,
}

impl ParagraphUnit {
    /// Paragraph-relative character offset addressed by `anchor`.
    ///
    /// The local offset is clamped to the unit's length; anchors into runs
    /// that contribute no text resolve to `None`.
    pub fn offset_of(&self, anchor: &Anchor) -> Option<usize> {
        if anchor.part != self.part || anchor.paragraph_index != self.paragraph_index {
            return None;
        }
        let mut base = 0;
        for unit in &self.units {
            if unit.run_index == anchor.run_index {
                return Some(base + anchor.char_offset.min(unit.len()));
            }
            base += unit.len();
        }
        None
    }

    /// Anchor for a paragraph-relative character offset.
    ///
    /// An offset on a boundary between two runs resolves to the start of the
    /// later run; the paragraph end resolves to the end of the last run.
    pub fn anchor_at(&self, offset: usize) -> Option<Anchor> {
        let last = self.units.last()?;
        let bounded = offset.min(self.total_length);

        if bounded == self.total_length {
            return Some(self.anchor_in(last, last.len()));
        }

        let mut start = 0;
        for unit in &self.units {
            let end = start + unit.len();
            if bounded >= start && bounded < end {
                return Some(self.anchor_in(unit, bounded - start));
            }
            start = end;
        }

        Some(self.anchor_in(last, last.len()))
    }

    fn anchor_in(&self, unit: &TextUnit, char_offset: usize) -> Anchor {
        Anchor::new(unit.part.clone(), unit.paragraph_index, unit.run_index, char_offset)
    }
}

impl TextMap {
    pub fn paragraph(&self, paragraph_index: usize) -> Option<&ParagraphUnit> {
        // Every paragraph is present, so the index is usually the position.
        match self.paragraphs.get(paragraph_index) {
            Some(p) if p.paragraph_index == paragraph_index => Some(p),
            _ => self
                .paragraphs
                .iter()
                .find(|p| p.paragraph_index == paragraph_index),
        }
    }

    /// All paragraph texts joined by `\n`; character positions equal the
    /// global offsets of the units.
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn global_offset(&self, anchor: &Anchor) -> Option<usize> {
        if anchor.part != self.part {
            return None;
        }
        let unit = self
            .paragraph(anchor.paragraph_index)?
            .units
            .iter()
            .find(|u| u.run_index == anchor.run_index)?;
        Some(unit.global_start + anchor.char_offset.min(unit.len()))
    }

    /// Exact text between two anchors; paragraph breaks read as `\n`.
    pub fn quote(&self, start: &Anchor, end: &Anchor) -> Option<String> {
        let (from, to) = self.span(start, end)?;
        Some(slice_chars(&self.plain_text(), from, to))
    }

    /// Up to `width` characters before and after the span between two anchors.
    pub fn context(&self, start: &Anchor, end: &Anchor, width: usize) -> Option<(String, String)> {
        let (from, to) = self.span(start, end)?;
        let text = self.plain_text();
        let prefix = slice_chars(&text, from.saturating_sub(width), from);
        let suffix = slice_chars(&text, to, to + width);
        Some((prefix, suffix))
    }

    fn span(&self, start: &Anchor, end: &Anchor) -> Option<(usize, usize)> {
        let a = self.global_offset(start)?;
        let b = self.global_offset(end)?;
        Some((a.min(b), a.max(b)))
    }
}

fn slice_chars(text: &str, from: usize, to: usize) -> String {
    text.chars().skip(from).take(to.saturating_sub(from)).collect()
}
