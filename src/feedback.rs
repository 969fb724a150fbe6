//! Persisted feedback records and their conversion into generation input.

use crate::core::anchor::{compare, ordered, Anchor, AnchorOrdering, AnchorPair};
use crate::core::text_map::TextMap;
use crate::core::writer::AnnotationComment;
use crate::error::{AnnotateError, Result};
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Characters of surrounding text kept on each side of an inline quote.
pub const CONTEXT_WIDTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSource {
    Teacher,
    Llm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    /// Tied to a span of the document.
    Inline,
    /// General remark on the whole document.
    Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: String,
    pub file_id: String,
    pub source: FeedbackSource,
    pub kind: FeedbackKind,
    pub comment_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_anchor: Option<Anchor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_anchor: Option<Anchor>,
    #[serde(default)]
    pub applied: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FeedbackRecord {
    /// New inline record for a captured selection, with quote and context
    /// read from the text map.
    pub fn inline(
        file_id: &str,
        source: FeedbackSource,
        comment_text: &str,
        selection: &AnchorPair,
        text_map: &TextMap,
    ) -> Result<Self> {
        let (start, end) = ordered(&selection.start, &selection.end)
            .ok_or_else(|| AnnotateError::InvalidAnchor("selection spans two parts".to_string()))?;
        let quote = text_map
            .quote(&start, &end)
            .ok_or_else(|| AnnotateError::InvalidAnchor("selection is not covered by the text map".to_string()))?;
        let (prefix, suffix) = text_map
            .context(&start, &end, CONTEXT_WIDTH)
            .unwrap_or_default();

        let record = Self {
            kind: FeedbackKind::Inline,
            exact_quote: Some(quote),
            prefix_text: Some(prefix),
            suffix_text: Some(suffix),
            start_anchor: Some(start),
            end_anchor: Some(end),
            ..Self::block(file_id, source, comment_text)
        };
        record.validate()?;
        Ok(record)
    }

    pub fn block(file_id: &str, source: FeedbackSource, comment_text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_id: file_id.to_string(),
            source,
            kind: FeedbackKind::Block,
            comment_text: comment_text.to_string(),
            exact_quote: None,
            prefix_text: None,
            suffix_text: None,
            start_anchor: None,
            end_anchor: None,
            applied: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(AnnotateError::InvalidRecord(format!("{}: {msg}", self.id)));
        if self.comment_text.trim().is_empty() {
            return fail("comment text is empty");
        }

        let inline_fields = [
            self.exact_quote.is_some(),
            self.prefix_text.is_some(),
            self.suffix_text.is_some(),
            self.start_anchor.is_some(),
            self.end_anchor.is_some(),
        ];
        match self.kind {
            FeedbackKind::Block if inline_fields.iter().any(|f| *f) => fail("block record carries inline fields"),
            FeedbackKind::Block => Ok(()),
            FeedbackKind::Inline => {
                if !inline_fields.iter().all(|f| *f) {
                    return fail("inline record is missing quote, context or anchors");
                }
                if self.exact_quote.as_deref().is_some_and(|q| q.is_empty()) {
                    return fail("inline record has an empty quote");
                }
                match (&self.start_anchor, &self.end_anchor) {
                    (Some(start), Some(end)) if !start.is_valid() || !end.is_valid() => {
                        fail("anchor part is blank")
                    }
                    (Some(start), Some(end)) if compare(start, end) == AnchorOrdering::After => {
                        fail("start anchor is after end anchor")
                    }
                    _ => Ok(()),
                }
            }
        }
    }

    /// Generation input for inline records; block records have nothing to anchor.
    pub fn to_annotation(&self) -> Option<AnnotationComment> {
        if self.kind != FeedbackKind::Inline {
            return None;
        }
        Some(AnnotationComment {
            comment_text: self.comment_text.clone(),
            exact_quote: self.exact_quote.clone().unwrap_or_default(),
            start_anchor: self.start_anchor.clone()?,
            end_anchor: self.end_anchor.clone()?,
        })
    }

    pub fn mark_applied(&mut self) {
        self.applied = true;
        self.updated_at = Some(Utc::now());
    }
}

/// Read a JSON array of records, dropping entries that fail to decode or validate.
pub fn parse_records(json: &str) -> Result<Vec<FeedbackRecord>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| AnnotateError::InvalidRecord(format!("feedback is not a JSON array: {e}")))?;

    let mut records = Vec::with_capacity(values.len());
    for (i, value) in values.into_iter().enumerate() {
        let record = FeedbackRecord::deserialize(value)
            .map_err(|e| AnnotateError::InvalidRecord(e.to_string()))
            .and_then(|r| r.validate().map(|_| r));
        match record {
            Ok(record) => records.push(record),
            Err(e) => warn!("ignoring feedback entry {i}: {e}"),
        }
    }
    Ok(records)
}

/// Generation input for every inline record, in record order.
pub fn annotations_for(records: &[FeedbackRecord]) -> Vec<AnnotationComment> {
    records.iter().filter_map(FeedbackRecord::to_annotation).collect()
}
