pub mod core {
    pub mod anchor;
    pub mod bridge;
    pub mod package;
    pub mod parser;
    pub mod text_map;
    pub mod view;
    pub mod writer;
    pub mod xml;
}

pub mod utils {
    pub mod document_processor;
    pub mod files;
}

pub mod config;
pub mod error;
pub mod feedback;

pub use crate::config::{AnnotationOptions, BridgeConfig, EngineConfig};
pub use crate::core::anchor::{compare, Anchor, AnchorOrdering, AnchorPair};
pub use crate::core::bridge::RenderBridge;
pub use crate::core::parser::DocxParser;
pub use crate::core::text_map::{ParagraphUnit, TextMap, TextUnit};
pub use crate::core::view::{ViewNodeId, ViewPosition, ViewRange, ViewTree};
pub use crate::core::writer::{
    AnnotationComment, AppliedComment, DocxWriter, GenerateReport, SkipReason, SkippedComment,
};
pub use crate::error::{AnnotateError, Result};
pub use crate::feedback::{FeedbackKind, FeedbackRecord, FeedbackSource};

/// Text map of the main text part of a package.
pub fn extract(bytes: &[u8]) -> Result<TextMap> {
    DocxParser.extract(bytes)
}

/// Align a rendered view with a text map using the default tuning.
pub fn build_bridge<'t>(tree: &'t ViewTree, text_map: &TextMap) -> RenderBridge<'t> {
    RenderBridge::build(tree, text_map, &BridgeConfig::default())
}

pub fn capture_selection(range: &ViewRange, bridge: &RenderBridge<'_>, text_map: &TextMap) -> Option<AnchorPair> {
    bridge.capture(range, text_map)
}

pub fn restore_selection(
    start: &Anchor,
    end: &Anchor,
    bridge: &RenderBridge<'_>,
    text_map: &TextMap,
) -> Option<ViewRange> {
    bridge.restore(start, end, text_map)
}

/// Attach comments with the default options. See [`DocxWriter::generate`].
pub fn generate(source: &[u8], comments: &[AnnotationComment]) -> Result<GenerateReport> {
    DocxWriter::default().generate(source, comments)
}
