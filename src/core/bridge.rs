//! Render bridge: aligns paragraph-like nodes of a rendered view with text
//! map paragraphs, then translates selections into anchors and back.

use crate::config::BridgeConfig;
use crate::core::anchor::{Anchor, AnchorPair};
use crate::core::text_map::TextMap;
use crate::core::view::{ViewNodeId, ViewPosition, ViewRange, ViewTree};
use log::debug;
use std::collections::{BTreeMap, HashMap};

const PARAGRAPH_TAGS: [&str; 10] = ["p", "li", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6"];
const FALLBACK_TAG: &str = "div";

pub struct RenderBridge<'t> {
    tree: &'t ViewTree,
    paragraph_to_index: HashMap<ViewNodeId, usize>,
    index_to_paragraph: BTreeMap<usize, ViewNodeId>,
}

/// Collapse whitespace runs, trim and lowercase.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Similarity of two normalized strings in `[0, 1]`.
pub fn score_match(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    let longer = len_a.max(len_b) as f64;
    if a.contains(b) || b.contains(a) {
        return len_a.min(len_b) as f64 / longer;
    }
    let prefix = a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count();
    prefix as f64 / longer
}

fn collect_candidates(tree: &ViewTree) -> Vec<ViewNodeId> {
    let below_root = || tree.descendants(tree.root()).into_iter().skip(1);
    let mut candidates: Vec<ViewNodeId> = below_root()
        .filter(|n| tree.tag(*n).is_some_and(|t| PARAGRAPH_TAGS.contains(&t)))
        .collect();
    if candidates.is_empty() {
        candidates = below_root().filter(|n| tree.tag(*n) == Some(FALLBACK_TAG)).collect();
    }
    candidates
}

impl<'t> RenderBridge<'t> {
    pub fn build(tree: &'t ViewTree, text_map: &TextMap, config: &BridgeConfig) -> Self {
        let targets: Vec<String> = text_map.paragraphs.iter().map(|p| normalize_text(&p.text)).collect();
        let mut paragraph_to_index = HashMap::new();
        let mut index_to_paragraph = BTreeMap::new();
        let mut cursor = 0usize;
        let mut candidates = 0usize;

        for node in collect_candidates(tree) {
            let view_text = normalize_text(&tree.text_content(node));
            if view_text.is_empty() {
                continue;
            }
            candidates += 1;

            let window_end = targets.len().min(cursor + config.lookahead);
            let mut best: Option<(usize, f64)> = None;
            for (i, target) in targets.iter().enumerate().take(window_end).skip(cursor) {
                let score = score_match(&view_text, target);
                if best.map_or(score > 0.0, |(_, s)| score > s) {
                    best = Some((i, score));
                }
                if score >= 1.0 {
                    break;
                }
            }

            if let Some((i, score)) = best.filter(|(_, s)| *s >= config.accept_threshold) {
                let paragraph_index = text_map.paragraphs[i].paragraph_index;
                paragraph_to_index.insert(node, paragraph_index);
                index_to_paragraph.entry(paragraph_index).or_insert(node);
                cursor = i + 1;
                debug!("view {node} -> paragraph {paragraph_index} (score {score:.2})");
            }
        }

        debug!(
            "render bridge: {} of {candidates} view paragraphs aligned to {} text paragraphs",
            paragraph_to_index.len(),
            targets.len()
        );
        Self {
            tree,
            paragraph_to_index,
            index_to_paragraph,
        }
    }

    pub fn paragraph_of(&self, node: ViewNodeId) -> Option<usize> {
        self.paragraph_to_index.get(&node).copied()
    }

    pub fn node_of(&self, paragraph_index: usize) -> Option<ViewNodeId> {
        self.index_to_paragraph.get(&paragraph_index).copied()
    }

    pub fn mapped_count(&self) -> usize {
        self.paragraph_to_index.len()
    }

    /// Anchors for both ends of a non-collapsed selection.
    pub fn capture(&self, range: &ViewRange, text_map: &TextMap) -> Option<AnchorPair> {
        if range.is_collapsed() {
            return None;
        }
        let start = self.position_to_anchor(range.start, text_map)?;
        let end = self.position_to_anchor(range.end, text_map)?;
        Some(AnchorPair { start, end })
    }

    /// View range covering the text between two anchors.
    pub fn restore(&self, start: &Anchor, end: &Anchor, text_map: &TextMap) -> Option<ViewRange> {
        let start = self.anchor_to_position(start, text_map)?;
        let end = self.anchor_to_position(end, text_map)?;
        Some(ViewRange::new(start, end))
    }

    fn position_to_anchor(&self, position: ViewPosition, text_map: &TextMap) -> Option<Anchor> {
        let resolved = self.resolve_text_position(position)?;
        let (paragraph_node, paragraph_index) = self
            .tree
            .ancestors(resolved.node)
            .find_map(|n| self.paragraph_of(n).map(|i| (n, i)))?;
        let paragraph = text_map.paragraph(paragraph_index)?;

        let preceding: usize = self
            .tree
            .text_nodes(paragraph_node)
            .into_iter()
            .take_while(|n| *n != resolved.node)
            .map(|n| self.tree.text_len(n))
            .sum();
        paragraph.anchor_at(preceding + resolved.offset)
    }

    /// Map a boundary point onto a text node. Element offsets count children:
    /// a child slot resolves to the start of that child's first text, the slot
    /// after the last child to the end of the last text.
    fn resolve_text_position(&self, position: ViewPosition) -> Option<ViewPosition> {
        let tree = self.tree;
        if let Some(text) = tree.text(position.node) {
            let offset = position.offset.min(text.chars().count());
            return Some(ViewPosition::new(position.node, offset));
        }
        tree.tag(position.node)?;

        let children = tree.children(position.node);
        if let Some(child) = children.get(position.offset) {
            let first = *tree.text_nodes(*child).first()?;
            return Some(ViewPosition::new(first, 0));
        }
        let last_child = *children.last()?;
        let last = *tree.text_nodes(last_child).last()?;
        Some(ViewPosition::new(last, tree.text_len(last)))
    }

    fn anchor_to_position(&self, anchor: &Anchor, text_map: &TextMap) -> Option<ViewPosition> {
        let paragraph = text_map.paragraph(anchor.paragraph_index)?;
        let node = self.node_of(anchor.paragraph_index)?;
        let target = paragraph.offset_of(anchor)?;

        let mut consumed = 0;
        for text_node in self.tree.text_nodes(node) {
            let len = self.tree.text_len(text_node);
            if target <= consumed + len {
                return Some(ViewPosition::new(text_node, target - consumed));
            }
            consumed += len;
        }
        None
    }
}
