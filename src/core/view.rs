//! Arena-backed stand-in for the rendered view tree.
//!
//! Only structure and text content matter here; layout belongs to the
//! renderer. Positions follow DOM boundary rules: inside a text node the
//! offset counts characters, inside an element it counts children.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewNodeId(usize);

#[derive(Debug, Clone)]
enum ViewNodeKind {
    Element { tag: String },
    Text(String),
}

#[derive(Debug, Clone)]
struct ViewNode {
    kind: ViewNodeKind,
    parent: Option<ViewNodeId>,
    children: Vec<ViewNodeId>,
}

#[derive(Debug, Clone)]
pub struct ViewTree {
    nodes: Vec<ViewNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewPosition {
    pub node: ViewNodeId,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRange {
    pub start: ViewPosition,
    pub end: ViewPosition,
}

impl ViewPosition {
    pub fn new(node: ViewNodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

impl ViewRange {
    pub fn new(start: ViewPosition, end: ViewPosition) -> Self {
        Self { start, end }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

impl ViewTree {
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![ViewNode {
                kind: ViewNodeKind::Element {
                    tag: root_tag.to_lowercase(),
                },
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Build from well-formed markup; element names are lowercased local names.
    pub fn from_xhtml(markup: &str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(markup)?;
        let root = doc.root_element();
        let mut tree = ViewTree::new(root.tag_name().name());
        let tree_root = tree.root();
        tree.copy_children(root, tree_root);
        Ok(tree)
    }

    fn copy_children(&mut self, from: roxmltree::Node, to: ViewNodeId) {
        for child in from.children() {
            if child.is_element() {
                let id = self.append_element(to, child.tag_name().name());
                self.copy_children(child, id);
            } else if let Some(text) = child.text().filter(|_| child.is_text()) {
                self.append_text(to, text);
            }
        }
    }

    pub fn root(&self) -> ViewNodeId {
        ViewNodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn append_element(&mut self, parent: ViewNodeId, tag: &str) -> ViewNodeId {
        self.push(
            parent,
            ViewNodeKind::Element {
                tag: tag.to_lowercase(),
            },
        )
    }

    pub fn append_text(&mut self, parent: ViewNodeId, text: &str) -> ViewNodeId {
        self.push(parent, ViewNodeKind::Text(text.to_string()))
    }

    fn push(&mut self, parent: ViewNodeId, kind: ViewNodeKind) -> ViewNodeId {
        let id = ViewNodeId(self.nodes.len());
        self.nodes.push(ViewNode {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn contains(&self, id: ViewNodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn tag(&self, id: ViewNodeId) -> Option<&str> {
        match &self.nodes.get(id.0)?.kind {
            ViewNodeKind::Element { tag } => Some(tag),
            ViewNodeKind::Text(_) => None,
        }
    }

    pub fn text(&self, id: ViewNodeId) -> Option<&str> {
        match &self.nodes.get(id.0)?.kind {
            ViewNodeKind::Text(text) => Some(text),
            ViewNodeKind::Element { .. } => None,
        }
    }

    pub fn parent(&self, id: ViewNodeId) -> Option<ViewNodeId> {
        self.nodes.get(id.0)?.parent
    }

    pub fn children(&self, id: ViewNodeId) -> &[ViewNodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    /// `id` and everything below it, in document order.
    pub fn descendants(&self, id: ViewNodeId) -> Vec<ViewNodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    pub fn text_nodes(&self, id: ViewNodeId) -> Vec<ViewNodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.text(*n).is_some())
            .collect()
    }

    pub fn text_content(&self, id: ViewNodeId) -> String {
        self.text_nodes(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Length of a text node in characters; zero for elements.
    pub fn text_len(&self, id: ViewNodeId) -> usize {
        self.text(id).map(|t| t.chars().count()).unwrap_or(0)
    }

    /// `node` itself followed by its ancestors up to the root.
    pub fn ancestors(&self, node: ViewNodeId) -> impl Iterator<Item = ViewNodeId> + '_ {
        std::iter::successors(Some(node).filter(|n| self.contains(*n)), move |n| self.parent(*n))
    }
}

impl fmt::Display for ViewNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_from_markup_in_document_order() {
        let tree = ViewTree::from_xhtml("<div><p>One <b>two</b></p><P>three</P></div>").unwrap();
        let tags: Vec<&str> = tree
            .descendants(tree.root())
            .into_iter()
            .filter_map(|n| tree.tag(n))
            .collect();
        assert_eq!(tags, vec!["div", "p", "b", "p"]);
        assert_eq!(tree.text_content(tree.root()), "One twothree");
    }

    #[test]
    fn ancestors_walk_to_root() {
        let mut tree = ViewTree::new("body");
        let p = tree.append_element(tree.root(), "p");
        let t = tree.append_text(p, "hi");
        let chain: Vec<ViewNodeId> = tree.ancestors(t).collect();
        assert_eq!(chain, vec![t, p, tree.root()]);
    }

    #[test]
    fn unknown_ids_are_tolerated() {
        let tree = ViewTree::new("body");
        let foreign = ViewNodeId(42);
        assert!(tree.descendants(foreign).is_empty());
        assert_eq!(tree.ancestors(foreign).count(), 0);
        assert!(tree.children(foreign).is_empty());
    }

    #[test]
    fn collapsed_range() {
        let tree = ViewTree::new("body");
        let at = ViewPosition::new(tree.root(), 0);
        assert!(ViewRange::new(at, at).is_collapsed());
    }
}
