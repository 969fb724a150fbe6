//! Owned, editable XML tree on top of `quick-xml` events.
//!
//! Events are kept exactly as read (raw attribute bytes, escaped text,
//! declarations, comments), so anything the engine does not touch is written
//! back unchanged.

use crate::error::{AnnotateError, Result};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;

/// Where a run came from in the source part. Pieces produced by splitting
/// keep the run index and record the character at which they begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOrigin {
    pub run_index: usize,
    pub char_start: usize,
}

#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(BytesText<'static>),
    Other(Event<'static>),
}

#[derive(Debug, Clone)]
pub struct XmlElement {
    pub start: BytesStart<'static>,
    pub children: Vec<XmlNode>,
    self_closing: bool,
    /// In-memory tag, never serialized.
    pub origin: Option<RunOrigin>,
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    prolog: Vec<XmlNode>,
    pub root: XmlElement,
    epilog: Vec<XmlNode>,
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Element whose local name is `local`.
    pub fn element_named(&self, local: &str) -> Option<&XmlElement> {
        self.as_element().filter(|el| el.is(local))
    }
}

impl XmlElement {
    /// Element with no attributes that serializes as `<name/>` while empty.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: BytesStart::new(name.into()),
            children: Vec::new(),
            self_closing: true,
            origin: None,
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.start.push_attribute((key, value));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Element holding a single escaped text node.
    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(BytesText::new(text).into_owned()));
        self
    }

    /// Same start tag, no children.
    pub fn shell(&self) -> Self {
        Self {
            start: self.start.clone(),
            children: Vec::new(),
            self_closing: false,
            origin: self.origin,
        }
    }

    pub fn is(&self, local: &str) -> bool {
        self.start.local_name().as_ref() == local.as_bytes()
    }

    /// Namespace prefix of the element name, empty for unprefixed names.
    pub fn prefix(&self) -> String {
        self.start
            .name()
            .prefix()
            .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
            .unwrap_or_default()
    }

    /// Attribute value matched on its local name.
    pub fn attr(&self, local: &str) -> Option<String> {
        self.start
            .attributes()
            .flatten()
            .find(|a| a.key.local_name().as_ref() == local.as_bytes())
            .and_then(|a| a.unescape_value().ok().map(Cow::into_owned))
    }

    pub fn has_attr(&self, qualified: &str) -> bool {
        self.start
            .attributes()
            .flatten()
            .any(|a| a.key.as_ref() == qualified.as_bytes())
    }

    pub fn push(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn elements_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |el| el.is(local))
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.children
            .iter_mut()
            .filter_map(XmlNode::as_element_mut)
            .find(|el| el.is(local))
    }

    /// Unescaped character data of the direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(t) => match t.unescape() {
                    Ok(s) => out.push_str(&s),
                    Err(_) => out.push_str(&String::from_utf8_lossy(t)),
                },
                XmlNode::Other(Event::CData(c)) => out.push_str(&String::from_utf8_lossy(c)),
                _ => {}
            }
        }
        out
    }

    /// Visit this element and every element below it, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a XmlElement)) {
        visit(self);
        for el in self.elements() {
            el.walk(visit);
        }
    }

    fn write_to(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        if self.self_closing && self.children.is_empty() {
            writer.write_event(Event::Empty(self.start.borrow()))?;
            return Ok(());
        }
        writer.write_event(Event::Start(self.start.borrow()))?;
        for child in &self.children {
            write_node(child, writer)?;
        }
        writer.write_event(Event::End(self.start.to_end()))?;
        Ok(())
    }
}

fn write_node(node: &XmlNode, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    match node {
        XmlNode::Element(el) => el.write_to(writer),
        XmlNode::Text(t) => Ok(writer.write_event(Event::Text(t.clone()))?),
        XmlNode::Other(event) => Ok(writer.write_event(event)?),
    }
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let node = match reader.read_event()? {
                Event::Eof => break,
                Event::Start(start) => {
                    stack.push(XmlElement {
                        start: start.into_owned(),
                        children: Vec::new(),
                        self_closing: false,
                        origin: None,
                    });
                    continue;
                }
                Event::End(_) => match stack.pop() {
                    Some(el) => XmlNode::Element(el),
                    None => return Err(AnnotateError::invalid("unbalanced end tag")),
                },
                Event::Empty(start) => XmlNode::Element(XmlElement {
                    start: start.into_owned(),
                    children: Vec::new(),
                    self_closing: true,
                    origin: None,
                }),
                Event::Text(text) => XmlNode::Text(text.into_owned()),
                other => XmlNode::Other(other.into_owned()),
            };

            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            } else if let XmlNode::Element(el) = node {
                if root.is_some() {
                    return Err(AnnotateError::invalid("more than one root element"));
                }
                root = Some(el);
            } else if root.is_none() {
                prolog.push(node);
            } else {
                epilog.push(node);
            }
        }

        if !stack.is_empty() {
            return Err(AnnotateError::invalid("unclosed element at end of part"));
        }
        let root = root.ok_or_else(|| AnnotateError::invalid("part has no root element"))?;
        Ok(Self { prolog, root, epilog })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.prolog {
            write_node(node, &mut writer)?;
        }
        self.root.write_to(&mut writer)?;
        for node in &self.epilog {
            write_node(node, &mut writer)?;
        }
        Ok(writer.into_inner())
    }
}
