use crate::config::AnnotationOptions;
use crate::core::anchor::{ordered, Anchor};
use crate::core::package::{
    part_dir, relative_target, rels_part_for, resolve_target, Package, COMMENTS_CONTENT_TYPE,
    COMMENTS_REL, CONTENT_TYPES_PART,
};
use crate::core::xml::{RunOrigin, XmlDocument, XmlElement, XmlNode};
use crate::error::{AnnotateError, Result};
use crate::utils::files::{ensure_docx, read_source, write_output_atomic};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const EMPTY_COMMENTS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:comments xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#;

const EMPTY_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#;

/// One comment to attach, as handed over by the caller.
///
/// `exact_quote` only feeds the summary block; the anchors drive the edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationComment {
    pub comment_text: String,
    #[serde(default)]
    pub exact_quote: String,
    pub start_anchor: Anchor,
    pub end_anchor: Anchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    ParagraphMissing,
    RunMissing,
    OffsetOutOfRange,
    CrossPart,
    ForeignPart,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::ParagraphMissing => "paragraph not found",
            SkipReason::RunMissing => "run not found",
            SkipReason::OffsetOutOfRange => "offset beyond end of run",
            SkipReason::CrossPart => "anchors in different parts",
            SkipReason::ForeignPart => "anchors outside the main text part",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedComment {
    pub input_index: usize,
    pub comment_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedComment {
    pub input_index: usize,
    pub reason: SkipReason,
}

/// Output package plus the per-comment outcome. Positions refer to the
/// caller's input list.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub bytes: Vec<u8>,
    pub applied: Vec<AppliedComment>,
    pub skipped: Vec<SkippedComment>,
}

/// Writer is responsible for writing comments back into the original .docx
pub trait Writer {
    /// Annotate the package at `original` and write the result to `out_path`.
    fn write_annotations<P: AsRef<Path>>(
        &self,
        original: P,
        out_path: P,
        comments: &[AnnotationComment],
    ) -> Result<GenerateReport>;
}

/// DocxWriter inserts comment ranges, the comments part and a summary block
/// into word-processing packages.
#[derive(Debug, Clone, Default)]
pub struct DocxWriter {
    options: AnnotationOptions,
}

impl Writer for DocxWriter {
    fn write_annotations<P: AsRef<Path>>(
        &self,
        original: P,
        out_path: P,
        comments: &[AnnotationComment],
    ) -> Result<GenerateReport> {
        let original = original.as_ref();
        ensure_docx(original)?;
        let source = read_source(original)?;
        let report = self.generate(&source, comments)?;
        write_output_atomic(out_path.as_ref(), &report.bytes)?;
        Ok(report)
    }
}

/// A comment that survived validation, in normalized (start <= end) form.
struct Job<'c> {
    input_index: usize,
    start: Anchor,
    end: Anchor,
    text: &'c str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

type Placement = std::result::Result<(usize, usize), SkipReason>;

impl DocxWriter {
    pub fn new(options: AnnotationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnnotationOptions {
        &self.options
    }

    /// Produce a new package with every resolvable comment attached.
    ///
    /// The source is validated first, so an unreadable package fails before
    /// anything is touched. An empty comment list returns the source bytes.
    pub fn generate(&self, source: &[u8], comments: &[AnnotationComment]) -> Result<GenerateReport> {
        let mut package = Package::open(source)?;
        let primary = package.primary_part()?;
        let xml = package
            .read_xml(&primary)?
            .ok_or_else(|| AnnotateError::invalid(format!("main part {primary} not found in package")))?;
        let mut document = XmlDocument::parse(&xml)?;
        if document.root.child("body").is_none() {
            return Err(AnnotateError::invalid(format!("{primary} has no body element")));
        }

        if comments.is_empty() {
            info!("no comments for {primary}, package left unchanged");
            return Ok(GenerateReport {
                bytes: source.to_vec(),
                applied: Vec::new(),
                skipped: Vec::new(),
            });
        }

        let rels_part = rels_part_for(&primary);
        let mut rels = match package.read_xml(&rels_part)? {
            Some(xml) => XmlDocument::parse(&xml)?,
            None => XmlDocument::parse(EMPTY_RELATIONSHIPS)?,
        };
        let comments_part = comments_part_for(&rels.root, &primary);
        let mut comments_doc = match package.read_xml(&comments_part)? {
            Some(xml) => XmlDocument::parse(&xml)?,
            None => XmlDocument::parse(EMPTY_COMMENTS)?,
        };
        let content_types_xml = package
            .read_xml(CONTENT_TYPES_PART)?
            .ok_or_else(|| AnnotateError::invalid("[Content_Types].xml missing"))?;
        let mut content_types = XmlDocument::parse(&content_types_xml)?;

        let first_id = max_comment_id(&comments_doc.root, &document.root)
            .checked_add(1)
            .ok_or_else(|| AnnotateError::invalid("comment ids exhausted"))?;
        let (applied, skipped) =
            self.update_document_xml_with_comments(&mut document.root, &primary, comments, first_id)?;
        self.update_comments_xml(&mut comments_doc.root, comments, &applied);
        self.update_relationships(&mut rels.root, &primary, &comments_part);
        self.update_content_types(&mut content_types.root, &comments_part);

        package.set_part(&primary, document.to_bytes()?);
        package.set_part(&comments_part, comments_doc.to_bytes()?);
        package.set_part(&rels_part, rels.to_bytes()?);
        package.set_part(CONTENT_TYPES_PART, content_types.to_bytes()?);
        let bytes = package.to_bytes()?;

        info!(
            "annotated {primary}: {} applied, {} skipped, {} bytes",
            applied.len(),
            skipped.len(),
            bytes.len()
        );
        Ok(GenerateReport { bytes, applied, skipped })
    }

    /// Insert range markers and reference runs, then append the summary block.
    ///
    /// Comments are validated against the untouched tree, numbered in
    /// document order, and applied last-to-first so earlier positions are
    /// never disturbed by later splits.
    fn update_document_xml_with_comments(
        &self,
        root: &mut XmlElement,
        primary: &str,
        comments: &[AnnotationComment],
        first_id: u32,
    ) -> Result<(Vec<AppliedComment>, Vec<SkippedComment>)> {
        let body = root
            .child_mut("body")
            .ok_or_else(|| AnnotateError::invalid(format!("{primary} has no body element")))?;
        tag_run_origins(body);

        let mut jobs = Vec::new();
        let mut skipped = Vec::new();
        for (input_index, comment) in comments.iter().enumerate() {
            let checked = normalize(comment, primary).and_then(|(start, end)| {
                validate(body, &start, &end)?;
                Ok((start, end))
            });
            match checked {
                Ok((start, end)) => jobs.push(Job {
                    input_index,
                    start,
                    end,
                    text: &comment.comment_text,
                }),
                Err(reason) => {
                    warn!("skipping comment #{input_index}: {reason}");
                    skipped.push(SkippedComment { input_index, reason });
                }
            }
        }

        jobs.sort_by(|a, b| {
            a.start
                .key()
                .cmp(&b.start.key())
                .then_with(|| a.end.key().cmp(&b.end.key()))
                .then_with(|| a.text.cmp(b.text))
                .then_with(|| a.input_index.cmp(&b.input_index))
        });

        let last_offset = u32::try_from(jobs.len().saturating_sub(1)).ok();
        if last_offset.and_then(|n| first_id.checked_add(n)).is_none() {
            return Err(AnnotateError::invalid("comment ids exhausted"));
        }

        let prefix = body.prefix();
        let mut applied = Vec::with_capacity(jobs.len());
        for (position, job) in jobs.iter().enumerate().rev() {
            let comment_id = first_id + position as u32;
            match apply_comment(body, &prefix, &job.start, &job.end, comment_id) {
                Ok(()) => applied.push(AppliedComment {
                    input_index: job.input_index,
                    comment_id,
                }),
                Err(reason) => {
                    warn!("skipping comment #{}: {reason}", job.input_index);
                    skipped.push(SkippedComment {
                        input_index: job.input_index,
                        reason,
                    });
                }
            }
        }
        applied.sort_by_key(|a| a.input_index);
        skipped.sort_by_key(|s| s.input_index);

        append_summary(body, &prefix, &self.options.summary_heading, comments);
        Ok((applied, skipped))
    }

    /// Append one entry per applied comment, in id order.
    fn update_comments_xml(
        &self,
        root: &mut XmlElement,
        comments: &[AnnotationComment],
        applied: &[AppliedComment],
    ) {
        let prefix = root.prefix();
        let date = self.options.date_stamp();
        let mut ordered_ids: Vec<&AppliedComment> = applied.iter().collect();
        ordered_ids.sort_by_key(|a| a.comment_id);

        for entry in ordered_ids {
            let text = &comments[entry.input_index].comment_text;
            root.push(XmlNode::Element(self.comment_entry(&prefix, entry.comment_id, &date, text)));
        }
    }

    fn comment_entry(&self, prefix: &str, id: u32, date: &str, text: &str) -> XmlElement {
        let q = |local: &str| qualified(prefix, local);
        let mut comment = XmlElement::new(q("comment"))
            .with_attr(&q("id"), &id.to_string())
            .with_attr(&q("author"), &self.options.author)
            .with_attr(&q("date"), date)
            .with_attr(&q("initials"), &self.options.initials);

        for (i, line) in text.split('\n').enumerate() {
            let mut paragraph = XmlElement::new(q("p")).with_child(
                XmlElement::new(q("pPr"))
                    .with_child(XmlElement::new(q("pStyle")).with_attr(&q("val"), "CommentText")),
            );
            if i == 0 {
                paragraph = paragraph.with_child(
                    XmlElement::new(q("r"))
                        .with_child(style_props(prefix, "CommentReference"))
                        .with_child(XmlElement::new(q("annotationRef"))),
                );
            }
            paragraph = paragraph.with_child(text_run(prefix, line.trim_end_matches('\r'), false));
            comment = comment.with_child(paragraph);
        }
        comment
    }

    /// Make sure the main part points at the comments part.
    fn update_relationships(&self, root: &mut XmlElement, primary: &str, comments_part: &str) {
        if find_relationship(root, COMMENTS_REL).is_some() {
            return;
        }
        let next = root
            .elements_named("Relationship")
            .filter_map(|r| r.attr("Id"))
            .filter_map(|id| id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
            .max()
            .unwrap_or(0)
            + 1;
        let target = relative_target(part_dir(primary), comments_part);
        debug!("adding comments relationship rId{next} -> {target}");
        let relationship = XmlElement::new(qualified(&root.prefix(), "Relationship"))
            .with_attr("Id", &format!("rId{next}"))
            .with_attr("Type", COMMENTS_REL)
            .with_attr("Target", &target);
        root.push(XmlNode::Element(relationship));
    }

    fn update_content_types(&self, root: &mut XmlElement, comments_part: &str) {
        let part_name = format!("/{comments_part}");
        let declared = root.elements_named("Override").any(|o| {
            o.attr("PartName")
                .is_some_and(|name| name.eq_ignore_ascii_case(&part_name))
        });
        if declared {
            return;
        }
        let entry = XmlElement::new(qualified(&root.prefix(), "Override"))
            .with_attr("PartName", &part_name)
            .with_attr("ContentType", COMMENTS_CONTENT_TYPE);
        root.push(XmlNode::Element(entry));
    }
}

fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{prefix}:{local}")
    }
}

fn find_relationship<'a>(root: &'a XmlElement, rel_type: &str) -> Option<&'a XmlElement> {
    root.elements_named("Relationship")
        .find(|r| r.attr("Type").as_deref() == Some(rel_type))
}

/// Existing comments target, or `comments.xml` beside the main part.
fn comments_part_for(rels: &XmlElement, primary: &str) -> String {
    let dir = part_dir(primary);
    match find_relationship(rels, COMMENTS_REL).and_then(|r| r.attr("Target")) {
        Some(target) => resolve_target(dir, &target),
        None => resolve_target(dir, "comments.xml"),
    }
}

fn max_comment_id(comments: &XmlElement, document: &XmlElement) -> u32 {
    let mut max = 0;
    let mut visit = |el: &XmlElement| {
        let numbered = el.is("comment")
            || el.is("commentRangeStart")
            || el.is("commentRangeEnd")
            || el.is("commentReference");
        if let Some(id) = el.attr("id").filter(|_| numbered).and_then(|v| v.trim().parse::<u32>().ok()) {
            max = max.max(id);
        }
    };
    comments.walk(&mut visit);
    document.walk(&mut visit);
    max
}

fn paragraphs_mut(body: &mut XmlElement) -> impl Iterator<Item = &mut XmlElement> {
    body.children
        .iter_mut()
        .filter_map(XmlNode::as_element_mut)
        .filter(|el| el.is("p"))
}

fn tag_run_origins(body: &mut XmlElement) {
    for paragraph in paragraphs_mut(body) {
        tag_paragraph_runs(paragraph);
    }
}

fn tag_paragraph_runs(paragraph: &mut XmlElement) {
    let runs = paragraph
        .children
        .iter_mut()
        .filter_map(XmlNode::as_element_mut)
        .filter(|el| el.is("r"));
    for (run_index, run) in runs.enumerate() {
        run.origin = Some(RunOrigin {
            run_index,
            char_start: 0,
        });
    }
}

fn normalize(comment: &AnnotationComment, primary: &str) -> std::result::Result<(Anchor, Anchor), SkipReason> {
    let (start, end) = ordered(&comment.start_anchor, &comment.end_anchor).ok_or(SkipReason::CrossPart)?;
    if start.part.trim_start_matches('/') != primary {
        return Err(SkipReason::ForeignPart);
    }
    Ok((start, end))
}

fn validate(body: &XmlElement, start: &Anchor, end: &Anchor) -> std::result::Result<(), SkipReason> {
    for (anchor, side) in [(start, Side::Start), (end, Side::End)] {
        let paragraph = body
            .elements_named("p")
            .nth(anchor.paragraph_index)
            .ok_or(SkipReason::ParagraphMissing)?;
        locate(paragraph, anchor, side)?;
    }
    Ok(())
}

fn run_text(run: &XmlElement) -> String {
    run.elements_named("t").map(XmlElement::text).collect()
}

fn run_len(run: &XmlElement) -> usize {
    run_text(run).chars().count()
}

/// Child position of the run piece holding `anchor`, and the offset inside it.
///
/// A start prefers the piece beginning at the offset, an end the piece
/// finishing there, so markers hug the text they bound.
fn locate(paragraph: &XmlElement, anchor: &Anchor, side: Side) -> Placement {
    let offset = anchor.char_offset;
    let mut seen = false;
    let mut fallback = None;

    for (pos, node) in paragraph.children.iter().enumerate() {
        let Some(run) = node.as_element() else { continue };
        let Some(origin) = run.origin.filter(|o| o.run_index == anchor.run_index) else {
            continue;
        };
        let len = run_len(run);
        // Runs without text are not addressable.
        if len == 0 {
            continue;
        }
        seen = true;
        let start = origin.char_start;
        let end = start + len;
        let inside = match side {
            Side::Start => offset >= start && offset < end,
            Side::End => offset > start && offset <= end,
        };
        if inside {
            return Ok((pos, offset - start));
        }
        match side {
            Side::Start if offset == end => fallback = Some((pos, end - start)),
            Side::End if offset == start => fallback = fallback.or(Some((pos, 0))),
            _ => {}
        }
    }

    match fallback {
        Some(found) => Ok(found),
        None if seen => Err(SkipReason::OffsetOutOfRange),
        None => Err(SkipReason::RunMissing),
    }
}

/// Boundary index before which a marker for `offset` belongs. Returns whether
/// the run had to be split in two.
fn split_at(paragraph: &mut XmlElement, pos: usize, offset: usize) -> (usize, bool) {
    if offset == 0 {
        return (pos, false);
    }
    let Some(run) = paragraph.children[pos].as_element() else {
        return (pos + 1, false);
    };
    if offset >= run_len(run) {
        return (pos + 1, false);
    }
    let (left, right) = split_run(run, offset);
    debug!(
        "split run {:?} at {offset}",
        left.origin.map(|o| o.run_index)
    );
    paragraph.children[pos] = XmlNode::Element(left);
    paragraph.children.insert(pos + 1, XmlNode::Element(right));
    (pos + 1, true)
}

/// Split a run so the left half holds the first `offset` characters.
/// Both halves keep the run properties.
fn split_run(run: &XmlElement, offset: usize) -> (XmlElement, XmlElement) {
    let mut left = run.shell();
    let mut right = run.shell();
    right.origin = run.origin.map(|o| RunOrigin {
        char_start: o.char_start + offset,
        ..o
    });

    let mut consumed = 0;
    for child in &run.children {
        match child {
            XmlNode::Element(el) if el.is("rPr") => {
                left.push(child.clone());
                right.push(child.clone());
            }
            XmlNode::Element(el) if el.is("t") => {
                let text = el.text();
                let start = consumed;
                consumed += text.chars().count();
                if consumed <= offset {
                    left.push(child.clone());
                } else if start >= offset {
                    right.push(child.clone());
                } else {
                    let cut = offset - start;
                    let head: String = text.chars().take(cut).collect();
                    let tail: String = text.chars().skip(cut).collect();
                    left.push(XmlNode::Element(text_like(el, &head)));
                    right.push(XmlNode::Element(text_like(el, &tail)));
                }
            }
            other if consumed < offset => left.push(other.clone()),
            other => right.push(other.clone()),
        }
    }
    (left, right)
}

/// `w:t` with the template's attributes and new text.
fn text_like(template: &XmlElement, text: &str) -> XmlElement {
    let el = template.shell().with_text(text);
    if needs_preserve(text) && !el.has_attr("xml:space") {
        el.with_attr("xml:space", "preserve")
    } else {
        el
    }
}

fn needs_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

fn apply_comment(
    body: &mut XmlElement,
    prefix: &str,
    start: &Anchor,
    end: &Anchor,
    id: u32,
) -> std::result::Result<(), SkipReason> {
    if start.paragraph_index == end.paragraph_index {
        let paragraph = paragraphs_mut(body)
            .nth(start.paragraph_index)
            .ok_or(SkipReason::ParagraphMissing)?;
        let (pos_end, local_end) = locate(paragraph, end, Side::End)?;
        let mut end_boundary = split_at(paragraph, pos_end, local_end).0;
        let (pos_start, local_start) = locate(paragraph, start, Side::Start)?;
        let (start_boundary, split) = split_at(paragraph, pos_start, local_start);
        if split && end_boundary > pos_start {
            end_boundary += 1;
        }
        insert_range_end(paragraph, end_boundary, prefix, id);
        insert_range_start(paragraph, start_boundary, prefix, id);
        return Ok(());
    }

    let start_placement = {
        let paragraph = body
            .elements_named("p")
            .nth(start.paragraph_index)
            .ok_or(SkipReason::ParagraphMissing)?;
        locate(paragraph, start, Side::Start)?
    };

    let paragraph = paragraphs_mut(body)
        .nth(end.paragraph_index)
        .ok_or(SkipReason::ParagraphMissing)?;
    let (pos_end, local_end) = locate(paragraph, end, Side::End)?;
    let end_boundary = split_at(paragraph, pos_end, local_end).0;
    insert_range_end(paragraph, end_boundary, prefix, id);

    let paragraph = paragraphs_mut(body)
        .nth(start.paragraph_index)
        .ok_or(SkipReason::ParagraphMissing)?;
    let start_boundary = split_at(paragraph, start_placement.0, start_placement.1).0;
    insert_range_start(paragraph, start_boundary, prefix, id);
    Ok(())
}

fn marker(prefix: &str, local: &str, id: u32) -> XmlElement {
    XmlElement::new(qualified(prefix, local)).with_attr(&qualified(prefix, "id"), &id.to_string())
}

fn style_props(prefix: &str, style: &str) -> XmlElement {
    XmlElement::new(qualified(prefix, "rPr")).with_child(
        XmlElement::new(qualified(prefix, "rStyle")).with_attr(&qualified(prefix, "val"), style),
    )
}

fn insert_range_start(paragraph: &mut XmlElement, at: usize, prefix: &str, id: u32) {
    let at = at.min(paragraph.children.len());
    paragraph
        .children
        .insert(at, XmlNode::Element(marker(prefix, "commentRangeStart", id)));
}

fn insert_range_end(paragraph: &mut XmlElement, at: usize, prefix: &str, id: u32) {
    let at = at.min(paragraph.children.len());
    let reference = XmlElement::new(qualified(prefix, "r"))
        .with_child(style_props(prefix, "CommentReference"))
        .with_child(marker(prefix, "commentReference", id));
    paragraph
        .children
        .insert(at, XmlNode::Element(marker(prefix, "commentRangeEnd", id)));
    paragraph.children.insert(at + 1, XmlNode::Element(reference));
}

fn text_run(prefix: &str, text: &str, bold: bool) -> XmlElement {
    let mut run = XmlElement::new(qualified(prefix, "r"));
    if bold {
        run = run.with_child(
            XmlElement::new(qualified(prefix, "rPr")).with_child(XmlElement::new(qualified(prefix, "b"))),
        );
    }
    let mut t = XmlElement::new(qualified(prefix, "t"));
    if needs_preserve(text) {
        t = t.with_attr("xml:space", "preserve");
    }
    run.with_child(t.with_text(text))
}

fn summary_line(position: usize, comment: &AnnotationComment) -> String {
    let text = comment.comment_text.replace(&['\r', '\n'][..], " ");
    let quote = comment.exact_quote.trim();
    if quote.is_empty() {
        format!("{position}. {text}")
    } else {
        format!("{position}. \"{quote}\": {text}")
    }
}

/// Heading plus one line per comment in caller order, placed before the
/// final section properties.
fn append_summary(body: &mut XmlElement, prefix: &str, heading: &str, comments: &[AnnotationComment]) {
    let mut block = vec![XmlElement::new(qualified(prefix, "p")).with_child(text_run(prefix, heading, true))];
    for (i, comment) in comments.iter().enumerate() {
        block.push(
            XmlElement::new(qualified(prefix, "p")).with_child(text_run(prefix, &summary_line(i + 1, comment), false)),
        );
    }

    let at = body
        .children
        .iter()
        .rposition(|n| n.element_named("sectPr").is_some())
        .unwrap_or(body.children.len());
    for (offset, paragraph) in block.into_iter().enumerate() {
        body.children.insert(at + offset, XmlNode::Element(paragraph));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PART: &str = "word/document.xml";

    fn paragraph(runs: &str) -> XmlElement {
        let xml = format!(
            r#"<w:p xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{runs}</w:p>"#
        );
        let mut paragraph = XmlDocument::parse(&xml).unwrap().root;
        tag_paragraph_runs(&mut paragraph);
        paragraph
    }

    fn texts(paragraph: &XmlElement) -> Vec<String> {
        paragraph.elements_named("r").map(run_text).collect()
    }

    #[test]
    fn split_keeps_properties_and_preserves_edge_space() {
        let p = paragraph(r#"<w:r w:rsidR="01"><w:rPr><w:i/></w:rPr><w:t>Hello world</w:t></w:r>"#);
        let run = p.child("r").unwrap();
        let (left, right) = split_run(run, 5);

        assert_eq!(run_text(&left), "Hello");
        assert_eq!(run_text(&right), " world");
        assert!(left.child("rPr").is_some() && right.child("rPr").is_some());
        assert_eq!(right.attr("rsidR").as_deref(), Some("01"));
        assert!(right.child("t").unwrap().has_attr("xml:space"));
        assert!(!left.child("t").unwrap().has_attr("xml:space"));
        assert_eq!(right.origin.map(|o| o.char_start), Some(5));
    }

    #[test]
    fn split_routes_whole_text_elements() {
        let p = paragraph(r#"<w:r><w:t>ab</w:t><w:tab/><w:t>cd</w:t></w:r>"#);
        let (left, right) = split_run(p.child("r").unwrap(), 2);
        assert_eq!(run_text(&left), "ab");
        assert_eq!(run_text(&right), "cd");
        assert!(right.child("tab").is_some());
    }

    #[test]
    fn locate_prefers_tight_pieces_after_a_split() {
        let mut p = paragraph(r#"<w:r><w:t>abcd</w:t></w:r>"#);
        assert_eq!(split_at(&mut p, 0, 2), (1, true));
        assert_eq!(texts(&p), vec!["ab", "cd"]);

        let at_two = Anchor::new(PART, 0, 0, 2);
        assert_eq!(locate(&p, &at_two, Side::Start), Ok((1, 0)));
        assert_eq!(locate(&p, &at_two, Side::End), Ok((0, 2)));
        assert_eq!(locate(&p, &Anchor::new(PART, 0, 0, 4), Side::Start), Ok((1, 2)));
        assert_eq!(locate(&p, &Anchor::new(PART, 0, 0, 0), Side::End), Ok((0, 0)));
    }

    #[test]
    fn locate_reports_missing_runs_and_offsets() {
        let p = paragraph(r#"<w:r><w:t>abc</w:t></w:r>"#);
        assert_eq!(
            locate(&p, &Anchor::new(PART, 0, 1, 0), Side::Start),
            Err(SkipReason::RunMissing)
        );
        assert_eq!(
            locate(&p, &Anchor::new(PART, 0, 0, 4), Side::End),
            Err(SkipReason::OffsetOutOfRange)
        );
    }

    #[test]
    fn runs_without_text_cannot_be_addressed() {
        let p = paragraph(r#"<w:r><w:t>ab</w:t></w:r><w:r><w:br/></w:r><w:r><w:t>cd</w:t></w:r>"#);
        let on_break = Anchor::new(PART, 0, 1, 0);
        assert_eq!(locate(&p, &on_break, Side::Start), Err(SkipReason::RunMissing));
        assert_eq!(locate(&p, &on_break, Side::End), Err(SkipReason::RunMissing));
        assert_eq!(locate(&p, &Anchor::new(PART, 0, 2, 0), Side::Start), Ok((2, 0)));
    }

    #[test]
    fn markers_wrap_a_mid_run_span() {
        let mut body = XmlDocument::parse(
            r#"<w:body xmlns:w="urn:w"><w:p><w:r><w:t>The cat sat.</w:t></w:r></w:p></w:body>"#,
        )
        .unwrap()
        .root;
        tag_run_origins(&mut body);
        apply_comment(&mut body, "w", &Anchor::new(PART, 0, 0, 4), &Anchor::new(PART, 0, 0, 7), 3).unwrap();

        let names: Vec<String> = body
            .child("p")
            .unwrap()
            .elements()
            .map(|el| {
                if el.is("r") {
                    format!("r:{}", run_text(el))
                } else {
                    String::from_utf8_lossy(el.start.local_name().as_ref()).into_owned()
                }
            })
            .collect();
        assert_eq!(
            names,
            vec!["r:The ", "commentRangeStart", "r:cat", "commentRangeEnd", "r:", "r: sat."]
        );
    }

    #[test]
    fn summary_lines_quote_when_available() {
        let anchor = Anchor::new(PART, 0, 0, 0);
        let mut comment = AnnotationComment {
            comment_text: "Needs a citation.\nSee style guide.".to_string(),
            exact_quote: "cats are liquid".to_string(),
            start_anchor: anchor.clone(),
            end_anchor: anchor,
        };
        assert_eq!(
            summary_line(2, &comment),
            "2. \"cats are liquid\": Needs a citation. See style guide."
        );
        comment.exact_quote.clear();
        assert_eq!(summary_line(1, &comment), "1. Needs a citation. See style guide.");
    }
}
