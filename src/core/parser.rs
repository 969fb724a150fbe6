use crate::core::package::Package;
use crate::core::text_map::{ParagraphUnit, TextMap, TextUnit};
use crate::error::{AnnotateError, Result};
use crate::utils::files::{read_source, FileKind};
use log::debug;
use roxmltree::{Document, Node};
use std::path::Path;

pub trait Parser {
    /// Parse a document on disk into the text map of its main part
    fn parse<P: AsRef<Path>>(&self, path: P) -> Result<TextMap>;
}

/// Universal parser that rejects every kind except word-processing packages
pub struct UniversalParser {
    pub docx_parser: DocxParser,
}

impl UniversalParser {
    pub fn new() -> Self {
        Self {
            docx_parser: DocxParser,
        }
    }
}

impl Default for UniversalParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for UniversalParser {
    fn parse<P: AsRef<Path>>(&self, path: P) -> Result<TextMap> {
        match FileKind::from_path(path.as_ref()) {
            FileKind::Docx => self.docx_parser.parse(path),
            other => Err(AnnotateError::UnsupportedFormat(format!(
                "{} ({})",
                path.as_ref().display(),
                other.as_str()
            ))),
        }
    }
}

/// DocxParser: builds the run-granular text map of the main part using roxmltree.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxParser;

impl DocxParser {
    /// Text map of the package's main text part.
    pub fn extract(&self, bytes: &[u8]) -> Result<TextMap> {
        let package = Package::open(bytes)?;
        let part = package.primary_part()?;
        self.extract_part(&package, &part)
    }

    pub fn extract_part(&self, package: &Package, part: &str) -> Result<TextMap> {
        let xml = package
            .read_xml(part)?
            .ok_or_else(|| AnnotateError::invalid(format!("{part} not found in package")))?;
        build_text_map(&xml, part)
    }
}

impl Parser for DocxParser {
    fn parse<P: AsRef<Path>>(&self, path: P) -> Result<TextMap> {
        let bytes = read_source(path.as_ref())?;
        self.extract(&bytes)
    }
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
    local: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == local)
}

/// Literal text of a run: its direct `t` children, nothing else.
fn run_text(run: Node) -> String {
    let mut text = String::new();
    for t in element_children(run, "t") {
        for piece in t.children().filter(|n| n.is_text()) {
            text.push_str(piece.text().unwrap_or_default());
        }
    }
    text
}

/// Walk body paragraphs and their runs in document order.
///
/// Run indices count every run, including ones that contribute no text, so
/// they line up with the runs the writer later addresses.
pub fn build_text_map(xml: &str, part: &str) -> Result<TextMap> {
    let doc = Document::parse(xml)?;
    let body = element_children(doc.root_element(), "body")
        .next()
        .ok_or_else(|| AnnotateError::invalid(format!("{part} has no body element")))?;

    let mut paragraphs = Vec::new();
    let mut global = 0usize;

    for (paragraph_index, paragraph) in element_children(body, "p").enumerate() {
        let mut units = Vec::new();
        let mut text = String::new();

        for (run_index, run) in element_children(paragraph, "r").enumerate() {
            let run_text = run_text(run);
            if run_text.is_empty() {
                continue;
            }
            let len = run_text.chars().count();
            units.push(TextUnit {
                part: part.to_string(),
                paragraph_index,
                run_index,
                text: run_text.clone(),
                global_start: global,
                global_end: global + len,
            });
            text.push_str(&run_text);
            global += len;
        }

        paragraphs.push(ParagraphUnit {
            part: part.to_string(),
            paragraph_index,
            total_length: text.chars().count(),
            text,
            units,
        });
        // Paragraph gap: never addressable, keeps global ranges apart.
        global += 1;
    }

    debug!("text map for {part}: {} paragraphs", paragraphs.len());
    Ok(TextMap {
        part: part.to_string(),
        paragraphs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PART: &str = "word/document.xml";

    fn doc(body: &str) -> String {
        format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
        )
    }

    #[test]
    fn units_concatenate_to_paragraph_text() {
        let xml = doc(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>The </w:t></w:r><w:r><w:t>cat</w:t><w:t xml:space="preserve"> sat</w:t></w:r></w:p>"#,
        );
        let map = build_text_map(&xml, PART).unwrap();
        let paragraph = &map.paragraphs[0];
        let joined: String = paragraph.units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(joined, paragraph.text);
        assert_eq!(paragraph.text, "The cat sat");
        assert_eq!(paragraph.total_length, paragraph.text.chars().count());
    }

    #[test]
    fn empty_runs_are_skipped_but_keep_their_index() {
        let xml = doc(
            r#"<w:p><w:r><w:t>A</w:t></w:r><w:r><w:br/></w:r><w:r><w:t>B</w:t></w:r></w:p>"#,
        );
        let map = build_text_map(&xml, PART).unwrap();
        let runs: Vec<usize> = map.paragraphs[0].units.iter().map(|u| u.run_index).collect();
        assert_eq!(runs, vec![0, 2]);
    }

    #[test]
    fn global_offsets_increase_with_paragraph_gap() {
        let xml = doc(r#"<w:p><w:r><w:t>ab</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>c</w:t></w:r></w:p>"#);
        let map = build_text_map(&xml, PART).unwrap();
        assert_eq!(map.paragraphs.len(), 3);
        assert!(map.paragraphs[1].units.is_empty());
        let third = &map.paragraphs[2].units[0];
        assert_eq!((third.global_start, third.global_end), (4, 5));
    }

    #[test]
    fn entities_and_multibyte_text_count_characters() {
        let xml = doc(r#"<w:p><w:r><w:t>Fish &amp; chips, café</w:t></w:r></w:p>"#);
        let map = build_text_map(&xml, PART).unwrap();
        assert_eq!(map.paragraphs[0].text, "Fish & chips, café");
        assert_eq!(map.paragraphs[0].total_length, 18);
    }

    #[test]
    fn missing_body_is_invalid_package() {
        let result = build_text_map("<w:document xmlns:w=\"urn:x\"/>", PART);
        assert!(matches!(result, Err(AnnotateError::InvalidPackage(_))));
    }

    #[test]
    fn universal_parser_rejects_other_kinds_before_reading() {
        let result = UniversalParser::new().parse("/nonexistent/report.pdf");
        assert!(matches!(result, Err(AnnotateError::UnsupportedFormat(_))));
    }
}
