#![allow(dead_code)]

use annotator_rs::{Anchor, AnnotationComment, AnnotationOptions};
use chrono::{TimeZone, Utc};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const PART: &str = "word/document.xml";

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

pub const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

pub const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

pub const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="Normal"/></w:styles>"#;

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// `<w:r>` holding `text`, marked for space preservation only when needed.
pub fn run(text: &str) -> String {
    let preserve = text.starts_with(' ') || text.ends_with(' ');
    let attr = if preserve { r#" xml:space="preserve""# } else { "" };
    format!("<w:r><w:t{attr}>{}</w:t></w:r>", escape(text))
}

pub fn paragraph(runs: &[&str]) -> String {
    let inner: String = runs.iter().map(|r| run(r)).collect();
    format!("<w:p>{inner}</w:p>")
}

pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
    )
}

/// Zip the given parts, in order, into package bytes.
pub fn package(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn docx_with_body(body: &str) -> Vec<u8> {
    let document = document_xml(body);
    package(&[
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/document.xml", &document),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("word/styles.xml", STYLES),
    ])
}

/// Package whose paragraphs hold the given runs.
pub fn docx(paragraphs: &[&[&str]]) -> Vec<u8> {
    let body: String = paragraphs.iter().map(|runs| paragraph(runs)).collect();
    docx_with_body(&body)
}

pub fn read_part(bytes: &[u8], name: &str) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name(name).ok()?;
    let mut out = String::new();
    entry.read_to_string(&mut out).unwrap();
    Some(out)
}

pub fn part_names(bytes: &[u8]) -> Vec<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Text inside the comment range with the given id, in document order.
pub fn marked_text(document: &str, id: u32) -> String {
    let doc = roxmltree::Document::parse(document).unwrap();
    let id = id.to_string();
    let mut inside = false;
    let mut out = String::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        let name = node.tag_name().name();
        let matches = node.attribute((W_NS, "id")) == Some(id.as_str());
        match name {
            "commentRangeStart" if matches => inside = true,
            "commentRangeEnd" if matches => break,
            "t" if inside => out.push_str(node.text().unwrap_or_default()),
            _ => {}
        }
    }
    out
}

pub fn count_elements(xml: &str, local: &str) -> usize {
    let doc = roxmltree::Document::parse(xml).unwrap();
    doc.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == local)
        .count()
}

pub fn comment(text: &str, quote: &str, start: (usize, usize, usize), end: (usize, usize, usize)) -> AnnotationComment {
    AnnotationComment {
        comment_text: text.to_string(),
        exact_quote: quote.to_string(),
        start_anchor: Anchor::new(PART, start.0, start.1, start.2),
        end_anchor: Anchor::new(PART, end.0, end.1, end.2),
    }
}

pub fn fixed_options() -> AnnotationOptions {
    AnnotationOptions {
        author: "Ms. Vega".to_string(),
        initials: "MV".to_string(),
        date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).single(),
        ..AnnotationOptions::default()
    }
}
