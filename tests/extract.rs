mod common;

use annotator_rs::core::parser::{DocxParser, Parser, UniversalParser};
use annotator_rs::{extract, AnnotateError};
use common::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn paragraphs_and_runs_follow_document_order() {
    let bytes = docx(&[&["The ", "cat"], &[], &["Second ", "paragraph."]]);
    let map = extract(&bytes).unwrap();

    assert_eq!(map.part, PART);
    let texts: Vec<&str> = map.paragraphs.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["The cat", "", "Second paragraph."]);
    assert_eq!(map.paragraphs[2].units[1].run_index, 1);
    assert_eq!(map.paragraphs[2].units[1].global_start, 7 + 1 + 1 + 7);
    assert_eq!(map.plain_text(), "The cat\n\nSecond paragraph.");
}

#[test]
fn non_text_runs_keep_their_index() {
    let body = r#"<w:p><w:r><w:t>A</w:t></w:r><w:r><w:tab/></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>B</w:t></w:r></w:p>"#;
    let map = extract(&docx_with_body(body)).unwrap();
    let units: Vec<(usize, &str)> = map.paragraphs[0]
        .units
        .iter()
        .map(|u| (u.run_index, u.text.as_str()))
        .collect();
    assert_eq!(units, vec![(0, "A"), (2, "B")]);
}

#[test]
fn main_part_is_found_through_package_relationships() {
    let rels = PACKAGE_RELS.replace("word/document.xml", "word/main.xml");
    let types = CONTENT_TYPES.replace("/word/document.xml", "/word/main.xml");
    let document = document_xml(&paragraph(&["Relocated"]));
    let bytes = package(&[
        ("[Content_Types].xml", &types),
        ("_rels/.rels", &rels),
        ("word/main.xml", &document),
    ]);

    let map = extract(&bytes).unwrap();
    assert_eq!(map.part, "word/main.xml");
    assert_eq!(map.paragraphs[0].units[0].part, "word/main.xml");
}

#[rstest]
#[case::pdf(b"%PDF-1.7\n%...".to_vec())]
#[case::png(b"\x89PNG\r\n\x1a\n".to_vec())]
#[case::text(b"just some text".to_vec())]
fn foreign_bytes_are_unsupported(#[case] bytes: Vec<u8>) {
    assert!(matches!(extract(&bytes), Err(AnnotateError::UnsupportedFormat(_))));
}

#[test]
fn spreadsheet_packages_are_unsupported() {
    let types = CONTENT_TYPES.replace(
        "wordprocessingml.document.main+xml",
        "spreadsheetml.sheet.main+xml",
    );
    let bytes = package(&[("[Content_Types].xml", &types), ("xl/workbook.xml", "<workbook/>")]);
    assert!(matches!(extract(&bytes), Err(AnnotateError::UnsupportedFormat(_))));
}

#[rstest]
#[case::no_content_types(package(&[("word/document.xml", &document_xml(""))]))]
#[case::no_main_part(package(&[("[Content_Types].xml", CONTENT_TYPES), ("_rels/.rels", PACKAGE_RELS)]))]
#[case::malformed_main_part(package(&[
    ("[Content_Types].xml", CONTENT_TYPES),
    ("_rels/.rels", PACKAGE_RELS),
    ("word/document.xml", "<w:document><w:body><w:p></w:body>"),
]))]
#[case::truncated(docx(&[&["cut short"]])[..40].to_vec())]
fn broken_packages_are_invalid(#[case] bytes: Vec<u8>) {
    assert!(matches!(extract(&bytes), Err(AnnotateError::InvalidPackage(_))));
}

#[test]
fn parsers_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("essay.docx");
    std::fs::write(&path, docx(&[&["On disk"]])).unwrap();

    let map = UniversalParser::new().parse(&path).unwrap();
    assert_eq!(map, DocxParser.parse(&path).unwrap());
    assert_eq!(map.paragraphs[0].text, "On disk");

    let missing = DocxParser.parse(dir.path().join("absent.docx"));
    assert!(matches!(missing, Err(AnnotateError::IoFailure(_))));
}
