//! Zip package access: format sniffing, part lookup through relationships,
//! and re-emission with replaced parts.

use crate::error::{AnnotateError, Result};
use log::debug;
use roxmltree::Document;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELS_PART: &str = "_rels/.rels";
pub const DEFAULT_MAIN_PART: &str = "word/document.xml";

pub const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const COMMENTS_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
pub const COMMENTS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";

const WORD_MAIN_TYPES: [&str; 3] = [
    "wordprocessingml.document.main",
    "wordprocessingml.template.main",
    "ms-word.document.macroEnabled.main",
];
const OTHER_MAIN_TYPES: [(&str, &str); 2] = [
    ("spreadsheetml.sheet.main", "spreadsheet package"),
    ("presentationml.presentation.main", "presentation package"),
];

/// Coarse classification of raw bytes, decided before any parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sniffed {
    Zip,
    Other(&'static str),
}

pub fn sniff(bytes: &[u8]) -> Sniffed {
    const SIGNATURES: [(&[u8], &str); 6] = [
        (b"%PDF", "pdf"),
        (b"\x89PNG", "png"),
        (b"\xFF\xD8\xFF", "jpeg"),
        (b"GIF8", "gif"),
        (b"BM", "bmp"),
        (b"\xD0\xCF\x11\xE0", "legacy compound document"),
    ];
    if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"PK\x05\x06") {
        return Sniffed::Zip;
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| bytes.starts_with(magic))
        .map(|(_, kind)| Sniffed::Other(*kind))
        .unwrap_or(Sniffed::Other("unrecognised bytes"))
}

/// An opened document package. Reads go to the original archive unless the
/// part has been replaced; writing copies untouched entries verbatim.
pub struct Package {
    source: Vec<u8>,
    names: Vec<String>,
    replaced: BTreeMap<String, Vec<u8>>,
}

impl Package {
    pub fn open(bytes: &[u8]) -> Result<Self> {
        if let Sniffed::Other(kind) = sniff(bytes) {
            return Err(AnnotateError::UnsupportedFormat(kind.to_string()));
        }
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        let names = archive.file_names().map(str::to_string).collect();
        let package = Self {
            source: bytes.to_vec(),
            names,
            replaced: BTreeMap::new(),
        };
        package.check_word_processing()?;
        Ok(package)
    }

    fn check_word_processing(&self) -> Result<()> {
        let xml = self
            .read_xml(CONTENT_TYPES_PART)?
            .ok_or_else(|| AnnotateError::invalid("[Content_Types].xml missing"))?;
        let doc = Document::parse(&xml)?;
        let declared: Vec<&str> = doc
            .descendants()
            .filter(|n| n.is_element())
            .filter_map(|n| n.attribute("ContentType"))
            .collect();
        if declared.iter().any(|ct| WORD_MAIN_TYPES.iter().any(|w| ct.contains(w))) {
            return Ok(());
        }
        for (marker, kind) in OTHER_MAIN_TYPES {
            if declared.iter().any(|ct| ct.contains(marker)) {
                return Err(AnnotateError::UnsupportedFormat(kind.to_string()));
            }
        }
        Ok(())
    }

    pub fn read_part(&self, name: &str) -> Result<Option<Vec<u8>>> {
        if let Some(bytes) = self.replaced.get(name) {
            return Ok(Some(bytes.clone()));
        }
        if !self.names.iter().any(|n| n == name) {
            return Ok(None);
        }
        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))?;
        let mut entry = archive.by_name(name)?;
        let mut out = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut out)
            .map_err(|e| AnnotateError::invalid(format!("cannot inflate {name}: {e}")))?;
        Ok(Some(out))
    }

    pub fn read_xml(&self, name: &str) -> Result<Option<String>> {
        match self.read_part(name)? {
            Some(bytes) => Ok(Some(decode_xml(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        self.replaced.insert(name.to_string(), bytes);
    }

    /// Name of the main text part, taken from the package relationships.
    pub fn primary_part(&self) -> Result<String> {
        let Some(rels) = self.read_xml(PACKAGE_RELS_PART)? else {
            return Ok(DEFAULT_MAIN_PART.to_string());
        };
        let doc = Document::parse(&rels)?;
        let target = doc
            .descendants()
            .filter(|n| n.tag_name().name() == "Relationship")
            .find(|n| n.attribute("Type") == Some(OFFICE_DOCUMENT_REL))
            .and_then(|n| n.attribute("Target"));
        Ok(match target {
            Some(target) => resolve_target("", target),
            None => DEFAULT_MAIN_PART.to_string(),
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(self.source.as_slice()))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(self.source.len())));

        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            match self.replaced.get(&name) {
                Some(bytes) => {
                    let method = match entry.compression() {
                        CompressionMethod::Stored => CompressionMethod::Stored,
                        _ => CompressionMethod::Deflated,
                    };
                    drop(entry);
                    write_entry(&mut writer, &name, bytes, method)?;
                }
                None => writer.raw_copy_file(entry).map_err(write_failure)?,
            }
        }

        for (name, bytes) in &self.replaced {
            if !self.names.iter().any(|n| n == name) {
                debug!("adding new part {name}");
                write_entry(&mut writer, name, bytes, CompressionMethod::Deflated)?;
            }
        }

        let cursor = writer.finish().map_err(write_failure)?;
        Ok(cursor.into_inner())
    }
}

fn write_entry<W: Write + std::io::Seek>(
    writer: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    method: CompressionMethod,
) -> Result<()> {
    writer
        .start_file(name, FileOptions::default().compression_method(method))
        .map_err(write_failure)?;
    writer.write_all(bytes)?;
    Ok(())
}

fn write_failure(err: zip::result::ZipError) -> AnnotateError {
    match err {
        zip::result::ZipError::Io(io) => AnnotateError::IoFailure(io),
        other => AnnotateError::IoFailure(std::io::Error::other(other.to_string())),
    }
}

/// Strip a UTF-8 byte order mark and decode.
fn decode_xml(mut bytes: Vec<u8>) -> Result<String> {
    if bytes.starts_with(b"\xEF\xBB\xBF") {
        bytes.drain(..3);
    }
    Ok(String::from_utf8(bytes)?)
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

pub fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Inverse of [`resolve_target`] for parts in or below `base_dir`.
pub fn relative_target(base_dir: &str, part: &str) -> String {
    if base_dir.is_empty() {
        return part.to_string();
    }
    match part.strip_prefix(base_dir).and_then(|rest| rest.strip_prefix('/')) {
        Some(rest) => rest.to_string(),
        None => format!("/{part}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"%PDF-1.7".as_slice(), Sniffed::Other("pdf"))]
    #[case(b"\x89PNG\r\n".as_slice(), Sniffed::Other("png"))]
    #[case(b"PK\x03\x04rest".as_slice(), Sniffed::Zip)]
    #[case(b"plain text".as_slice(), Sniffed::Other("unrecognised bytes"))]
    fn sniffs_leading_bytes(#[case] bytes: &[u8], #[case] expected: Sniffed) {
        assert_eq!(sniff(bytes), expected);
    }

    #[test]
    fn non_zip_bytes_are_unsupported_not_invalid() {
        assert!(matches!(
            Package::open(b"%PDF-1.4 ..."),
            Err(AnnotateError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn truncated_zip_is_invalid_package() {
        assert!(matches!(
            Package::open(b"PK\x03\x04\x14\x00"),
            Err(AnnotateError::InvalidPackage(_))
        ));
    }

    #[rstest]
    #[case("word/document.xml", "word/_rels/document.xml.rels")]
    #[case("document.xml", "_rels/document.xml.rels")]
    fn rels_part_paths(#[case] part: &str, #[case] expected: &str) {
        assert_eq!(rels_part_for(part), expected);
    }

    #[rstest]
    #[case("word", "comments.xml", "word/comments.xml")]
    #[case("word", "/word/comments.xml", "word/comments.xml")]
    #[case("word/sub", "../comments.xml", "word/comments.xml")]
    #[case("", "word/document.xml", "word/document.xml")]
    fn resolves_targets(#[case] base: &str, #[case] target: &str, #[case] expected: &str) {
        assert_eq!(resolve_target(base, target), expected);
    }

    #[test]
    fn relative_target_inverts_resolution() {
        assert_eq!(relative_target("word", "word/comments.xml"), "comments.xml");
        assert_eq!(relative_target("word", "custom/comments.xml"), "/custom/comments.xml");
    }
}
