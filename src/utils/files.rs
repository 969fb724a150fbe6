use crate::error::{AnnotateError, Result};
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sources above this size are read through a memory map.
const MMAP_THRESHOLD: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Docx,
    Pdf,
    Image,
    Unknown,
}

impl FileKind {
    pub fn from_extension(extension: &str) -> Self {
        let normalized = extension.trim_start_matches('.').to_lowercase();
        match normalized.as_str() {
            "docx" => FileKind::Docx,
            "pdf" => FileKind::Pdf,
            "jpeg" | "jpg" | "png" | "gif" | "webp" | "bmp" | "svg" | "heic" | "heif" | "avif"
            | "tiff" | "tif" => FileKind::Image,
            _ => FileKind::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(FileKind::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Docx => "docx",
            FileKind::Pdf => "pdf",
            FileKind::Image => "image",
            FileKind::Unknown => "unknown",
        }
    }
}

/// Reject anything but a word-processing package before touching the disk.
pub fn ensure_docx(path: &Path) -> Result<()> {
    match FileKind::from_path(path) {
        FileKind::Docx => Ok(()),
        other => Err(AnnotateError::UnsupportedFormat(format!(
            "{} ({})",
            path.display(),
            other.as_str()
        ))),
    }
}

/// `essays/draft.docx` -> `essays/draft_annotated.docx`
pub fn annotated_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_annotated.{}", ext.to_string_lossy()),
        None => format!("{stem}_annotated"),
    };
    path.with_file_name(name)
}

pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    let size = std::fs::metadata(path)?.len();
    if size > MMAP_THRESHOLD {
        debug!("mapping {} ({size} bytes)", path.display());
        let file = File::open(path)?;
        // SAFETY: the map is copied out immediately and dropped.
        let mmap = unsafe { Mmap::map(&file)? };
        return Ok(mmap.to_vec());
    }
    Ok(std::fs::read(path)?)
}

/// Write through a temporary sibling and rename, so a failed write never
/// leaves partial output at `path`.
pub fn write_output_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AnnotateError::IoFailure(e.error))?;
    Ok(())
}
