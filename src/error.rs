use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AnnotateError>;

/// Terminal failures of extraction and generation.
///
/// Comments whose anchors cannot be resolved are not errors; they are
/// reported through [`crate::core::writer::GenerateReport::skipped`].
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    #[error("IO failure: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("Invalid anchor: {0}")]
    InvalidAnchor(String),

    #[error("Invalid feedback record: {0}")]
    InvalidRecord(String),
}

impl AnnotateError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AnnotateError::InvalidPackage(message.into())
    }
}

// Archives are always read from memory, so even an io error from the zip
// reader means the bytes are not a readable package.
impl From<zip::result::ZipError> for AnnotateError {
    fn from(err: zip::result::ZipError) -> Self {
        AnnotateError::InvalidPackage(err.to_string())
    }
}

impl From<roxmltree::Error> for AnnotateError {
    fn from(err: roxmltree::Error) -> Self {
        AnnotateError::InvalidPackage(format!("malformed XML: {err}"))
    }
}

impl From<quick_xml::Error> for AnnotateError {
    fn from(err: quick_xml::Error) -> Self {
        AnnotateError::InvalidPackage(format!("malformed XML: {err}"))
    }
}

impl From<std::string::FromUtf8Error> for AnnotateError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        AnnotateError::InvalidPackage(format!("part is not UTF-8: {err}"))
    }
}
