use crate::config::AnnotationOptions;
use crate::core::writer::{DocxWriter, GenerateReport};
use crate::error::{AnnotateError, Result};
use crate::feedback::{annotations_for, FeedbackRecord};
use crate::utils::files::{annotated_path, ensure_docx, read_source, write_output_atomic};
use log::{error, info};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome of annotating one file on disk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub applied: usize,
    pub skipped: usize,
}

/// One unit of work for [`DocumentProcessor::annotate_batch`].
#[derive(Debug, Clone)]
pub struct AnnotateJob {
    pub source: PathBuf,
    pub records: Vec<FeedbackRecord>,
}

pub struct DocumentProcessor {
    writer: DocxWriter,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new(AnnotationOptions::default())
    }
}

impl DocumentProcessor {
    pub fn new(options: AnnotationOptions) -> Self {
        Self {
            writer: DocxWriter::new(options),
        }
    }

    /// Annotate `source` with the inline records and write `<stem>_annotated.docx`
    /// next to it. Nothing is written unless generation succeeds.
    pub async fn annotate_file(&self, source: &Path, records: &[FeedbackRecord]) -> Result<FileReport> {
        self.annotate_file_to(source, &annotated_path(source), records).await
    }

    pub async fn annotate_file_to(
        &self,
        source: &Path,
        output: &Path,
        records: &[FeedbackRecord],
    ) -> Result<FileReport> {
        ensure_docx(source)?;
        info!("annotating {} with {} records", source.display(), records.len());

        let bytes = tokio::fs::read(source).await?;
        let writer = self.writer.clone();
        let comments = annotations_for(records);
        let report = tokio::task::spawn_blocking(move || writer.generate(&bytes, &comments))
            .await
            .map_err(|e| AnnotateError::IoFailure(std::io::Error::other(e)))??;

        let out = output.to_path_buf();
        let data = report.bytes.clone();
        tokio::task::spawn_blocking(move || write_output_atomic(&out, &data))
            .await
            .map_err(|e| AnnotateError::IoFailure(std::io::Error::other(e)))??;

        Ok(file_report(source, output, &report))
    }

    /// Synchronous counterpart of [`Self::annotate_file`].
    pub fn annotate_path(&self, source: &Path, output: &Path, records: &[FeedbackRecord]) -> Result<FileReport> {
        ensure_docx(source)?;
        let bytes = read_source(source)?;
        let report = self.writer.generate(&bytes, &annotations_for(records))?;
        write_output_atomic(output, &report.bytes)?;
        Ok(file_report(source, output, &report))
    }

    /// Annotate independent files in parallel. Results keep the job order.
    pub fn annotate_batch(&self, jobs: &[AnnotateJob]) -> Vec<Result<FileReport>> {
        jobs.par_iter()
            .map(|job| {
                let output = annotated_path(&job.source);
                let result = self.annotate_path(&job.source, &output, &job.records);
                if let Err(e) = &result {
                    error!("failed to annotate {}: {e}", job.source.display());
                }
                result
            })
            .collect()
    }
}

fn file_report(source: &Path, output: &Path, report: &GenerateReport) -> FileReport {
    info!(
        "wrote {} ({} applied, {} skipped)",
        output.display(),
        report.applied.len(),
        report.skipped.len()
    );
    FileReport {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        applied: report.applied.len(),
        skipped: report.skipped.len(),
    }
}
