//! Upload run: read resolved records, transform, validate, write documents.
//!
//! This module combines all steps of one uploader run:
//! parsing, NDC consolidation or SIDER normalization, schema validation,
//! JSON-lines output and the truncation audit.
//!
//! # Example
//!
//! ```rust,ignore
//! use drugload::{run_upload, SourceKind, UploadOptions};
//! use std::path::Path;
//!
//! let out = std::fs::File::create("sider_docs.jsonl")?;
//! let report = run_upload(
//!     SourceKind::Sider,
//!     Path::new("sider_resolved.jsonl"),
//!     out,
//!     &UploadOptions::default(),
//! )?;
//! println!("{} documents, {} truncated", report.output_documents, report.truncated.len());
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ndc::NdcConsolidator;
use super::sider::SiderNormalizer;
use crate::audit::{TruncatedDocument, TruncationAudit};
use crate::config::UploadOptions;
use crate::error::{ParseError, PipelineResult};
use crate::parser::read_records;
use crate::sources::SourceKind;
use crate::validation::validate_document;

/// Validation failures kept in the report; the rest are only counted.
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Summary of one upload run
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub run_id: Uuid,
    pub source: SourceKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Resolved records read from the input
    pub input_records: usize,

    /// Documents written to the sink
    pub output_documents: usize,

    /// Documents rejected by schema validation (not written)
    pub invalid_documents: usize,

    /// First validation failures (output position, errors)
    pub validation_errors: Vec<(usize, Vec<String>)>,

    /// SIDER documents whose side-effect list was capped
    pub truncated: Vec<TruncatedDocument>,
}

impl UploadReport {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Run an uploader over a file of resolved records.
///
/// Documents are written to `sink` as JSON lines. The input format is
/// detected by [`read_records`].
pub fn run_upload<W: Write>(
    kind: SourceKind,
    input: &Path,
    sink: W,
    options: &UploadOptions,
) -> PipelineResult<UploadReport> {
    info!(source = %kind, input = %input.display(), "reading resolved records");
    let records = read_records(input)?;
    upload_records(kind, records, sink, options)
}

/// Run an uploader into a file.
///
/// Documents go to a temporary file next to `output` that replaces it only
/// once the run succeeds; a failed run leaves `output` untouched.
pub fn upload_to_file(
    kind: SourceKind,
    input: &Path,
    output: &Path,
    options: &UploadOptions,
) -> PipelineResult<UploadReport> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)?;
    let report = run_upload(kind, input, BufWriter::new(staged.as_file_mut()), options)?;
    staged.persist(output).map_err(|e| e.error)?;
    debug!(path = %output.display(), "documents written");
    Ok(report)
}

/// Run an uploader over records already in hand.
///
/// A parse error in the stream aborts the run.
pub fn upload_records<I, W>(
    kind: SourceKind,
    records: I,
    sink: W,
    options: &UploadOptions,
) -> PipelineResult<UploadReport>
where
    I: IntoIterator<Item = Result<Value, ParseError>>,
    W: Write,
{
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, source = %kind, validate = options.validate, "upload started");

    let mut out = DocumentSink::new(sink, kind, options.validate);
    let mut input_records = 0;

    let audit = match kind {
        SourceKind::Ndc => {
            let mut consolidator = NdcConsolidator::new();
            for (index, record) in records.into_iter().enumerate() {
                consolidator.push(index, &record?)?;
                input_records += 1;
            }
            info!(records = input_records, documents = consolidator.len(), "grouped NDC products");
            for doc in consolidator.finish() {
                out.emit(&doc)?;
            }
            TruncationAudit::new()
        }
        SourceKind::Sider => {
            let mut normalizer = SiderNormalizer::new(options.max_sider_entries);
            for (index, record) in records.into_iter().enumerate() {
                let doc = normalizer.normalize(index, record?)?;
                input_records += 1;
                out.emit(&doc)?;
            }
            normalizer.into_audit()
        }
    };

    out.finish()?;

    if !audit.is_empty() {
        warn!(
            documents = audit.documents().len(),
            dropped_entries = audit.dropped_entries(),
            "side-effect lists truncated"
        );
    }
    if let Some(path) = &options.audit_path {
        audit.write_tsv(path)?;
        info!(path = %path.display(), documents = audit.documents().len(), "wrote truncation audit");
    }

    let report = UploadReport {
        run_id,
        source: kind,
        started_at,
        finished_at: Utc::now(),
        input_records,
        output_documents: out.written,
        invalid_documents: out.invalid,
        validation_errors: out.errors,
        truncated: audit.documents().to_vec(),
    };

    if report.invalid_documents > 0 {
        warn!(invalid = report.invalid_documents, "documents failed schema validation");
    }
    info!(
        %run_id,
        records = report.input_records,
        documents = report.output_documents,
        duration_ms = report.duration_ms(),
        "upload finished"
    );
    Ok(report)
}

/// JSON-lines writer with optional schema validation
struct DocumentSink<W> {
    sink: W,
    kind: SourceKind,
    validate: bool,
    position: usize,
    written: usize,
    invalid: usize,
    errors: Vec<(usize, Vec<String>)>,
}

impl<W: Write> DocumentSink<W> {
    fn new(sink: W, kind: SourceKind, validate: bool) -> Self {
        Self {
            sink,
            kind,
            validate,
            position: 0,
            written: 0,
            invalid: 0,
            errors: Vec::new(),
        }
    }

    fn emit<T: Serialize>(&mut self, doc: &T) -> PipelineResult<()> {
        let position = self.position;
        self.position += 1;
        let value = serde_json::to_value(doc)?;

        if self.validate {
            if let Err(errors) = validate_document(self.kind, &value) {
                let id = value.get("_id").and_then(Value::as_str).unwrap_or_default();
                debug!(position, id, errors = ?errors, "invalid document");
                self.invalid += 1;
                if self.errors.len() < MAX_REPORTED_ERRORS {
                    self.errors.push((position, errors));
                }
                return Ok(());
            }
        }

        serde_json::to_writer(&mut self.sink, &value)?;
        self.sink.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.sink.flush()
    }
}
