//! Truncation audit - record which SIDER documents lost side-effect entries
//!
//! Documents are capped without leaving a trace on the document itself, so
//! the ids and counts are collected here and written to `truncated_docs.tsv`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default file name of the audit list.
pub const DEFAULT_AUDIT_FILE: &str = "truncated_docs.tsv";

/// One truncated document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TruncatedDocument {
    /// Canonical key of the document
    #[serde(rename = "_id")]
    pub id: String,
    /// Number of side-effect entries before truncation
    pub original_len: usize,
    /// Number of entries kept
    pub kept_len: usize,
}

impl TruncatedDocument {
    /// Number of entries dropped
    pub fn dropped(&self) -> usize {
        self.original_len - self.kept_len
    }
}

/// Truncations seen during one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct TruncationAudit {
    documents: Vec<TruncatedDocument>,
}

impl TruncationAudit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a truncated document
    pub fn record(&mut self, id: impl Into<String>, original_len: usize, kept_len: usize) {
        self.documents.push(TruncatedDocument {
            id: id.into(),
            original_len,
            kept_len,
        });
    }

    /// All truncated documents, in processing order
    pub fn documents(&self) -> &[TruncatedDocument] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Total number of entries dropped across documents
    pub fn dropped_entries(&self) -> usize {
        self.documents.iter().map(TruncatedDocument::dropped).sum()
    }

    /// Write the audit list as tab-separated values with a header row
    pub fn write_tsv(&self, path: &Path) -> Result<(), csv::Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        for document in &self.documents {
            writer.serialize(document)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load an audit list written by [`TruncationAudit::write_tsv`]
    pub fn read_tsv(path: &Path) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        let documents = reader
            .deserialize()
            .collect::<Result<Vec<TruncatedDocument>, _>>()?;
        Ok(Self { documents })
    }
}
