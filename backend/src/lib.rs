//! # Drugload - NDC and SIDER uploaders for the compound hub
//!
//! Drugload turns records already resolved to a canonical compound key into
//! the documents the hub stores: NDC products grouped per compound, and SIDER
//! side effects ranked by frequency.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Resolved   │────▶│   Parser    │────▶│  Transform  │────▶│  Documents  │
//! │   records   │     │ (auto-fmt)  │     │ (NDC/SIDER) │     │ (JSON lines)│
//! └─────────────┘     └─────────────┘     └──────┬──────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         truncated_docs.tsv
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use drugload::{run_upload, SourceKind, UploadOptions};
//! use std::path::Path;
//!
//! let report = run_upload(
//!     SourceKind::Ndc,
//!     Path::new("ndc_resolved.jsonl"),
//!     std::io::stdout().lock(),
//!     &UploadOptions::default(),
//! )?;
//! eprintln!("Wrote {} documents", report.output_documents);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Document models (NdcDocument, SiderDocument, FrequencyCategory)
//! - [`parser`] - Resolved-record reader with format auto-detection
//! - [`transform`] - NDC consolidation, SIDER normalization, pipeline
//! - [`validation`] - Document schema validation
//! - [`mapping`] - Static index mappings
//! - [`sources`] - Source registry and metadata
//! - [`audit`] - Truncation audit
//! - [`config`] - Upload options and environment overrides
//! - [`logging`] - Tracing subscriber setup

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Source registry
pub mod mapping;
pub mod sources;

// Run support
pub mod audit;
pub mod config;
pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    EntryDefect,
    InputContractError,
    MalformedEntryError,
    ParseError,
    PipelineError,
    TransformError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    FrequencyCategory,
    NdcDocument,
    NdcField,
    NdcProduct,
    SiderDocument,
    SourceMeta,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_records,
    read_records,
    RecordStream,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    consolidate_ndc,
    normalize_sider,
    run_upload,
    upload_records,
    upload_to_file,
    NdcConsolidator,
    SiderNormalizer,
    UploadReport,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid_document, validate_document};

// =============================================================================
// Re-exports - Sources, audit, config
// =============================================================================

pub use audit::{TruncatedDocument, TruncationAudit};
pub use config::UploadOptions;
pub use mapping::{ndc_mapping, sider_mapping};
pub use sources::SourceKind;
