//! Transformation module.
//!
//! This module turns resolved records into hub documents:
//! - NDC: group products under their canonical key
//! - SIDER: rank side effects by frequency and cap the list
//! - Frequency: read frequency labels into clinical bands
//! - Pipeline: one complete upload run

pub mod frequency;
pub mod ndc;
pub mod pipeline;
pub mod sider;

pub use ndc::{consolidate_ndc, NdcConsolidator};
pub use pipeline::{run_upload, upload_records, upload_to_file, UploadReport};
pub use sider::{normalize_sider, rank_entries, SiderNormalizer, SortKey, DEFAULT_MAX_ENTRIES};
