//! JSON Schema validation of the documents handed to storage.
//!
//! # Embedded Schemas
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `ndc-document.json` - `_id` plus a scalar product or a list of 0 or 2+
//!   distinct products
//! - `sider-document.json` - `_id` plus at most 2000 ranked side-effect entries
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use drugload::{validate_document, SourceKind};
//!
//! let doc = json!({ "_id": "IK1", "ndc": ["N1", "N2"] });
//! assert!(validate_document(SourceKind::Ndc, &doc).is_ok());
//!
//! let doc = json!({ "_id": "IK1", "ndc": ["N1"] });
//! assert!(validate_document(SourceKind::Ndc, &doc).is_err());
//! ```

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::sources::SourceKind;

static NDC_VALIDATOR: Lazy<Validator> =
    Lazy::new(|| compile(include_str!("../../schemas/ndc-document.json")));

static SIDER_VALIDATOR: Lazy<Validator> =
    Lazy::new(|| compile(include_str!("../../schemas/sider-document.json")));

fn compile(source: &str) -> Validator {
    let schema: Value = serde_json::from_str(source).expect("Invalid embedded schema");
    jsonschema::draft7::new(&schema).expect("Invalid embedded schema")
}

fn validator(kind: SourceKind) -> &'static Validator {
    match kind {
        SourceKind::Ndc => &NDC_VALIDATOR,
        SourceKind::Sider => &SIDER_VALIDATOR,
    }
}

/// Validate a document of the given source against its embedded schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
pub fn validate_document(kind: SourceKind, data: &Value) -> Result<(), Vec<String>> {
    collect_errors(validator(kind), data)
}

/// Quick check against the embedded schema of a source.
pub fn is_valid_document(kind: SourceKind, data: &Value) -> bool {
    validator(kind).is_valid(data)
}

fn collect_errors(validator: &Validator, data: &Value) -> Result<(), Vec<String>> {
    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
