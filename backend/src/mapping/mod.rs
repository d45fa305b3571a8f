//! Search-index mappings of the NDC and SIDER documents.
//!
//! Static configuration handed to the indexer as-is: for each field the
//! index type, an optional normalizer and optional `copy_to` targets.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// Normalizer applied to every keyword field.
pub const KEYWORD_NORMALIZER: &str = "keyword_lowercase_normalizer";

fn keyword() -> Value {
    json!({
        "normalizer": KEYWORD_NORMALIZER,
        "type": "keyword",
    })
}

fn text() -> Value {
    json!({ "type": "text" })
}

static NDC_MAPPING: Lazy<Value> = Lazy::new(|| {
    json!({
        "ndc": {
            "properties": {
                "product_id": keyword(),
                "productndc": text(),
                "producttypename": keyword(),
                "proprietaryname": keyword(),
                "proprietarynamesuffix": keyword(),
                "nonproprietaryname": keyword(),
                "dosageformname": keyword(),
                "routename": keyword(),
                "startmarketingdate": text(),
                "endmarketingdate": text(),
                "marketingcategoryname": keyword(),
                "applicationnumber": keyword(),
                "labelername": keyword(),
                "substancename": {
                    "normalizer": KEYWORD_NORMALIZER,
                    "type": "keyword",
                    "copy_to": ["all"],
                },
                "active_numerator_strength": text(),
                "active_ingred_unit": keyword(),
                "pharm_classes": keyword(),
                "deaschedule": keyword(),
                "package": {
                    "properties": {
                        "packagedescription": keyword(),
                        "ndcpackagecode": text(),
                    }
                }
            }
        }
    })
});

static SIDER_MAPPING: Lazy<Value> = Lazy::new(|| {
    json!({
        "sider": {
            "properties": {
                "stitch": {
                    "properties": {
                        "flat": keyword(),
                        "stereo": keyword(),
                    }
                },
                "indication": {
                    "properties": {
                        "method_of_detection": keyword(),
                        "name": text(),
                    }
                },
                "meddra": {
                    "properties": {
                        "type": keyword(),
                        "umls_id": keyword(),
                    }
                },
                "side_effect": {
                    "properties": {
                        "frequency": keyword(),
                        "placebo": { "type": "boolean" },
                        "name": text(),
                    }
                }
            }
        }
    })
});

/// Index mapping of NDC documents.
pub fn ndc_mapping() -> &'static Value {
    &NDC_MAPPING
}

/// Index mapping of SIDER documents.
pub fn sider_mapping() -> &'static Value {
    &SIDER_MAPPING
}

/// Dotted paths of every leaf field declared in a mapping.
///
/// `{"a": {"properties": {"b": {"type": "text"}}}}` yields `["a.b"]`.
pub fn field_paths(mapping: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(mapping, "", &mut paths);
    paths
}

fn collect_paths(node: &Value, prefix: &str, paths: &mut Vec<String>) {
    let Some(fields) = node.as_object() else {
        return;
    };
    for (name, spec) in fields {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        match spec.get("properties") {
            Some(properties) => collect_paths(properties, &path, paths),
            None => paths.push(path),
        }
    }
}
