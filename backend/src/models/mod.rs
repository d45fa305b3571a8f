//! Domain models for the drugload uploaders.
//!
//! - [`NdcField`] - Scalar-or-list product field of an NDC document
//! - [`NdcDocument`] - One consolidated NDC document per canonical key
//! - [`SiderDocument`] - One SIDER document with its side-effect list
//! - [`FrequencyCategory`] - Clinical frequency band of a side effect
//! - [`SourceMeta`] - Homepage and license of a data source

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A product of the NDC directory.
///
/// Either the bare product code (`"0002-1433"`) or the full product record
/// emitted by the NDC parser; both are passed through untouched.
pub type NdcProduct = Value;

// =============================================================================
// NDC
// =============================================================================

/// The `ndc` field of a consolidated document.
///
/// The shape depends on cardinality only: one product is stored as a scalar,
/// anything else as an array. Serialized untagged so the index sees the
/// same scalar/array duality the hub always produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NdcField {
    /// Two or more products (or none), in first-seen order.
    Multiple(Vec<NdcProduct>),
    /// Exactly one product.
    Single(NdcProduct),
}

impl NdcField {
    /// Build the field from an accumulated product list.
    pub fn from_products(mut products: Vec<NdcProduct>) -> Self {
        if products.len() == 1 {
            NdcField::Single(products.remove(0))
        } else {
            NdcField::Multiple(products)
        }
    }

    /// Number of products in the field.
    pub fn len(&self) -> usize {
        match self {
            NdcField::Single(_) => 1,
            NdcField::Multiple(products) => products.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the products regardless of shape.
    pub fn products(&self) -> impl Iterator<Item = &NdcProduct> {
        let slice = match self {
            NdcField::Single(product) => std::slice::from_ref(product),
            NdcField::Multiple(products) => products.as_slice(),
        };
        slice.iter()
    }
}

/// A consolidated NDC document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NdcDocument {
    /// Canonical compound key.
    #[serde(rename = "_id")]
    pub id: String,
    pub ndc: NdcField,
}

// =============================================================================
// SIDER
// =============================================================================

/// A SIDER document.
///
/// Side-effect entries stay raw JSON: only their order and count change.
/// Top-level fields other than `_id` and `sider` are carried over as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiderDocument {
    /// Canonical compound key.
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sider: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SiderDocument {
    /// Number of side-effect entries (0 when the list is absent).
    pub fn entry_count(&self) -> usize {
        self.sider.as_ref().map_or(0, Vec::len)
    }
}

// =============================================================================
// Frequency Category
// =============================================================================

/// Clinical frequency band of a side effect.
///
/// Declaration order is rank order: the most frequent band sorts first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyCategory {
    /// At least 1 in 10.
    VeryCommon,
    /// 1 in 100 to 1 in 10.
    Common,
    /// 1 in 1,000 to 1 in 100.
    Uncommon,
    /// 1 in 10,000 to 1 in 1,000.
    Rare,
    /// Fewer than 1 in 10,000.
    VeryRare,
    /// Post-marketing reports, frequency cannot be estimated.
    NotKnown,
}

impl FrequencyCategory {
    /// Position in the ranking, 0 for the most frequent band.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryCommon => "very common",
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::VeryRare => "very rare",
            Self::NotKnown => "not known",
        }
    }
}

// =============================================================================
// Source metadata
// =============================================================================

/// Provenance of a data source, stored alongside its documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceMeta {
    pub url: String,
    pub license: String,
    pub license_url: String,
    pub license_url_short: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ndc_field_shape_follows_cardinality() {
        assert_eq!(NdcField::from_products(vec![json!("N1")]), NdcField::Single(json!("N1")));
        assert_eq!(
            NdcField::from_products(vec![json!("N1"), json!("N2")]),
            NdcField::Multiple(vec![json!("N1"), json!("N2")])
        );
        assert!(NdcField::from_products(vec![]).is_empty());
    }

    #[test]
    fn test_ndc_document_serialization() {
        let single = NdcDocument {
            id: "IK1".into(),
            ndc: NdcField::Single(json!("N3")),
        };
        assert_eq!(serde_json::to_value(&single).unwrap(), json!({"_id": "IK1", "ndc": "N3"}));

        let multiple = NdcDocument {
            id: "IK1".into(),
            ndc: NdcField::Multiple(vec![json!("N1"), json!("N2")]),
        };
        assert_eq!(
            serde_json::to_value(&multiple).unwrap(),
            json!({"_id": "IK1", "ndc": ["N1", "N2"]})
        );
    }

    #[test]
    fn test_ndc_document_deserializes_both_shapes() {
        let doc: NdcDocument = serde_json::from_value(json!({"_id": "IK1", "ndc": ["N1", "N2"]})).unwrap();
        assert_eq!(doc.ndc.len(), 2);
        let doc: NdcDocument = serde_json::from_value(json!({"_id": "IK2", "ndc": {"productndc": "N3"}})).unwrap();
        assert!(matches!(doc.ndc, NdcField::Single(_)));
    }

    #[test]
    fn test_sider_document_keeps_extra_fields() {
        let raw = json!({"_id": "IK1", "pubchem_cid": 2244, "sider": []});
        let doc: SiderDocument = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(doc.extra["pubchem_cid"], 2244);
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_sider_document_absent_list_stays_absent() {
        let raw = json!({"_id": "IK1"});
        let doc: SiderDocument = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(doc.entry_count(), 0);
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn test_frequency_rank_order() {
        assert!(FrequencyCategory::VeryCommon < FrequencyCategory::Common);
        assert!(FrequencyCategory::Rare < FrequencyCategory::VeryRare);
        assert!(FrequencyCategory::VeryRare < FrequencyCategory::NotKnown);
        assert_eq!(FrequencyCategory::VeryCommon.rank(), 0);
        assert_eq!(FrequencyCategory::NotKnown.rank(), 5);
    }
}
