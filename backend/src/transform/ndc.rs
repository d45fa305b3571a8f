//! Consolidate resolved NDC product records into one document per compound.
//!
//! The NDC directory lists one record per marketed product. After key lookup
//! several products usually resolve to the same compound, so records are
//! grouped under their canonical key:
//!
//! ```text
//! Resolved records               →  Documents
//! ┌────────────────────────┐       ┌─────────────────────────┐
//! │ _id: IK1, ndc: N1      │       │ _id: IK1                │
//! │ _id: IK1, ndc: N2      │  →    │ ndc: [N1, N2]           │
//! │ _id: IK2, ndc: N3      │       ├─────────────────────────┤
//! └────────────────────────┘       │ _id: IK2                │
//!                                  │ ndc: N3                 │
//!                                  └─────────────────────────┘
//! ```
//!
//! # Output Format
//!
//! - `ndc` is a scalar when exactly one product maps to the key, an array otherwise
//! - arrays keep first-seen order and never hold the same product twice
//! - documents come out in the order their key was first seen

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::InputContractError;
use crate::models::{NdcDocument, NdcField, NdcProduct};

/// Consolidate a sequence of resolved NDC records.
///
/// Grouping needs every record for a key before it can emit, so the whole
/// input is consumed before the first document is returned.
pub fn consolidate_ndc<I>(records: I) -> Result<impl Iterator<Item = NdcDocument>, InputContractError>
where
    I: IntoIterator<Item = Value>,
{
    let mut consolidator = NdcConsolidator::new();
    for (index, record) in records.into_iter().enumerate() {
        consolidator.push(index, &record)?;
    }
    Ok(consolidator.finish())
}

/// Incremental grouping state, keyed by canonical compound id.
#[derive(Debug, Default)]
pub struct NdcConsolidator {
    positions: HashMap<String, usize>,
    groups: Vec<ProductGroup>,
    records_seen: usize,
}

#[derive(Debug)]
struct ProductGroup {
    id: String,
    products: Vec<NdcProduct>,
    /// Canonical form of every product in `products`.
    seen: HashSet<String>,
}

impl ProductGroup {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            products: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn add(&mut self, product: &NdcProduct) {
        if self.seen.insert(canonical_key(product)) {
            self.products.push(product.clone());
        }
    }
}

/// JSON text of a product with object keys sorted, so equal products
/// share a key whatever their field order.
fn canonical_key(product: &NdcProduct) -> String {
    let mut key = String::new();
    write_canonical(product, &mut key);
    key
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(fields) => {
            let mut names: Vec<&String> = fields.keys().collect();
            names.sort();
            out.push('{');
            for (i, name) in names.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(&fields[name.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

impl NdcConsolidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one resolved record.
    ///
    /// `index` is the record's position in the input and is only used to
    /// report contract violations.
    pub fn push(&mut self, index: usize, record: &Value) -> Result<(), InputContractError> {
        let id = match record.get("_id") {
            None | Some(Value::Null) => return Err(InputContractError::missing(index, "_id")),
            Some(Value::String(id)) => id,
            Some(_) => return Err(InputContractError::wrong_type(index, "_id", "string")),
        };
        let ndc = match record.get("ndc") {
            None | Some(Value::Null) => return Err(InputContractError::missing(index, "ndc")),
            Some(ndc) => ndc,
        };

        let group = self.group_mut(id);
        match ndc {
            // Several products already attached upstream: merge, keep what we have.
            Value::Array(products) => {
                for product in products {
                    group.add(product);
                }
            }
            product => group.add(product),
        }
        self.records_seen += 1;
        Ok(())
    }

    fn group_mut(&mut self, id: &str) -> &mut ProductGroup {
        let position = match self.positions.get(id) {
            Some(&position) => position,
            None => {
                let position = self.groups.len();
                self.positions.insert(id.to_string(), position);
                self.groups.push(ProductGroup::new(id));
                position
            }
        };
        &mut self.groups[position]
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records accepted so far.
    pub fn records_seen(&self) -> usize {
        self.records_seen
    }

    /// Emit one document per key, in first-seen order.
    pub fn finish(self) -> impl Iterator<Item = NdcDocument> {
        debug!(
            records = self.records_seen,
            documents = self.groups.len(),
            "consolidated NDC products"
        );
        self.groups.into_iter().map(|group| NdcDocument {
            id: group.id,
            ndc: NdcField::from_products(group.products),
        })
    }
}
