//! Normalize SIDER documents: rank side effects, cap the list.
//!
//! Each resolved SIDER record carries every side effect reported for a
//! compound. The list is sorted so the most frequent effects come first,
//! then names in case-insensitive order, and only the first
//! [`DEFAULT_MAX_ENTRIES`] entries are kept. Dropped entries are not noted on
//! the document; they are reported through [`TruncationAudit`].

use serde_json::Value;
use std::cmp::Ordering;
use tracing::{trace, warn};

use crate::audit::TruncationAudit;
use crate::error::{EntryDefect, InputContractError, MalformedEntryError, TransformError};
use crate::models::{FrequencyCategory, SiderDocument};

/// Maximum number of side-effect entries kept per document.
pub const DEFAULT_MAX_ENTRIES: usize = 2000;

/// Composite sort key of a side-effect entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub frequency: FrequencyCategory,
    /// Lowercased side-effect name.
    pub name: String,
}

impl SortKey {
    /// Read `side_effect.frequency` and `side_effect.name` of an entry.
    pub fn for_entry(entry: &Value) -> Result<Self, EntryDefect> {
        let entry = entry.as_object().ok_or(EntryDefect::NotAnObject)?;
        let side_effect = entry.get("side_effect");

        let raw_frequency = side_effect
            .and_then(|se| se.get("frequency"))
            .filter(|v| !v.is_null())
            .ok_or(EntryDefect::MissingFrequency)?;
        let frequency = FrequencyCategory::from_json(raw_frequency)
            .ok_or_else(|| EntryDefect::UnknownFrequency(display_raw(raw_frequency)))?;

        let name = side_effect
            .and_then(|se| se.get("name"))
            .and_then(Value::as_str)
            .ok_or(EntryDefect::MissingName)?;

        Ok(Self {
            frequency,
            name: name.to_lowercase(),
        })
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frequency
            .cmp(&other.frequency)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Sort a side-effect list and cap it at `max_entries`.
///
/// The sort is stable: entries with equal keys keep their input order.
/// On error the defect comes with the position of the entry in `entries`.
pub fn rank_entries(
    entries: Vec<Value>,
    max_entries: usize,
) -> Result<Vec<Value>, (usize, EntryDefect)> {
    let mut keyed = entries
        .into_iter()
        .enumerate()
        .map(|(position, entry)| match SortKey::for_entry(&entry) {
            Ok(key) => Ok((key, entry)),
            Err(defect) => Err((position, defect)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.truncate(max_entries);
    Ok(keyed.into_iter().map(|(_, entry)| entry).collect())
}

/// Record-at-a-time SIDER normalizer.
#[derive(Debug)]
pub struct SiderNormalizer {
    max_entries: usize,
    audit: TruncationAudit,
}

impl Default for SiderNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl SiderNormalizer {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            audit: TruncationAudit::new(),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Truncations recorded so far.
    pub fn audit(&self) -> &TruncationAudit {
        &self.audit
    }

    pub fn into_audit(self) -> TruncationAudit {
        self.audit
    }

    /// Normalize one resolved record.
    ///
    /// `index` is the record's position in the input, used to report
    /// contract violations.
    pub fn normalize(&mut self, index: usize, record: Value) -> Result<SiderDocument, TransformError> {
        let mut fields = match record {
            Value::Object(fields) => fields,
            _ => return Err(InputContractError::wrong_type(index, "record", "object").into()),
        };

        let id = match fields.remove("_id") {
            None | Some(Value::Null) => return Err(InputContractError::missing(index, "_id").into()),
            Some(Value::String(id)) => id,
            Some(_) => return Err(InputContractError::wrong_type(index, "_id", "string").into()),
        };

        let sider = match fields.remove("sider") {
            None | Some(Value::Null) => None,
            Some(Value::Array(entries)) => Some(self.rank(&id, entries)?),
            Some(_) => return Err(InputContractError::wrong_type(index, "sider", "array").into()),
        };

        Ok(SiderDocument {
            id,
            sider,
            extra: fields,
        })
    }

    fn rank(&mut self, id: &str, entries: Vec<Value>) -> Result<Vec<Value>, MalformedEntryError> {
        let original_len = entries.len();
        let ranked = rank_entries(entries, self.max_entries).map_err(|(entry, defect)| {
            MalformedEntryError {
                id: id.to_string(),
                entry,
                defect,
            }
        })?;

        if ranked.len() < original_len {
            warn!(
                id,
                original_len,
                kept = ranked.len(),
                "truncated side-effect list"
            );
            self.audit.record(id, original_len, ranked.len());
        } else {
            trace!(id, entries = original_len, "ranked side-effect list");
        }
        Ok(ranked)
    }
}

/// Lazily normalize a sequence of resolved SIDER records.
pub fn normalize_sider<I>(records: I, max_entries: usize) -> NormalizeSider<I::IntoIter>
where
    I: IntoIterator<Item = Value>,
{
    NormalizeSider {
        records: records.into_iter().enumerate(),
        normalizer: SiderNormalizer::new(max_entries),
    }
}

/// Iterator returned by [`normalize_sider`].
#[derive(Debug)]
pub struct NormalizeSider<I> {
    records: std::iter::Enumerate<I>,
    normalizer: SiderNormalizer,
}

impl<I> NormalizeSider<I> {
    /// Truncations recorded so far.
    pub fn audit(&self) -> &TruncationAudit {
        self.normalizer.audit()
    }
}

impl<I> Iterator for NormalizeSider<I>
where
    I: Iterator<Item = Value>,
{
    type Item = Result<SiderDocument, TransformError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, record) = self.records.next()?;
        Some(self.normalizer.normalize(index, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn entry(name: &str, frequency: &str) -> Value {
        json!({
            "side_effect": {"name": name, "frequency": frequency, "placebo": false},
            "meddra": {"type": "PT", "umls_id": "C0000000"},
        })
    }

    fn names(doc: &SiderDocument) -> Vec<String> {
        doc.sider
            .as_ref()
            .unwrap()
            .iter()
            .map(|e| e["side_effect"]["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_sorted_by_frequency_then_name() {
        let record = json!({
            "_id": "IK1",
            "sider": [
                entry("nausea", "rare"),
                entry("Headache", "frequent"),
                entry("abdominal pain", "frequent"),
                entry("rash", "postmarketing"),
                entry("Dizziness", "25%"),
            ]
        });

        let doc = SiderNormalizer::default().normalize(0, record).unwrap();
        assert_eq!(
            names(&doc),
            vec!["Dizziness", "abdominal pain", "Headache", "nausea", "rash"]
        );
    }

    #[test]
    fn test_truncates_to_max_entries() {
        let entries: Vec<Value> = (0..2005)
            .map(|i| entry(&format!("effect {i:04}"), if i % 2 == 0 { "rare" } else { "common" }))
            .collect();
        let record = json!({"_id": "IK1", "sider": entries});

        let mut normalizer = SiderNormalizer::default();
        let doc = normalizer.normalize(0, record).unwrap();

        let sider = doc.sider.as_ref().unwrap();
        assert_eq!(sider.len(), 2000);
        let keys: Vec<SortKey> = sider.iter().map(|e| SortKey::for_entry(e).unwrap()).collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]));
        // 1002 common entries come first, rare ones fill the rest
        assert_eq!(keys[0].frequency, FrequencyCategory::Common);
        assert_eq!(keys[1999].frequency, FrequencyCategory::Rare);

        assert_eq!(normalizer.audit().documents().len(), 1);
        assert_eq!(normalizer.audit().documents()[0].dropped(), 5);
    }

    #[test]
    fn test_absent_and_empty_lists_pass_through() {
        let mut normalizer = SiderNormalizer::default();

        let doc = normalizer.normalize(0, json!({"_id": "IK1", "pubchem": 5})).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"_id": "IK1", "pubchem": 5}));

        let doc = normalizer.normalize(1, json!({"_id": "IK2", "sider": []})).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"_id": "IK2", "sider": []}));

        // null is read as an absent list
        let doc = normalizer.normalize(2, json!({"_id": "IK3", "sider": null})).unwrap();
        assert_eq!(doc.sider, None);
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"_id": "IK3"}));
        assert!(normalizer.audit().is_empty());
    }

    #[test]
    fn test_entries_untouched_apart_from_order() {
        let first = entry("b", "rare");
        let second = entry("a", "rare");
        let doc = SiderNormalizer::default()
            .normalize(0, json!({"_id": "IK1", "sider": [first.clone(), second.clone()]}))
            .unwrap();
        assert_eq!(doc.sider.unwrap(), vec![second, first]);
    }

    #[test]
    fn test_missing_frequency_names_document() {
        let record = json!({
            "_id": "IK7",
            "sider": [entry("a", "rare"), {"side_effect": {"name": "b"}}]
        });
        let err = SiderNormalizer::default().normalize(0, record).unwrap_err();
        assert_eq!(
            err,
            TransformError::MalformedEntry(MalformedEntryError {
                id: "IK7".into(),
                entry: 1,
                defect: EntryDefect::MissingFrequency,
            })
        );
    }

    #[test]
    fn test_missing_name_and_unknown_frequency() {
        let key = SortKey::for_entry(&json!({"side_effect": {"frequency": "rare"}}));
        assert_eq!(key, Err(EntryDefect::MissingName));

        let key = SortKey::for_entry(&json!({"side_effect": {"name": "x", "frequency": "often"}}));
        assert_eq!(key, Err(EntryDefect::UnknownFrequency("often".into())));

        assert_eq!(SortKey::for_entry(&json!("x")), Err(EntryDefect::NotAnObject));
    }

    #[test]
    fn test_contract_violations() {
        let mut normalizer = SiderNormalizer::default();

        let err = normalizer.normalize(4, json!({"sider": []})).unwrap_err();
        assert_eq!(err, TransformError::from(InputContractError::missing(4, "_id")));

        let err = normalizer.normalize(5, json!({"_id": "IK1", "sider": "rash"})).unwrap_err();
        assert_eq!(err, TransformError::from(InputContractError::wrong_type(5, "sider", "array")));

        let err = normalizer.normalize(6, json!(["IK1"])).unwrap_err();
        assert_eq!(err, TransformError::from(InputContractError::wrong_type(6, "record", "object")));
        assert_eq!(err.to_string(), "Record 6: field 'record' expected object");
    }

    #[test]
    fn test_lazy_iterator_stops_at_consumer() {
        let records = (0..3).map(|i| json!({"_id": format!("IK{i}"), "sider": [entry("x", "rare")]}));
        let mut docs = normalize_sider(records, 10);

        let first = docs.next().unwrap().unwrap();
        assert_eq!(first.id, "IK0");
        assert_eq!(docs.count(), 2);
    }

    const FREQUENCIES: [&str; 8] = [
        "very frequent", "frequent", "infrequent", "rare", "very rare", "postmarketing", "5%", "<1%",
    ];

    fn entries_strategy() -> impl Strategy<Value = Vec<Value>> {
        prop::collection::vec(
            (0..FREQUENCIES.len(), "[a-zA-Z ]{1,8}"),
            0..80,
        )
        .prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(f, name)| entry(&name, FREQUENCIES[f]))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_sorted_capped_and_idempotent(entries in entries_strategy(), max in 1usize..40) {
            let ranked = rank_entries(entries, max).unwrap();
            prop_assert!(ranked.len() <= max);

            let keys: Vec<SortKey> = ranked.iter().map(|e| SortKey::for_entry(e).unwrap()).collect();
            for pair in keys.windows(2) {
                prop_assert!(pair[0].frequency.rank() <= pair[1].frequency.rank());
                if pair[0].frequency == pair[1].frequency {
                    prop_assert!(pair[0].name <= pair[1].name);
                }
            }

            let again = rank_entries(ranked.clone(), max).unwrap();
            prop_assert_eq!(again, ranked);
        }
    }
}
