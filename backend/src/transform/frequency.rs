//! Frequency labels of SIDER side effects.
//!
//! SIDER reports frequencies either as label keywords (`"frequent"`,
//! `"rare"`, `"postmarketing"`) or as percentages taken from drug labels
//! (`"5%"`, `"1-10%"`, `"0.1% to 1%"`, `"<1%"`). Both are mapped onto the
//! CIOMS frequency bands of [`FrequencyCategory`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::FrequencyCategory;

/// First number of a label, with an optional `<` in front.
static PERCENTAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(<|≤|less than)?\s*(\d*\.?\d+)").expect("valid percentage pattern")
});

impl FrequencyCategory {
    /// Parse a SIDER frequency label.
    ///
    /// Returns `None` for labels that name no known band and hold no number.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        if let Some(category) = Self::from_keyword(&normalized) {
            return Some(category);
        }

        let caps = PERCENTAGE.captures(&normalized)?;
        let value: f64 = caps.get(2)?.as_str().parse().ok()?;
        let exclusive = caps.get(1).is_some();
        Some(Self::from_percentage(value, exclusive))
    }

    /// Parse the raw JSON value stored in `side_effect.frequency`.
    ///
    /// Numbers are read as percentages.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n.as_f64().map(|v| Self::from_percentage(v, false)),
            _ => None,
        }
    }

    fn from_keyword(label: &str) -> Option<Self> {
        let category = match label {
            "very common" | "very frequent" => Self::VeryCommon,
            "common" | "frequent" => Self::Common,
            "uncommon" | "infrequent" => Self::Uncommon,
            "rare" => Self::Rare,
            "very rare" => Self::VeryRare,
            "postmarketing" | "post-marketing" | "not known" | "unknown" => Self::NotKnown,
            _ => return None,
        };
        Some(category)
    }

    /// Map a percentage onto its band.
    ///
    /// With `exclusive` the value is a strict upper bound (`"<1%"`), so a
    /// value sitting exactly on a band edge falls into the band below.
    pub fn from_percentage(value: f64, exclusive: bool) -> Self {
        let at_least = |edge: f64| if exclusive { value > edge } else { value >= edge };
        if at_least(10.0) {
            Self::VeryCommon
        } else if at_least(1.0) {
            Self::Common
        } else if at_least(0.1) {
            Self::Uncommon
        } else if at_least(0.01) {
            Self::Rare
        } else {
            Self::VeryRare
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keywords() {
        assert_eq!(FrequencyCategory::parse("very frequent"), Some(FrequencyCategory::VeryCommon));
        assert_eq!(FrequencyCategory::parse("Frequent"), Some(FrequencyCategory::Common));
        assert_eq!(FrequencyCategory::parse(" infrequent "), Some(FrequencyCategory::Uncommon));
        assert_eq!(FrequencyCategory::parse("rare"), Some(FrequencyCategory::Rare));
        assert_eq!(FrequencyCategory::parse("very rare"), Some(FrequencyCategory::VeryRare));
        assert_eq!(FrequencyCategory::parse("postmarketing"), Some(FrequencyCategory::NotKnown));
    }

    #[test]
    fn test_percentages_use_lower_bound() {
        assert_eq!(FrequencyCategory::parse("25%"), Some(FrequencyCategory::VeryCommon));
        assert_eq!(FrequencyCategory::parse("10%"), Some(FrequencyCategory::VeryCommon));
        assert_eq!(FrequencyCategory::parse("1-10%"), Some(FrequencyCategory::Common));
        assert_eq!(FrequencyCategory::parse("0.1% to 1%"), Some(FrequencyCategory::Uncommon));
        assert_eq!(FrequencyCategory::parse("0.05%"), Some(FrequencyCategory::Rare));
        assert_eq!(FrequencyCategory::parse("0.001%"), Some(FrequencyCategory::VeryRare));
        assert_eq!(FrequencyCategory::parse(".5%"), Some(FrequencyCategory::Uncommon));
        assert_eq!(FrequencyCategory::parse(".01% to .1%"), Some(FrequencyCategory::Rare));
    }

    #[test]
    fn test_strict_upper_bound() {
        assert_eq!(FrequencyCategory::parse("<1%"), Some(FrequencyCategory::Uncommon));
        assert_eq!(FrequencyCategory::parse("< 10%"), Some(FrequencyCategory::Common));
        assert_eq!(FrequencyCategory::parse("less than 0.1%"), Some(FrequencyCategory::Rare));
        assert_eq!(FrequencyCategory::parse("<.1%"), Some(FrequencyCategory::Rare));
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(FrequencyCategory::parse(""), None);
        assert_eq!(FrequencyCategory::parse("sometimes"), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(FrequencyCategory::from_json(&json!("rare")), Some(FrequencyCategory::Rare));
        assert_eq!(FrequencyCategory::from_json(&json!(3.5)), Some(FrequencyCategory::Common));
        assert_eq!(FrequencyCategory::from_json(&json!(null)), None);
        assert_eq!(FrequencyCategory::from_json(&json!(["rare"])), None);
    }
}
