//! Data sources handled by the uploaders.
//!
//! Each source has a registry name, provenance metadata and an index
//! mapping. The transform behind each one lives in [`crate::transform`].

use clap::ValueEnum;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::mapping::{ndc_mapping, sider_mapping};
use crate::models::SourceMeta;

/// A data source known to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// FDA National Drug Code directory.
    Ndc,
    /// SIDER side-effect resource.
    Sider,
}

static NDC_META: Lazy<SourceMeta> = Lazy::new(|| SourceMeta {
    url: "http://www.fda.gov/Drugs/InformationOnDrugs/ucm142438.htm".into(),
    license: "public domain".into(),
    license_url: "https://www.fda.gov/AboutFDA/AboutThisWebsite/WebsitePolicies/default.htm#linking"
        .into(),
    license_url_short: "http://bit.ly/2KAojBn".into(),
});

static SIDER_META: Lazy<SourceMeta> = Lazy::new(|| SourceMeta {
    url: "http://sideeffects.embl.de/".into(),
    license: "CC BY-NC-SA 3.0".into(),
    license_url: "ftp://xi.embl.de/SIDER/LICENSE".into(),
    license_url_short: "http://bit.ly/2SjPTpx".into(),
});

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Ndc, SourceKind::Sider];

    /// Registry name of the source.
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Ndc => "ndc",
            SourceKind::Sider => "sider",
        }
    }

    pub fn meta(self) -> &'static SourceMeta {
        match self {
            SourceKind::Ndc => &NDC_META,
            SourceKind::Sider => &SIDER_META,
        }
    }

    pub fn mapping(self) -> &'static Value {
        match self {
            SourceKind::Ndc => ndc_mapping(),
            SourceKind::Sider => sider_mapping(),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_names_match_registry() {
        use clap::ValueEnum;
        for kind in SourceKind::ALL {
            assert_eq!(SourceKind::from_str(kind.name(), false), Ok(kind));
        }
        assert!(SourceKind::from_str("chembl", true).is_err());
    }

    #[test]
    fn test_mapping_root_is_source_field() {
        for kind in SourceKind::ALL {
            assert!(kind.mapping().get(kind.name()).is_some(), "{kind}");
        }
    }

    #[test]
    fn test_licenses() {
        assert_eq!(SourceKind::Ndc.meta().license, "public domain");
        assert_eq!(SourceKind::Sider.meta().license, "CC BY-NC-SA 3.0");
    }
}
