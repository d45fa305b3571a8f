//! Upload run options.
//!
//! Defaults can be overridden from the environment (a `.env` file is loaded
//! by the binary through `dotenvy`); command-line flags are applied last.
//!
//! | Variable                     | Effect                                  |
//! |------------------------------|-----------------------------------------|
//! | `DRUGLOAD_SIDER_MAX_ENTRIES` | cap on side-effect entries per document |
//! | `DRUGLOAD_AUDIT_FILE`        | where truncated documents are recorded  |
//! | `DRUGLOAD_SKIP_VALIDATION`   | `1`/`true`/`yes` disables schema checks |

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::transform::sider::DEFAULT_MAX_ENTRIES;

pub const ENV_SIDER_MAX_ENTRIES: &str = "DRUGLOAD_SIDER_MAX_ENTRIES";
pub const ENV_AUDIT_FILE: &str = "DRUGLOAD_AUDIT_FILE";
pub const ENV_SKIP_VALIDATION: &str = "DRUGLOAD_SKIP_VALIDATION";

/// Options for [`crate::transform::pipeline::run_upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Maximum number of side-effect entries kept per SIDER document.
    pub max_sider_entries: usize,

    /// Check every output document against its schema.
    pub validate: bool,

    /// Write the truncation audit to this file when set.
    pub audit_path: Option<PathBuf>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_sider_entries: DEFAULT_MAX_ENTRIES,
            validate: true,
            audit_path: None,
        }
    }
}

impl UploadOptions {
    /// Defaults with the `DRUGLOAD_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`UploadOptions::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(value) = lookup(ENV_SIDER_MAX_ENTRIES) {
            options.max_sider_entries = parse_max_entries(&value)?;
        }
        if let Some(value) = lookup(ENV_AUDIT_FILE) {
            let value = value.trim();
            if !value.is_empty() {
                options.audit_path = Some(PathBuf::from(value));
            }
        }
        if let Some(value) = lookup(ENV_SKIP_VALIDATION) {
            options.validate = !parse_flag(ENV_SKIP_VALIDATION, &value)?;
        }

        Ok(options)
    }
}

fn parse_max_entries(value: &str) -> Result<usize, ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidValue {
        var: ENV_SIDER_MAX_ENTRIES,
        value: value.to_string(),
        message: message.to_string(),
    };
    let max: usize = value
        .trim()
        .parse()
        .map_err(|_| invalid("expected a positive integer"))?;
    if max == 0 {
        return Err(invalid("must be at least 1"));
    }
    Ok(max)
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            message: "expected a boolean".to_string(),
        }),
    }
}
