//! Conversion configuration.
//!
//! Mirrors the CLI surface: every field can come from a YAML config file,
//! with individual values overridden by command-line flags.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Name reported in the generated `document/tracking/generator` block.
pub const ENGINE_NAME: &str = "cvrf2csaf";

/// Configuration consumed by the conversion core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Publisher name; CVRF keeps publisher identity out of the document
    /// content, so this is supplied by the operator
    pub publisher_name: String,
    /// Publisher namespace; must be a valid URI
    pub publisher_namespace: String,
    /// Value of the `csaf_version` field in the output
    pub csaf_version: String,
    /// Synthesize a revision-history entry when the current version is
    /// missing from the history, instead of failing
    pub fix_insert_current_version_into_revision_history: bool,
    /// Default a reference's category to "external" when the source has no
    /// `Type` attribute
    pub force_insert_default_reference_category: bool,
    /// Drop CVSS score sets without a vector string instead of failing
    pub remove_cvss_values_without_vector: bool,
    /// Produce output even when the conversion raised the failure flag
    pub force: bool,
    /// CVSS v3.x version used when it cannot be derived from the document
    pub default_cvss3_version: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            publisher_name: String::new(),
            publisher_namespace: String::new(),
            csaf_version: "2.0".to_string(),
            fix_insert_current_version_into_revision_history: false,
            force_insert_default_reference_category: false,
            remove_cvss_values_without_vector: false,
            force: false,
            default_cvss3_version: "3.0".to_string(),
        }
    }
}

impl ConversionConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConvertError::io(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConvertError::config(format!("reading {} failed: {e}", path.display())))
    }
}
