//! Output file naming and writing.
//!
//! CSAF prescribes the file name of a distributed advisory; invalid output
//! produced under `--force` is marked with an `_invalid` suffix so it can
//! never be mistaken for a conforming document.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{ConvertError, Result};

static NON_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^+\-a-z0-9]+").expect("static regex"));
static UNDERSCORE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("static regex"));

/// Derive the output file name from the document tracking id, per the CSAF
/// filename rules (section 5.1 of the standard).
#[must_use]
pub fn create_file_name(tracking_id: Option<&str>, valid_output: bool) -> String {
    let mut name = match tracking_id {
        Some(id) => {
            let lowered = id.to_lowercase();
            let replaced = NON_FILENAME_CHARS.replace_all(&lowered, "_");
            UNDERSCORE_RUNS.replace_all(&replaced, "_").into_owned()
        }
        None => "out".to_string(),
    };
    if !valid_output {
        name.push_str("_invalid");
    }
    name.push_str(".json");
    name
}

/// Write the CSAF document as pretty-printed JSON, creating the parent
/// directory if needed.
pub fn store_json(csaf: &Value, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConvertError::io(parent.to_path_buf(), e))?;
            tracing::info!("created output folder {}", parent.display());
        }
    }

    if path.exists() {
        tracing::warn!("output {} already exists, overwriting it", path.display());
    }

    let mut serialized = serde_json::to_string_pretty(csaf)
        .map_err(|e| ConvertError::config(format!("serializing output failed: {e}")))?;
    serialized.push('\n');
    std::fs::write(path, serialized).map_err(|e| ConvertError::io(path.to_path_buf(), e))?;
    tracing::info!("successfully wrote {}", path.display());
    Ok(())
}
