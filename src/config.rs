use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::group::DEFAULT_TREATMENT_PATTERN;
use crate::data::schema::VariantChoice;
use crate::error::PipelineError;

/// Default header of the authoritative treatment column.
pub const DEFAULT_OVERRIDE_COLUMN: &str = "TRATAMIENTOS";

/// Settings for one pipeline run.
///
/// Every field has a default, so a JSON config file only needs to name the
/// settings it changes:
///
/// ```json
/// { "variant": "weekly", "output_dir": "out" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub variant: VariantChoice,
    /// Column whose values replace label extraction when present.
    pub override_column: String,
    /// Regex applied to the label to find the treatment code.
    pub treatment_pattern: String,
    pub output_dir: PathBuf,
    /// Write the CSV export after a successful run.
    pub export: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            variant: VariantChoice::Auto,
            override_column: DEFAULT_OVERRIDE_COLUMN.to_string(),
            treatment_pattern: DEFAULT_TREATMENT_PATTERN.to_string(),
            output_dir: PathBuf::from("."),
            export: true,
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file. Unknown keys are rejected.
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("reading {}: {e}", path.display())))?;
        let config = Self::from_json_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
