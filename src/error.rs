use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Fatal errors
// ---------------------------------------------------------------------------

/// Errors that abort a pipeline run. Nothing is summarized or exported.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required columns absent after trimming header names.
    #[error("missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// The file could not be read or a cell holds the wrong type.
    #[error("could not read {source_name}: {cause}")]
    Parse { source_name: String, cause: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("could not write {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl PipelineError {
    /// Wrap a loader error, keeping its full context chain in the message.
    pub fn parse(source_name: impl Into<String>, err: &anyhow::Error) -> Self {
        PipelineError::Parse {
            source_name: source_name.into(),
            cause: format!("{err:#}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Non-fatal warnings
// ---------------------------------------------------------------------------

/// Data-quality notices collected during a run. None of them abort it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Columns with no values at all, removed before validation.
    EmptyColumnsDropped { columns: Vec<String> },
    /// Rows removed for missing analysis fields.
    RowsDropped { before: usize, after: usize },
    /// Nothing left after cleaning; no summaries are produced.
    EmptyResult,
    /// A derived metric could not be computed for some rows.
    DegenerateDerivation { column: String, rows: usize },
    /// No feed-source column, so that summary was skipped.
    FeedSourceMissing,
    /// Fewer than two distinct weeks, so no trend line.
    InsufficientTrendData { distinct_periods: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EmptyColumnsDropped { columns } => {
                write!(f, "dropped empty columns: {}", columns.join(", "))
            }
            Warning::RowsDropped { before, after } => write!(
                f,
                "{} of {before} rows dropped for missing values ({after} remain)",
                before - after
            ),
            Warning::EmptyResult => write!(f, "no rows left after cleaning; nothing to summarize"),
            Warning::DegenerateDerivation { column, rows } => {
                write!(f, "'{column}' could not be computed for {rows} rows")
            }
            Warning::FeedSourceMissing => {
                write!(f, "no feed-source column; skipping the summary by feed source")
            }
            Warning::InsufficientTrendData { distinct_periods } => write!(
                f,
                "insufficient data for a trend line ({distinct_periods} distinct weeks, need 2)"
            ),
        }
    }
}
