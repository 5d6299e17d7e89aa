use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::data::aggregate::{self, Summary};
use crate::data::chart::{self, Figure};
use crate::data::clean::{self, CleanReport};
use crate::data::derive;
use crate::data::group::GroupExtractor;
use crate::data::loader;
use crate::data::model::{Dataset, Field, RawTable};
use crate::data::schema::{Layout, Variant};
use crate::data::trend::{self, TrendError, TrendFit};
use crate::error::{PipelineError, Warning};
use crate::export;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Everything computed from a non-empty cleaned dataset.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub dataset: Dataset,
    /// Summary by treatment (treatment layout) or by week (weekly layout).
    pub by_group: Summary,
    pub by_feed_source: Option<Summary>,
    pub overall: Summary,
    pub figures: Vec<Figure>,
    pub trend: Option<TrendFit>,
}

/// Outcome of one run, consumed by the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub source: String,
    pub variant: Variant,
    pub rows_loaded: usize,
    pub dropped_columns: Vec<String>,
    pub clean: CleanReport,
    pub warnings: Vec<Warning>,
    /// `None` when cleaning left no rows.
    pub analysis: Option<Analysis>,
}

impl PipelineReport {
    pub fn is_empty(&self) -> bool {
        self.analysis.is_none()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// validate → extract → clean → derive → aggregate → project, once per file.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    extractor: GroupExtractor,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let extractor = GroupExtractor::new(&config.treatment_pattern).map_err(|e| {
            PipelineError::Config(format!("treatment pattern '{}': {e}", config.treatment_pattern))
        })?;
        Ok(Pipeline { config, extractor })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load `path` and run the full pipeline on it.
    pub fn run_file(&self, path: &Path) -> Result<PipelineReport, PipelineError> {
        let source = path.display().to_string();
        let table = loader::load_file(path).map_err(|e| PipelineError::parse(&source, &e))?;
        self.run_table(source, table)
    }

    /// Run the pipeline on an already loaded table.
    pub fn run_table(
        &self,
        source: impl Into<String>,
        mut table: RawTable,
    ) -> Result<PipelineReport, PipelineError> {
        let source = source.into();
        let mut warnings = Vec::new();
        let mut note = |w: Warning| {
            warn!("{w}");
            warnings.push(w);
        };

        let variant = Variant::resolve(self.config.variant, &table.normalized_columns());
        let mut layout = Layout::new(variant, &self.config.override_column);
        info!("Processing {source} as {variant:?} layout");

        let dropped_columns = clean::drop_empty_columns(&mut table, &layout.required_columns());
        if !dropped_columns.is_empty() {
            note(Warning::EmptyColumnsDropped {
                columns: dropped_columns.clone(),
            });
        }

        let missing = layout.bind(&table);
        if !missing.is_empty() {
            return Err(PipelineError::Schema { missing });
        }

        let rows_loaded = table.len();
        let mut dataset = Dataset::from_table(&table, variant, layout)
            .map_err(|e| PipelineError::parse(&source, &e))?;
        self.extractor.apply(&mut dataset);

        let clean = clean::drop_incomplete_rows(&mut dataset);
        if clean.dropped() > 0 && clean.after > 0 {
            note(Warning::RowsDropped {
                before: clean.before,
                after: clean.after,
            });
        }

        let analysis = if dataset.is_empty() {
            note(Warning::EmptyResult);
            None
        } else {
            for w in derive::derive_metrics(&mut dataset) {
                note(w);
            }
            Some(analyze(dataset, &mut note))
        };

        Ok(PipelineReport {
            source,
            variant,
            rows_loaded,
            dropped_columns,
            clean,
            warnings,
            analysis,
        })
    }

    /// Write the export file for a completed run. `Ok(None)` when the run
    /// produced nothing to export.
    pub fn export(&self, report: &PipelineReport) -> Result<Option<PathBuf>, PipelineError> {
        match &report.analysis {
            Some(a) => export::export_to_dir(&a.dataset, &a.by_group, &self.config.output_dir).map(Some),
            None => Ok(None),
        }
    }
}

fn analyze(dataset: Dataset, note: &mut impl FnMut(Warning)) -> Analysis {
    let by_group = aggregate::by_primary(&dataset);
    let by_feed_source = aggregate::by_feed_source(&dataset);
    if by_feed_source.is_none() {
        note(Warning::FeedSourceMissing);
    }

    let trend = if dataset.layout.is_present(Field::Week) {
        match trend::fit_dataset(&dataset) {
            Ok(fit) => {
                info!("Trend: gain = {:.4} + {:.4} * week", fit.intercept, fit.slope);
                Some(fit)
            }
            Err(TrendError::InsufficientData { distinct_periods }) => {
                note(Warning::InsufficientTrendData { distinct_periods });
                None
            }
        }
    } else {
        None
    };

    Analysis {
        overall: aggregate::overall(&dataset),
        figures: chart::figures(&dataset),
        by_group,
        by_feed_source,
        trend,
        dataset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_csv;

    fn run(csv: &str) -> Result<PipelineReport, PipelineError> {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        pipeline.run_table("test.csv", load_csv(csv.as_bytes()).unwrap())
    }

    const HEADER: &str = "REPETICIONES,Peso Inicial,Peso Final,Ganancia de peso,Consumo de alimento,Conversión alimenticia,Rendimiento de Carcasa (%)\n";

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = PipelineConfig {
            treatment_pattern: "(".into(),
            ..Default::default()
        };
        assert!(matches!(Pipeline::new(config), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_schema_error_halts() {
        let err = run("REPETICIONES,Peso Inicial\nT1R1,1.0\n").unwrap_err();
        match err {
            PipelineError::Schema { missing } => {
                assert!(missing.contains(&"Peso Final".to_string()));
                assert_eq!(missing[0], "Peso Final");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_text_in_numeric_column_is_parse_error() {
        let csv = format!("{HEADER}T1R1,abc,2.0,1.0,3.0,3.0,70\n");
        assert!(matches!(run(&csv), Err(PipelineError::Parse { .. })));
    }

    #[test]
    fn test_empty_result_is_warning() {
        let csv = format!("{HEADER}T1R1,1.0,,1.0,3.0,3.0,70\n1R2,1.0,2.0,1.0,3.0,3.0,70\n");
        let report = run(&csv).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.clean.after, 0);
        assert!(report.warnings.contains(&Warning::EmptyResult));
    }

    #[test]
    fn test_treatment_run_without_week_has_no_trend() {
        let csv = format!("{HEADER}T1R1,1.0,2.0,1.0,3.0,3.0,70\nT2R1,1.0,2.2,1.2,3.0,2.5,72\n");
        let report = run(&csv).unwrap();
        let analysis = report.analysis.unwrap();
        assert_eq!(analysis.by_group.len(), 2);
        assert!(analysis.trend.is_none());
        assert!(report.warnings.contains(&Warning::FeedSourceMissing));
        assert!(!report
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::InsufficientTrendData { .. })));
    }
}
