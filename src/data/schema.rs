use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::model::{Field, RawTable, Record};

// ---------------------------------------------------------------------------
// Variant – which of the two trial layouts a file follows
// ---------------------------------------------------------------------------

/// Trial file layouts understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// One row per replicate (`REPETICIONES`), derived metrics supplied.
    Treatment,
    /// One row per animal per week (`ID`, `Semana`), raw weights only.
    Weekly,
}

/// Variant selection as configured; `Auto` inspects the header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VariantChoice {
    #[default]
    Auto,
    Treatment,
    Weekly,
}

pub const LABEL_TREATMENT: &str = "REPETICIONES";
pub const LABEL_WEEKLY: &str = "ID";
pub const WEEK: &str = "Semana";
pub const FEED_SOURCE: &str = "Insumo";
pub const INITIAL_WEIGHT: &str = "Peso Inicial";
pub const FINAL_WEIGHT: &str = "Peso Final";
pub const GAIN: &str = "Ganancia de peso";
pub const CONSUMPTION_TREATMENT: &str = "Consumo de alimento";
pub const CONSUMPTION_WEEKLY: &str = "Consumo";
pub const FEED_CONVERSION: &str = "Conversión alimenticia";
pub const CARCASS_WEIGHT: &str = "Peso Carcasa";
pub const CARCASS_YIELD: &str = "Rendimiento de Carcasa (%)";
pub const TREATMENT_KEY: &str = "Tratamiento";

impl Variant {
    /// Pick the layout from the normalized column names.
    pub fn detect(columns: &[String]) -> Variant {
        let has = |name: &str| columns.iter().any(|c| c == name);
        if has(LABEL_TREATMENT) {
            Variant::Treatment
        } else if has(LABEL_WEEKLY) && has(WEEK) {
            Variant::Weekly
        } else {
            Variant::Treatment
        }
    }

    pub fn resolve(choice: VariantChoice, columns: &[String]) -> Variant {
        match choice {
            VariantChoice::Auto => Variant::detect(columns),
            VariantChoice::Treatment => Variant::Treatment,
            VariantChoice::Weekly => Variant::Weekly,
        }
    }

    /// Column layout in reporting order. Required columns come first, in
    /// the order they are listed to the user when missing.
    pub fn field_specs(self, override_column: &str) -> Vec<FieldSpec> {
        use Field::*;
        let spec = |field, column: &str, required| FieldSpec {
            field,
            column: column.to_string(),
            required,
        };
        match self {
            Variant::Treatment => vec![
                spec(Label, LABEL_TREATMENT, true),
                spec(InitialWeight, INITIAL_WEIGHT, true),
                spec(FinalWeight, FINAL_WEIGHT, true),
                spec(Gain, GAIN, true),
                spec(Consumption, CONSUMPTION_TREATMENT, true),
                spec(FeedConversion, FEED_CONVERSION, true),
                spec(CarcassYield, CARCASS_YIELD, true),
                spec(GroupOverride, override_column, false),
                spec(Week, WEEK, false),
                spec(FeedSource, FEED_SOURCE, false),
                spec(CarcassWeight, CARCASS_WEIGHT, false),
            ],
            Variant::Weekly => vec![
                spec(Label, LABEL_WEEKLY, true),
                spec(Week, WEEK, true),
                spec(InitialWeight, INITIAL_WEIGHT, true),
                spec(FinalWeight, FINAL_WEIGHT, true),
                spec(Consumption, CONSUMPTION_WEEKLY, true),
                spec(CarcassWeight, CARCASS_WEIGHT, true),
                spec(FeedSource, FEED_SOURCE, false),
                spec(GroupOverride, override_column, false),
                spec(Gain, GAIN, false),
                spec(FeedConversion, FEED_CONVERSION, false),
                spec(CarcassYield, CARCASS_YIELD, false),
            ],
        }
    }

    /// Primary grouping key of a record: treatment code or week index.
    pub fn group_key(self, record: &Record) -> Option<String> {
        match self {
            Variant::Treatment => record.group.clone(),
            Variant::Weekly => record.week.map(|w| w.to_string()),
        }
    }

    /// Header of the grouping key column in summaries.
    pub fn group_label(self) -> &'static str {
        match self {
            Variant::Treatment => TREATMENT_KEY,
            Variant::Weekly => WEEK,
        }
    }

    /// Metrics summarized, in output column order.
    pub fn summary_metrics(self) -> Vec<Field> {
        use Field::*;
        match self {
            Variant::Treatment => vec![InitialWeight, FinalWeight, Gain, FeedConversion, CarcassYield],
            Variant::Weekly => vec![
                InitialWeight,
                FinalWeight,
                Gain,
                Consumption,
                FeedConversion,
                CarcassYield,
            ],
        }
    }

    /// File name of the CSV export.
    pub fn export_file_name(self) -> &'static str {
        match self {
            Variant::Treatment => "resumen_zootecnico.csv",
            Variant::Weekly => "datos_procesados.csv",
        }
    }
}

// ---------------------------------------------------------------------------
// Layout – semantic field ↔ column binding
// ---------------------------------------------------------------------------

/// One expected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub column: String,
    pub required: bool,
}

/// Expected columns of a variant, bound to column indices of a table.
#[derive(Debug, Clone)]
pub struct Layout {
    specs: Vec<FieldSpec>,
    indices: HashMap<Field, usize>,
}

impl Layout {
    pub fn new(variant: Variant, override_column: &str) -> Self {
        Layout {
            specs: variant.field_specs(override_column),
            indices: HashMap::new(),
        }
    }

    /// Names of the required columns.
    pub fn required_columns(&self) -> Vec<&str> {
        self.specs
            .iter()
            .filter(|s| s.required)
            .map(|s| s.column.as_str())
            .collect()
    }

    /// Required semantic fields.
    pub fn required_fields(&self) -> Vec<Field> {
        self.specs.iter().filter(|s| s.required).map(|s| s.field).collect()
    }

    /// Column name for a field. Both variants list every field.
    pub fn column(&self, field: Field) -> &str {
        self.specs
            .iter()
            .find(|s| s.field == field)
            .map_or("", |s| s.column.as_str())
    }

    /// Index of the bound column, `None` when the input lacks it.
    pub fn index(&self, field: Field) -> Option<usize> {
        self.indices.get(&field).copied()
    }

    pub fn is_present(&self, field: Field) -> bool {
        self.indices.contains_key(&field)
    }

    /// Validate `table` against the layout and bind every present column.
    ///
    /// Returns the required column names that are missing, in layout order.
    /// An empty list means the layout is fully bound.
    pub fn bind(&mut self, table: &RawTable) -> Vec<String> {
        let normalized = table.normalized_columns();
        let missing = missing_fields(&normalized, &self.required_columns());

        self.indices.clear();
        for spec in &self.specs {
            let mut positions = normalized
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == spec.column)
                .map(|(i, _)| i);
            if let Some(first) = positions.next() {
                if positions.next().is_some() {
                    warn!("Duplicate column '{}', using the first occurrence", spec.column);
                }
                debug!("Bound {:?} to column {first} ('{}')", spec.field, spec.column);
                self.indices.insert(spec.field, first);
            }
        }
        missing
    }
}

/// Required names absent from `columns`. Both sides are compared after
/// trimming; the comparison is exact and case-sensitive.
pub fn missing_fields(columns: &[String], required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !columns.iter().any(|c| c.trim() == name.trim()))
        .map(|name| name.to_string())
        .collect()
}
