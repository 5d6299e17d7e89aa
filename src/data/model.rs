use std::fmt;

use anyhow::{bail, Result};
use serde::Serialize;

use super::schema::{Layout, Variant};

// ---------------------------------------------------------------------------
// CellValue – a single loosely-typed cell as read from the input file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a spreadsheet reader infers.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// A spreadsheet formula error such as `#DIV/0!`. Reads as missing.
    Error(String),
    Null,
}

/// Text markers read as missing, same set pandas uses by default.
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Formula error values a spreadsheet writes into a cell.
pub const SPREADSHEET_ERRORS: &[&str] = &[
    "#DIV/0!", "#VALUE!", "#NUM!", "#REF!", "#NAME?", "#NULL!", "#GETTING_DATA",
];

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Error(e) => write!(f, "{e}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Build a cell from raw text, guessing the narrowest type.
    pub fn guess(raw: &str) -> Self {
        let s = raw.trim();
        if MISSING_MARKERS.contains(&s) {
            return CellValue::Null;
        }
        if SPREADSHEET_ERRORS.contains(&s) {
            return CellValue::Error(s.to_string());
        }
        if is_zero_padded(s) {
            return CellValue::Text(s.to_string());
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::Text(s.to_string())
    }

    /// Non-finite floats are stored as `Null`.
    pub fn float(v: f64) -> Self {
        if v.is_finite() {
            CellValue::Float(v)
        } else {
            CellValue::Null
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Null | CellValue::Error(_))
    }

    /// Interpret the value as an `f64`. Numeric text such as a zero-padded
    /// `"007"` parses; other text and bools give `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Text(s) => s.parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Text form used for labels and group keys. `None` when missing.
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Null | CellValue::Error(_) => None,
            other => Some(other.to_string()),
        }
    }
}

/// Digit strings like `"001"` are identifiers; parsing them would lose the
/// leading zeros.
fn is_zero_padded(s: &str) -> bool {
    let digits = s.strip_prefix(&['-', '+'][..]).unwrap_or(s);
    digits.len() > 1
        && digits.starts_with('0')
        && digits.as_bytes()[1].is_ascii_digit()
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

// ---------------------------------------------------------------------------
// RawTable – the file as loaded, before any schema is applied
// ---------------------------------------------------------------------------

/// Column names exactly as they appear in the file, plus row-major cells.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        RawTable { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names with surrounding whitespace stripped.
    pub fn normalized_columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.trim().to_string()).collect()
    }

    /// Cell at `(row, col)`; out-of-range cells read as `Null`.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Field – the semantic meaning of a column
// ---------------------------------------------------------------------------

/// Semantic fields a trial file can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    Label,
    GroupOverride,
    Week,
    FeedSource,
    InitialWeight,
    FinalWeight,
    Gain,
    Consumption,
    FeedConversion,
    CarcassWeight,
    CarcassYield,
}

impl Field {
    /// Ratios computed from other measurements. A missing ratio never
    /// removes a row.
    pub fn is_ratio(self) -> bool {
        matches!(self, Field::FeedConversion | Field::CarcassYield)
    }
}

// ---------------------------------------------------------------------------
// Record – one observation unit
// ---------------------------------------------------------------------------

/// One row of a validated trial file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    /// Replicate label (`REPETICIONES`) or animal id (`ID`).
    pub label: Option<String>,
    /// Treatment code, from the override column or extracted from `label`.
    pub group: Option<String>,
    pub week: Option<u32>,
    pub feed_source: Option<String>,
    pub initial_weight: Option<f64>,
    pub final_weight: Option<f64>,
    pub gain: Option<f64>,
    pub consumption: Option<f64>,
    pub feed_conversion: Option<f64>,
    pub carcass_weight: Option<f64>,
    pub carcass_yield: Option<f64>,
    /// Raw override cell, kept so extraction can be re-run.
    #[serde(skip)]
    pub group_override: Option<String>,
    /// Numeric fields whose cell held a spreadsheet error value.
    #[serde(skip)]
    pub error_cells: Vec<Field>,
}

impl Record {
    /// Numeric value of a measurement field.
    pub fn metric(&self, field: Field) -> Option<f64> {
        match field {
            Field::InitialWeight => self.initial_weight,
            Field::FinalWeight => self.final_weight,
            Field::Gain => self.gain,
            Field::Consumption => self.consumption,
            Field::FeedConversion => self.feed_conversion,
            Field::CarcassWeight => self.carcass_weight,
            Field::CarcassYield => self.carcass_yield,
            Field::Week => self.week.map(f64::from),
            _ => None,
        }
    }

    /// Whether the field holds a value.
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Label => self.label.is_some(),
            Field::GroupOverride => self.group_override.is_some(),
            Field::FeedSource => self.feed_source.is_some(),
            Field::Week => self.week.is_some(),
            numeric => self.metric(numeric).is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the validated, typed trial data
// ---------------------------------------------------------------------------

/// All records of one upload plus the layout they were read with.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub variant: Variant,
    #[serde(skip)]
    pub layout: Layout,
    pub records: Vec<Record>,
}

impl Dataset {
    /// Type every row of `table` through a bound `layout`.
    ///
    /// Missing cells stay `None`; a cell of the wrong type (text in a
    /// measurement column, a fractional week) is an error naming the row
    /// and column.
    pub fn from_table(table: &RawTable, variant: Variant, layout: Layout) -> Result<Dataset> {
        let records = (0..table.len())
            .map(|row| read_record(table, &layout, row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Dataset {
            variant,
            layout,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct values of the primary grouping key, in first-appearance order.
    pub fn distinct_groups(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for key in self.records.iter().filter_map(|r| self.variant.group_key(r)) {
            if !seen.contains(&key) {
                seen.push(key);
            }
        }
        seen
    }
}

const NUMERIC_FIELDS: [Field; 7] = [
    Field::InitialWeight,
    Field::FinalWeight,
    Field::Gain,
    Field::Consumption,
    Field::FeedConversion,
    Field::CarcassWeight,
    Field::CarcassYield,
];

fn read_record(table: &RawTable, layout: &Layout, row: usize) -> Result<Record> {
    let cell = |field: Field| layout.index(field).map(|col| table.cell(row, col));
    let text = |field: Field| cell(field).and_then(CellValue::as_label);
    let number = |field: Field| -> Result<Option<f64>> {
        match cell(field) {
            None | Some(CellValue::Null) | Some(CellValue::Error(_)) => Ok(None),
            Some(value) => match value.as_f64() {
                Some(v) => Ok(Some(v)),
                None => bail!(
                    "Row {row}, column '{}': '{value}' is not a number",
                    layout.column(field)
                ),
            },
        }
    };

    let week = match number(Field::Week)? {
        None => None,
        Some(w) if w >= 0.0 && w.fract() == 0.0 && w <= u32::MAX as f64 => Some(w as u32),
        Some(w) => bail!(
            "Row {row}, column '{}': '{w}' is not a week number",
            layout.column(Field::Week)
        ),
    };

    Ok(Record {
        label: text(Field::Label),
        group: None,
        week,
        feed_source: text(Field::FeedSource),
        initial_weight: number(Field::InitialWeight)?,
        final_weight: number(Field::FinalWeight)?,
        gain: number(Field::Gain)?,
        consumption: number(Field::Consumption)?,
        feed_conversion: number(Field::FeedConversion)?,
        carcass_weight: number(Field::CarcassWeight)?,
        carcass_yield: number(Field::CarcassYield)?,
        group_override: text(Field::GroupOverride),
        error_cells: NUMERIC_FIELDS
            .into_iter()
            .filter(|f| matches!(cell(*f), Some(CellValue::Error(_))))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_types() {
        assert_eq!(CellValue::guess("12"), CellValue::Integer(12));
        assert_eq!(CellValue::guess(" 1.5 "), CellValue::Float(1.5));
        assert_eq!(CellValue::guess("true"), CellValue::Bool(true));
        assert_eq!(CellValue::guess("T1R3"), CellValue::Text("T1R3".into()));
    }

    #[test]
    fn test_missing_markers_load_as_null() {
        for marker in ["", "  ", "NA", "NaN", "#N/A", "None", "<NA>", "-1.#QNAN"] {
            assert!(CellValue::guess(marker).is_missing(), "{marker:?}");
        }
    }

    #[test]
    fn test_spreadsheet_errors_read_as_missing() {
        let cell = CellValue::guess(" #DIV/0! ");
        assert_eq!(cell, CellValue::Error("#DIV/0!".into()));
        assert!(cell.is_missing());
        assert_eq!(cell.as_f64(), None);
        assert_eq!(cell.as_label(), None);
    }

    #[test]
    fn test_zero_padded_ids_keep_their_text() {
        let cell = CellValue::guess("001");
        assert_eq!(cell, CellValue::Text("001".into()));
        assert_eq!(cell.as_label().as_deref(), Some("001"));
        assert_eq!(cell.as_f64(), Some(1.0));
        assert_eq!(CellValue::guess("0.5"), CellValue::Float(0.5));
        assert_eq!(CellValue::guess("0"), CellValue::Integer(0));
    }

    #[test]
    fn test_non_finite_is_null() {
        assert!(CellValue::guess("inf").is_missing());
        assert!(CellValue::float(f64::NAN).is_missing());
    }

    #[test]
    fn test_cell_out_of_range_is_null() {
        let table = RawTable::new(vec!["a".into()], vec![vec![CellValue::Integer(1)]]);
        assert_eq!(table.cell(0, 0), &CellValue::Integer(1));
        assert!(table.cell(0, 3).is_missing());
        assert!(table.cell(5, 0).is_missing());
    }
}
