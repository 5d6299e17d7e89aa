use log::{debug, info};
use serde::Serialize;

use super::model::{Dataset, RawTable};

// ---------------------------------------------------------------------------
// Column pass: before validation
// ---------------------------------------------------------------------------

/// Remove every column whose cells are all missing. Returns the dropped
/// column names in their original order.
///
/// Columns named in `protected` (compared after trimming) are kept even when
/// empty, so a blank required column surfaces as missing values in the row
/// pass rather than as a schema error. A header-only table keeps all its
/// columns.
pub fn drop_empty_columns(table: &mut RawTable, protected: &[&str]) -> Vec<String> {
    if table.is_empty() {
        return Vec::new();
    }

    let keep: Vec<bool> = (0..table.columns.len())
        .map(|col| {
            protected.contains(&table.columns[col].trim())
                || (0..table.len()).any(|row| !table.cell(row, col).is_missing())
        })
        .collect();

    let dropped: Vec<String> = table
        .columns
        .iter()
        .zip(&keep)
        .filter(|(_, k)| !**k)
        .map(|(c, _)| c.clone())
        .collect();
    if dropped.is_empty() {
        return dropped;
    }

    retain_mask(&mut table.columns, &keep);
    for row in &mut table.rows {
        retain_mask(row, &keep);
    }

    debug!("Dropped empty columns: {dropped:?}");
    dropped
}

fn retain_mask<T>(items: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    items.retain(|_| flags.next().copied().unwrap_or(false));
}

// ---------------------------------------------------------------------------
// Row pass: after group extraction
// ---------------------------------------------------------------------------

/// Row counts around the row pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub before: usize,
    pub after: usize,
}

impl CleanReport {
    pub fn dropped(&self) -> usize {
        self.before - self.after
    }
}

/// Drop records missing a required measurement of the layout or the
/// primary grouping key. Ratio columns are required as headers but a blank
/// ratio cell leaves the row in place. Order of the remaining records is
/// preserved.
pub fn drop_incomplete_rows(dataset: &mut Dataset) -> CleanReport {
    let before = dataset.len();
    let required: Vec<_> = dataset
        .layout
        .required_fields()
        .into_iter()
        .filter(|f| !f.is_ratio())
        .collect();
    let variant = dataset.variant;

    dataset.records.retain(|record| {
        required.iter().all(|f| record.has(*f)) && variant.group_key(record).is_some()
    });

    let report = CleanReport {
        before,
        after: dataset.len(),
    };
    if report.dropped() > 0 {
        info!("Cleaning dropped {} of {before} rows", report.dropped());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::group::{GroupExtractor, DEFAULT_TREATMENT_PATTERN};
    use crate::data::model::CellValue;
    use crate::data::schema::{Layout, Variant};

    fn weekly_dataset(rows: Vec<Vec<CellValue>>) -> Dataset {
        let columns = ["ID", "Semana", "Peso Inicial", "Peso Final", "Consumo", "Peso Carcasa"];
        let table = RawTable::new(columns.iter().map(|c| c.to_string()).collect(), rows);
        let mut layout = Layout::new(Variant::Weekly, "TRATAMIENTOS");
        assert!(layout.bind(&table).is_empty());
        let mut ds = Dataset::from_table(&table, Variant::Weekly, layout).unwrap();
        GroupExtractor::new(DEFAULT_TREATMENT_PATTERN).unwrap().apply(&mut ds);
        ds
    }

    fn row(id: &str, week: Option<i64>, final_weight: Option<f64>) -> Vec<CellValue> {
        vec![
            CellValue::Text(id.into()),
            week.map(CellValue::Integer).unwrap_or(CellValue::Null),
            CellValue::Float(1.0),
            final_weight.map(CellValue::Float).unwrap_or(CellValue::Null),
            CellValue::Float(3.0),
            CellValue::Float(1.5),
        ]
    }

    #[test]
    fn test_drop_empty_columns() {
        let mut table = RawTable::new(
            vec!["a".into(), "Insumo".into(), "b".into()],
            vec![
                vec![CellValue::Integer(1), CellValue::Null, CellValue::Null],
                vec![CellValue::Null, CellValue::Null, CellValue::Integer(2)],
            ],
        );
        let dropped = drop_empty_columns(&mut table, &[]);
        assert_eq!(dropped, vec!["Insumo".to_string()]);
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows[1], vec![CellValue::Null, CellValue::Integer(2)]);
    }

    #[test]
    fn test_protected_empty_column_is_kept() {
        let mut table = RawTable::new(
            vec!["a".into(), " Peso Final ".into()],
            vec![vec![CellValue::Integer(1), CellValue::Null]],
        );
        assert!(drop_empty_columns(&mut table, &["Peso Final"]).is_empty());
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn test_header_only_table_keeps_columns() {
        let mut table = RawTable::new(vec!["a".into()], Vec::new());
        assert!(drop_empty_columns(&mut table, &[]).is_empty());
        assert_eq!(table.columns.len(), 1);
    }

    #[test]
    fn test_drop_incomplete_rows_reports_counts() {
        let mut ds = weekly_dataset(vec![
            row("A1", Some(1), Some(2.0)),
            row("A2", None, Some(2.0)),
            row("A3", Some(1), None),
            row("A4", Some(2), Some(2.5)),
        ]);
        let report = drop_incomplete_rows(&mut ds);
        assert_eq!(report, CleanReport { before: 4, after: 2 });
        let ids: Vec<_> = ds.records.iter().map(|r| r.label.clone().unwrap()).collect();
        assert_eq!(ids, vec!["A1", "A4"]);
    }

    #[test]
    fn test_blank_ratio_keeps_row() {
        let columns = [
            "REPETICIONES",
            "Peso Inicial",
            "Peso Final",
            "Ganancia de peso",
            "Consumo de alimento",
            "Conversión alimenticia",
            "Rendimiento de Carcasa (%)",
        ];
        let table = RawTable::new(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![
                vec![
                    CellValue::Text("T1R1".into()),
                    CellValue::Float(1.0),
                    CellValue::Float(2.0),
                    CellValue::Float(1.0),
                    CellValue::Float(3.0),
                    CellValue::Null,
                    CellValue::Error("#DIV/0!".into()),
                ],
                vec![
                    CellValue::Text("T1R2".into()),
                    CellValue::Null,
                    CellValue::Float(2.0),
                    CellValue::Float(1.0),
                    CellValue::Float(3.0),
                    CellValue::Float(3.0),
                    CellValue::Float(70.0),
                ],
            ],
        );
        let mut layout = Layout::new(Variant::Treatment, "TRATAMIENTOS");
        assert!(layout.bind(&table).is_empty());
        let mut ds = Dataset::from_table(&table, Variant::Treatment, layout).unwrap();
        GroupExtractor::new(DEFAULT_TREATMENT_PATTERN).unwrap().apply(&mut ds);

        let report = drop_incomplete_rows(&mut ds);
        assert_eq!(report, CleanReport { before: 2, after: 1 });
        assert_eq!(ds.records[0].label.as_deref(), Some("T1R1"));
    }

    #[test]
    fn test_all_rows_incomplete_yields_empty() {
        let mut ds = weekly_dataset(vec![row("A1", Some(1), None), row("A2", Some(2), None)]);
        let report = drop_incomplete_rows(&mut ds);
        assert_eq!(report.after, 0);
        assert!(ds.is_empty());
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let mut ds = weekly_dataset(vec![row("A1", Some(1), Some(2.0)), row("A2", None, None)]);
        drop_incomplete_rows(&mut ds);
        let once = ds.records.clone();
        let report = drop_incomplete_rows(&mut ds);
        assert_eq!(report.dropped(), 0);
        assert_eq!(ds.records, once);
    }
}
