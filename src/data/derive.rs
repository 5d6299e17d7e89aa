use log::{debug, warn};

use super::model::{Dataset, Field, Record};
use crate::error::Warning;

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Weight gain over the period.
pub fn gain(initial_weight: f64, final_weight: f64) -> Option<f64> {
    finite(final_weight - initial_weight)
}

/// Feed consumed per unit of weight gained. `None` when nothing was gained.
pub fn feed_conversion(consumption: f64, gain: f64) -> Option<f64> {
    if gain == 0.0 {
        return None;
    }
    finite(consumption / gain)
}

/// Carcass weight as a percentage of final live weight.
pub fn carcass_yield(carcass_weight: f64, final_weight: f64) -> Option<f64> {
    if final_weight == 0.0 {
        return None;
    }
    finite(carcass_weight / final_weight * 100.0)
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

// ---------------------------------------------------------------------------
// Dataset pass
// ---------------------------------------------------------------------------

/// Fill in gain, feed conversion and carcass yield for every record whose
/// input lacks the corresponding column. Columns supplied by the input are
/// left untouched.
///
/// Returns one warning per derived column that is undefined for some rows
/// despite all its inputs being present. For supplied columns this counts
/// spreadsheet error cells and blank cells whose formula is undefined
/// (a zero gain, for instance).
pub fn derive_metrics(dataset: &mut Dataset) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let derivations: [(Field, fn(&Record) -> Option<(f64, f64)>, fn(f64, f64) -> Option<f64>); 3] = [
        (Field::Gain, |r| Some((r.initial_weight?, r.final_weight?)), gain),
        (Field::FeedConversion, |r| Some((r.consumption?, r.gain?)), feed_conversion),
        (Field::CarcassYield, |r| Some((r.carcass_weight?, r.final_weight?)), carcass_yield),
    ];

    for (field, inputs, formula) in derivations {
        let supplied = dataset.layout.is_present(field);
        if supplied {
            debug!("{field:?} supplied by input, not recomputed");
        }

        let mut degenerate = 0;
        for record in &mut dataset.records {
            // outer None: an input is missing; inner None: undefined result
            let computed = inputs(record).map(|(a, b)| formula(a, b));
            if supplied {
                let blank = record.metric(field).is_none();
                if blank && (record.error_cells.contains(&field) || computed == Some(None)) {
                    degenerate += 1;
                }
            } else {
                if computed == Some(None) {
                    degenerate += 1;
                }
                set_metric(record, field, computed.flatten());
            }
        }

        if degenerate > 0 {
            let column = dataset.layout.column(field).to_string();
            warn!("'{column}' undefined for {degenerate} rows");
            warnings.push(Warning::DegenerateDerivation {
                column,
                rows: degenerate,
            });
        }
    }

    warnings
}

fn set_metric(record: &mut Record, field: Field, value: Option<f64>) {
    match field {
        Field::Gain => record.gain = value,
        Field::FeedConversion => record.feed_conversion = value,
        Field::CarcassYield => record.carcass_yield = value,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, RawTable};
    use crate::data::schema::{Layout, Variant};

    fn weekly(rows: &[[f64; 4]]) -> Dataset {
        let columns = ["ID", "Semana", "Peso Inicial", "Peso Final", "Consumo", "Peso Carcasa"];
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mut cells = vec![CellValue::Text(format!("A{i}")), CellValue::Integer(1)];
                cells.extend(r.iter().map(|v| CellValue::Float(*v)));
                cells
            })
            .collect();
        let table = RawTable::new(columns.iter().map(|c| c.to_string()).collect(), rows);
        let mut layout = Layout::new(Variant::Weekly, "TRATAMIENTOS");
        layout.bind(&table);
        Dataset::from_table(&table, Variant::Weekly, layout).unwrap()
    }

    #[test]
    fn test_formulas() {
        assert_eq!(gain(1.0, 2.5), Some(1.5));
        assert_eq!(feed_conversion(3.0, 1.5), Some(2.0));
        assert_eq!(carcass_yield(1.5, 2.0), Some(75.0));
    }

    #[test]
    fn test_zero_gain_has_no_feed_conversion() {
        assert_eq!(feed_conversion(3.0, 0.0), None);
        assert_eq!(carcass_yield(1.0, 0.0), None);
    }

    #[test]
    fn test_derive_metrics_fills_missing_columns() {
        let mut ds = weekly(&[[1.0, 2.0, 3.0, 1.5]]);
        let warnings = derive_metrics(&mut ds);
        assert!(warnings.is_empty());
        let r = &ds.records[0];
        assert_eq!(r.gain, Some(1.0));
        assert_eq!(r.feed_conversion, Some(3.0));
        assert_eq!(r.carcass_yield, Some(75.0));
    }

    #[test]
    fn test_derive_metrics_tolerates_zero_gain() {
        let mut ds = weekly(&[[2.0, 2.0, 3.0, 1.5], [1.0, 2.0, 3.0, 1.5]]);
        let warnings = derive_metrics(&mut ds);
        assert_eq!(ds.records[0].gain, Some(0.0));
        assert_eq!(ds.records[0].feed_conversion, None);
        assert_eq!(ds.records[1].feed_conversion, Some(3.0));
        assert_eq!(
            warnings,
            vec![Warning::DegenerateDerivation {
                column: "Conversión alimenticia".into(),
                rows: 1
            }]
        );
    }

    #[test]
    fn test_supplied_columns_are_authoritative() {
        let columns = [
            "REPETICIONES",
            "Peso Inicial",
            "Peso Final",
            "Ganancia de peso",
            "Consumo de alimento",
            "Conversión alimenticia",
            "Rendimiento de Carcasa (%)",
        ];
        let row = vec![
            CellValue::Text("T1R1".into()),
            CellValue::Float(1.0),
            CellValue::Float(2.0),
            CellValue::Float(9.9),
            CellValue::Float(3.0),
            CellValue::Float(1.7),
            CellValue::Float(70.0),
        ];
        let table = RawTable::new(columns.iter().map(|c| c.to_string()).collect(), vec![row]);
        let mut layout = Layout::new(Variant::Treatment, "TRATAMIENTOS");
        layout.bind(&table);
        let mut ds = Dataset::from_table(&table, Variant::Treatment, layout).unwrap();

        derive_metrics(&mut ds);
        let r = &ds.records[0];
        assert_eq!(r.gain, Some(9.9));
        assert_eq!(r.feed_conversion, Some(1.7));
        assert_eq!(r.carcass_yield, Some(70.0));
    }

    #[test]
    fn test_supplied_blank_ratio_with_zero_gain_is_degenerate() {
        let columns = [
            "REPETICIONES",
            "Peso Inicial",
            "Peso Final",
            "Ganancia de peso",
            "Consumo de alimento",
            "Conversión alimenticia",
            "Rendimiento de Carcasa (%)",
        ];
        let row = |label: &str, fcr: CellValue, carcass: CellValue| {
            vec![
                CellValue::Text(label.into()),
                CellValue::Float(2.0),
                CellValue::Float(2.0),
                CellValue::Float(0.0),
                CellValue::Float(3.0),
                fcr,
                carcass,
            ]
        };
        let table = RawTable::new(
            columns.iter().map(|c| c.to_string()).collect(),
            vec![
                row("T1R1", CellValue::Null, CellValue::Float(70.0)),
                row("T1R2", CellValue::Error("#DIV/0!".into()), CellValue::Error("#VALUE!".into())),
            ],
        );
        let mut layout = Layout::new(Variant::Treatment, "TRATAMIENTOS");
        layout.bind(&table);
        let mut ds = Dataset::from_table(&table, Variant::Treatment, layout).unwrap();

        let warnings = derive_metrics(&mut ds);
        assert_eq!(
            warnings,
            vec![
                Warning::DegenerateDerivation {
                    column: "Conversión alimenticia".into(),
                    rows: 2
                },
                Warning::DegenerateDerivation {
                    column: "Rendimiento de Carcasa (%)".into(),
                    rows: 1
                },
            ]
        );
        assert_eq!(ds.records[1].carcass_yield, None);
    }
}
