use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, RawTable};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a trial table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`                         – header row plus one record per line
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – first worksheet, first row is the header
/// * `.json`                        – `[{ "REPETICIONES": "T1R1", ... }, ...]`
/// * `.parquet`                     – flat scalar columns
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            load_csv(file)
        }
        "xlsx" | "xlsm" | "xls" | "ods" => load_spreadsheet(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, every cell typed by guessing.
pub fn load_csv<R: Read>(input: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .from_reader(input);
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(CellValue::guess).collect());
    }

    Ok(RawTable::new(columns, rows))
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).context("opening spreadsheet")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("spreadsheet has no worksheet")?
        .context("reading first worksheet")?;

    let mut sheet_rows = range.rows();
    let Some(header) = sheet_rows.next() else {
        return Ok(RawTable::default());
    };
    let columns: Vec<String> = header.iter().map(|c| c.to_string()).collect();
    debug!("Spreadsheet header: {columns:?}");

    let rows = sheet_rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    Ok(RawTable::new(columns, rows))
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) => CellValue::guess(s),
        Data::Empty => CellValue::Null,
        Data::Error(e) => CellValue::Error(e.to_string()),
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "REPETICIONES": "T1R1", "Peso Inicial": 1.2, ... },
///   ...
/// ]
/// ```
///
/// Columns are ordered by first appearance across all records.
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json_records(&text)
}

pub fn parse_json_records(text: &str) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(RawTable::new(columns, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::guess(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by pandas (`df.to_parquet()`) or polars.
///
/// Every column must be a flat scalar: utf8, int32/int64, float32/float64
/// or boolean.
fn load_parquet(path: &Path) -> Result<RawTable> {
    read_parquet(path, PARQUET_BATCH_ROWS)
}

const PARQUET_BATCH_ROWS: usize = 8192;

fn read_parquet(path: &Path, batch_rows: usize) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?
        .with_batch_size(batch_rows);
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let offset = rows.len();
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .zip(&columns)
                .map(|(col, name)| {
                    extract_cell(col, row)
                        .with_context(|| format!("Row {}, column '{name}'", offset + row))
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(cells);
        }
    }

    Ok(RawTable::new(columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => CellValue::guess(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => CellValue::guess(col.as_string::<i64>().value(row)),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => CellValue::float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => CellValue::float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(cell)
}
