//! Terminal presentation of a pipeline report.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::data::aggregate::Summary;
use crate::data::chart::Figure;
use crate::data::model::Dataset;
use crate::data::trend::TrendFit;
use crate::export::format_value;
use crate::pipeline::PipelineReport;

// ---------------------------------------------------------------------------
// Table builders
// ---------------------------------------------------------------------------

/// Build a text-only batch: one nullable Utf8 column per header.
fn text_batch(headers: &[String], rows: &[Vec<Option<String>>]) -> Result<RecordBatch> {
    let schema = Schema::new(
        headers
            .iter()
            .map(|h| ArrowField::new(h, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let columns: Vec<ArrayRef> = (0..headers.len())
        .map(|col| {
            let cells: Vec<Option<String>> = rows.iter().map(|r| r.get(col).cloned().flatten()).collect();
            Arc::new(StringArray::from(cells)) as ArrayRef
        })
        .collect();
    Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
}

fn number(v: Option<f64>) -> Option<String> {
    v.map(|v| format_value(Some(v)))
}

pub fn summary_table(summary: &Summary) -> Result<String> {
    let mut headers: Vec<String> = summary.key_column.iter().cloned().collect();
    headers.extend(summary.metric_columns.iter().cloned());

    let rows: Vec<Vec<Option<String>>> = summary
        .rows
        .iter()
        .map(|r| {
            let mut cells: Vec<Option<String>> = Vec::new();
            if summary.key_column.is_some() {
                cells.push(r.key.clone());
            }
            cells.extend(r.values.iter().map(|v| number(*v)));
            cells
        })
        .collect();
    Ok(pretty_format_batches(&[text_batch(&headers, &rows)?])?.to_string())
}

pub fn dataset_table(dataset: &Dataset) -> Result<String> {
    use crate::data::model::Field::*;
    let metrics = [InitialWeight, FinalWeight, Gain, Consumption, FeedConversion, CarcassWeight, CarcassYield];

    let mut headers: Vec<String> = ["Etiqueta", "Tratamiento", "Semana", "Insumo"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    headers.extend(metrics.iter().map(|f| dataset.layout.column(*f).to_string()));

    let rows: Vec<Vec<Option<String>>> = dataset
        .records
        .iter()
        .map(|r| {
            let mut cells = vec![
                r.label.clone(),
                r.group.clone(),
                r.week.map(|w| w.to_string()),
                r.feed_source.clone(),
            ];
            cells.extend(metrics.iter().map(|f| number(r.metric(*f))));
            cells
        })
        .collect();
    Ok(pretty_format_batches(&[text_batch(&headers, &rows)?])?.to_string())
}

pub fn figure_table(figure: &Figure) -> Result<String> {
    let headers: Vec<String> = [
        figure.group_label.as_str(),
        "n",
        "min",
        "q1",
        "mediana",
        "q3",
        "max",
        "atípicos",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();

    let rows: Vec<Vec<Option<String>>> = figure
        .boxes
        .iter()
        .map(|b| {
            vec![
                Some(b.group.clone()),
                Some(b.count.to_string()),
                number(Some(b.min)),
                number(Some(b.q1)),
                number(Some(b.median)),
                number(Some(b.q3)),
                number(Some(b.max)),
                Some(b.outliers.len().to_string()),
            ]
        })
        .collect();
    Ok(pretty_format_batches(&[text_batch(&headers, &rows)?])?.to_string())
}

pub fn trend_table(trend: &TrendFit) -> Result<String> {
    let headers: Vec<String> = ["Semana", "Ganancia observada", "Ganancia proyectada"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<Vec<Option<String>>> = trend
        .periods
        .iter()
        .zip(&trend.observed)
        .zip(&trend.predicted)
        .map(|((p, o), f)| vec![Some(p.to_string()), number(Some(*o)), number(Some(*f))])
        .collect();
    Ok(pretty_format_batches(&[text_batch(&headers, &rows)?])?.to_string())
}

// ---------------------------------------------------------------------------
// Whole report
// ---------------------------------------------------------------------------

/// Render every section of the report as plain text.
pub fn render_report(report: &PipelineReport) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Archivo: {} ({:?}, {} filas)", report.source, report.variant, report.rows_loaded)?;

    for w in &report.warnings {
        writeln!(out, "Aviso: {w}")?;
    }

    let Some(analysis) = &report.analysis else {
        return Ok(out);
    };

    writeln!(out, "\nDatos procesados\n{}", dataset_table(&analysis.dataset)?)?;
    writeln!(
        out,
        "\nResumen por {}\n{}",
        report.variant.group_label(),
        summary_table(&analysis.by_group)?
    )?;
    if let Some(by_source) = &analysis.by_feed_source {
        writeln!(out, "\nResumen por Insumo\n{}", summary_table(by_source)?)?;
    }
    writeln!(out, "\nResumen general\n{}", summary_table(&analysis.overall)?)?;

    for figure in &analysis.figures {
        writeln!(out, "\n{}\n{}", figure.title, figure_table(figure)?)?;
    }

    if let Some(trend) = &analysis.trend {
        writeln!(
            out,
            "\nTendencia: ganancia = {:.4} + {:.4} x semana\n{}",
            trend.intercept,
            trend.slope,
            trend_table(trend)?
        )?;
    }
    Ok(out)
}
