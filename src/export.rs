//! CSV export of summaries and processed datasets.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use log::info;

use crate::data::aggregate::Summary;
use crate::data::model::{Dataset, Field};
use crate::data::schema::{Variant, LABEL_WEEKLY, TREATMENT_KEY};
use crate::error::PipelineError;

/// Two decimals, empty cell for missing values.
pub fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Header row plus one row per group; the key column comes first when the
/// summary has one.
pub fn write_summary<W: Write>(summary: &Summary, out: W) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().from_writer(out);

    let mut header: Vec<&str> = summary.key_column.iter().map(String::as_str).collect();
    header.extend(summary.metric_columns.iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in &summary.rows {
        let mut cells: Vec<String> = Vec::with_capacity(header.len());
        if summary.key_column.is_some() {
            cells.push(row.key.clone().unwrap_or_default());
        }
        cells.extend(row.values.iter().map(|v| format_value(*v)));
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    Ok(())
}

/// Columns of the processed-dataset export, in order.
const DATASET_FIELDS: [Field; 9] = [
    Field::Week,
    Field::FeedSource,
    Field::InitialWeight,
    Field::FinalWeight,
    Field::Gain,
    Field::Consumption,
    Field::FeedConversion,
    Field::CarcassWeight,
    Field::CarcassYield,
];

/// Every cleaned record with its derived metrics.
pub fn write_dataset<W: Write>(dataset: &Dataset, out: W) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().from_writer(out);

    let mut header = vec![LABEL_WEEKLY, TREATMENT_KEY];
    header.extend(DATASET_FIELDS.iter().map(|f| dataset.layout.column(*f)));
    writer.write_record(&header)?;

    for record in &dataset.records {
        let mut cells = vec![
            record.label.clone().unwrap_or_default(),
            record.group.clone().unwrap_or_default(),
        ];
        for field in DATASET_FIELDS {
            cells.push(match field {
                Field::Week => record.week.map(|w| w.to_string()).unwrap_or_default(),
                Field::FeedSource => record.feed_source.clone().unwrap_or_default(),
                numeric => format_value(record.metric(numeric)),
            });
        }
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the variant's export file into `dir`: the primary summary for the
/// treatment layout, the processed dataset for the weekly layout.
pub fn export_to_dir(dataset: &Dataset, primary: &Summary, dir: &Path) -> Result<PathBuf, PipelineError> {
    let path = dir.join(dataset.variant.export_file_name());
    let wrap = |source: csv::Error| PipelineError::Export {
        path: path.clone(),
        source,
    };

    fs::create_dir_all(dir).map_err(|e| wrap(e.into()))?;
    let file = fs::File::create(&path).map_err(|e| wrap(e.into()))?;
    let written = match dataset.variant {
        Variant::Treatment => write_summary(primary, file),
        Variant::Weekly => write_dataset(dataset, file),
    };
    written.map_err(wrap)?;

    info!("Exported {}", path.display());
    Ok(path)
}
