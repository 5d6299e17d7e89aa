use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use zootrial::data::schema::VariantChoice;
use zootrial::render::render_report;
use zootrial::{Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "zootrial")]
#[command(about = "Clean, summarize and export a zootechnical trial file", long_about = None)]
struct Cli {
    /// Trial file (.csv, .xlsx, .xls, .ods, .json or .parquet)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Column layout of the file
    #[arg(long, value_enum)]
    variant: Option<VariantChoice>,

    /// Directory the CSV export is written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Column whose values are used as the treatment code verbatim
    #[arg(long)]
    override_column: Option<String>,

    /// Skip writing the CSV export
    #[arg(long)]
    no_export: bool,

    /// Print the report as JSON instead of tables
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(column) = &self.override_column {
            config.override_column = column.clone();
        }
        if self.no_export {
            config.export = false;
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let pipeline = Pipeline::new(cli.pipeline_config()?)?;
    let report = pipeline.run_file(&cli.input)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report).context("serializing report")?);
    } else {
        print!("{}", render_report(&report)?);
    }

    if pipeline.config().export {
        if let Some(path) = pipeline.export(&report)? {
            eprintln!("Exported {}", path.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
