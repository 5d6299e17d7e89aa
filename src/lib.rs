//! Zootechnical trial analysis: load a trial spreadsheet, validate and clean
//! it, derive gain / feed conversion / carcass yield, and summarize by
//! treatment, week and feed source.

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod render;

pub use config::PipelineConfig;
pub use error::{PipelineError, Warning};
pub use pipeline::{Analysis, Pipeline, PipelineReport};
