//! Data layer: loading, validation, cleaning, derivation and summaries.
//!
//! Architecture:
//! ```text
//!  .csv / .xlsx / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → RawTable (loosely typed cells)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  clean    │  drop all-empty columns
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  schema   │  required columns present? → Layout → Dataset of Records
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  group    │  label / override column → treatment code
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  clean    │  drop rows missing analysis fields
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  derive   │  gain, feed conversion, carcass yield
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────────────────────┐
//!   │ aggregate / chart / trend │  summaries, box plots, OLS fit
//!   └──────────────────────────┘
//! ```

pub mod aggregate;
pub mod chart;
pub mod clean;
pub mod derive;
pub mod group;
pub mod loader;
pub mod model;
pub mod schema;
pub mod trend;
