//! Error types for the report pipeline.
//!
//! Loading, scoring and report generation all return [`Result`]. Conditions
//! that are not fatal (a missing pollutant file, a blank cell) never surface
//! here; they are recorded in the load report instead.

use crate::types::Pollutant;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A declared pollutant file does not exist. Recorded per pollutant by
    /// the loader; only returned directly by single-file helpers.
    #[error("source file for {pollutant} not found: {}", path.display())]
    MissingSourceFile { pollutant: Pollutant, path: PathBuf },

    /// A measurement column header does not parse as `YYYY.MM`.
    #[error("malformed month column {column:?} in {}", path.display())]
    MalformedDate { column: String, path: PathBuf },

    /// None of the declared source files could be found.
    #[error("no data available: none of the declared source files exist")]
    NoDataAvailable,

    /// The aggregate score was asked for with no sub-scores.
    #[error("no pollutants selected")]
    NoPollutantsSelected,

    /// A selection filter matched no records.
    #[error("no data matches the selection: {0}")]
    NoMatchingData(String),

    #[error("required column {role} not found in {} (accepted headers: {accepted})", path.display())]
    MissingColumn {
        role: String,
        accepted: String,
        path: PathBuf,
    },

    #[error("no measurement columns with prefix {prefix:?} in {}", path.display())]
    NoMeasurementColumns { prefix: String, path: PathBuf },

    #[error("duplicate row for {province} / {city} in {}", path.display())]
    DuplicateRecord {
        province: String,
        city: String,
        path: PathBuf,
    },

    /// Header rows of a two-row-header file are missing or truncated.
    #[error("invalid header in {}: {reason}", path.display())]
    InvalidHeader { reason: String, path: PathBuf },

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
