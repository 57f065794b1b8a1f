//! Tidy-table ingestion and scoring for monthly city air-quality tables and
//! the soil pollution survey.
//!
//! The pipeline is: [`loader::load`] (or [`cache::TidyCache`]) turns wide
//! per-pollutant CSVs into a [`types::TidyTable`]; [`scoring`] and [`query`]
//! derive scores and views from it; [`reports`] and [`output`] turn those
//! into CSV/JSON files and console tables.

pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod query;
pub mod regions;
pub mod reports;
pub mod schema;
pub mod scoring;
pub mod soil;
pub mod types;
pub mod util;

pub use error::{Error, Result};
