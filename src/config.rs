//! Report configuration, loaded from an optional TOML file.
//!
//! Every field has a built-in default matching the published 2024 monthly
//! city tables and the 2023 soil survey, so the binary runs with no config
//! file when the CSVs sit in the working directory.

use crate::error::Result;
use crate::schema::{SoilSchema, WideSchema};
use crate::scoring::ScoringStrategy;
use crate::types::{Pollutant, SourceSet};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory the relative source paths are resolved against.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Pollutant key → CSV file name, e.g. `"PM2.5" = "pm25.csv"`.
    #[serde(default = "default_sources")]
    pub sources: SourceSet,

    #[serde(default)]
    pub schema: WideSchema,

    #[serde(default)]
    pub strategy: ScoringStrategy,

    /// Rows shown in console previews.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    #[serde(default)]
    pub soil: SoilConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoilConfig {
    #[serde(default = "default_soil_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub schema: SoilSchema,

    /// Metric column that colours the soil map.
    #[serde(default = "default_soil_color_metric")]
    pub color_metric: String,
}

impl Default for SoilConfig {
    fn default() -> Self {
        SoilConfig {
            path: default_soil_path(),
            schema: SoilSchema::default(),
            color_metric: default_soil_color_metric(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            sources: default_sources(),
            schema: WideSchema::default(),
            strategy: ScoringStrategy::default(),
            preview_rows: default_preview_rows(),
            soil: SoilConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_preview_rows() -> usize {
    5
}

fn default_sources() -> SourceSet {
    [
        (Pollutant::Pm25, "미세먼지_PM2.5__월별_도시별_대기오염도_20250610151935.csv"),
        (Pollutant::Pm10, "미세먼지_PM10__월별_도시별_대기오염도_20250610152841.csv"),
        (Pollutant::So2, "아황산가스_월별_도시별_대기오염도_20250610152914.csv"),
        (Pollutant::No2, "이산화질소_월별_도시별_대기오염도_20250610153008.csv"),
        (Pollutant::Co, "일산화탄소_월별_도시별_대기오염도_20250610153041.csv"),
    ]
    .into_iter()
    .map(|(p, f)| (p, PathBuf::from(f)))
    .collect()
}

fn default_soil_path() -> PathBuf {
    PathBuf::from("토양오염실태조사결과_조사기관별_오염도_20250617151231.csv")
}

fn default_soil_color_metric() -> String {
    "2023 (카드뮴 Cd (mg/kg))".to_string()
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config = Self::from_toml_str(&text)?;
                info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            None => Ok(Config::default()),
        }
    }

    /// Source files with relative paths joined onto `data_dir`.
    pub fn resolved_sources(&self) -> SourceSet {
        self.sources
            .iter()
            .map(|(p, path)| (p, self.data_dir.join(path)))
            .collect()
    }

    pub fn soil_path(&self) -> PathBuf {
        self.data_dir.join(&self.soil.path)
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}
