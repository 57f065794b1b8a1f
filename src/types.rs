use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tabled::Tabled;

/// The five pollutants published in the monthly city air-quality tables.
///
/// Ordering follows declaration order; tidy tables and reports list
/// pollutants in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pollutant {
    Pm25,
    Pm10,
    So2,
    No2,
    Co,
}

impl Pollutant {
    pub const ALL: [Pollutant; 5] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::So2,
        Pollutant::No2,
        Pollutant::Co,
    ];

    /// Short key used in config files and CSV output.
    pub fn key(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::So2 => "SO2",
            Pollutant::No2 => "NO2",
            Pollutant::Co => "CO",
        }
    }

    /// Display label including the measurement unit.
    pub fn label(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5 (㎍/m³)",
            Pollutant::Pm10 => "PM10 (㎍/m³)",
            Pollutant::So2 => "SO₂ (ppm)",
            Pollutant::No2 => "NO₂ (ppm)",
            Pollutant::Co => "CO (ppm)",
        }
    }

    /// Penalty per unit of concentration in the fixed-threshold score.
    pub fn fixed_weight(&self) -> f64 {
        match self {
            Pollutant::Pm25 => 2.0,
            Pollutant::Pm10 => 1.5,
            Pollutant::So2 => 500.0,
            Pollutant::No2 => 300.0,
            Pollutant::Co => 10.0,
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Pollutant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accepts keys ("SO2") as well as unit labels ("SO₂ (ppm)").
        let head = s.split('(').next().unwrap_or(s);
        let norm = head.trim().to_uppercase().replace('₂', "2").replace(' ', "");
        match norm.as_str() {
            "PM2.5" | "PM25" => Ok(Pollutant::Pm25),
            "PM10" => Ok(Pollutant::Pm10),
            "SO2" => Ok(Pollutant::So2),
            "NO2" => Ok(Pollutant::No2),
            "CO" => Ok(Pollutant::Co),
            _ => Err(format!("unknown pollutant {:?}", s)),
        }
    }
}

impl TryFrom<String> for Pollutant {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Pollutant> for String {
    fn from(p: Pollutant) -> String {
        p.key().to_string()
    }
}

/// A calendar month, stored as the first day of that month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Month)
    }

    /// Parse a measurement column label of the form `YYYY.MM`.
    pub fn parse_column(label: &str) -> Option<Self> {
        let label = label.trim();
        // A day is appended because `NaiveDate` cannot be parsed from a year and month alone.
        NaiveDate::parse_from_str(&format!("{}.01", label), "%Y.%m.%d")
            .ok()
            .map(Month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One long-form observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub province: String,
    pub city: String,
    pub month: Month,
    pub pollutant: Pollutant,
    pub value: Option<f64>,
}

/// Long-form measurements concatenated across all pollutant files.
///
/// Built once per load and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TidyTable {
    records: Vec<Measurement>,
}

impl TidyTable {
    pub fn new(records: Vec<Measurement>) -> Self {
        TidyTable { records }
    }

    pub fn records(&self) -> &[Measurement] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Declared pollutant files. Also the identity under which a load is cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(transparent)]
pub struct SourceSet {
    files: BTreeMap<Pollutant, PathBuf>,
}

impl SourceSet {
    pub fn new() -> Self {
        SourceSet::default()
    }

    pub fn with(mut self, pollutant: Pollutant, path: impl Into<PathBuf>) -> Self {
        self.files.insert(pollutant, path.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, &Path)> {
        self.files.iter().map(|(p, path)| (*p, path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(Pollutant, PathBuf)> for SourceSet {
    fn from_iter<I: IntoIterator<Item = (Pollutant, PathBuf)>>(iter: I) -> Self {
        SourceSet {
            files: iter.into_iter().collect(),
        }
    }
}

/// Derived overall score for one top-level region at one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalScore {
    pub region: String,
    pub month: Month,
    pub score: f64,
    pub sub_scores: BTreeMap<Pollutant, f64>,
    pub coordinates: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreBand {
    VeryGood,
    Moderate,
    Poor,
    VeryPoor,
}

impl ScoreBand {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::VeryGood => "Very good",
            ScoreBand::Moderate => "Moderate",
            ScoreBand::Poor => "Poor",
            ScoreBand::VeryPoor => "Very poor",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionScoreRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "PM2.5")]
    #[tabled(rename = "PM2.5")]
    pub pm25: String,
    #[serde(rename = "PM10")]
    #[tabled(rename = "PM10")]
    pub pm10: String,
    #[serde(rename = "SO2")]
    #[tabled(rename = "SO2")]
    pub so2: String,
    #[serde(rename = "NO2")]
    #[tabled(rename = "NO2")]
    pub no2: String,
    #[serde(rename = "CO")]
    #[tabled(rename = "CO")]
    pub co: String,
    #[serde(rename = "Score")]
    #[tabled(rename = "Score")]
    pub score: String,
    #[serde(rename = "Band")]
    #[tabled(rename = "Band")]
    pub band: String,
    #[serde(rename = "Lat")]
    #[tabled(skip)]
    pub lat: Option<f64>,
    #[serde(rename = "Lon")]
    #[tabled(skip)]
    pub lon: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CityScoreRow {
    #[serde(rename = "Pollutant")]
    #[tabled(rename = "Pollutant")]
    pub pollutant: String,
    #[serde(rename = "Average")]
    #[tabled(rename = "Average")]
    pub average: String,
    #[serde(rename = "Latest")]
    #[tabled(rename = "Latest")]
    pub latest: String,
    #[serde(rename = "SubScore")]
    #[tabled(rename = "SubScore")]
    pub sub_score: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PivotRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "PM2.5")]
    #[tabled(rename = "PM2.5")]
    pub pm25: String,
    #[serde(rename = "PM10")]
    #[tabled(rename = "PM10")]
    pub pm10: String,
    #[serde(rename = "SO2")]
    #[tabled(rename = "SO2")]
    pub so2: String,
    #[serde(rename = "NO2")]
    #[tabled(rename = "NO2")]
    pub no2: String,
    #[serde(rename = "CO")]
    #[tabled(rename = "CO")]
    pub co: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub missing_values: usize,
    pub total_provinces: usize,
    pub total_cities: usize,
    pub first_month: Option<Month>,
    pub last_month: Option<Month>,
    pub pollutants_loaded: Vec<Pollutant>,
    pub missing_sources: Vec<String>,
    pub national_averages: BTreeMap<Pollutant, f64>,
}

/// A circle marker for the map view. Rendering is left to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub radius: u32,
    /// Value driving the marker colour (score or concentration).
    pub value: f64,
    pub popup: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub center: (f64, f64),
    /// Upper bound of the colour scale; the lower bound is 0.
    pub scale_max: f64,
    pub markers: Vec<MapMarker>,
}
