//! Column layouts of the source CSV files.
//!
//! The government exports identify columns only by header text. Rather than
//! indexing by string prefix wherever a column is needed, each file kind is
//! described once here and resolved against the actual header row up front,
//! so a renamed or missing column fails with a named error.

use crate::error::{Error, Result};
use crate::types::Month;
use crate::util::strip_bom;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Province,
    City,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRole::Province => write!(f, "province"),
            ColumnRole::City => write!(f, "city"),
        }
    }
}

/// One expected column and the header labels accepted for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnSpec {
    pub role: ColumnRole,
    pub labels: Vec<String>,
}

impl ColumnSpec {
    fn matches(&self, header: &str) -> bool {
        self.labels.iter().any(|l| l == header)
    }
}

/// Layout of a wide monthly pollutant file:
/// `province, city, YYYY.01, YYYY.02, ...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct WideSchema {
    pub province_labels: Vec<String>,
    pub city_labels: Vec<String>,
    /// Year whose `YYYY.` prefix marks a measurement column.
    pub year: i32,
    /// Province value of the nationwide sum row.
    pub total_marker: String,
}

impl Default for WideSchema {
    fn default() -> Self {
        WideSchema {
            province_labels: vec!["구분(1)".into(), "province".into(), "시도".into()],
            city_labels: vec!["구분(2)".into(), "city".into(), "기관".into()],
            year: 2024,
            total_marker: "총계".into(),
        }
    }
}

/// Header indices resolved for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct WideLayout {
    pub province: usize,
    pub city: usize,
    pub months: Vec<(usize, Month)>,
}

impl WideSchema {
    pub fn month_prefix(&self) -> String {
        format!("{}.", self.year)
    }

    /// Expected columns in header order.
    pub fn columns(&self) -> Vec<ColumnSpec> {
        vec![
            ColumnSpec {
                role: ColumnRole::Province,
                labels: self.province_labels.clone(),
            },
            ColumnSpec {
                role: ColumnRole::City,
                labels: self.city_labels.clone(),
            },
        ]
    }

    /// Match the header row against this schema.
    ///
    /// Every column starting with the year prefix is a measurement column and
    /// must parse as `YYYY.MM`; anything else is ignored.
    pub fn resolve(&self, headers: &csv::StringRecord, path: &Path) -> Result<WideLayout> {
        let headers: Vec<&str> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| if i == 0 { strip_bom(h).trim() } else { h.trim() })
            .collect();

        let mut found: HashMap<ColumnRole, usize> = HashMap::new();
        for spec in self.columns() {
            let idx = headers.iter().position(|h| spec.matches(h)).ok_or_else(|| {
                Error::MissingColumn {
                    role: spec.role.to_string(),
                    accepted: spec.labels.join(", "),
                    path: path.to_path_buf(),
                }
            })?;
            found.insert(spec.role, idx);
        }

        let prefix = self.month_prefix();
        let mut months = Vec::new();
        for (idx, h) in headers.iter().enumerate() {
            if !h.starts_with(&prefix) {
                continue;
            }
            let month = Month::parse_column(h).ok_or_else(|| Error::MalformedDate {
                column: h.to_string(),
                path: path.to_path_buf(),
            })?;
            months.push((idx, month));
        }
        if months.is_empty() {
            return Err(Error::NoMeasurementColumns {
                prefix,
                path: path.to_path_buf(),
            });
        }

        Ok(WideLayout {
            province: found[&ColumnRole::Province],
            city: found[&ColumnRole::City],
            months,
        })
    }
}

/// Layout of the soil survey export: two header rows (category, sub-metric)
/// followed by a units row that is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct SoilSchema {
    /// Flattened header of the region column before renaming.
    pub region_header: String,
    /// Flattened header of the surveying institution column before renaming.
    pub institution_header: String,
    /// Sub-metric label meaning "the category itself".
    pub subtotal_label: String,
    pub total_marker: String,
    /// Flattened metric columns to keep, in output order.
    pub metrics: Vec<String>,
}

impl Default for SoilSchema {
    fn default() -> Self {
        SoilSchema {
            region_header: "구분(1) (구분(1))".into(),
            institution_header: "구분(2) (구분(2))".into(),
            subtotal_label: "소계".into(),
            total_marker: "계".into(),
            metrics: vec![
                "2023 (카드뮴 Cd (mg/kg))".into(),
                "2023 (납 Pb (mg/kg))".into(),
                "2023 (수은 Hg (mg/kg))".into(),
                "2023 (유류 (mg/kg))".into(),
                "2023 (유류 (mg/kg).1)".into(),
                "2023 (유류 (mg/kg).4)".into(),
                "2023 (수소이온농도 pH (pH))".into(),
            ],
        }
    }
}

/// Header indices resolved for a soil file.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilLayout {
    pub region: usize,
    pub institution: usize,
    pub metrics: Vec<(usize, String)>,
}

impl SoilSchema {
    /// Collapse the category and sub-metric rows into single column names.
    ///
    /// Blank category cells inherit the category to their left. When a
    /// (category, sub-metric) pair repeats, the repeat gets `.1`, `.2`, ...
    /// appended to its sub-metric so every column stays addressable. Only an
    /// unrenamed subtotal or blank sub-metric collapses to the bare category.
    pub fn flatten_headers(
        &self,
        categories: &csv::StringRecord,
        subs: &csv::StringRecord,
    ) -> Vec<String> {
        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        let mut current = String::new();
        let mut out = Vec::with_capacity(categories.len());

        for i in 0..categories.len().max(subs.len()) {
            let raw_cat = categories.get(i).unwrap_or("");
            let raw_cat = (if i == 0 { strip_bom(raw_cat) } else { raw_cat }).trim();
            if !raw_cat.is_empty() {
                current = raw_cat.to_string();
            }
            let raw_sub = subs.get(i).unwrap_or("");
            let raw_sub = (if i == 0 { strip_bom(raw_sub) } else { raw_sub }).trim();

            let n = seen
                .entry((current.clone(), raw_sub.to_string()))
                .or_insert(0);
            let sub = if *n == 0 {
                raw_sub.to_string()
            } else {
                format!("{}.{}", raw_sub, n)
            };
            *n += 1;

            let name = if sub == self.subtotal_label || sub.is_empty() {
                current.clone()
            } else {
                format!("{} ({})", current, sub)
            };
            out.push(name);
        }
        out
    }

    pub fn resolve(&self, flattened: &[String], path: &Path) -> Result<SoilLayout> {
        let find = |name: &str, role: &str| {
            flattened
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| Error::MissingColumn {
                    role: role.to_string(),
                    accepted: name.to_string(),
                    path: path.to_path_buf(),
                })
        };
        let region = find(&self.region_header, "region")?;
        let institution = find(&self.institution_header, "institution")?;
        let metrics = self
            .metrics
            .iter()
            .map(|m| find(m, "metric").map(|idx| (idx, m.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(SoilLayout {
            region,
            institution,
            metrics,
        })
    }
}
