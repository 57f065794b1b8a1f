use crate::error::{Error, Result};
use crate::regions;
use crate::schema::SoilSchema;
use crate::util::{mean_present, parse_f64_safe};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// One surveying institution's row in the soil pollution survey.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilRecord {
    pub region: String,
    pub institution: String,
    /// Aligned with [`SoilTable::metrics`].
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SoilTable {
    pub metrics: Vec<String>,
    pub rows: Vec<SoilRecord>,
}

/// Mean of each metric over a group of soil rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilMean {
    pub name: String,
    pub values: Vec<Option<f64>>,
    pub coordinates: Option<(f64, f64)>,
}

/// Load the soil survey export.
///
/// Row 0 and row 1 are the category and sub-metric headers, row 2 is a units
/// row and is skipped. Total rows are dropped and metric cells coerced to
/// numbers (invalid → missing).
pub fn load_soil(path: &Path, schema: &SoilSchema) -> Result<SoilTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut records = rdr.records();

    let mut header_row = |which: &str| -> Result<csv::StringRecord> {
        match records.next() {
            Some(rec) => Ok(rec?),
            None => Err(Error::InvalidHeader {
                reason: format!("missing {} row", which),
                path: path.to_path_buf(),
            }),
        }
    };
    let categories = header_row("category")?;
    let subs = header_row("sub-metric")?;
    header_row("units")?;

    let flattened = schema.flatten_headers(&categories, &subs);
    let layout = schema.resolve(&flattened, path)?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for result in records {
        let rec = result?;
        let region = rec.get(layout.region).unwrap_or("").trim().to_string();
        if region == schema.total_marker {
            dropped += 1;
            continue;
        }
        let institution = rec.get(layout.institution).unwrap_or("").trim().to_string();
        let values = layout
            .metrics
            .iter()
            .map(|(idx, _)| parse_f64_safe(rec.get(*idx)))
            .collect();
        rows.push(SoilRecord {
            region,
            institution,
            values,
        });
    }

    info!(path = %path.display(), rows = rows.len(), dropped, "Loaded soil survey");
    Ok(SoilTable {
        metrics: layout.metrics.into_iter().map(|(_, name)| name).collect(),
        rows,
    })
}

fn group_means<'a, I, F>(table: &'a SoilTable, rows: I, key: F) -> Vec<SoilMean>
where
    I: Iterator<Item = &'a SoilRecord>,
    F: Fn(&'a SoilRecord) -> &'a str,
{
    let mut groups: BTreeMap<&str, Vec<&SoilRecord>> = BTreeMap::new();
    for r in rows {
        groups.entry(key(r)).or_default().push(r);
    }
    groups
        .into_iter()
        .map(|(name, members)| {
            let values = (0..table.metrics.len())
                .map(|i| mean_present(members.iter().map(|r| r.values.get(i).copied().flatten())))
                .collect();
            SoilMean {
                name: name.to_string(),
                values,
                coordinates: regions::coordinates(name),
            }
        })
        .collect()
}

/// Per-region means of every metric, regions in name order.
pub fn mean_by_region(table: &SoilTable) -> Vec<SoilMean> {
    group_means(table, table.rows.iter(), |r| r.region.as_str())
}

/// Per-institution means within one region.
pub fn mean_by_institution(table: &SoilTable, region: &str) -> Vec<SoilMean> {
    group_means(
        table,
        table.rows.iter().filter(|r| r.region == region),
        |r| r.institution.as_str(),
    )
}

/// Largest regional mean of `metric`, the upper bound of a colour scale.
pub fn metric_max(table: &SoilTable, means: &[SoilMean], metric: &str) -> Option<f64> {
    let idx = table.metrics.iter().position(|m| m == metric)?;
    means
        .iter()
        .filter_map(|m| m.values.get(idx).copied().flatten())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SURVEY: &str = "\
구분(1),구분(2),2023,2023,2023,2023
구분(1),구분(2),카드뮴 Cd (mg/kg),납 Pb (mg/kg),유류 (mg/kg),유류 (mg/kg)
구분(1),구분(2),mg/kg,mg/kg,mg/kg,mg/kg
계,소계,0.5,20,1,2
서울특별시,보건환경연구원,0.4,18,-,3
서울특별시,환경공단,0.6,22,5,
부산광역시,보건환경연구원,0.2,10,1,1
";

    fn schema() -> SoilSchema {
        SoilSchema {
            metrics: vec![
                "2023 (카드뮴 Cd (mg/kg))".into(),
                "2023 (납 Pb (mg/kg))".into(),
                "2023 (유류 (mg/kg).1)".into(),
            ],
            ..SoilSchema::default()
        }
    }

    fn load_fixture() -> SoilTable {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("soil.csv");
        fs::write(&path, SURVEY).unwrap();
        load_soil(&path, &schema()).unwrap()
    }

    #[test]
    fn loads_rows_and_drops_total() {
        let t = load_fixture();
        assert_eq!(t.rows.len(), 3);
        assert!(t.rows.iter().all(|r| r.region != "계"));
        assert_eq!(t.metrics.len(), 3);
        assert_eq!(t.rows[0].institution, "보건환경연구원");
        assert_eq!(t.rows[0].values, vec![Some(0.4), Some(18.0), Some(3.0)]);
        assert_eq!(t.rows[1].values[2], None);
    }

    #[test]
    fn region_means_skip_missing_values() {
        let t = load_fixture();
        let means = mean_by_region(&t);
        assert_eq!(means.len(), 2);
        let seoul = means.iter().find(|m| m.name == "서울특별시").unwrap();
        assert_eq!(seoul.values[1], Some(20.0));
        assert_eq!(seoul.values[2], Some(3.0));
        assert!(seoul.coordinates.is_some());
        assert_eq!(metric_max(&t, &means, "2023 (납 Pb (mg/kg))"), Some(20.0));
        assert_eq!(metric_max(&t, &means, "unknown"), None);
    }

    #[test]
    fn institution_means_within_region() {
        let t = load_fixture();
        let means = mean_by_institution(&t, "서울특별시");
        let names: Vec<&str> = means.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["보건환경연구원", "환경공단"]);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("soil.csv");
        fs::write(&path, "구분(1),구분(2)\n").unwrap();
        assert!(matches!(
            load_soil(&path, &schema()),
            Err(Error::InvalidHeader { .. })
        ));
    }
}
