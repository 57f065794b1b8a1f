use crate::error::{Error, Result};
use crate::schema::WideSchema;
use crate::types::{Measurement, Pollutant, SourceSet, TidyTable};
use crate::util::parse_f64_safe;
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct MissingSource {
    pub pollutant: Pollutant,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub files_read: usize,
    pub missing_sources: Vec<MissingSource>,
    /// Data rows read across all files, total rows included.
    pub source_rows: usize,
    pub total_rows_dropped: usize,
    /// Measurement cells that were blank or not numeric.
    pub missing_values: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub table: TidyTable,
    pub report: LoadReport,
}

/// Load every declared pollutant file and concatenate them into one tidy table.
///
/// A file that does not exist is logged and skipped. Any other failure
/// (unreadable CSV, bad header, malformed month) fails the whole load.
pub fn load(sources: &SourceSet, schema: &WideSchema) -> Result<LoadOutcome> {
    let mut report = LoadReport::default();
    let mut records: Vec<Measurement> = Vec::new();

    for (pollutant, path) in sources.iter() {
        if !path.exists() {
            let err = Error::MissingSourceFile {
                pollutant,
                path: path.to_path_buf(),
            };
            warn!(%pollutant, error = %err, "Skipping pollutant");
            report.missing_sources.push(MissingSource {
                pollutant,
                path: path.to_path_buf(),
            });
            continue;
        }
        let rows = load_pollutant_file(pollutant, path, schema, &mut report)?;
        info!(%pollutant, path = %path.display(), rows = rows.len(), "Loaded pollutant file");
        records.extend(rows);
        report.files_read += 1;
    }

    if report.files_read == 0 {
        return Err(Error::NoDataAvailable);
    }

    debug!(
        records = records.len(),
        dropped = report.total_rows_dropped,
        missing_values = report.missing_values,
        "Tidy table assembled"
    );
    Ok(LoadOutcome {
        table: TidyTable::new(records),
        report,
    })
}

/// Read one wide pollutant file and melt it into long form.
///
/// Output is ordered by month column first, then by source row.
pub fn load_pollutant_file(
    pollutant: Pollutant,
    path: &Path,
    schema: &WideSchema,
    report: &mut LoadReport,
) -> Result<Vec<Measurement>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let layout = schema.resolve(&headers, path)?;

    struct WideRow {
        province: String,
        city: String,
        values: Vec<Option<f64>>,
    }

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut wide: Vec<WideRow> = Vec::new();
    for result in rdr.records() {
        let rec = result?;
        report.source_rows += 1;

        let province = rec.get(layout.province).unwrap_or("").trim().to_string();
        if province == schema.total_marker {
            report.total_rows_dropped += 1;
            continue;
        }
        let city = rec.get(layout.city).unwrap_or("").trim().to_string();

        if !seen.insert((province.clone(), city.clone())) {
            return Err(Error::DuplicateRecord {
                province,
                city,
                path: path.to_path_buf(),
            });
        }

        let values: Vec<Option<f64>> = layout
            .months
            .iter()
            .map(|(idx, _)| parse_f64_safe(rec.get(*idx)))
            .collect();
        report.missing_values += values.iter().filter(|v| v.is_none()).count();
        wide.push(WideRow {
            province,
            city,
            values,
        });
    }

    let mut long = Vec::with_capacity(wide.len() * layout.months.len());
    for (col, (_, month)) in layout.months.iter().enumerate() {
        for row in &wide {
            long.push(Measurement {
                province: row.province.clone(),
                city: row.city.clone(),
                month: *month,
                pollutant,
                value: row.values[col],
            });
        }
    }
    Ok(long)
}
