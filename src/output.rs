use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::debug;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "Wrote CSV report");
    Ok(())
}

/// Write rows whose columns are only known at run time.
pub fn write_records(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(headers)?;
    for r in rows {
        wtr.write_record(r)?;
    }
    wtr.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "Wrote CSV report");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    debug!(path = %path.display(), "Wrote JSON report");
    Ok(())
}

pub fn preview_table<T>(
    report_no: usize,
    title: &str,
    note: Option<&str>,
    rows: &[T],
    max_rows: usize,
) where
    T: Tabled + Clone,
{
    println!("Report {}: {}", report_no, title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    preview_table_rows(rows, max_rows);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Markdown preview for rows with run-time columns.
pub fn preview_records(headers: &[String], rows: &[Vec<String>], max_rows: usize) {
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    println!("{}\n", render_records(headers, rows, max_rows));
}

pub fn render_records(headers: &[String], rows: &[Vec<String>], max_rows: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());
    for r in rows.iter().take(max_rows) {
        builder.push_record(r.iter().cloned());
    }
    builder.build().with(Style::markdown()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Serialize, Tabled, Clone)]
    struct Row {
        name: String,
        value: f64,
    }

    #[test]
    fn write_csv_includes_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rows.csv");
        let rows = vec![
            Row { name: "a".into(), value: 1.5 },
            Row { name: "b".into(), value: 2.0 },
        ];
        write_csv(&path, &rows).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["name,value", "a,1.5", "b,2.0"]);
    }

    #[test]
    fn write_records_keeps_dynamic_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("soil.csv");
        let headers = vec!["region".to_string(), "Cd".to_string()];
        let rows = vec![vec!["서울특별시".to_string(), "0.5".to_string()]];
        write_records(&path, &headers, &rows).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "region,Cd\n서울특별시,0.5\n");
    }

    #[test]
    fn write_json_is_pretty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");
        write_json(&path, &serde_json::json!({"total": 3})).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\n  \"total\": 3\n}");
    }

    #[test]
    fn render_records_limits_rows() {
        let headers = vec!["a".to_string()];
        let rows = vec![vec!["1".to_string()], vec!["2".to_string()], vec!["3".to_string()]];
        let s = render_records(&headers, &rows, 2);
        assert!(s.contains('1') && s.contains('2'));
        assert!(!s.contains('3'));
    }
}
