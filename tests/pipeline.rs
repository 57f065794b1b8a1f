use air_quality_report::cache::TidyCache;
use air_quality_report::loader::load;
use air_quality_report::query::{self, Selection};
use air_quality_report::reports;
use air_quality_report::schema::WideSchema;
use air_quality_report::scoring::{self, normalize_relative, overall, Averages, ScoringStrategy};
use air_quality_report::types::{Month, Pollutant, SourceSet};
use air_quality_report::Error;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PM25: &str = "\u{feff}구분(1),구분(2),2024.01,2024.02,2024.03
총계,소계,20,22,24
서울특별시,중구,10,20,
서울특별시,종로구,14,18,16
부산광역시,중구,30,-,20
";

const PM10: &str = "구분(1),구분(2),2024.01,2024.02,2024.03
총계,소계,40,40,40
서울특별시,중구,30,40,50
서울특별시,종로구,34,36,38
부산광역시,중구,50,44,42
";

const CO: &str = "구분(1),구분(2),2024.01,2024.02,2024.03
총계,소계,0.5,0.5,0.5
서울특별시,중구,0.4,0.5,0.6
서울특별시,종로구,0.5,0.5,0.5
부산광역시,중구,0.3,0.4,측정중
";

fn fixture_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("pm25.csv"), PM25).unwrap();
    fs::write(dir.path().join("pm10.csv"), PM10).unwrap();
    fs::write(dir.path().join("co.csv"), CO).unwrap();
    dir
}

fn sources(dir: &Path) -> SourceSet {
    SourceSet::new()
        .with(Pollutant::Pm25, dir.join("pm25.csv"))
        .with(Pollutant::Pm10, dir.join("pm10.csv"))
        .with(Pollutant::Co, dir.join("co.csv"))
        .with(Pollutant::So2, dir.join("so2_missing.csv"))
}

#[test]
fn full_load_shape_and_report() {
    let dir = fixture_dir();
    let outcome = load(&sources(dir.path()), &WideSchema::default()).unwrap();

    // 3 files × 3 regions × 3 months.
    assert_eq!(outcome.table.len(), 27);
    assert_eq!(outcome.report.files_read, 3);
    assert_eq!(outcome.report.total_rows_dropped, 3);
    assert_eq!(outcome.report.missing_sources.len(), 1);
    assert_eq!(outcome.report.missing_sources[0].pollutant, Pollutant::So2);
    assert_eq!(outcome.report.missing_values, 3);

    assert!(outcome.table.iter().all(|m| m.province != "총계"));
    assert_eq!(query::provinces(&outcome.table), vec!["부산광역시", "서울특별시"]);
    assert_eq!(
        query::pollutants(&outcome.table),
        vec![Pollutant::Pm25, Pollutant::Pm10, Pollutant::Co]
    );
}

#[test]
fn repeated_loads_are_identical() {
    let dir = fixture_dir();
    let schema = WideSchema::default();
    let a = load(&sources(dir.path()), &schema).unwrap();
    let b = load(&sources(dir.path()), &schema).unwrap();
    assert_eq!(a, b);
}

#[test]
fn cache_serves_snapshot_until_refreshed() {
    let dir = fixture_dir();
    let schema = WideSchema::default();
    let set = sources(dir.path());
    let cache = TidyCache::new();

    let first = cache.get_or_load(&set, &schema).unwrap();
    fs::remove_file(dir.path().join("pm10.csv")).unwrap();
    let again = cache.get_or_load(&set, &schema).unwrap();
    assert_eq!(first.table, again.table);

    let refreshed = cache.refresh(&set, &schema).unwrap();
    assert_eq!(refreshed.report.files_read, 2);
    assert!(refreshed.table.iter().all(|m| m.pollutant != Pollutant::Pm10));
}

#[test]
fn regional_scores_for_latest_month() {
    let dir = fixture_dir();
    let outcome = load(&sources(dir.path()), &WideSchema::default()).unwrap();
    let march = query::latest_month(&outcome.table).unwrap();
    assert_eq!(march, Month::new(2024, 3).unwrap());

    let fixed = scoring::scores_by_region(&outcome.table, march, ScoringStrategy::FixedThreshold);
    assert_eq!(fixed.len(), 2);
    for s in &fixed {
        assert!((0.0..=100.0).contains(&s.score));
        assert!(s.coordinates.is_some());
    }
    // Busan's March CO cell is non-numeric, so only PM2.5 and PM10 score.
    let busan = &fixed[0];
    assert_eq!(busan.region, "부산광역시");
    assert_eq!(busan.sub_scores.len(), 2);
    assert_eq!(busan.sub_scores[&Pollutant::Pm25], 60.0);
    assert_eq!(busan.sub_scores[&Pollutant::Pm10], 37.0);

    let relative = scoring::scores_by_region(&outcome.table, march, ScoringStrategy::Relative);
    let busan = &relative[0];
    assert_eq!(busan.sub_scores.len(), 3);
    assert_eq!(busan.sub_scores[&Pollutant::Co], 50.0);

    let rows = reports::regional_score_rows(&fixed);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.month == "2024-03"));
}

#[test]
fn neutral_and_missing_baseline_properties() {
    let national: Averages = [
        (Pollutant::Pm25, Some(20.0)),
        (Pollutant::Pm10, Some(40.0)),
        (Pollutant::So2, Some(0.004)),
        (Pollutant::No2, Some(0.02)),
        (Pollutant::Co, Some(0.5)),
    ]
    .into_iter()
    .collect();
    assert_eq!(overall(&normalize_relative(&national, &national)).unwrap(), 50.0);

    let mut city = national.clone();
    city.insert(Pollutant::Pm10, Some(30.0));
    city.insert(Pollutant::Pm25, None);
    let subs = normalize_relative(&city, &national);
    assert_eq!(subs[&Pollutant::Pm25], 50.0);
    assert_eq!(subs[&Pollutant::Pm10], 62.5);
    assert_eq!(overall(&subs).unwrap(), (50.0 + 62.5 + 50.0 + 50.0 + 50.0) / 5.0);
}

#[test]
fn city_dashboard_end_to_end() {
    let dir = fixture_dir();
    let outcome = load(&sources(dir.path()), &WideSchema::default()).unwrap();
    let sel = Selection::city("서울특별시", "중구").with_pollutants([Pollutant::Pm25]);

    let summary =
        query::city_summary(&outcome.table, &sel, ScoringStrategy::FixedThreshold).unwrap();
    // Mean of 10 and 20; the blank March cell is skipped.
    assert_eq!(summary.averages[&Pollutant::Pm25], Some(15.0));
    assert_eq!(summary.score, 70.0);
    assert_eq!(summary.latest[&Pollutant::Pm25], None);

    let records = query::filter(&outcome.table, &sel);
    let pivot = reports::pivot_rows(&query::pivot_by_month(&records));
    let cells: Vec<(&str, &str)> = pivot
        .iter()
        .map(|r| (r.month.as_str(), r.pm25.as_str()))
        .collect();
    assert_eq!(cells, vec![("2024-01", "10.0"), ("2024-02", "20.0"), ("2024-03", "")]);
}

#[test]
fn single_row_melts_into_two_months() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pm25.csv");
    fs::write(&path, "province,city,2024.01,2024.02\n서울특별시,중구,10,20\n").unwrap();
    let sources = SourceSet::new().with(Pollutant::Pm25, path);
    let outcome = load(&sources, &WideSchema::default()).unwrap();

    let rows: Vec<(String, String, String, Pollutant, Option<f64>)> = outcome
        .table
        .iter()
        .map(|m| (m.province.clone(), m.city.clone(), m.month.to_string(), m.pollutant, m.value))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("서울특별시".into(), "중구".into(), "2024-01".into(), Pollutant::Pm25, Some(10.0)),
            ("서울특별시".into(), "중구".into(), "2024-02".into(), Pollutant::Pm25, Some(20.0)),
        ]
    );
}

#[test]
fn renamed_header_fails_fast() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pm25.csv");
    fs::write(&path, "지역,도시,2024.01\n서울특별시,중구,10\n").unwrap();
    let sources = SourceSet::new().with(Pollutant::Pm25, path);
    let err = load(&sources, &WideSchema::default()).unwrap_err();
    assert!(matches!(err, Error::MissingColumn { .. }));
}
