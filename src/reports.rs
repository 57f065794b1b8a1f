use crate::loader::LoadOutcome;
use crate::query::{self, CitySummary};
use crate::regions::COUNTRY_CENTER;
use crate::scoring::national_averages;
use crate::soil::{self, SoilMean, SoilTable};
use crate::types::{
    CityScoreRow, MapMarker, MapView, Month, PivotRow, Pollutant, RegionScoreRow, RegionalScore,
    SummaryStats,
};
use crate::util::{format_number, format_opt};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// Regional scores as table rows, best score first.
pub fn regional_score_rows(scores: &[RegionalScore]) -> Vec<RegionScoreRow> {
    let mut sorted: Vec<&RegionalScore> = scores.iter().collect();
    sorted.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.region.cmp(&b.region))
    });

    sorted
        .into_iter()
        .map(|s| {
            let sub = |p: Pollutant| format_opt(s.sub_scores.get(&p).copied(), 1);
            RegionScoreRow {
                region: s.region.clone(),
                month: s.month.to_string(),
                pm25: sub(Pollutant::Pm25),
                pm10: sub(Pollutant::Pm10),
                so2: sub(Pollutant::So2),
                no2: sub(Pollutant::No2),
                co: sub(Pollutant::Co),
                score: format_number(s.score, 1),
                band: crate::scoring::score_band(s.score).to_string(),
                lat: s.coordinates.map(|c| c.0),
                lon: s.coordinates.map(|c| c.1),
            }
        })
        .collect()
}

/// One row per selected pollutant plus a closing overall row.
pub fn city_score_rows(summary: &CitySummary) -> Vec<CityScoreRow> {
    let mut rows: Vec<CityScoreRow> = summary
        .selection
        .pollutants
        .iter()
        .map(|p| CityScoreRow {
            pollutant: p.label().to_string(),
            average: format_opt(summary.averages.get(p).copied().flatten(), 3),
            latest: format_opt(summary.latest.get(p).copied().flatten(), 3),
            sub_score: format_opt(summary.sub_scores.get(p).copied(), 1),
        })
        .collect();
    rows.push(CityScoreRow {
        pollutant: "Overall".to_string(),
        average: String::new(),
        latest: summary.latest_month.to_string(),
        sub_score: format!("{} ({})", format_number(summary.score, 1), summary.band),
    });
    rows
}

pub fn pivot_rows(pivot: &[(Month, BTreeMap<Pollutant, Option<f64>>)]) -> Vec<PivotRow> {
    pivot
        .iter()
        .map(|(month, cells)| {
            let cell = |p: Pollutant| format_opt(cells.get(&p).copied().flatten(), 1);
            PivotRow {
                month: month.to_string(),
                pm25: cell(Pollutant::Pm25),
                pm10: cell(Pollutant::Pm10),
                so2: cell(Pollutant::So2),
                no2: cell(Pollutant::No2),
                co: cell(Pollutant::Co),
            }
        })
        .collect()
}

/// Header and rows for a soil means table; values rounded to three decimals.
pub fn soil_mean_records(
    table: &SoilTable,
    means: &[SoilMean],
    key: &str,
) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers = vec![key.to_string()];
    headers.extend(table.metrics.iter().cloned());
    let rows = means
        .iter()
        .map(|m| {
            let mut row = vec![m.name.clone()];
            row.extend(m.values.iter().map(|v| format_opt(*v, 3)));
            row
        })
        .collect();
    (headers, rows)
}

/// Per-institution means within `region`, as a records table.
pub fn soil_institution_records(
    table: &SoilTable,
    region: &str,
) -> (Vec<String>, Vec<Vec<String>>) {
    soil_mean_records(table, &soil::mean_by_institution(table, region), "institution")
}

/// Map markers for regional scores. The selected region is drawn larger.
pub fn score_map(scores: &[RegionalScore], selected: Option<&str>) -> MapView {
    let markers = scores
        .iter()
        .filter_map(|s| {
            let (lat, lon) = s.coordinates?;
            let mut popup = vec![("Score".to_string(), format_number(s.score, 1))];
            popup.extend(
                s.sub_scores
                    .iter()
                    .map(|(p, v)| (p.key().to_string(), format_number(*v, 1))),
            );
            Some(MapMarker {
                name: s.region.clone(),
                lat,
                lon,
                radius: marker_radius(&s.region, selected),
                value: s.score,
                popup,
            })
        })
        .collect();
    MapView {
        center: COUNTRY_CENTER,
        scale_max: 100.0,
        markers,
    }
}

/// Map markers for soil means, coloured by `metric`.
pub fn soil_map(
    table: &SoilTable,
    means: &[SoilMean],
    metric: &str,
    selected: Option<&str>,
) -> MapView {
    let idx = table.metrics.iter().position(|m| m == metric);
    let markers = means
        .iter()
        .filter_map(|m| {
            let (lat, lon) = m.coordinates?;
            let popup = table
                .metrics
                .iter()
                .zip(&m.values)
                .map(|(name, v)| (name.clone(), format_opt(*v, 2)))
                .collect();
            Some(MapMarker {
                name: m.name.clone(),
                lat,
                lon,
                radius: marker_radius(&m.name, selected),
                value: idx.and_then(|i| m.values.get(i).copied().flatten()).unwrap_or(0.0),
                popup,
            })
        })
        .collect();
    MapView {
        center: COUNTRY_CENTER,
        scale_max: soil::metric_max(table, means, metric).unwrap_or(0.0),
        markers,
    }
}

fn marker_radius(name: &str, selected: Option<&str>) -> u32 {
    if selected == Some(name) {
        12
    } else {
        8
    }
}

pub fn generate_summary(outcome: &LoadOutcome) -> SummaryStats {
    let table = &outcome.table;
    let cities: HashSet<(&str, &str)> = table
        .iter()
        .map(|m| (m.province.as_str(), m.city.as_str()))
        .collect();
    let months = query::months(table);
    SummaryStats {
        total_records: table.len(),
        missing_values: table.iter().filter(|m| m.value.is_none()).count(),
        total_provinces: query::provinces(table).len(),
        total_cities: cities.len(),
        first_month: months.first().copied(),
        last_month: months.last().copied(),
        pollutants_loaded: query::pollutants(table),
        missing_sources: outcome
            .report
            .missing_sources
            .iter()
            .map(|m| format!("{}: {}", m.pollutant, m.path.display()))
            .collect(),
        national_averages: national_averages(table, None)
            .into_iter()
            .filter_map(|(p, v)| v.map(|v| (p, v)))
            .collect(),
    }
}
