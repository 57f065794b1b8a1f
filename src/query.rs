//! Selections over a tidy table and the per-city views built from them.

use crate::error::{Error, Result};
use crate::scoring::{
    self, national_averages, pollutant_averages, Averages, ScoringStrategy, SubScores,
};
use crate::types::{Measurement, Month, Pollutant, ScoreBand, TidyTable};
use crate::util::{mean_present, round_to};
use std::collections::{BTreeMap, BTreeSet};

/// Province / city / pollutant filter. `None` for province or city means any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub province: Option<String>,
    pub city: Option<String>,
    pub pollutants: BTreeSet<Pollutant>,
}

impl Default for Selection {
    fn default() -> Self {
        Selection {
            province: None,
            city: None,
            pollutants: Pollutant::ALL.into_iter().collect(),
        }
    }
}

impl Selection {
    /// One city, every pollutant.
    pub fn city(province: impl Into<String>, city: impl Into<String>) -> Self {
        Selection {
            province: Some(province.into()),
            city: Some(city.into()),
            ..Selection::default()
        }
    }

    pub fn with_pollutants<I: IntoIterator<Item = Pollutant>>(mut self, pollutants: I) -> Self {
        self.pollutants = pollutants.into_iter().collect();
        self
    }

    pub fn matches(&self, m: &Measurement) -> bool {
        self.province.as_deref().map_or(true, |p| m.province == p)
            && self.city.as_deref().map_or(true, |c| m.city == c)
            && self.pollutants.contains(&m.pollutant)
    }

    pub fn describe(&self) -> String {
        let pollutants: Vec<&str> = self.pollutants.iter().map(|p| p.key()).collect();
        format!(
            "{} {} [{}]",
            self.province.as_deref().unwrap_or("*"),
            self.city.as_deref().unwrap_or("*"),
            pollutants.join(", ")
        )
    }
}

pub fn filter<'a>(table: &'a TidyTable, selection: &Selection) -> Vec<&'a Measurement> {
    table.iter().filter(|m| selection.matches(m)).collect()
}

pub fn provinces(table: &TidyTable) -> Vec<String> {
    let set: BTreeSet<&str> = table.iter().map(|m| m.province.as_str()).collect();
    set.into_iter().map(str::to_string).collect()
}

pub fn cities(table: &TidyTable, province: &str) -> Vec<String> {
    let set: BTreeSet<&str> = table
        .iter()
        .filter(|m| m.province == province)
        .map(|m| m.city.as_str())
        .collect();
    set.into_iter().map(str::to_string).collect()
}

pub fn pollutants(table: &TidyTable) -> Vec<Pollutant> {
    let set: BTreeSet<Pollutant> = table.iter().map(|m| m.pollutant).collect();
    set.into_iter().collect()
}

pub fn months(table: &TidyTable) -> Vec<Month> {
    let set: BTreeSet<Month> = table.iter().map(|m| m.month).collect();
    set.into_iter().collect()
}

pub fn latest_month(table: &TidyTable) -> Option<Month> {
    table.iter().map(|m| m.month).max()
}

/// Values of each pollutant at the latest month present in `records`.
pub fn latest_readings(
    records: &[&Measurement],
) -> Option<(Month, BTreeMap<Pollutant, Option<f64>>)> {
    let latest = records.iter().map(|m| m.month).max()?;
    let readings = records
        .iter()
        .filter(|m| m.month == latest)
        .map(|m| (m.pollutant, m.value))
        .collect();
    Some((latest, readings))
}

/// Month × pollutant mean, rounded to one decimal, months ascending.
pub fn pivot_by_month(records: &[&Measurement]) -> Vec<(Month, BTreeMap<Pollutant, Option<f64>>)> {
    let mut cells: BTreeMap<Month, BTreeMap<Pollutant, Vec<Option<f64>>>> = BTreeMap::new();
    for m in records {
        cells
            .entry(m.month)
            .or_default()
            .entry(m.pollutant)
            .or_default()
            .push(m.value);
    }
    cells
        .into_iter()
        .map(|(month, by_pollutant)| {
            let row = by_pollutant
                .into_iter()
                .map(|(p, values)| (p, mean_present(values).map(|v| round_to(v, 1))))
                .collect();
            (month, row)
        })
        .collect()
}

/// Time series of one pollutant, sorted by month.
pub fn series(records: &[&Measurement], pollutant: Pollutant) -> Vec<(Month, Option<f64>)> {
    let mut out: Vec<(Month, Option<f64>)> = records
        .iter()
        .filter(|m| m.pollutant == pollutant)
        .map(|m| (m.month, m.value))
        .collect();
    out.sort_by_key(|(month, _)| *month);
    out
}

/// Everything the single-city dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct CitySummary {
    pub selection: Selection,
    pub averages: Averages,
    pub sub_scores: SubScores,
    pub score: f64,
    pub band: ScoreBand,
    pub latest_month: Month,
    pub latest: BTreeMap<Pollutant, Option<f64>>,
}

/// Score a selection over every month it covers.
///
/// The relative strategy compares against national averages over the whole
/// table for the selected pollutants.
pub fn city_summary(
    table: &TidyTable,
    selection: &Selection,
    strategy: ScoringStrategy,
) -> Result<CitySummary> {
    if selection.pollutants.is_empty() {
        return Err(Error::NoPollutantsSelected);
    }
    let records = filter(table, selection);
    let Some((latest_month, latest)) = latest_readings(&records) else {
        return Err(Error::NoMatchingData(selection.describe()));
    };

    let own = pollutant_averages(records.iter().copied());
    let national: Averages = national_averages(table, None)
        .into_iter()
        .filter(|(p, _)| selection.pollutants.contains(p))
        .collect();
    let averages: Averages = selection
        .pollutants
        .iter()
        .filter(|p| own.contains_key(*p) || national.contains_key(*p))
        .map(|p| (*p, own.get(p).copied().flatten()))
        .collect();

    let sub_scores = strategy.sub_scores(&averages, &national);
    let score = scoring::overall(&sub_scores)?;
    Ok(CitySummary {
        selection: selection.clone(),
        averages,
        sub_scores,
        score,
        band: scoring::score_band(score),
        latest_month,
        latest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(
        province: &str,
        city: &str,
        month: u32,
        pollutant: Pollutant,
        value: Option<f64>,
    ) -> Measurement {
        Measurement {
            province: province.into(),
            city: city.into(),
            month: Month::new(2024, month).unwrap(),
            pollutant,
            value,
        }
    }

    fn table() -> TidyTable {
        TidyTable::new(vec![
            m("서울특별시", "중구", 1, Pollutant::Pm25, Some(10.0)),
            m("서울특별시", "중구", 2, Pollutant::Pm25, Some(20.0)),
            m("서울특별시", "중구", 1, Pollutant::Pm10, Some(30.0)),
            m("서울특별시", "중구", 2, Pollutant::Pm10, None),
            m("서울특별시", "종로구", 1, Pollutant::Pm25, Some(30.0)),
            m("부산광역시", "중구", 1, Pollutant::Pm25, Some(40.0)),
            m("부산광역시", "중구", 2, Pollutant::Pm25, Some(12.34)),
        ])
    }

    #[test]
    fn listings_are_sorted_and_distinct() {
        let t = table();
        assert_eq!(provinces(&t), vec!["부산광역시", "서울특별시"]);
        assert_eq!(cities(&t, "서울특별시"), vec!["종로구", "중구"]);
        assert_eq!(pollutants(&t), vec![Pollutant::Pm25, Pollutant::Pm10]);
        assert_eq!(months(&t).len(), 2);
        assert_eq!(latest_month(&t), Month::new(2024, 2));
    }

    #[test]
    fn city_summary_fixed_threshold() {
        let t = table();
        let sel = Selection::city("서울특별시", "중구");
        let summary = city_summary(&t, &sel, ScoringStrategy::FixedThreshold).unwrap();
        // PM2.5 mean 15 -> 70, PM10 mean 30 (Feb missing) -> 55.
        assert_eq!(summary.sub_scores[&Pollutant::Pm25], 70.0);
        assert_eq!(summary.sub_scores[&Pollutant::Pm10], 55.0);
        assert_eq!(summary.score, 62.5);
        assert_eq!(summary.band, ScoreBand::Moderate);
        assert_eq!(summary.latest_month, Month::new(2024, 2).unwrap());
        assert_eq!(summary.latest[&Pollutant::Pm10], None);
    }

    #[test]
    fn city_summary_relative_uses_all_months() {
        let t = table();
        let sel = Selection::city("서울특별시", "중구").with_pollutants([Pollutant::Pm10]);
        let summary = city_summary(&t, &sel, ScoringStrategy::Relative).unwrap();
        // The only PM10 value nationally is this city's, so it matches the baseline.
        assert_eq!(summary.score, 50.0);
    }

    #[test]
    fn empty_pollutant_selection_is_an_error() {
        let sel = Selection::city("서울특별시", "중구").with_pollutants(Vec::new());
        assert!(matches!(
            city_summary(&table(), &sel, ScoringStrategy::FixedThreshold),
            Err(Error::NoPollutantsSelected)
        ));
    }

    #[test]
    fn unknown_city_has_no_data() {
        let sel = Selection::city("서울특별시", "없는구");
        assert!(matches!(
            city_summary(&table(), &sel, ScoringStrategy::FixedThreshold),
            Err(Error::NoMatchingData(_))
        ));
    }

    #[test]
    fn pivot_rounds_to_one_decimal() {
        let t = table();
        let sel = Selection {
            province: Some("부산광역시".into()),
            ..Selection::default()
        };
        let records = filter(&t, &sel);
        let pivot = pivot_by_month(&records);
        assert_eq!(pivot.len(), 2);
        assert_eq!(pivot[1].1[&Pollutant::Pm25], Some(12.3));
    }

    #[test]
    fn series_is_month_ordered() {
        let mut records = table().records().to_vec();
        records.reverse();
        let t = TidyTable::new(records);
        let recs = filter(&t, &Selection::city("서울특별시", "중구"));
        let s = series(&recs, Pollutant::Pm25);
        assert_eq!(
            s,
            vec![
                (Month::new(2024, 1).unwrap(), Some(10.0)),
                (Month::new(2024, 2).unwrap(), Some(20.0)),
            ]
        );
    }
}
