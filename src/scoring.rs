//! Pollutant sub-scores and the overall air-quality score.
//!
//! Two normalizations coexist in the dashboards and are kept side by side as
//! [`ScoringStrategy`] variants:
//!
//! | Strategy          | Sub-score                                        |
//! |-------------------|--------------------------------------------------|
//! | `fixed-threshold` | `max(0, 100 - avg * weight)`                     |
//! | `relative`        | `clamp(50 + 50 * (national - city) / national)`  |
//!
//! The overall score is the plain mean of the sub-scores.

use crate::error::{Error, Result};
use crate::regions;
use crate::types::{Measurement, Month, Pollutant, RegionalScore, ScoreBand, TidyTable};
use crate::util::mean_present;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Per-pollutant mean; `None` when every value for that pollutant was missing.
pub type Averages = BTreeMap<Pollutant, Option<f64>>;
pub type SubScores = BTreeMap<Pollutant, f64>;

/// Sub-score given when there is nothing to compare against.
pub const NEUTRAL_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringStrategy {
    #[default]
    FixedThreshold,
    Relative,
}

impl ScoringStrategy {
    /// Sub-scores for `local` averages. `national` is only read by
    /// [`ScoringStrategy::Relative`].
    pub fn sub_scores(&self, local: &Averages, national: &Averages) -> SubScores {
        match self {
            ScoringStrategy::FixedThreshold => {
                let present: BTreeMap<Pollutant, f64> = local
                    .iter()
                    .filter_map(|(p, v)| v.map(|v| (*p, v)))
                    .collect();
                normalize_fixed(&present)
            }
            ScoringStrategy::Relative => normalize_relative(local, national),
        }
    }
}

pub fn fixed_sub_score(pollutant: Pollutant, avg: f64) -> f64 {
    (100.0 - avg * pollutant.fixed_weight()).clamp(0.0, 100.0)
}

/// Fixed-threshold normalization of per-pollutant averages.
pub fn normalize_fixed(avg: &BTreeMap<Pollutant, f64>) -> SubScores {
    avg.iter()
        .map(|(p, v)| (*p, fixed_sub_score(*p, *v)))
        .collect()
}

pub fn relative_sub_score(local: Option<f64>, national: Option<f64>) -> f64 {
    match (local, national) {
        (Some(local), Some(national)) if national.abs() >= f64::EPSILON => {
            let ratio = (national - local) / national;
            (NEUTRAL_SCORE + ratio * 50.0).clamp(0.0, 100.0)
        }
        _ => NEUTRAL_SCORE,
    }
}

/// Relative-to-baseline normalization.
///
/// Every pollutant named by either side gets a sub-score. A missing value on
/// either side, or a baseline of zero, scores exactly [`NEUTRAL_SCORE`].
pub fn normalize_relative(local: &Averages, national: &Averages) -> SubScores {
    let pollutants: BTreeSet<Pollutant> = local.keys().chain(national.keys()).copied().collect();
    pollutants
        .into_iter()
        .map(|p| {
            let l = local.get(&p).copied().flatten();
            let n = national.get(&p).copied().flatten();
            (p, relative_sub_score(l, n))
        })
        .collect()
}

/// Unweighted mean of the sub-scores.
pub fn overall(sub_scores: &SubScores) -> Result<f64> {
    if sub_scores.is_empty() {
        return Err(Error::NoPollutantsSelected);
    }
    Ok(sub_scores.values().sum::<f64>() / sub_scores.len() as f64)
}

/// | Range  | Band      |
/// |--------|-----------|
/// | >= 80  | Very good |
/// | >= 60  | Moderate  |
/// | >= 40  | Poor      |
/// | < 40   | Very poor |
pub fn score_band(score: f64) -> ScoreBand {
    match score {
        s if s >= 80.0 => ScoreBand::VeryGood,
        s if s >= 60.0 => ScoreBand::Moderate,
        s if s >= 40.0 => ScoreBand::Poor,
        _ => ScoreBand::VeryPoor,
    }
}

/// Mean of the present values per pollutant.
pub fn pollutant_averages<'a, I>(records: I) -> Averages
where
    I: IntoIterator<Item = &'a Measurement>,
{
    let mut grouped: BTreeMap<Pollutant, Vec<Option<f64>>> = BTreeMap::new();
    for m in records {
        grouped.entry(m.pollutant).or_default().push(m.value);
    }
    grouped
        .into_iter()
        .map(|(p, values)| (p, mean_present(values)))
        .collect()
}

/// Nationwide per-pollutant averages, over one month or the whole table.
pub fn national_averages(table: &TidyTable, month: Option<Month>) -> Averages {
    pollutant_averages(
        table
            .iter()
            .filter(|m| month.map_or(true, |month| m.month == month)),
    )
}

/// One score per province present in `table` at `month`.
///
/// Provinces are listed in name order. Under the fixed-threshold strategy a
/// province with no present value at that month has nothing to score and is
/// left out (with a warning).
pub fn scores_by_region(
    table: &TidyTable,
    month: Month,
    strategy: ScoringStrategy,
) -> Vec<RegionalScore> {
    let national = national_averages(table, Some(month));

    let mut by_region: BTreeMap<&str, Vec<&Measurement>> = BTreeMap::new();
    for m in table.iter().filter(|m| m.month == month) {
        by_region.entry(m.province.as_str()).or_default().push(m);
    }

    let mut out = Vec::with_capacity(by_region.len());
    for (region, records) in by_region {
        let own = pollutant_averages(records.iter().copied());
        // Compare on the national pollutant set so gaps score as neutral.
        let local: Averages = national
            .keys()
            .map(|p| (*p, own.get(p).copied().flatten()))
            .collect();
        let sub_scores = strategy.sub_scores(&local, &national);
        match overall(&sub_scores) {
            Ok(score) => out.push(RegionalScore {
                region: region.to_string(),
                month,
                score,
                sub_scores,
                coordinates: regions::coordinates(region),
            }),
            Err(err) => warn!(region, %month, error = %err, "Region left unscored"),
        }
    }
    out
}
