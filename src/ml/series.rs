//! Observation series and the per-session top-set reduction

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ForecastError;
use crate::db::WorkoutSet;

/// A single dated value (body-weight entry or session top 1RM)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Chronological series with unique dates and finite values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: Vec<Observation>,
}

impl Series {
    /// Build a series from unordered observations.
    ///
    /// Non-finite values are dropped; for duplicate dates the last one supplied wins.
    pub fn new(observations: impl IntoIterator<Item = Observation>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for obs in observations {
            if obs.value.is_finite() {
                by_date.insert(obs.date, obs.value);
            }
        }

        Self {
            points: by_date
                .into_iter()
                .map(|(date, value)| Observation { date, value })
                .collect(),
        }
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<Observation> for Series {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Series::new(iter)
    }
}

/// Estimated one-rep max: `weight × (1 + reps/30)`
pub fn one_rep_max(weight: f64, reps: i32) -> Result<f64, ForecastError> {
    if reps <= 0 {
        return Err(ForecastError::invalid(
            "reps",
            format!("must be positive, got {}", reps),
        ));
    }
    if !weight.is_finite() || weight < 0.0 {
        return Err(ForecastError::invalid(
            "weight",
            format!("must be a non-negative number, got {}", weight),
        ));
    }
    Ok(weight * (1.0 + reps as f64 / 30.0))
}

/// Reduce raw set entries for one exercise to a series of per-session best 1RM estimates.
///
/// Sets with invalid reps or weight are skipped.
pub fn top_set_series(sets: &[WorkoutSet], exercise: &str) -> Series {
    let mut best: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    let exercise = exercise.trim();
    for set in sets.iter().filter(|s| s.exercise.trim().eq_ignore_ascii_case(exercise)) {
        match one_rep_max(set.weight, set.reps) {
            Ok(estimate) => {
                let entry = best.entry(set.date).or_insert(estimate);
                if estimate > *entry {
                    *entry = estimate;
                }
            }
            Err(e) => warn!(exercise, date = %set.date, "skipping set: {}", e),
        }
    }

    best.into_iter()
        .map(|(date, value)| Observation { date, value })
        .collect()
}

/// Weeks elapsed between two dates, fractional
pub fn weeks_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / 7.0
}
