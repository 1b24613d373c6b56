//! ML module - Training analytics and trend forecasts
//!
//! Features:
//! - Series cleaning (IQR outliers, moving-average smoothing)
//! - Trend models: weighted/polynomial regression (linfa), Holt smoothing, rate projection
//! - Horizon-widening confidence bands
//! - Strength and body-weight forecasts
//! - Volume, personal best and frequency stats

pub mod cleaner;
pub mod error;
pub mod forecast;
pub mod series;
pub mod trend;
pub mod uncertainty;

pub use error::ForecastError;
pub use forecast::{ForecastMode, ForecastParameters, ForecastPoint, ForecastResult, Forecaster};
pub use series::{one_rep_max, Observation, Series};
pub use trend::TrendModel;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::db::{WeightEntry, WorkoutSet};
use crate::exercises::canonical_name;

/// Case-insensitive grouping key plus the name to show for it
fn exercise_key(name: &str) -> (String, String) {
    let display = canonical_name(name);
    (display.to_lowercase(), display)
}

/// Volume for one exercise in one ISO week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyVolume {
    pub year: i32,
    pub week: u32,
    pub exercise: String,
    pub volume: f64,
    pub sessions: usize,
}

/// Heaviest estimated 1RM ever logged for an exercise
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalBest {
    pub exercise: String,
    pub date: NaiveDate,
    pub weight: f64,
    pub reps: i32,
    pub one_rep_max: f64,
}

/// Start/current/goal summary of body-weight entries
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightStats {
    pub start: f64,
    pub current: f64,
    pub delta: f64,
    pub goal: Option<f64>,
}

impl WeightStats {
    /// None when there are no entries
    pub fn from_entries(entries: &[WeightEntry]) -> Option<Self> {
        let mut sorted: Vec<&WeightEntry> = entries.iter().collect();
        sorted.sort_by_key(|e| e.date);

        let start = sorted.first()?.weight;
        let current = sorted.last()?.weight;
        let goal = sorted.iter().rev().find_map(|e| e.goal);

        Some(Self { start, current, delta: current - start, goal })
    }
}

/// Training analytics
pub struct Analytics {
    workouts: Vec<WorkoutSet>,
}

impl Analytics {
    pub fn new(workouts: Vec<WorkoutSet>) -> Self {
        Self { workouts }
    }

    fn matching<'a>(&'a self, exercise: &'a str) -> impl Iterator<Item = &'a WorkoutSet> + 'a {
        let exercise = exercise.trim();
        self.workouts
            .iter()
            .filter(move |w| w.exercise.trim().eq_ignore_ascii_case(exercise))
    }

    /// Total volume (sets × reps × weight) for an exercise
    pub fn total_volume(&self, exercise: &str) -> f64 {
        self.matching(exercise).map(WorkoutSet::volume).sum()
    }

    /// Heaviest weight lifted per session date for an exercise, oldest first
    pub fn progression(&self, exercise: &str) -> Vec<Observation> {
        let mut top: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for w in self.matching(exercise) {
            let entry = top.entry(w.date).or_insert(w.weight);
            *entry = entry.max(w.weight);
        }
        top.into_iter()
            .map(|(date, weight)| Observation::new(date, weight))
            .collect()
    }

    /// Volume and session count per ISO week and exercise, oldest first
    pub fn weekly_volume(&self) -> Vec<WeeklyVolume> {
        type Week = (String, f64, BTreeSet<NaiveDate>);
        let mut weeks: BTreeMap<(i32, u32, String), Week> = BTreeMap::new();

        for w in &self.workouts {
            let iso = w.date.iso_week();
            let (key, display) = exercise_key(&w.exercise);
            let entry = weeks
                .entry((iso.year(), iso.week(), key))
                .or_insert_with(|| (display, 0.0, BTreeSet::new()));
            entry.1 += w.volume();
            entry.2.insert(w.date);
        }

        weeks
            .into_iter()
            .map(|((year, week, _), (exercise, volume, dates))| WeeklyVolume {
                year,
                week,
                exercise,
                volume,
                sessions: dates.len(),
            })
            .collect()
    }

    /// Best estimated 1RM per exercise, sorted by exercise name
    pub fn personal_bests(&self) -> Vec<PersonalBest> {
        let mut bests: BTreeMap<String, PersonalBest> = BTreeMap::new();

        for w in &self.workouts {
            let Ok(estimate) = one_rep_max(w.weight, w.reps) else {
                continue;
            };
            let (key, display) = exercise_key(&w.exercise);
            let is_better = bests
                .get(&key)
                .is_none_or(|pb| estimate > pb.one_rep_max);
            if is_better {
                bests.insert(key, PersonalBest {
                    exercise: display,
                    date: w.date,
                    weight: w.weight,
                    reps: w.reps,
                    one_rep_max: estimate,
                });
            }
        }

        bests.into_values().collect()
    }

    /// Distinct exercise names ignoring case, sorted
    pub fn exercises(&self) -> Vec<String> {
        let mut names: BTreeMap<String, String> = BTreeMap::new();
        for w in &self.workouts {
            let (key, display) = exercise_key(&w.exercise);
            names.entry(key).or_insert(display);
        }
        names.into_values().collect()
    }

    /// Get training frequency (sessions per week)
    pub fn weekly_frequency(&self) -> f64 {
        let dates: BTreeSet<NaiveDate> = self.workouts.iter().map(|w| w.date).collect();
        let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
            return 0.0;
        };
        if dates.len() < 2 {
            return 0.0;
        }

        let days = (*last - *first).num_days() as f64;
        (dates.len() as f64 / days) * 7.0
    }
}
