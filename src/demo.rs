//! Synthetic history for trying the forecasts without months of logging

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::db::{Database, WeightEntry, WorkoutSet};

/// Lifts and their starting working weights
const DEMO_LIFTS: &[(&str, f64)] = &[
    ("Bench Press", 80.0),
    ("Back Squat", 110.0),
    ("Overhead Press", 50.0),
    ("Barbell Row", 70.0),
];

const START_WEIGHT_LBS: f64 = 186.0;
const DAILY_DRIFT_LBS: f64 = -0.08;

/// Roughly one day in seven has no weigh-in
fn skip_day(rng: &mut StdRng) -> bool {
    rng.gen_range(0..7) == 0
}

/// Daily weigh-ins over `days` ending at `end`, drifting down with noise
pub fn demo_weights(rng: &mut StdRng, end: NaiveDate, days: i64) -> Vec<WeightEntry> {
    let start = end - Duration::days(days - 1);
    (0..days)
        .filter_map(|i| {
            if skip_day(rng) {
                return None;
            }
            let noise: f64 = rng.gen_range(-0.9..0.9);
            let weight = START_WEIGHT_LBS + DAILY_DRIFT_LBS * i as f64 + noise;
            Some(WeightEntry {
                date: start + Duration::days(i),
                weight: (weight * 10.0).round() / 10.0,
                goal: (i == 0).then_some(170.0),
            })
        })
        .collect()
}

/// Monday/Wednesday/Friday sessions, ~1.25 kg per week progression per lift
pub fn demo_workouts(rng: &mut StdRng, end: NaiveDate, days: i64) -> Vec<WorkoutSet> {
    let start = end - Duration::days(days - 1);
    let mut workouts = Vec::new();

    for i in 0..days {
        let date = start + Duration::days(i);
        if !matches!(date.weekday(), Weekday::Mon | Weekday::Wed | Weekday::Fri) {
            continue;
        }
        let weeks = i as f64 / 7.0;

        for (exercise, base) in DEMO_LIFTS {
            let bad_day: f64 = rng.gen_range(-2.5..2.5);
            let weight = base + 1.25 * weeks + bad_day;
            // Nearest 2.5 kg plate jump
            let weight = (weight / 2.5).round() * 2.5;

            workouts.push(WorkoutSet {
                id: None,
                date,
                exercise: exercise.to_string(),
                sets: 3,
                reps: rng.gen_range(4..=6),
                weight,
                notes: None,
            });
        }
    }

    workouts
}

/// Insert demo history; `seed` makes it reproducible. Returns (weights, workouts) inserted.
pub fn seed_database(
    db: &Database,
    end: NaiveDate,
    days: i64,
    seed: Option<u64>,
) -> Result<(usize, usize)> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let weights = demo_weights(&mut rng, end, days);
    for entry in &weights {
        db.upsert_weight(entry)?;
    }

    let workouts = demo_workouts(&mut rng, end, days);
    for workout in &workouts {
        db.add_workout(workout)?;
    }

    info!(weights = weights.len(), workouts = workouts.len(), "seeded demo data");
    Ok((weights.len(), workouts.len()))
}
