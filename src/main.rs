//! fittrend - Personal strength and body-weight tracker
//!
//! Log sets, meals and weigh-ins, then ask where they are heading.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::task::JoinSet;
use tracing::{info, warn};

use fittrend::config::ForecastConfig;
use fittrend::db::{Database, Meal, Table, WeightEntry, WorkoutSet};
use fittrend::demo::seed_database;
use fittrend::exercises::{canonical_name, exercises_in, find_exercise_by_name, MuscleGroup};
use fittrend::ml::forecast::{
    DEFAULT_SMOOTH_DAYS, DEFAULT_STRENGTH_HORIZON, DEFAULT_WEIGHT_HORIZON,
};
use fittrend::ml::{
    Analytics, ForecastMode, ForecastParameters, ForecastResult, Forecaster, Observation, Series,
    WeightStats,
};

const DB_PATH: &str = "fittrend.db";

#[derive(Parser)]
#[command(name = "fittrend")]
#[command(author, version, about = "Personal strength and body-weight tracker with forecasts")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "FITTREND_DB", default_value = DB_PATH)]
    db: String,

    /// JSON file overriding forecast tunables
    #[arg(long, global = true, env = "FITTREND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Record kinds the `reset` command can wipe
#[derive(Clone, Copy, ValueEnum)]
enum ResetTarget {
    Workouts,
    Meals,
    Weights,
}

impl From<ResetTarget> for Table {
    fn from(target: ResetTarget) -> Self {
        match target {
            ResetTarget::Workouts => Table::Workouts,
            ResetTarget::Meals => Table::Meals,
            ResetTarget::Weights => Table::BodyWeights,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Log a working set
    LogSet {
        /// Exercise name (e.g., "Bench Press")
        exercise: String,

        /// Weight lifted
        #[arg(short, long)]
        weight: f64,

        /// Reps per set
        #[arg(short, long, default_value = "5")]
        reps: i32,

        /// Number of sets at this weight
        #[arg(short, long, default_value = "1")]
        sets: i32,

        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Optional notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Log body weight (replaces any entry for the same date)
    LogWeight {
        /// Body weight
        weight: f64,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Goal weight
        #[arg(short, long)]
        goal: Option<f64>,
    },

    /// Log a meal
    LogMeal {
        /// Calories
        calories: f64,

        /// Protein, grams
        #[arg(short, long, default_value = "0")]
        protein: f64,

        /// Carbohydrates, grams
        #[arg(short, long, default_value = "0")]
        carbs: f64,

        /// Fat, grams
        #[arg(short, long, default_value = "0")]
        fat: f64,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Optional notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete a logged set by id
    DeleteSet { id: i64 },

    /// Delete a logged meal by id
    DeleteMeal { id: i64 },

    /// Delete the body-weight entry for a date
    DeleteWeight { date: NaiveDate },

    /// List workout history
    List {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Daily calorie and macro totals
    Meals {
        /// Only this date (YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// List body-weight history
    Weights {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show training statistics
    Stats {
        /// Filter by exercise name
        exercise: Option<String>,
    },

    /// Show the exercise catalog
    Exercises,

    /// Heaviest weight per session for an exercise
    Progression {
        exercise: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Forecast estimated 1RM for an exercise
    ForecastStrength {
        exercise: String,

        /// Weeks to project
        #[arg(long, default_value_t = DEFAULT_STRENGTH_HORIZON, allow_negative_numbers = true)]
        horizon: i64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Forecast body weight
    ForecastWeight {
        /// `plan` (fixed weekly rate) or `calorie` (follow the recent trend)
        #[arg(short, long, default_value = "plan")]
        mode: String,

        /// Weekly rate of change in percent, plan mode only (-2.0 to 1.5)
        #[arg(short, long, allow_negative_numbers = true)]
        target_rate_pct: Option<f64>,

        /// Weeks to project
        #[arg(long, default_value_t = DEFAULT_WEIGHT_HORIZON, allow_negative_numbers = true)]
        horizon: i64,

        /// Smoothing window in days (3 to 14)
        #[arg(short, long, default_value_t = DEFAULT_SMOOTH_DAYS)]
        smooth_days: i64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Forecast every logged exercise
    Progress {
        /// Weeks to project
        #[arg(long, default_value_t = DEFAULT_STRENGTH_HORIZON)]
        horizon: i64,
    },

    /// Delete every record of one kind
    Reset {
        #[arg(value_enum)]
        target: ResetTarget,

        /// Required, there is no undo
        #[arg(long)]
        yes: bool,
    },

    /// Fill the database with synthetic history
    Seed {
        /// Days of history ending today
        #[arg(long, default_value = "120")]
        days: i64,

        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_forecast(result: &ForecastResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if let Some(model) = result.model {
        println!("Model: {}", model.name());
    }
    println!("{:-<52}", "");
    for (label, points) in [("actual", &result.actual), ("forecast", &result.forecast)] {
        for p in points {
            match (p.lower, p.upper) {
                (Some(lower), Some(upper)) => println!(
                    "{} | {:8} | {:8.1} | {:8.1} .. {:8.1}",
                    p.date, label, p.value, lower, upper
                ),
                _ => println!("{} | {:8} | {:8.1}", p.date, label, p.value),
            }
        }
    }

    if result.is_insufficient() {
        println!("Not enough data to forecast");
    }
    Ok(())
}

/// One strength forecast per exercise, computed on the blocking pool
async fn forecast_all(
    forecaster: Arc<Forecaster>,
    workouts: Arc<Vec<WorkoutSet>>,
    exercises: Vec<String>,
    params: ForecastParameters,
) -> Result<Vec<(String, ForecastResult)>> {
    let mut tasks = JoinSet::new();
    for exercise in exercises {
        let forecaster = Arc::clone(&forecaster);
        let workouts = Arc::clone(&workouts);
        tasks.spawn_blocking(move || {
            let result = forecaster.forecast_strength(&workouts, &exercise, &params);
            (exercise, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        results.push(joined?);
    }
    results.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(results)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let db = Database::open(&cli.db)?;

    let config = match &cli.config {
        Some(path) => ForecastConfig::load(path)?,
        None => ForecastConfig::default(),
    };
    let forecaster = Forecaster::new(config)?;

    match cli.command {
        Commands::LogSet { exercise, weight, reps, sets, date, notes } => {
            if reps <= 0 || sets <= 0 {
                bail!("reps and sets must be positive");
            }
            if !weight.is_finite() || weight < 0.0 {
                bail!("weight must be a non-negative number");
            }
            if find_exercise_by_name(&exercise).is_none() {
                warn!(exercise = %exercise, "exercise not in catalog, logging as typed");
            }
            let name = canonical_name(&exercise);
            let workout = WorkoutSet {
                id: None,
                date: date.unwrap_or_else(today),
                exercise: name.clone(),
                sets,
                reps,
                weight,
                notes,
            };
            let id = db.add_workout(&workout)?;
            println!("Logged: {} - {}x{} @ {} (id: {})", name, sets, reps, weight, id);
        }

        Commands::LogWeight { weight, date, goal } => {
            if !weight.is_finite() || weight <= 0.0 {
                bail!("weight must be a positive number");
            }
            let entry = WeightEntry { date: date.unwrap_or_else(today), weight, goal };
            db.upsert_weight(&entry)?;
            println!("Logged weight {} on {}", weight, entry.date);
        }

        Commands::LogMeal { calories, protein, carbs, fat, date, notes } => {
            if [calories, protein, carbs, fat].iter().any(|v| !v.is_finite() || *v < 0.0) {
                bail!("calories and macros must be non-negative numbers");
            }
            let meal = Meal {
                id: None,
                date: date.unwrap_or_else(today),
                calories,
                protein_g: protein,
                carbs_g: carbs,
                fat_g: fat,
                notes,
            };
            let id = db.add_meal(&meal)?;
            println!("Logged meal: {:.0} kcal on {} (id: {})", calories, meal.date, id);
        }

        Commands::DeleteMeal { id } => {
            if db.delete_meal(id)? {
                println!("Deleted meal {}", id);
            } else {
                println!("No meal with id {}", id);
            }
        }

        Commands::DeleteSet { id } => {
            if db.delete_workout(id)? {
                println!("Deleted set {}", id);
            } else {
                println!("No set with id {}", id);
            }
        }

        Commands::DeleteWeight { date } => {
            if db.delete_weight(date)? {
                println!("Deleted weight entry for {}", date);
            } else {
                println!("No weight entry for {}", date);
            }
        }

        Commands::List { limit } => {
            let workouts = db.get_workouts()?;
            println!("Recent workouts:");
            println!("{:-<70}", "");
            for w in workouts.iter().rev().take(limit) {
                println!(
                    "{:>5} | {} | {:24} | {}x{} @ {:6.1} | {}",
                    w.id.unwrap_or_default(),
                    w.date,
                    w.exercise,
                    w.sets,
                    w.reps,
                    w.weight,
                    w.notes.as_deref().unwrap_or("-")
                );
            }
        }

        Commands::Meals { date } => {
            let days = db.daily_nutrition(date)?;
            if days.is_empty() {
                println!("No meals logged");
            }
            println!(
                "{:10} | {:>7} | {:>7} | {:>7} | {:>7} | meals",
                "date", "kcal", "protein", "carbs", "fat"
            );
            println!("{:-<62}", "");
            for d in days {
                println!(
                    "{} | {:7.0} | {:7.1} | {:7.1} | {:7.1} | {}",
                    d.date, d.calories, d.protein_g, d.carbs_g, d.fat_g, d.meals
                );
            }
        }

        Commands::Weights { limit } => {
            let entries = db.get_weights()?;
            println!("Recent weigh-ins:");
            println!("{:-<40}", "");
            for e in entries.iter().rev().take(limit) {
                let goal = e.goal.map(|g| format!("{:.1}", g)).unwrap_or_else(|| "-".to_string());
                println!("{} | {:6.1} | goal {}", e.date, e.weight, goal);
            }
        }

        Commands::Stats { exercise } => {
            let analytics = Analytics::new(db.get_workouts()?);

            println!("Training Statistics");
            println!("{:-<40}", "");

            if let Some(ex) = exercise {
                println!("Exercise: {}", ex);
                println!("Total volume: {:.0}", analytics.total_volume(&ex));
                if let Some(pb) = analytics
                    .personal_bests()
                    .into_iter()
                    .find(|pb| pb.exercise.eq_ignore_ascii_case(&ex))
                {
                    println!(
                        "Best e1RM: {:.1} ({}x{} on {})",
                        pb.one_rep_max, pb.weight, pb.reps, pb.date
                    );
                }
            } else {
                println!("Weekly frequency: {:.1} sessions/week", analytics.weekly_frequency());
                for pb in analytics.personal_bests() {
                    println!("{:24} e1RM {:6.1} on {}", pb.exercise, pb.one_rep_max, pb.date);
                }
                if let Some(week) = analytics.weekly_volume().last() {
                    println!("Latest week: {}-W{:02}", week.year, week.week);
                }
                if let Some(stats) = WeightStats::from_entries(&db.get_weights()?) {
                    println!(
                        "Body weight: {:.1} -> {:.1} ({:+.1})",
                        stats.start, stats.current, stats.delta
                    );
                    if let Some(goal) = stats.goal {
                        println!("Goal: {:.1}", goal);
                    }
                }
            }
        }

        Commands::Exercises => {
            for group in MuscleGroup::all() {
                let names: Vec<&str> = exercises_in(*group).map(|e| e.name).collect();
                println!("{:10} {}", group.name(), names.join(", "));
            }
        }

        Commands::Progression { exercise, json } => {
            let progression = Analytics::new(db.get_workouts()?).progression(&exercise);
            if json {
                println!("{}", serde_json::to_string_pretty(&progression)?);
            } else if progression.is_empty() {
                println!("No sessions logged for {}", exercise);
            } else {
                for p in &progression {
                    println!("{} | {:6.1}", p.date, p.value);
                }
            }
        }

        Commands::ForecastStrength { exercise, horizon, json } => {
            let params = ForecastParameters::strength(horizon)?;
            let workouts = db.get_workouts()?;
            let result = forecaster.forecast_strength(&workouts, &exercise, &params);
            print_forecast(&result, json)?;
        }

        Commands::ForecastWeight { mode, target_rate_pct, horizon, smooth_days, json } => {
            let mode = ForecastMode::from_weight_request(&mode)?;
            let params = ForecastParameters::weight(horizon, smooth_days, target_rate_pct)?;
            let series: Series = db.get_weights()?.iter().map(Observation::from).collect();
            let result = forecaster.forecast(&series, mode, &params);
            print_forecast(&result, json)?;
        }

        Commands::Progress { horizon } => {
            let params = ForecastParameters::strength(horizon)?;
            let workouts = db.get_workouts()?;
            let exercises = Analytics::new(workouts.clone()).exercises();
            info!(count = exercises.len(), "forecasting all exercises");

            let forecaster = Arc::new(forecaster);
            let results = forecast_all(forecaster, Arc::new(workouts), exercises, params).await?;
            println!("{:24} | {:>8} | {:>8} | {:>8}", "exercise", "now", "forecast", "change");
            println!("{:-<58}", "");
            for (exercise, result) in results {
                match (result.actual.last(), result.forecast.last()) {
                    (Some(now), Some(then)) => println!(
                        "{:24} | {:8.1} | {:8.1} | {:+8.1}",
                        exercise, now.value, then.value, then.value - now.value
                    ),
                    _ => println!("{:24} | not enough data to forecast", exercise),
                }
            }
        }

        Commands::Reset { target, yes } => {
            if !yes {
                bail!("reset deletes every record of that kind; pass --yes to confirm");
            }
            let removed = db.clear(target.into())?;
            println!("Removed {} rows", removed);
        }

        Commands::Seed { days, seed } => {
            if days < 14 {
                bail!("seed needs at least 14 days");
            }
            let (weights, workouts) = seed_database(&db, today(), days, seed)?;
            println!("Seeded {} weigh-ins and {} workout rows into {}", weights, workouts, cli.db);
        }
    }

    Ok(())
}
