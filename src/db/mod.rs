//! Database module - SQLite storage for workouts, meals and body-weight entries

use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ml::series::Observation;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One logged workout row: `sets` sets of `reps` at `weight`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub exercise: String,
    pub sets: i32,
    pub reps: i32,
    pub weight: f64,
    pub notes: Option<String>,
}

impl WorkoutSet {
    /// Training volume: sets × reps × weight
    pub fn volume(&self) -> f64 {
        self.sets as f64 * self.reps as f64 * self.weight
    }
}

/// Body-weight entry, one per date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: NaiveDate,
    pub weight: f64,
    pub goal: Option<f64>,
}

/// One logged meal with its macros, grams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub notes: Option<String>,
}

/// Calorie and macro totals for one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyNutrition {
    pub date: NaiveDate,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub meals: usize,
}

/// Tables that can be wiped in one go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Workouts,
    Meals,
    BodyWeights,
}

impl Table {
    fn name(&self) -> &'static str {
        match self {
            Table::Workouts => "workouts",
            Table::Meals => "meals",
            Table::BodyWeights => "body_weights",
        }
    }
}

impl From<&WeightEntry> for Observation {
    fn from(entry: &WeightEntry) -> Self {
        Observation::new(entry.date, entry.weight)
    }
}

fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        info!(path, "opened database");
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Throwaway database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let db = Self { conn: Connection::open_in_memory()? };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS workouts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                exercise TEXT NOT NULL,
                sets INTEGER NOT NULL,
                reps INTEGER NOT NULL,
                weight REAL NOT NULL,
                notes TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS meals (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                calories REAL NOT NULL,
                protein_g REAL NOT NULL DEFAULT 0,
                carbs_g REAL NOT NULL DEFAULT 0,
                fat_g REAL NOT NULL DEFAULT 0,
                notes TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS body_weights (
                date TEXT PRIMARY KEY,
                weight REAL NOT NULL
            )",
            [],
        )?;

        // Migration: add goal column if missing
        let has_goal: bool = self.conn
            .prepare("SELECT goal FROM body_weights LIMIT 1")
            .is_ok();
        if !has_goal {
            debug!("adding goal column to body_weights");
            self.conn.execute("ALTER TABLE body_weights ADD COLUMN goal REAL", [])?;
        }

        Ok(())
    }

    /// Add new workout row
    pub fn add_workout(&self, workout: &WorkoutSet) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO workouts (date, exercise, sets, reps, weight, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format_date(workout.date),
                workout.exercise,
                workout.sets,
                workout.reps,
                workout.weight,
                workout.notes,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, exercise = %workout.exercise, "workout added");
        Ok(id)
    }

    /// All workouts, oldest first
    pub fn get_workouts(&self) -> Result<Vec<WorkoutSet>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, exercise, sets, reps, weight, notes FROM workouts
             ORDER BY date ASC, id ASC",
        )?;

        let workouts = stmt.query_map([], |row| {
            let date_str: String = row.get(1)?;
            Ok(WorkoutSet {
                id: Some(row.get(0)?),
                date: parse_date(1, &date_str)?,
                exercise: row.get(2)?,
                sets: row.get(3)?,
                reps: row.get(4)?,
                weight: row.get(5)?,
                notes: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

        Ok(workouts)
    }

    /// Delete a workout row; false when no such id
    pub fn delete_workout(&self, id: i64) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM workouts WHERE id = ?1", params![id])?;
        debug!(id, removed, "workout delete");
        Ok(removed > 0)
    }

    /// Add a meal, returns its id
    pub fn add_meal(&self, meal: &Meal) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO meals (date, calories, protein_g, carbs_g, fat_g, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                format_date(meal.date),
                meal.calories,
                meal.protein_g,
                meal.carbs_g,
                meal.fat_g,
                meal.notes,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, calories = meal.calories, "meal added");
        Ok(id)
    }

    /// All meals, oldest first
    pub fn get_meals(&self) -> Result<Vec<Meal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, calories, protein_g, carbs_g, fat_g, notes FROM meals
             ORDER BY date ASC, id ASC",
        )?;

        let meals = stmt.query_map([], |row| {
            let date_str: String = row.get(1)?;
            Ok(Meal {
                id: Some(row.get(0)?),
                date: parse_date(1, &date_str)?,
                calories: row.get(2)?,
                protein_g: row.get(3)?,
                carbs_g: row.get(4)?,
                fat_g: row.get(5)?,
                notes: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

        Ok(meals)
    }

    /// Delete a meal; false when no such id
    pub fn delete_meal(&self, id: i64) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM meals WHERE id = ?1", params![id])?;
        debug!(id, removed, "meal delete");
        Ok(removed > 0)
    }

    /// Per-day calorie and macro totals, oldest first; only `date` when given
    pub fn daily_nutrition(&self, date: Option<NaiveDate>) -> Result<Vec<DailyNutrition>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, SUM(calories), SUM(protein_g), SUM(carbs_g), SUM(fat_g), COUNT(*)
             FROM meals
             WHERE ?1 IS NULL OR date = ?1
             GROUP BY date
             ORDER BY date ASC",
        )?;

        let days = stmt.query_map(params![date.map(format_date)], |row| {
            let date_str: String = row.get(0)?;
            let meals: i64 = row.get(5)?;
            Ok(DailyNutrition {
                date: parse_date(0, &date_str)?,
                calories: row.get(1)?,
                protein_g: row.get(2)?,
                carbs_g: row.get(3)?,
                fat_g: row.get(4)?,
                meals: meals as usize,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

        Ok(days)
    }

    /// Insert or replace the entry for `entry.date`.
    ///
    /// A missing goal keeps the goal already stored for that date.
    pub fn upsert_weight(&self, entry: &WeightEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO body_weights (date, weight, goal) VALUES (?1, ?2, ?3)
             ON CONFLICT(date) DO UPDATE SET
                weight = excluded.weight,
                goal = COALESCE(excluded.goal, goal)",
            params![format_date(entry.date), entry.weight, entry.goal],
        )?;
        debug!(date = %entry.date, weight = entry.weight, "body weight upserted");
        Ok(())
    }

    /// Entry for one date
    pub fn get_weight(&self, date: NaiveDate) -> Result<Option<WeightEntry>> {
        let entry = self.conn
            .query_row(
                "SELECT date, weight, goal FROM body_weights WHERE date = ?1",
                params![format_date(date)],
                |row| {
                    let date_str: String = row.get(0)?;
                    Ok(WeightEntry {
                        date: parse_date(0, &date_str)?,
                        weight: row.get(1)?,
                        goal: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// All body-weight entries, oldest first
    pub fn get_weights(&self) -> Result<Vec<WeightEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, weight, goal FROM body_weights ORDER BY date ASC"
        )?;

        let entries = stmt.query_map([], |row| {
            let date_str: String = row.get(0)?;
            Ok(WeightEntry {
                date: parse_date(0, &date_str)?,
                weight: row.get(1)?,
                goal: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Delete the entry for a date; false when there was none
    pub fn delete_weight(&self, date: NaiveDate) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM body_weights WHERE date = ?1",
            params![format_date(date)],
        )?;
        debug!(date = %date, removed, "body weight delete");
        Ok(removed > 0)
    }

    /// Delete every row of a table, returns how many were removed
    pub fn clear(&self, table: Table) -> Result<usize> {
        let removed = self.conn.execute(&format!("DELETE FROM {}", table.name()), [])?;
        info!(table = table.name(), removed, "table cleared");
        Ok(removed)
    }
}
