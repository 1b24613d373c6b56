//! fittrend - Personal strength and body-weight tracker
//!
//! Logs workouts and weigh-ins, then projects where they are heading.

pub mod config;
pub mod db;
pub mod demo;
pub mod exercises;
pub mod ml;

pub use config::ForecastConfig;
pub use db::Database;
