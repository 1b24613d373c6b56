//! Forecast orchestration: picks a trend model per mode and assembles actual + forecast
//!
//! Three modes:
//! - strength progression: per-session top 1RM, weighted regression with a
//!   polynomial fallback when the line fits poorly, no bands
//! - weight plan: smoothed body-weight compounded at a user-chosen weekly rate
//! - weight from calories: smoothed body-weight continued by Holt smoothing
//!
//! Every call recomputes from the supplied data; nothing is cached.

use std::ops::RangeInclusive;

use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::cleaner::{clean, CleanedSeries};
use super::error::ForecastError;
use super::series::{top_set_series, Series};
use super::trend::{FittedTrend, TrendModel};
use super::uncertainty::Band;
use crate::config::ForecastConfig;
use crate::db::WorkoutSet;

pub const DEFAULT_STRENGTH_HORIZON: i64 = 8;
pub const DEFAULT_WEIGHT_HORIZON: i64 = 12;
pub const DEFAULT_SMOOTH_DAYS: i64 = 7;

/// Accepted smoothing window, days
pub const SMOOTH_DAYS_RANGE: RangeInclusive<i64> = 3..=14;

/// Accepted weekly rate of body-weight change, percent
pub const TARGET_RATE_RANGE: RangeInclusive<f64> = -2.0..=1.5;

/// Longest accepted horizon, weeks (ten years)
pub const MAX_HORIZON_WEEKS: usize = 520;

/// One forecast period is one week
const DAYS_PER_PERIOD: u64 = 7;

/// Degree of the strength curvature re-fit
const FALLBACK_DEGREE: usize = 2;

/// A quadratic through 3 points interpolates exactly, so the re-fit needs a spare point
const MIN_POINTS_FOR_FALLBACK: usize = FALLBACK_DEGREE + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastMode {
    /// Top estimated 1RM per session for one exercise
    StrengthProgression,
    /// Body-weight compounded at the requested weekly rate
    WeightPlan,
    /// Body-weight following its own smoothed recent trend
    WeightFromCalories,
}

impl ForecastMode {
    /// Parse the body-weight `mode` request parameter (`plan` or `calorie`)
    pub fn from_weight_request(mode: &str) -> Result<Self, ForecastError> {
        match mode.to_ascii_lowercase().as_str() {
            "plan" => Ok(ForecastMode::WeightPlan),
            "calorie" | "calories" => Ok(ForecastMode::WeightFromCalories),
            other => Err(ForecastError::invalid(
                "mode",
                format!("expected `plan` or `calorie`, got `{}`", other),
            )),
        }
    }
}

/// Validated request parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastParameters {
    /// Future periods, in weeks
    pub horizon: usize,
    /// Moving-average window, body-weight modes only
    pub smoothing_window: usize,
    /// Signed weekly rate, plan mode only
    pub target_rate_pct: f64,
}

fn check_horizon(horizon: i64) -> Result<usize, ForecastError> {
    match usize::try_from(horizon) {
        Ok(weeks) if (1..=MAX_HORIZON_WEEKS).contains(&weeks) => Ok(weeks),
        _ => Err(ForecastError::invalid(
            "horizon",
            format!("must be within 1..={}, got {}", MAX_HORIZON_WEEKS, horizon),
        )),
    }
}

impl ForecastParameters {
    /// Parameters for strength progression
    pub fn strength(horizon: i64) -> Result<Self, ForecastError> {
        Ok(Self {
            horizon: check_horizon(horizon)?,
            smoothing_window: 1,
            target_rate_pct: 0.0,
        })
    }

    /// Parameters for body-weight modes; rejects out-of-band values instead of clamping
    pub fn weight(
        horizon: i64,
        smooth_days: i64,
        target_rate_pct: Option<f64>,
    ) -> Result<Self, ForecastError> {
        let horizon = check_horizon(horizon)?;

        if !SMOOTH_DAYS_RANGE.contains(&smooth_days) {
            return Err(ForecastError::invalid(
                "smooth_days",
                format!("must be within {:?}, got {}", SMOOTH_DAYS_RANGE, smooth_days),
            ));
        }

        let rate = target_rate_pct.unwrap_or(0.0);
        if !TARGET_RATE_RANGE.contains(&rate) {
            return Err(ForecastError::invalid(
                "target_rate_pct",
                format!("must be within {:?}, got {}", TARGET_RATE_RANGE, rate),
            ));
        }

        Ok(Self {
            horizon,
            smoothing_window: smooth_days as usize,
            target_rate_pct: rate,
        })
    }

    /// Force values into their accepted ranges, for callers that skipped validation
    fn sanitized(&self) -> Self {
        let rate = if self.target_rate_pct.is_finite() {
            self.target_rate_pct.clamp(*TARGET_RATE_RANGE.start(), *TARGET_RATE_RANGE.end())
        } else {
            0.0
        };
        Self {
            horizon: self.horizon.min(MAX_HORIZON_WEEKS),
            smoothing_window: self
                .smoothing_window
                .clamp(*SMOOTH_DAYS_RANGE.start() as usize, *SMOOTH_DAYS_RANGE.end() as usize),
            target_rate_pct: rate,
        }
    }
}

/// One row of a forecast payload; bands only for body-weight modes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

impl ForecastPoint {
    fn point(date: NaiveDate, value: f64) -> Self {
        Self { date, value, lower: None, upper: None }
    }

    fn banded(date: NaiveDate, value: f64, (lower, upper): (f64, f64)) -> Self {
        Self { date, value, lower: Some(lower), upper: Some(upper) }
    }
}

/// Cleaned history plus future periods
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastResult {
    pub actual: Vec<ForecastPoint>,
    pub forecast: Vec<ForecastPoint>,
    /// Model that produced `forecast`, None when there was not enough data
    #[serde(skip)]
    pub model: Option<TrendModel>,
}

impl ForecastResult {
    /// True when the caller should show "not enough data to forecast"
    pub fn is_insufficient(&self) -> bool {
        self.forecast.is_empty()
    }
}

/// Stateless forecast engine; safe to share across threads
#[derive(Debug, Clone, Default)]
pub struct Forecaster {
    config: ForecastConfig,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Result<Self, ForecastError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Strength forecast straight from raw set entries
    pub fn forecast_strength(
        &self,
        sets: &[WorkoutSet],
        exercise: &str,
        params: &ForecastParameters,
    ) -> ForecastResult {
        let series = top_set_series(sets, exercise);
        debug!(exercise, sessions = series.len(), "reduced sets to session top 1RM");
        self.forecast(&series, ForecastMode::StrengthProgression, params)
    }

    /// Forecast a prepared series. Never fails: too little data yields an empty `forecast`.
    pub fn forecast(
        &self,
        raw: &Series,
        mode: ForecastMode,
        params: &ForecastParameters,
    ) -> ForecastResult {
        let params = params.sanitized();

        match mode {
            ForecastMode::StrengthProgression => self.strength(raw, params.horizon),
            ForecastMode::WeightPlan | ForecastMode::WeightFromCalories => {
                self.body_weight(raw, mode, &params)
            }
        }
    }

    /// Sessions are kept as logged: a bad day is real regression, not noise
    fn strength(&self, raw: &Series, horizon: usize) -> ForecastResult {
        let cleaned = CleanedSeries::unfiltered(raw);
        let fit = self.fit_strength(&cleaned);
        self.strength_result(&cleaned, fit, horizon)
    }

    fn strength_result(
        &self,
        cleaned: &CleanedSeries,
        fit: Result<FittedTrend, ForecastError>,
        horizon: usize,
    ) -> ForecastResult {
        let actual: Vec<ForecastPoint> = cleaned
            .points()
            .iter()
            .map(|p| ForecastPoint::point(p.date, p.value))
            .collect();

        let fitted = match fit {
            Ok(fitted) => fitted,
            Err(e) => match self.recover(cleaned, e) {
                Some(flat) => flat,
                None => return ForecastResult { actual, ..Default::default() },
            },
        };

        let forecast = future_dates(cleaned, fitted.project(horizon))
            .map(|(date, _, value)| ForecastPoint::point(date, value.max(0.0)))
            .collect();

        ForecastResult { actual, forecast, model: Some(fitted.model()) }
    }

    /// Weighted line first; polynomial when the line explains too little variance
    fn fit_strength(&self, cleaned: &CleanedSeries) -> Result<FittedTrend, ForecastError> {
        let primary = TrendModel::WeightedLinear.fit(cleaned)?;
        if cleaned.len() < MIN_POINTS_FOR_FALLBACK || !self.is_poor_fit(&primary, cleaned) {
            return Ok(primary);
        }

        let fallback = TrendModel::Polynomial { degree: FALLBACK_DEGREE };
        match fallback.fit(cleaned) {
            Ok(alt) if alt.sse() < primary.sse() => {
                debug!(
                    primary_sse = primary.sse(),
                    fallback_sse = alt.sse(),
                    "polynomial beats weighted line"
                );
                Ok(alt)
            }
            Ok(_) => Ok(primary),
            Err(e) => {
                warn!("polynomial fallback failed: {}", e);
                Ok(primary)
            }
        }
    }

    fn is_poor_fit(&self, fitted: &FittedTrend, cleaned: &CleanedSeries) -> bool {
        let values = cleaned.values();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        // Flat series: any line fits
        if variance < f64::EPSILON {
            return false;
        }
        fitted.sse() / (n * variance) > self.config.poor_fit_ratio
    }

    fn body_weight(
        &self,
        raw: &Series,
        mode: ForecastMode,
        params: &ForecastParameters,
    ) -> ForecastResult {
        let cleaned = clean(raw, Some(params.smoothing_window));
        let floor = self.config.min_sigma;

        let fit = match mode {
            ForecastMode::WeightPlan => {
                let model = TrendModel::RateProjection { rate_pct: params.target_rate_pct };
                let windows = self.config.volatility_windows;
                model
                    .fit(&cleaned)
                    .map(|fitted| (fitted, Band::from_volatility(&cleaned, windows, floor)))
            }
            _ => {
                let model = TrendModel::HoltLinear {
                    alpha: self.config.holt_alpha,
                    beta: self.config.holt_beta,
                };
                model.fit(&cleaned).map(|fitted| {
                    let band = Band::from_trend(&fitted, floor);
                    (fitted, band)
                })
            }
        };

        self.body_weight_result(&cleaned, fit, params.horizon)
    }

    fn body_weight_result(
        &self,
        cleaned: &CleanedSeries,
        fit: Result<(FittedTrend, Band), ForecastError>,
        horizon: usize,
    ) -> ForecastResult {
        let floor = self.config.min_sigma;
        let (fitted, band) = match fit {
            Ok(pair) => pair,
            Err(e) => match self.recover(cleaned, e) {
                Some(flat) => {
                    let band = Band::from_trend(&flat, floor);
                    (flat, band)
                }
                None => {
                    let actual = banded_actual(cleaned, Band::from_residuals(&[], floor));
                    return ForecastResult { actual, ..Default::default() };
                }
            },
        };

        debug!(model = fitted.model().name(), sigma = band.sigma(), "body-weight forecast");

        let forecast = future_dates(cleaned, fitted.project(horizon))
            .map(|(date, offset, value)| {
                ForecastPoint::banded(date, value, band.bandwidth(value, offset))
            })
            .collect();

        ForecastResult {
            actual: banded_actual(cleaned, band),
            forecast,
            model: Some(fitted.model()),
        }
    }

    /// Insufficient data stays empty; any other fit failure becomes a flat line
    fn recover(&self, cleaned: &CleanedSeries, error: ForecastError) -> Option<FittedTrend> {
        if error.is_insufficient_data() {
            info!(points = cleaned.len(), "not enough data to forecast");
            return None;
        }
        warn!("trend fit failed, projecting flat: {}", error);
        FittedTrend::flat(cleaned)
    }
}

fn banded_actual(cleaned: &CleanedSeries, band: Band) -> Vec<ForecastPoint> {
    cleaned
        .points()
        .iter()
        .map(|p| ForecastPoint::banded(p.date, p.value, band.bandwidth(p.value, 0)))
        .collect()
}

/// Attach calendar dates, 7 days per offset past the last cleaned date.
///
/// Stops early rather than running past the end of the calendar.
fn future_dates(
    cleaned: &CleanedSeries,
    projection: Vec<(usize, f64)>,
) -> impl Iterator<Item = (NaiveDate, usize, f64)> {
    let last = cleaned.last().map(|p| p.date);
    projection.into_iter().map_while(move |(offset, value)| {
        let days = DAYS_PER_PERIOD.checked_mul(u64::try_from(offset).ok()?)?;
        let date = last?.checked_add_days(Days::new(days))?;
        Some((date, offset, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::series::Observation;
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn daily(values: &[f64]) -> Series {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(start() + Duration::days(i as i64), *v))
            .collect()
    }

    fn session(days: i64, weight: f64, reps: i32) -> WorkoutSet {
        WorkoutSet {
            id: None,
            date: start() + Duration::days(days),
            exercise: "Bench Press".to_string(),
            sets: 1,
            reps,
            weight,
            notes: None,
        }
    }

    fn run(series: &Series, mode: ForecastMode, params: &ForecastParameters) -> ForecastResult {
        Forecaster::default().forecast(series, mode, params)
    }

    fn weight_params(horizon: i64, rate: Option<f64>) -> ForecastParameters {
        ForecastParameters::weight(horizon, 7, rate).unwrap()
    }

    #[test]
    fn test_horizon_rejected_when_not_positive() {
        assert!(ForecastParameters::strength(0).is_err());
        assert!(ForecastParameters::weight(-1, 7, None).is_err());
    }

    #[test]
    fn test_rate_out_of_band_rejected() {
        let err = ForecastParameters::weight(12, 7, Some(3.0)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter { name: "target_rate_pct", .. }));
        assert!(ForecastParameters::weight(12, 7, Some(-2.5)).is_err());
        assert!(ForecastParameters::weight(12, 7, Some(1.5)).is_ok());
        assert!(ForecastParameters::weight(12, 7, Some(-2.0)).is_ok());
    }

    #[test]
    fn test_smooth_days_range() {
        assert!(ForecastParameters::weight(12, 2, None).is_err());
        assert!(ForecastParameters::weight(12, 15, None).is_err());
        assert!(ForecastParameters::weight(12, 3, None).is_ok());
        assert!(ForecastParameters::weight(12, 14, None).is_ok());
    }

    #[test]
    fn test_mode_from_request() {
        assert_eq!(ForecastMode::from_weight_request("plan").unwrap(), ForecastMode::WeightPlan);
        assert_eq!(
            ForecastMode::from_weight_request("calorie").unwrap(),
            ForecastMode::WeightFromCalories
        );
        assert!(ForecastMode::from_weight_request("magic").is_err());
    }

    #[test]
    fn test_plan_mode_compounds_from_last_smoothed_value() {
        let series = daily(&[180.0; 10]);
        let result = run(&series, ForecastMode::WeightPlan, &weight_params(2, Some(-1.0)));

        assert_eq!(result.forecast.len(), 2);
        let (week1, week2) = (result.forecast[0].value, result.forecast[1].value);
        assert!((week1 - 178.2).abs() < 1e-9, "Week 1: {}", week1);
        assert!((week2 - 176.418).abs() < 1e-9, "Week 2: {}", week2);
    }

    #[test]
    fn test_forecast_dates_weekly_after_last_actual() {
        let series = daily(&[180.0, 179.5, 179.8, 179.0, 178.6, 178.9, 178.2, 178.0]);
        let result = run(&series, ForecastMode::WeightFromCalories, &weight_params(12, None));

        assert_eq!(result.forecast.len(), 12);
        let last_actual = result.actual.last().unwrap().date;
        assert_eq!(result.forecast[0].date, last_actual + Duration::days(7));
        for pair in result.forecast.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(7));
        }
    }

    #[test]
    fn test_weight_bands_widen() {
        let series = daily(&[180.0, 179.5, 179.8, 179.0, 178.6, 178.9, 178.2, 178.0, 177.9, 177.4]);
        let result = run(&series, ForecastMode::WeightPlan, &weight_params(8, Some(-0.5)));

        let widths: Vec<f64> = result
            .forecast
            .iter()
            .map(|p| p.upper.unwrap() - p.lower.unwrap())
            .collect();
        for pair in widths.windows(2) {
            assert!(pair[1] >= pair[0], "Widths: {:?}", widths);
        }
        assert!(result.actual.iter().all(|p| p.lower.is_some() && p.upper.is_some()));
        assert!(widths[0] > 0.0);
    }

    #[test]
    fn test_calorie_mode_follows_trend() {
        let values: Vec<f64> = (0..28).map(|i| 200.0 - 0.2 * i as f64).collect();
        let params = weight_params(4, None);
        let result = run(&daily(&values), ForecastMode::WeightFromCalories, &params);

        assert_eq!(result.model.map(|m| m.name()), Some("holt linear"));
        let last = result.actual.last().unwrap().value;
        let week4 = result.forecast[3].value;
        assert!(week4 < last, "Forecast {} should fall below {}", week4, last);
    }

    #[test]
    fn test_empty_series_yields_empty_forecast() {
        let result = run(&Series::default(), ForecastMode::WeightPlan, &weight_params(12, None));
        assert!(result.actual.is_empty());
        assert!(result.is_insufficient());
        assert!(result.model.is_none());
    }

    #[test]
    fn test_single_point_keeps_actual() {
        let params = weight_params(12, None);
        let result = run(&daily(&[181.0]), ForecastMode::WeightFromCalories, &params);
        assert_eq!(result.actual.len(), 1);
        assert!(result.forecast.is_empty());
    }

    #[test]
    fn test_strength_has_no_bands() {
        let sets = vec![session(0, 80.0, 5), session(7, 82.5, 5), session(14, 85.0, 5)];
        let params = ForecastParameters::strength(8).unwrap();
        let result = Forecaster::default().forecast_strength(&sets, "Bench Press", &params);

        assert_eq!(result.actual.len(), 3);
        assert_eq!(result.forecast.len(), 8);
        assert!(result.forecast.iter().all(|p| p.lower.is_none() && p.upper.is_none()));
        // Steady +2.5 kg/week on 5 reps: +2.92 1RM per week
        let expected = 85.0 * (1.0 + 5.0 / 30.0) + 2.5 * (1.0 + 5.0 / 30.0);
        let week1 = result.forecast[0].value;
        assert!((week1 - expected).abs() < 1e-6, "Week 1: {}", week1);
        assert_eq!(result.model, Some(TrendModel::WeightedLinear));
    }

    #[test]
    fn test_strength_single_session_is_insufficient() {
        let sets = vec![session(0, 80.0, 5), session(0, 85.0, 3)];
        let params = ForecastParameters::strength(8).unwrap();
        let result = Forecaster::default().forecast_strength(&sets, "Bench Press", &params);

        assert_eq!(result.actual.len(), 1);
        assert!(result.forecast.is_empty());
    }

    #[test]
    fn test_strength_curved_series_uses_polynomial() {
        // Rise then fall: a straight line explains almost nothing
        let weights = [60.0, 70.0, 76.0, 78.0, 76.0, 70.0, 60.0];
        let sets: Vec<WorkoutSet> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| session(i as i64 * 7, *w, 1))
            .collect();
        let params = ForecastParameters::strength(4).unwrap();
        let result = Forecaster::default().forecast_strength(&sets, "Bench Press", &params);

        assert_eq!(result.model, Some(TrendModel::Polynomial { degree: 2 }));
        assert!(result.forecast[0].value < result.actual.last().unwrap().value);
    }

    #[test]
    fn test_strength_forecast_never_negative() {
        let sets = vec![session(0, 100.0, 1), session(7, 50.0, 1), session(14, 5.0, 1)];
        let params = ForecastParameters::strength(8).unwrap();
        let result = Forecaster::default().forecast_strength(&sets, "Bench Press", &params);
        assert!(result.forecast.iter().all(|p| p.value >= 0.0));
    }

    #[test]
    fn test_unvalidated_parameters_are_clamped() {
        let params = ForecastParameters { horizon: 2, smoothing_window: 40, target_rate_pct: 9.0 };
        let result = run(&daily(&[180.0; 20]), ForecastMode::WeightPlan, &params);

        // Rate clamped to +1.5 %/week
        let week1 = result.forecast[0].value;
        assert!((week1 - 182.7).abs() < 1e-9, "Week 1: {}", week1);
    }

    #[test]
    fn test_serialized_shapes() {
        let sets = vec![session(0, 80.0, 5), session(7, 82.5, 5)];
        let params = ForecastParameters::strength(1).unwrap();
        let strength = Forecaster::default().forecast_strength(&sets, "Bench Press", &params);
        let json = serde_json::to_value(&strength).unwrap();
        assert_eq!(json["actual"][0]["date"], "2024-01-01");
        assert!(json["forecast"][0].get("lower").is_none());
        assert!(json.get("model").is_none());

        let params = weight_params(1, None);
        let weight = run(&daily(&[180.0, 179.0]), ForecastMode::WeightPlan, &params);
        let json = serde_json::to_value(&weight).unwrap();
        assert!(json["forecast"][0]["lower"].is_number());
        assert!(json["actual"][0]["upper"].is_number());
    }

    #[test]
    fn test_horizon_upper_bound() {
        assert!(ForecastParameters::strength(MAX_HORIZON_WEEKS as i64).is_ok());
        assert!(ForecastParameters::strength(MAX_HORIZON_WEEKS as i64 + 1).is_err());
        let err = ForecastParameters::weight(14_000_000, 7, Some(0.0)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter { name: "horizon", .. }));
    }

    #[test]
    fn test_unvalidated_huge_horizon_is_capped() {
        let params = ForecastParameters {
            horizon: usize::MAX,
            smoothing_window: 7,
            target_rate_pct: 0.0,
        };
        let forecaster = Forecaster::default();

        let weight = forecaster.forecast(&daily(&[180.0; 10]), ForecastMode::WeightPlan, &params);
        assert_eq!(weight.forecast.len(), MAX_HORIZON_WEEKS);
        let last_actual = weight.actual.last().unwrap().date;
        let last_forecast = weight.forecast.last().unwrap().date;
        assert_eq!(last_forecast, last_actual + Duration::days(7 * MAX_HORIZON_WEEKS as i64));

        let strength = forecaster.forecast(
            &daily(&[100.0, 102.0, 104.0]),
            ForecastMode::StrengthProgression,
            &params,
        );
        assert_eq!(strength.forecast.len(), MAX_HORIZON_WEEKS);
    }

    #[test]
    fn test_forecast_stops_at_end_of_calendar() {
        let end = NaiveDate::MAX - Duration::days(10);
        let series: Series = (0..5)
            .map(|i| Observation::new(end - Duration::days(4 - i), 180.0))
            .collect();
        let result = run(&series, ForecastMode::WeightPlan, &weight_params(4, None));

        assert_eq!(result.actual.len(), 5);
        assert_eq!(result.forecast.len(), 1);
        assert_eq!(result.forecast[0].date, end + Duration::days(7));
    }

    #[test]
    fn test_strength_keeps_bad_session() {
        let weights = [100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 80.0];
        let sets: Vec<WorkoutSet> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| session(i as i64 * 7, *w, 1))
            .collect();
        let params = ForecastParameters::strength(2).unwrap();
        let result = Forecaster::default().forecast_strength(&sets, "Bench Press", &params);

        assert_eq!(result.actual.len(), 7);
        let last = result.actual[6].value;
        assert!((last - 80.0 * 31.0 / 30.0).abs() < 1e-9, "Last session: {}", last);
        // The drop pulls the projection below the previous best
        let best = result.actual[5].value;
        assert!(
            result.forecast.iter().all(|p| p.value < best),
            "Forecast {:?} should stay below {}",
            result.forecast,
            best
        );
    }

    #[test]
    fn test_fit_failure_projects_flat_with_floored_band() {
        let forecaster = Forecaster::default();
        let cleaned = clean(&daily(&[180.0; 6]), Some(3));
        let failure = Err(ForecastError::FitFailed("singular matrix".to_string()));
        let result = forecaster.body_weight_result(&cleaned, failure, 3);

        assert_eq!(result.model, Some(TrendModel::Polynomial { degree: 0 }));
        assert_eq!(result.forecast.len(), 3);
        for (k, p) in result.forecast.iter().enumerate() {
            assert!((p.value - 180.0).abs() < 1e-9);
            let half = p.upper.unwrap() - p.value;
            let expected = 0.5 * ((k + 2) as f64).sqrt();
            assert!((half - expected).abs() < 1e-9, "Offset {}: {}", k + 1, half);
        }
    }

    #[test]
    fn test_strength_fit_failure_projects_flat() {
        let forecaster = Forecaster::default();
        let cleaned = CleanedSeries::unfiltered(&daily(&[100.0, 104.0]));
        let failure = Err(ForecastError::FitFailed("singular matrix".to_string()));
        let result = forecaster.strength_result(&cleaned, failure, 2);

        assert_eq!(result.actual.len(), 2);
        assert_eq!(result.forecast.len(), 2);
        assert!(result.forecast.iter().all(|p| p.value == 104.0 && p.upper.is_none()));
    }

    #[test]
    fn test_actual_band_uses_forecast_sigma() {
        let values = [180.0, 179.2, 180.1, 179.0, 178.4, 179.1, 178.0, 177.9, 178.6, 177.2];
        let params = weight_params(3, None);
        let result = run(&daily(&values), ForecastMode::WeightFromCalories, &params);

        let sigma = result.actual[0].upper.unwrap() - result.actual[0].value;
        assert!(sigma >= 0.5 - 1e-9);
        for p in &result.actual {
            assert!((p.upper.unwrap() - p.value - sigma).abs() < 1e-9);
            assert!((p.value - p.lower.unwrap() - sigma).abs() < 1e-9);
        }
        for (k, p) in result.forecast.iter().enumerate() {
            let expected = sigma * ((k + 2) as f64).sqrt();
            assert!((p.upper.unwrap() - p.value - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_calorie_mode_sparse_weigh_ins() {
        // One weigh-in every 3 days, -0.1 per day: -0.7 per week
        let series: Series = (0..40)
            .map(|i| Observation::new(start() + Duration::days(3 * i), 180.0 - 0.3 * i as f64))
            .collect();
        let params = ForecastParameters::weight(4, 3, None).unwrap();
        let result = run(&series, ForecastMode::WeightFromCalories, &params);

        assert_eq!(result.forecast.len(), 4);
        let step = result.forecast[1].value - result.forecast[0].value;
        assert!((step + 0.7).abs() < 0.05, "Weekly step: {}", step);
        let last_actual = result.actual.last().unwrap().date;
        assert_eq!(result.forecast[0].date, last_actual + Duration::days(7));
    }
}
