//! Trend models: weighted/polynomial regression (linfa), Holt smoothing and rate projection
//!
//! Regressions use weeks since the first observation as the time axis, so one
//! projection period is one week regardless of how the series was sampled.

use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use serde::Serialize;

use super::cleaner::CleanedSeries;
use super::error::ForecastError;
use super::series::weeks_between;

/// Every model needs at least two points to define a trend
pub const MIN_TREND_POINTS: usize = 2;

/// Closed set of trend models, chosen by the forecaster
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TrendModel {
    /// Least squares line with recency weights ramping 1 → 2
    WeightedLinear,
    /// Least squares polynomial over the week index; degree must stay below the point count
    Polynomial { degree: usize },
    /// Double exponential smoothing (level + trend)
    HoltLinear { alpha: f64, beta: f64 },
    /// Compound `rate_pct` per week from the last value
    RateProjection { rate_pct: f64 },
}

impl TrendModel {
    pub fn name(&self) -> &'static str {
        match self {
            TrendModel::WeightedLinear => "weighted linear",
            TrendModel::Polynomial { .. } => "polynomial",
            TrendModel::HoltLinear { .. } => "holt linear",
            TrendModel::RateProjection { .. } => "rate projection",
        }
    }

    /// Fit the model to a cleaned series
    pub fn fit(&self, series: &CleanedSeries) -> Result<FittedTrend, ForecastError> {
        if series.len() < MIN_TREND_POINTS {
            return Err(ForecastError::InsufficientData {
                required: MIN_TREND_POINTS,
                available: series.len(),
            });
        }

        let t = week_index(series);
        let y = series.values();

        let fitted = match *self {
            TrendModel::WeightedLinear => fit_weighted_linear(&t, &y),
            TrendModel::Polynomial { degree } => fit_polynomial(&t, &y, degree),
            TrendModel::HoltLinear { alpha, beta } => Ok(fit_holt(series, &y, alpha, beta)),
            TrendModel::RateProjection { rate_pct } => Ok(FittedTrend {
                model: *self,
                state: TrendState::Rate {
                    last_value: y[y.len() - 1],
                    rate_pct,
                },
                residuals: Vec::new(),
            }),
        };

        fitted.map(|mut fitted| {
            fitted.model = *self;
            fitted
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TrendState {
    /// Ascending-power coefficients evaluated at `last_t + k` weeks
    Curve { coefficients: Vec<f64>, last_t: f64 },
    Holt { level: f64, weekly_trend: f64 },
    Rate { last_value: f64, rate_pct: f64 },
}

/// A fitted model ready to project
#[derive(Debug, Clone, PartialEq)]
pub struct FittedTrend {
    model: TrendModel,
    state: TrendState,
    /// In-sample residuals (one-step-ahead for Holt, none for rate projection)
    residuals: Vec<f64>,
}

impl FittedTrend {
    /// Flat line at the last value, used when a fit degenerates
    pub fn flat(series: &CleanedSeries) -> Option<Self> {
        let last = series.last()?;
        let t = week_index(series);
        Some(Self {
            model: TrendModel::Polynomial { degree: 0 },
            state: TrendState::Curve {
                coefficients: vec![last.value],
                last_t: t.last().copied().unwrap_or(0.0),
            },
            residuals: series.values().iter().map(|v| v - last.value).collect(),
        })
    }

    pub fn model(&self) -> TrendModel {
        self.model
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Sum of squared residuals
    pub fn sse(&self) -> f64 {
        self.residuals.iter().map(|r| r * r).sum()
    }

    /// Predicted value `offset` weeks past the last observation
    pub fn predict(&self, offset: usize) -> f64 {
        let k = offset as f64;
        match &self.state {
            TrendState::Curve { coefficients, last_t } => eval_poly(coefficients, last_t + k),
            TrendState::Holt { level, weekly_trend } => level + k * weekly_trend,
            TrendState::Rate { last_value, rate_pct } => {
                last_value * (1.0 + rate_pct / 100.0).powi(offset as i32)
            }
        }
    }

    /// Offsets 1..=horizon with predicted values
    pub fn project(&self, horizon: usize) -> Vec<(usize, f64)> {
        match &self.state {
            // Compound step by step so each period is exactly prev × (1 + r)
            TrendState::Rate { last_value, rate_pct } => {
                let factor = 1.0 + rate_pct / 100.0;
                let mut value = *last_value;
                (1..=horizon)
                    .map(|k| {
                        value *= factor;
                        (k, value)
                    })
                    .collect()
            }
            _ => (1..=horizon).map(|k| (k, self.predict(k))).collect(),
        }
    }
}

/// Weeks since the first point, per point
fn week_index(series: &CleanedSeries) -> Vec<f64> {
    let Some(first) = series.points().first().map(|p| p.date) else {
        return Vec::new();
    };
    series
        .points()
        .iter()
        .map(|p| weeks_between(first, p.date))
        .collect()
}

fn eval_poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Ordinary least squares through linfa; returns (intercept, params)
fn least_squares(
    records: Array2<f64>,
    targets: Array1<f64>,
    with_intercept: bool,
) -> Result<(f64, Vec<f64>), ForecastError> {
    let dataset = Dataset::new(records, targets);
    let model = LinearRegression::default()
        .with_intercept(with_intercept)
        .fit(&dataset)
        .map_err(|e| ForecastError::FitFailed(e.to_string()))?;

    let params = model.params().to_vec();
    if params.iter().any(|p| !p.is_finite()) || !model.intercept().is_finite() {
        return Err(ForecastError::FitFailed("non-finite coefficients".to_string()));
    }
    Ok((model.intercept(), params))
}

fn curve_fit(t: &[f64], y: &[f64], coefficients: Vec<f64>) -> FittedTrend {
    let residuals = t
        .iter()
        .zip(y)
        .map(|(x, v)| v - eval_poly(&coefficients, *x))
        .collect();
    FittedTrend {
        model: TrendModel::WeightedLinear,
        state: TrendState::Curve {
            coefficients,
            last_t: t[t.len() - 1],
        },
        residuals,
    }
}

/// Weighted least squares by scaling each row with sqrt(weight).
///
/// Minimising Σ wᵢ(yᵢ − a − b·tᵢ)² equals plain OLS on (√wᵢ, √wᵢ·tᵢ) → √wᵢ·yᵢ
/// without an intercept.
fn fit_weighted_linear(t: &[f64], y: &[f64]) -> Result<FittedTrend, ForecastError> {
    let n = t.len();
    let mut records = Array2::<f64>::zeros((n, 2));
    let mut targets = Array1::<f64>::zeros(n);

    for i in 0..n {
        let weight = 1.0 + i as f64 / (n - 1) as f64;
        let sw = weight.sqrt();
        records[[i, 0]] = sw;
        records[[i, 1]] = sw * t[i];
        targets[i] = sw * y[i];
    }

    let (_, params) = least_squares(records, targets, false)?;
    Ok(curve_fit(t, y, vec![params[0], params[1]]))
}

fn fit_polynomial(t: &[f64], y: &[f64], degree: usize) -> Result<FittedTrend, ForecastError> {
    let n = t.len();
    if degree == 0 || degree >= n {
        return Err(ForecastError::invalid(
            "degree",
            format!("must be between 1 and {}, got {}", n - 1, degree),
        ));
    }

    let mut records = Array2::<f64>::zeros((n, degree));
    for (i, x) in t.iter().enumerate() {
        for p in 0..degree {
            records[[i, p]] = x.powi(p as i32 + 1);
        }
    }
    let targets = Array1::from_vec(y.to_vec());

    let (intercept, params) = least_squares(records, targets, true)?;
    let mut coefficients = Vec::with_capacity(degree + 1);
    coefficients.push(intercept);
    coefficients.extend(params);

    Ok(curve_fit(t, y, coefficients))
}

/// Holt's linear smoothing over the observation sequence.
///
/// Level starts at the first value and trend at the first difference. The final
/// per-step trend is rescaled to a per-week trend using the mean gap between points.
fn fit_holt(series: &CleanedSeries, y: &[f64], alpha: f64, beta: f64) -> FittedTrend {
    let mut level = y[0];
    let mut trend = y[1] - y[0];
    let mut residuals = Vec::with_capacity(y.len() - 1);

    for value in &y[1..] {
        let forecast = level + trend;
        residuals.push(value - forecast);

        let prev_level = level;
        level = alpha * value + (1.0 - alpha) * (level + trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
    }

    let points = series.points();
    let span_days = (points[points.len() - 1].date - points[0].date).num_days() as f64;
    let mean_gap = (span_days / (points.len() - 1) as f64).max(1.0);

    FittedTrend {
        model: TrendModel::HoltLinear { alpha, beta },
        state: TrendState::Holt {
            level,
            weekly_trend: trend * 7.0 / mean_gap,
        },
        residuals,
    }
}
