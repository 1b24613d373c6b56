//! Confidence bands that widen with forecast horizon

use super::cleaner::CleanedSeries;
use super::trend::FittedTrend;

/// Root mean square of residuals, or None when there are none
pub fn rms(residuals: &[f64]) -> Option<f64> {
    if residuals.is_empty() {
        return None;
    }
    let mean_sq = residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64;
    Some(mean_sq.sqrt())
}

/// Band with half-width `σ·sqrt(1 + t)` at horizon offset `t`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    sigma: f64,
}

impl Band {
    /// Band from raw residuals; σ never drops below `floor`
    pub fn from_residuals(residuals: &[f64], floor: f64) -> Self {
        let sigma = rms(residuals)
            .filter(|s| s.is_finite())
            .unwrap_or(0.0)
            .max(floor);
        Self { sigma }
    }

    /// σ from a model's own in-sample residuals
    pub fn from_trend(fitted: &FittedTrend, floor: f64) -> Self {
        Self::from_residuals(fitted.residuals(), floor)
    }

    /// σ from how far filtered values sit from the smoothed line,
    /// over the last `windows` smoothing-window lengths
    pub fn from_volatility(series: &CleanedSeries, windows: usize, floor: f64) -> Self {
        let window = series.window().unwrap_or(1);
        let residuals = series.smoothing_residuals(windows.max(1) * window);
        Self::from_residuals(&residuals, floor)
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn half_width(&self, offset: usize) -> f64 {
        self.sigma * (1.0 + offset as f64).sqrt()
    }

    /// (lower, upper) around `value` at horizon `offset`
    pub fn bandwidth(&self, value: f64, offset: usize) -> (f64, f64) {
        let half = self.half_width(offset);
        (value - half, value + half)
    }
}
