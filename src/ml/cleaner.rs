//! Series cleaning: IQR outlier removal and trailing moving-average smoothing

use chrono::NaiveDate;

use super::series::{Observation, Series};

/// Outlier removal needs at least this many points for stable quartiles
const MIN_POINTS_FOR_IQR: usize = 4;

/// Tukey fence multiplier
const IQR_FENCE: f64 = 1.5;

/// A cleaned point: smoothed value plus the filtered value it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanedPoint {
    pub date: NaiveDate,
    /// Value after smoothing (equals `filtered` when no window was used)
    pub value: f64,
    /// Value after outlier removal, before smoothing
    pub filtered: f64,
}

/// Series after outlier removal and optional smoothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedSeries {
    points: Vec<CleanedPoint>,
    window: Option<usize>,
}

impl CleanedSeries {
    /// Series taken as-is, no outlier removal and no smoothing
    pub fn unfiltered(series: &Series) -> Self {
        let points = series
            .points()
            .iter()
            .map(|obs| CleanedPoint { date: obs.date, value: obs.value, filtered: obs.value })
            .collect();
        Self { points, window: None }
    }

    pub fn points(&self) -> &[CleanedPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&CleanedPoint> {
        self.points.last()
    }

    /// Effective smoothing window after clamping, if smoothing was applied
    pub fn window(&self) -> Option<usize> {
        self.window
    }

    /// Filtered minus smoothed, for the trailing `count` points
    pub fn smoothing_residuals(&self, count: usize) -> Vec<f64> {
        let start = self.points.len().saturating_sub(count);
        self.points[start..]
            .iter()
            .map(|p| p.filtered - p.value)
            .collect()
    }
}

/// Quantile by linear interpolation between order statistics.
///
/// `sorted` must be ascending and non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// First and third quartiles, or None for an empty slice
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some((quantile(&sorted, 0.25), quantile(&sorted, 0.75)))
}

/// Drop observations outside the Tukey fences. Series shorter than 4 points pass through.
pub fn remove_outliers(observations: &[Observation]) -> Vec<Observation> {
    if observations.len() < MIN_POINTS_FOR_IQR {
        return observations.to_vec();
    }

    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    let Some((q1, q3)) = quartiles(&values) else {
        return Vec::new();
    };
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;

    observations
        .iter()
        .filter(|o| o.value >= lower && o.value <= upper)
        .copied()
        .collect()
}

/// Trailing moving average; the first points average over whatever history exists
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Remove outliers, then smooth when a window is given.
pub fn clean(series: &Series, smoothing_window: Option<usize>) -> CleanedSeries {
    let kept = remove_outliers(series.points());
    if kept.is_empty() {
        return CleanedSeries::default();
    }

    let filtered: Vec<f64> = kept.iter().map(|o| o.value).collect();
    let window = smoothing_window.map(|w| w.clamp(1, kept.len()));
    let smoothed = match window {
        Some(w) => moving_average(&filtered, w),
        None => filtered.clone(),
    };

    let points = kept
        .iter()
        .zip(smoothed)
        .map(|(obs, value)| CleanedPoint {
            date: obs.date,
            value,
            filtered: obs.value,
        })
        .collect();

    CleanedSeries { points, window }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(start + chrono::Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_quartiles_interpolate() {
        let (q1, q3) = quartiles(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((q1 - 1.75).abs() < 1e-12);
        assert!((q3 - 3.25).abs() < 1e-12);
    }

    #[test]
    fn test_drops_spike() {
        let input = series(&[70.0, 71.0, 69.0, 70.0, 150.0, 71.0]);
        let cleaned = clean(&input, None);

        assert_eq!(cleaned.len(), 5);
        assert!(cleaned.values().iter().all(|v| *v < 100.0), "Values: {:?}", cleaned.values());
    }

    #[test]
    fn test_short_series_keeps_spike() {
        let input = series(&[70.0, 150.0, 71.0]);
        let cleaned = clean(&input, None);
        assert_eq!(cleaned.len(), 3);
        assert!(cleaned.values().contains(&150.0));
    }

    #[test]
    fn test_unfiltered_keeps_spike() {
        let input = series(&[70.0, 71.0, 69.0, 70.0, 150.0, 71.0]);
        let cleaned = CleanedSeries::unfiltered(&input);

        assert_eq!(cleaned.len(), 6);
        assert_eq!(cleaned.values(), vec![70.0, 71.0, 69.0, 70.0, 150.0, 71.0]);
        assert_eq!(cleaned.window(), None);
    }

    #[test]
    fn test_window_one_is_identity() {
        let values = [70.0, 71.5, 69.0, 70.2, 72.0];
        let cleaned = clean(&series(&values), Some(1));
        assert_eq!(cleaned.values(), values.to_vec());
    }

    #[test]
    fn test_moving_average_partial_windows() {
        let smoothed = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(smoothed, vec![1.0, 1.5, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_window_clamped_to_length() {
        let input = series(&[70.0, 72.0]);
        let cleaned = clean(&input, Some(7));
        assert_eq!(cleaned.window(), Some(2));
        assert_eq!(cleaned.values(), vec![70.0, 71.0]);
    }

    #[test]
    fn test_empty_input() {
        let cleaned = clean(&Series::default(), Some(7));
        assert!(cleaned.is_empty());
    }

    #[test]
    fn test_input_untouched() {
        let input = series(&[70.0, 71.0, 69.0, 70.0, 150.0, 71.0]);
        let before = input.clone();
        let _ = clean(&input, Some(3));
        assert_eq!(input, before);
    }

    #[test]
    fn test_smoothing_residuals_tail() {
        let input = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let cleaned = clean(&input, Some(3));
        let residuals = cleaned.smoothing_residuals(2);
        assert_eq!(residuals, vec![1.0, 1.0]);
    }
}
