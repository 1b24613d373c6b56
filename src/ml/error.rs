//! Forecast engine errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Fewer usable points than a trend needs
    #[error("not enough data to forecast: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("model fit failed: {0}")]
    FitFailed(String),
}

impl ForecastError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ForecastError::InvalidParameter { name, reason: reason.into() }
    }

    /// True when the caller should render "not enough data" rather than an error
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ForecastError::InsufficientData { .. })
    }
}
