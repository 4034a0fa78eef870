//! Failure categories surfaced by the session.
//!
//! Network failures, timeouts and malformed bodies all collapse into the
//! same category per operation. The underlying cause is kept for logging
//! only; `user_message()` is the only text ever shown to the user.

use thiserror::Error;

/// Text shown when a weather fetch fails, regardless of cause.
pub const WEATHER_FETCH_FAILED: &str = "Failed to fetch weather data";

#[derive(Debug, Error)]
pub enum NimbusError {
    /// Autocomplete lookup failed; never blocks the user.
    #[error("Location suggestion lookup failed: {0:#}")]
    SuggestionLookup(anyhow::Error),

    #[error("Weather fetch failed: {0:#}")]
    WeatherFetch(anyhow::Error),
}

impl NimbusError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NimbusError::SuggestionLookup(_) => "No suggestions available",
            NimbusError::WeatherFetch(_) => WEATHER_FETCH_FAILED,
        }
    }

    /// Whether the failure ends the operation with a visible error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NimbusError::WeatherFetch(_))
    }
}
