use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A location candidate as returned by the suggestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSuggestion {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// A normalized location candidate, ready to be shown in the dropdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub display_label: String,
    pub lat: f64,
    pub lon: f64,
    pub country: String,
    pub state: Option<String>,
    pub city: String,
}

impl Suggestion {
    pub fn from_raw(raw: RawSuggestion) -> Self {
        let city = raw
            .name
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        let parts = [Some(raw.name.as_str()), raw.state.as_deref(), Some(raw.country.as_str())];
        let display_label = parts
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            name: raw.name,
            display_label,
            lat: raw.lat,
            lon: raw.lon,
            country: raw.country,
            state: raw.state,
            city,
        }
    }

    /// True if the location carries everything the weather endpoint needs.
    pub fn is_resolvable(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && !self.city.trim().is_empty()
            && !self.country.trim().is_empty()
    }
}

/// Normalize a whole lookup response, preserving provider order.
pub fn normalize_suggestions(raw: Vec<RawSuggestion>) -> Vec<Suggestion> {
    raw.into_iter().map(Suggestion::from_raw).collect()
}

// Wire format of `/api/weather`.

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherPayload {
    pub current: CurrentPayload,
    #[serde(default)]
    pub forecast: ForecastPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentPayload {
    pub main: CurrentMain,
    #[serde(default)]
    pub weather: Vec<ConditionPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentMain {
    pub temp: f64,
    pub humidity: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastPayload {
    #[serde(default)]
    pub list: Vec<ForecastItemPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastItemPayload {
    pub dt_txt: String,
    pub main: ForecastMain,
    #[serde(default)]
    pub weather: Vec<ConditionPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastMain {
    pub temp: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionPayload {
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: u8,
    pub description: String,
    pub icon: String,
}

impl CurrentConditions {
    pub fn temperature_label(&self) -> String {
        format_temperature(self.temperature)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub date: NaiveDateTime,
    pub temperature: f64,
    pub description: String,
    pub icon: String,
}

impl ForecastEntry {
    pub fn temperature_label(&self) -> String {
        format_temperature(self.temperature)
    }
}

/// Current conditions plus a time-ordered forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherResult {
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastEntry>,
}

impl WeatherResult {
    /// Convert the wire payload, keeping at most `forecast_len` entries.
    pub fn from_payload(payload: WeatherPayload, forecast_len: usize) -> Result<Self> {
        let (description, icon) = first_condition(payload.current.weather);

        let current = CurrentConditions {
            temperature: payload.current.main.temp,
            humidity: payload.current.main.humidity,
            description,
            icon,
        };

        let mut forecast = payload
            .forecast
            .list
            .into_iter()
            .map(|item| {
                let date = parse_forecast_time(&item.dt_txt)?;
                let (description, icon) = first_condition(item.weather);
                Ok(ForecastEntry {
                    date,
                    temperature: item.main.temp,
                    description,
                    icon,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        forecast.sort_by_key(|entry| entry.date);
        forecast.truncate(forecast_len);

        Ok(Self { current, forecast })
    }
}

fn first_condition(conditions: Vec<ConditionPayload>) -> (String, String) {
    conditions
        .into_iter()
        .next()
        .map(|c| (c.description, c.icon))
        .unwrap_or_else(|| ("Unknown".to_string(), String::new()))
}

fn parse_forecast_time(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_utc()))
        .with_context(|| format!("Invalid forecast timestamp '{raw}'"))
}

/// Celsius with one decimal place, e.g. `15.3°C`.
pub fn format_temperature(celsius: f64) -> String {
    format!("{celsius:.1}°C")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, state: Option<&str>, country: &str) -> RawSuggestion {
        RawSuggestion {
            name: name.to_string(),
            lat: 48.85,
            lon: 2.35,
            country: country.to_string(),
            state: state.map(str::to_string),
        }
    }

    #[test]
    fn display_label_joins_name_state_country() {
        let s = Suggestion::from_raw(raw("Paris", Some("Île-de-France"), "FR"));

        assert_eq!(s.display_label, "Paris, Île-de-France, FR");
        assert_eq!(s.city, "Paris");
    }

    #[test]
    fn display_label_skips_blank_parts() {
        let s = Suggestion::from_raw(raw("Monaco", Some("  "), "MC"));
        assert_eq!(s.display_label, "Monaco, MC");

        let s = Suggestion::from_raw(raw("Springfield", None, ""));
        assert_eq!(s.display_label, "Springfield");
    }

    #[test]
    fn city_is_first_segment_of_raw_name() {
        let s = Suggestion::from_raw(raw("London, England, GB", None, "GB"));
        assert_eq!(s.city, "London");
        assert!(s.is_resolvable());
    }

    #[test]
    fn suggestion_without_country_is_not_resolvable() {
        let s = Suggestion::from_raw(raw("Atlantis", None, ""));
        assert!(!s.is_resolvable());
    }

    #[test]
    fn raw_suggestion_defaults_missing_fields() {
        let parsed: RawSuggestion =
            serde_json::from_str(r#"{"name":"Oslo","lat":59.9,"lon":10.7}"#).unwrap();

        assert_eq!(parsed.country, "");
        assert_eq!(parsed.state, None);
    }

    #[test]
    fn weather_without_forecast_yields_current_only() {
        let payload: WeatherPayload = serde_json::from_value(serde_json::json!({
            "current": {
                "main": { "temp": 15.3, "humidity": 60 },
                "weather": [{ "description": "clear sky", "icon": "01d" }]
            }
        }))
        .unwrap();

        let result = WeatherResult::from_payload(payload, 5).unwrap();

        assert_eq!(result.current.temperature_label(), "15.3°C");
        assert_eq!(result.current.description, "clear sky");
        assert_eq!(result.current.humidity, 60);
        assert!(result.forecast.is_empty());
    }

    #[test]
    fn forecast_is_sorted_and_truncated() {
        let list: Vec<_> = (0..7)
            .rev()
            .map(|day| {
                serde_json::json!({
                    "dt_txt": format!("2024-05-{:02} 12:00:00", 10 + day),
                    "main": { "temp": f64::from(day) },
                    "weather": [{ "description": "rain", "icon": "10d" }]
                })
            })
            .collect();

        let payload: WeatherPayload = serde_json::from_value(serde_json::json!({
            "current": { "main": { "temp": 1.0, "humidity": 90 }, "weather": [] },
            "forecast": { "list": list }
        }))
        .unwrap();

        let result = WeatherResult::from_payload(payload, 5).unwrap();

        assert_eq!(result.current.description, "Unknown");
        assert_eq!(result.forecast.len(), 5);
        assert!(result.forecast.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(result.forecast[0].temperature_label(), "0.0°C");
    }

    #[test]
    fn unparsable_forecast_time_is_an_error() {
        let payload: WeatherPayload = serde_json::from_value(serde_json::json!({
            "current": { "main": { "temp": 1.0, "humidity": 90 } },
            "forecast": { "list": [{ "dt_txt": "tomorrow", "main": { "temp": 2.0 } }] }
        }))
        .unwrap();

        let err = WeatherResult::from_payload(payload, 5).unwrap_err();
        assert!(err.to_string().contains("Invalid forecast timestamp"));
    }

    #[test]
    fn temperature_rounds_to_one_decimal() {
        assert_eq!(format_temperature(15.34), "15.3°C");
        assert_eq!(format_temperature(-3.26), "-3.3°C");
        assert_eq!(format_temperature(20.0), "20.0°C");
    }
}
