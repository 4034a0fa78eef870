use chrono::NaiveDateTime;
use nimbus_core::{RequestState, WeatherResult};
use std::fmt::Write;

/// Text for each weather request state, shown under the selected label.
pub fn render_request(label: &str, state: &RequestState) -> String {
    match state {
        RequestState::Loading => "Loading...\n".to_string(),
        RequestState::Success(weather) => render_weather(label, weather),
        RequestState::Error(message) => format!("{message}\n"),
        RequestState::Idle => "Selected location lacks coordinates, city or country.\n".to_string(),
    }
}

pub fn render_weather(label: &str, weather: &WeatherResult) -> String {
    let mut out = String::new();
    let current = &weather.current;

    let _ = writeln!(out, "Current weather in {label}");
    let _ = writeln!(out, "  {}  {}", current.temperature_label(), current.description);
    let _ = writeln!(out, "  Humidity: {}%", current.humidity);

    if !weather.forecast.is_empty() {
        let _ = writeln!(out, "\n{}-Day Forecast", weather.forecast.len());
        for entry in &weather.forecast {
            let _ = writeln!(
                out,
                "  {:<16}  {:>7}  {}",
                date_label(entry.date),
                entry.temperature_label(),
                entry.description
            );
        }
    }

    out
}

fn date_label(date: NaiveDateTime) -> String {
    date.format("%a %Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nimbus_core::{ForecastEntry, model::CurrentConditions};

    #[test]
    fn renders_current_and_forecast() {
        let weather = WeatherResult {
            current: CurrentConditions {
                temperature: 15.3,
                humidity: 60,
                description: "clear sky".into(),
                icon: "01d".into(),
            },
            forecast: vec![ForecastEntry {
                date: NaiveDate::from_ymd_opt(2024, 5, 1)
                    .and_then(|d| d.and_hms_opt(12, 0, 0))
                    .unwrap(),
                temperature: 16.24,
                description: "light rain".into(),
                icon: "10d".into(),
            }],
        };

        let out = render_weather("Paris, Île-de-France, FR", &weather);

        assert!(out.contains("Current weather in Paris, Île-de-France, FR"));
        assert!(out.contains("15.3°C  clear sky"));
        assert!(out.contains("Humidity: 60%"));
        assert!(out.contains("1-Day Forecast"));
        assert!(out.contains("Wed 2024-05-01"));
        assert!(out.contains("16.2°C"));
    }

    #[test]
    fn pending_and_failed_requests_render_status_lines() {
        assert_eq!(render_request("Paris", &RequestState::Loading), "Loading...\n");
        assert_eq!(
            render_request("Paris", &RequestState::Error("Failed to fetch weather data".into())),
            "Failed to fetch weather data\n"
        );

        let idle = render_request("Atlantis", &RequestState::Idle);
        assert!(!idle.contains("Current weather"));
    }
}
