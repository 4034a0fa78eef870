//! Explicit state container for the location search widget.
//!
//! `WidgetState::reduce` is the only place visible state changes. It never
//! performs I/O: side effects are returned as [`Effect`]s and their outcomes
//! come back later as [`Action`]s tagged with the ticket or generation they
//! were issued under. A completion whose tag is no longer the newest one is
//! dropped, so a slow response can never overwrite newer data.

use std::time::Duration;
use tracing::{debug, error, warn};

use crate::{
    config::Settings,
    error::NimbusError,
    model::{RawSuggestion, Suggestion, WeatherResult, normalize_suggestions},
};

/// Visibility of the suggestion list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dropdown {
    #[default]
    Hidden,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success(WeatherResult),
    Error(String),
}

#[derive(Debug)]
pub enum Action {
    /// The input text changed.
    QueryChanged(String),
    /// A debounce timer survived its quiet period.
    DebounceElapsed { ticket: u64 },
    SuggestionsLoaded {
        generation: u64,
        result: Result<Vec<RawSuggestion>, NimbusError>,
    },
    SuggestionSelected(Suggestion),
    /// Explicit "Get Weather" for the current selection.
    WeatherRequested,
    WeatherLoaded {
        generation: u64,
        result: Result<WeatherResult, NimbusError>,
    },
    /// Pointer-down outside the suggestion list and its input.
    OutsidePointerDown,
    InputFocused,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace any pending debounce timer with one for `ticket`.
    ScheduleLookup { ticket: u64, delay: Duration },
    /// Drop the pending timer and any in-flight lookup.
    CancelLookup,
    LookupSuggestions { generation: u64, query: String },
    FetchWeather { generation: u64, location: Suggestion },
    /// Drop any in-flight weather fetch.
    CancelWeather,
}

#[derive(Debug, Clone)]
pub struct WidgetState {
    settings: Settings,
    query: String,
    suggestions: Vec<Suggestion>,
    dropdown: Dropdown,
    selected: Option<Suggestion>,
    weather: RequestState,
    lookup_notice: Option<&'static str>,
    debounce_pending: bool,
    lookup_in_flight: bool,
    debounce_ticket: u64,
    lookup_generation: u64,
    weather_generation: u64,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl WidgetState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            query: String::new(),
            suggestions: Vec::new(),
            dropdown: Dropdown::Hidden,
            selected: None,
            weather: RequestState::Idle,
            lookup_notice: None,
            debounce_pending: false,
            lookup_in_flight: false,
            debounce_ticket: 0,
            lookup_generation: 0,
            weather_generation: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn dropdown(&self) -> Dropdown {
        self.dropdown
    }

    pub fn is_dropdown_visible(&self) -> bool {
        self.dropdown == Dropdown::Visible
    }

    pub fn selected(&self) -> Option<&Suggestion> {
        self.selected.as_ref()
    }

    pub fn weather(&self) -> &RequestState {
        &self.weather
    }

    /// Non-blocking hint left by the last failed lookup.
    pub fn lookup_notice(&self) -> Option<&'static str> {
        self.lookup_notice
    }

    /// True while a lookup is debouncing or in flight.
    pub fn is_searching(&self) -> bool {
        self.debounce_pending || self.lookup_in_flight
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reduce(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::QueryChanged(text) => self.on_query_changed(text),
            Action::DebounceElapsed { ticket } => self.on_debounce_elapsed(ticket),
            Action::SuggestionsLoaded { generation, result } => {
                self.on_suggestions_loaded(generation, result);
                Vec::new()
            }
            Action::SuggestionSelected(suggestion) => self.on_suggestion_selected(suggestion),
            Action::WeatherRequested => match self.selected.clone() {
                Some(location) => self.start_weather(location).into_iter().collect(),
                None => {
                    debug!("weather requested without a selected location");
                    Vec::new()
                }
            },
            Action::WeatherLoaded { generation, result } => {
                self.on_weather_loaded(generation, result);
                Vec::new()
            }
            Action::OutsidePointerDown => {
                self.dropdown = Dropdown::Hidden;
                Vec::new()
            }
            Action::InputFocused => {
                if !self.suggestions.is_empty() {
                    self.dropdown = Dropdown::Visible;
                }
                Vec::new()
            }
        }
    }

    fn on_query_changed(&mut self, text: String) -> Vec<Effect> {
        self.query = text;
        self.debounce_ticket += 1;
        self.lookup_notice = None;

        if self.query.chars().count() < self.settings.min_query_len {
            self.invalidate_lookups();
            self.suggestions.clear();
            self.dropdown = Dropdown::Hidden;
            return vec![Effect::CancelLookup];
        }

        self.debounce_pending = true;
        vec![Effect::ScheduleLookup {
            ticket: self.debounce_ticket,
            delay: self.settings.debounce,
        }]
    }

    fn on_debounce_elapsed(&mut self, ticket: u64) -> Vec<Effect> {
        if ticket != self.debounce_ticket || !self.debounce_pending {
            debug!(ticket, current = self.debounce_ticket, "ignoring superseded debounce timer");
            return Vec::new();
        }

        self.debounce_pending = false;
        self.lookup_in_flight = true;
        self.lookup_generation += 1;

        vec![Effect::LookupSuggestions {
            generation: self.lookup_generation,
            query: self.query.clone(),
        }]
    }

    fn on_suggestions_loaded(
        &mut self,
        generation: u64,
        result: Result<Vec<RawSuggestion>, NimbusError>,
    ) {
        if generation != self.lookup_generation || !self.lookup_in_flight {
            debug!(generation, current = self.lookup_generation, "discarding stale suggestions");
            return;
        }

        self.lookup_in_flight = false;

        match result {
            Ok(raw) => {
                self.suggestions = normalize_suggestions(raw);
                debug!(count = self.suggestions.len(), query = %self.query, "suggestions updated");
            }
            Err(err) => {
                report(&err);
                self.lookup_notice = Some(err.user_message());
                self.suggestions.clear();
            }
        }

        self.dropdown = if self.suggestions.is_empty() {
            Dropdown::Hidden
        } else {
            Dropdown::Visible
        };
    }

    fn on_suggestion_selected(&mut self, suggestion: Suggestion) -> Vec<Effect> {
        self.query = suggestion.display_label.clone();
        self.debounce_ticket += 1;
        self.invalidate_lookups();
        self.lookup_notice = None;
        self.suggestions.clear();
        self.dropdown = Dropdown::Hidden;
        self.selected = Some(suggestion.clone());

        let mut effects = vec![Effect::CancelLookup];
        effects.extend(self.start_weather(suggestion));
        effects
    }

    fn start_weather(&mut self, location: Suggestion) -> Option<Effect> {
        if !location.is_resolvable() {
            warn!(label = %location.display_label, "location lacks coordinates, city or country");
            self.weather_generation += 1;
            self.weather = RequestState::Idle;
            return Some(Effect::CancelWeather);
        }

        self.weather_generation += 1;
        self.weather = RequestState::Loading;

        Some(Effect::FetchWeather {
            generation: self.weather_generation,
            location,
        })
    }

    fn on_weather_loaded(&mut self, generation: u64, result: Result<WeatherResult, NimbusError>) {
        if generation != self.weather_generation {
            debug!(generation, current = self.weather_generation, "discarding stale weather");
            return;
        }

        self.weather = match result {
            Ok(weather) => RequestState::Success(weather),
            Err(err) => {
                report(&err);
                RequestState::Error(err.user_message().to_string())
            }
        };
    }

    fn invalidate_lookups(&mut self) {
        self.lookup_generation += 1;
        self.debounce_pending = false;
        self.lookup_in_flight = false;
    }
}

fn report(err: &NimbusError) {
    if err.is_fatal() {
        error!(error = %err, "request failed");
    } else {
        warn!(error = %err, "request failed; continuing");
    }
}
