//! Core library for the `nimbus` weather lookup client.
//!
//! This crate defines:
//! - Configuration (backend URL resolution, tunables)
//! - The backend collaborator and its HTTP implementation
//! - Shared domain models (suggestions, weather results)
//! - The widget state container and the async session that drives it
//!
//! It is used by `nimbus-cli`, but can also back any other front-end that
//! forwards user events and renders snapshots.

pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod state;

pub use backend::{Backend, backend_from_config, http::HttpBackend};
pub use config::{Config, Settings};
pub use error::NimbusError;
pub use model::{
    ForecastEntry, RawSuggestion, Suggestion, WeatherPayload, WeatherResult, format_temperature,
};
pub use session::{Session, Snapshot};
pub use state::{Action, Dropdown, Effect, RequestState, WidgetState};
