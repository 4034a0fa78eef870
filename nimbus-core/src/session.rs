//! Asynchronous driver for [`WidgetState`].
//!
//! A single task owns the state. User events and effect completions are fed
//! to it through channels and applied strictly one at a time, so no locking
//! is involved: ordering is enforced by the tickets and generations the
//! reducer checks. Every applied event publishes a fresh [`Snapshot`].

use anyhow::{Context, Result};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    backend::Backend,
    config::Settings,
    error::NimbusError,
    model::{Suggestion, WeatherResult},
    state::{Action, Effect, RequestState, WidgetState},
};

/// State as published after the driver applied `applied` user events.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub applied: u64,
    pub state: WidgetState,
}

#[derive(Debug)]
pub struct Session {
    commands: mpsc::UnboundedSender<Action>,
    sent: AtomicU64,
    snapshots: watch::Receiver<Snapshot>,
    driver: JoinHandle<()>,
}

impl Session {
    /// Start the driver task on the current tokio runtime.
    pub fn spawn(backend: Arc<dyn Backend>, settings: Settings) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (completions, completion_rx) = mpsc::unbounded_channel();

        let state = WidgetState::new(settings);
        let (published, snapshots) = watch::channel(Snapshot {
            applied: 0,
            state: state.clone(),
        });

        let driver = Driver {
            backend,
            state,
            applied: 0,
            published,
            completions,
            debounce: None,
            lookup: None,
            fetch: None,
        };

        Self {
            commands,
            sent: AtomicU64::new(0),
            snapshots,
            driver: tokio::spawn(driver.run(command_rx, completion_rx)),
        }
    }

    pub fn on_query_change(&self, text: impl Into<String>) {
        self.send(Action::QueryChanged(text.into()));
    }

    pub fn on_suggestion_selected(&self, suggestion: Suggestion) {
        self.send(Action::SuggestionSelected(suggestion));
    }

    /// Re-fetch weather for the current selection.
    pub fn fetch_weather(&self) {
        self.send(Action::WeatherRequested);
    }

    pub fn on_outside_pointer_down(&self) {
        self.send(Action::OutsidePointerDown);
    }

    pub fn on_input_focus(&self) {
        self.send(Action::InputFocused);
    }

    /// Latest published state; may not yet reflect events sent just now.
    pub fn snapshot(&self) -> WidgetState {
        self.snapshots.borrow().state.clone()
    }

    /// Wait until every event sent so far is applied and no lookup is pending.
    pub async fn settled(&self) -> Result<WidgetState> {
        self.wait_for(|state| !state.is_searching()).await
    }

    /// Wait until every event sent so far is applied and no weather fetch is loading.
    pub async fn weather_settled(&self) -> Result<RequestState> {
        let state = self
            .wait_for(|state| !matches!(state.weather(), RequestState::Loading))
            .await?;

        Ok(state.weather().clone())
    }

    /// Stop the driver, aborting pending timers and requests.
    pub async fn shutdown(self) {
        let Self {
            commands, driver, ..
        } = self;

        drop(commands);
        if let Err(err) = driver.await {
            warn!(error = %err, "session driver ended abnormally");
        }
    }

    async fn wait_for(&self, ready: impl Fn(&WidgetState) -> bool) -> Result<WidgetState> {
        let target = self.sent.load(Ordering::SeqCst);
        let mut snapshots = self.snapshots.clone();

        let snapshot = snapshots
            .wait_for(|s| s.applied >= target && ready(&s.state))
            .await
            .context("Session driver has stopped")?;

        Ok(snapshot.state.clone())
    }

    fn send(&self, action: Action) {
        if self.commands.send(action).is_err() {
            warn!("session driver has stopped; dropping event");
            return;
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
    }
}

struct Driver {
    backend: Arc<dyn Backend>,
    state: WidgetState,
    applied: u64,
    published: watch::Sender<Snapshot>,
    completions: mpsc::UnboundedSender<Action>,
    debounce: Option<JoinHandle<()>>,
    lookup: Option<JoinHandle<()>>,
    fetch: Option<JoinHandle<()>>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Action>,
        mut completions: mpsc::UnboundedReceiver<Action>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(action) => {
                        self.applied += 1;
                        self.dispatch(action);
                    }
                    None => break,
                },
                Some(action) = completions.recv() => self.dispatch(action),
            }
        }

        for task in [self.debounce.take(), self.lookup.take(), self.fetch.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
        debug!("session driver stopped");
    }

    fn dispatch(&mut self, action: Action) {
        for effect in self.state.reduce(action) {
            self.execute(effect);
        }

        self.published.send_replace(Snapshot {
            applied: self.applied,
            state: self.state.clone(),
        });
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::ScheduleLookup { ticket, delay } => {
                abort(self.debounce.take());
                let tx = self.completions.clone();

                self.debounce = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Action::DebounceElapsed { ticket });
                }));
            }
            Effect::CancelLookup => {
                abort(self.debounce.take());
                abort(self.lookup.take());
            }
            Effect::CancelWeather => abort(self.fetch.take()),
            Effect::LookupSuggestions { generation, query } => {
                abort(self.lookup.take());
                let tx = self.completions.clone();
                let backend = Arc::clone(&self.backend);

                debug!(generation, %query, "looking up location suggestions");
                self.lookup = Some(tokio::spawn(async move {
                    let result = backend
                        .location_suggestions(&query)
                        .await
                        .map_err(NimbusError::SuggestionLookup);
                    let _ = tx.send(Action::SuggestionsLoaded { generation, result });
                }));
            }
            Effect::FetchWeather {
                generation,
                location,
            } => {
                abort(self.fetch.take());
                let tx = self.completions.clone();
                let backend = Arc::clone(&self.backend);
                let forecast_len = self.state.settings().forecast_len;

                debug!(generation, label = %location.display_label, "fetching weather");
                self.fetch = Some(tokio::spawn(async move {
                    let result = async {
                        let payload = backend.weather(&location).await?;
                        WeatherResult::from_payload(payload, forecast_len)
                    }
                    .await
                    .map_err(NimbusError::WeatherFetch);
                    let _ = tx.send(Action::WeatherLoaded { generation, result });
                }));
            }
        }
    }
}

fn abort(task: Option<JoinHandle<()>>) {
    if let Some(task) = task {
        task.abort();
    }
}
