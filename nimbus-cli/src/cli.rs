use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Select, Text};
use nimbus_core::{Config, RequestState, Session, Suggestion, backend_from_config};
use std::fmt;
use tracing::debug;

use crate::render::render_request;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nimbus", version, about = "Weather lookup with location autocomplete")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search for a location interactively and show its weather (default).
    Interactive,

    /// Show weather for a location query without prompting.
    Show {
        /// Free-text location, e.g. "Paris".
        query: String,

        /// Which suggestion to use, 1-based.
        #[arg(long, default_value_t = 1)]
        pick: usize,
    },

    /// Persist settings to the config file.
    Configure {
        /// Base URL of the Nimbus backend.
        #[arg(long)]
        backend_url: Option<String>,

        /// Quiet period before a suggestion lookup fires, in milliseconds.
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load()?;

        match self.command.unwrap_or(Command::Interactive) {
            Command::Configure {
                backend_url,
                debounce_ms,
            } => configure(config, backend_url, debounce_ms),
            Command::Show { query, pick } => {
                let session = open_session(&config)?;
                let outcome = show(&session, &query, pick).await;
                session.shutdown().await;
                outcome
            }
            Command::Interactive => {
                let session = open_session(&config)?;
                let outcome = interactive(&session).await;
                session.shutdown().await;
                outcome
            }
        }
    }
}

fn open_session(config: &Config) -> Result<Session> {
    let backend = backend_from_config(config)?;
    debug!(?backend, settings = ?config.settings(), "opening session");
    Ok(Session::spawn(backend, config.settings()))
}

fn configure(
    mut config: Config,
    backend_url: Option<String>,
    debounce_ms: Option<u64>,
) -> Result<()> {
    if backend_url.is_none() && debounce_ms.is_none() {
        println!("Backend: {}", config.backend_url()?);
        println!("Config file: {}", Config::config_file_path()?.display());
        return Ok(());
    }

    if let Some(url) = backend_url {
        config.set_backend_url(&url)?;
    }
    if let Some(ms) = debounce_ms {
        config.debounce_ms = Some(ms);
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(session: &Session, query: &str, pick: usize) -> Result<()> {
    session.on_query_change(query);
    let state = session.settled().await?;

    if query.chars().count() < state.settings().min_query_len {
        bail!("Query must be at least {} characters", state.settings().min_query_len);
    }

    let suggestion = pick
        .checked_sub(1)
        .and_then(|idx| state.suggestions().get(idx))
        .cloned()
        .with_context(|| {
            format!(
                "No suggestion #{pick} for '{query}' ({} found). {}",
                state.suggestions().len(),
                state.lookup_notice().unwrap_or("")
            )
        })?;

    session.on_suggestion_selected(suggestion);
    print_weather(session).await
}

async fn interactive(session: &Session) -> Result<()> {
    let min_len = session.snapshot().settings().min_query_len;

    loop {
        let Some(text) = prompt(move || {
            Text::new("Location:")
                .with_help_message(&format!("at least {min_len} characters, Esc to quit"))
                .prompt()
        })
        .await?
        else {
            return Ok(());
        };

        session.on_query_change(text.as_str());
        let state = session.settled().await?;

        if text.chars().count() < min_len {
            println!("Type at least {min_len} characters.");
            continue;
        }
        if state.suggestions().is_empty() {
            println!("{}", state.lookup_notice().unwrap_or("No matching locations."));
            continue;
        }

        let options: Vec<Choice> = state.suggestions().iter().cloned().map(Choice).collect();
        let Some(Choice(choice)) =
            prompt(move || Select::new("Pick a location:", options).prompt()).await?
        else {
            session.on_outside_pointer_down();
            continue;
        };

        session.on_suggestion_selected(choice);
        print_weather(session).await?;
    }
}

async fn print_weather(session: &Session) -> Result<()> {
    let label = session.snapshot().query().to_string();
    print!("{}", render_request(&label, &RequestState::Loading));

    let weather = session.weather_settled().await?;
    let state = session.snapshot();

    match weather {
        RequestState::Error(_) => eprint!("{}", render_request(state.query(), &weather)),
        _ => print!("{}", render_request(state.query(), &weather)),
    }

    Ok(())
}

/// Run a blocking inquire prompt; `None` when the user cancels.
async fn prompt<T, F>(f: F) -> Result<Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InquireError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await? {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

struct Choice(Suggestion);

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.display_label)
    }
}
