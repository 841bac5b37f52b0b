// corral - terminal client for the CRM backend
//
// A keyboard-driven client for a CRM service with an AI assistant. The core
// is the assistant session controller: one query in flight at a time, the
// transcript growing by a user/assistant pair per turn, and backend actions
// invalidating the collection cache so tables never show stale rows.
//
// Architecture:
// - API client (reqwest): talks to the backend, clears the session on 401
// - Assistant controller: turn-taking state machine over the conversation
// - Query cache: per-collection JSON cache with invalidation broadcast
// - TUI (ratatui): assistant chat, collection tables, notifications
// - Event system: spawned network tasks report back over an mpsc channel

mod api;
mod assistant;
mod cache;
mod cli;
mod config;
mod events;
mod logging;
mod notify;
mod session;
mod tui;
mod util;

use anyhow::Result;
use api::{ApiClient, ApiError};
use assistant::AssistantController;
use cache::QueryCache;
use config::{Config, LogRotation};
use logging::{LogBuffer, TuiLogLayer};
use notify::NotificationCenter;
use session::SessionStore;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (login, logout, whoami, config)
    // If a command was handled, exit early
    let early_config = Config::from_env();
    if cli::handle_cli(&early_config).await {
        return Ok(());
    }

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();

    let config = early_config;

    // Create log buffer for TUI mode
    let log_buffer = LogBuffer::new();

    init_tracing(&config, &log_buffer);

    // Load the persisted session and validate it before starting the UI.
    // A dead token at startup is an error message, not a broken chat panel.
    let session = SessionStore::new();
    if !session.has_token() {
        eprintln!("Not logged in. Run: corral login");
        std::process::exit(1);
    }

    let (event_tx, event_rx) = mpsc::channel(100);
    let api = ApiClient::new(&config, session.clone(), Some(event_tx.clone()))?;

    match api.me().await {
        Ok(user) => {
            tracing::info!(email = %user.email, "Session validated");
            session.set_user(user);
        }
        Err(ApiError::Unauthorized) => {
            eprintln!("Your session has expired. Run: corral login");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Cannot reach the backend at {}: {}", config.api_url, e);
            std::process::exit(1);
        }
    }

    if !config.enable_tui {
        // Headless run: validate the session and report, nothing else to do
        if let Some(user) = session.user() {
            println!("Session OK: {}", user.email);
        }
        return Ok(());
    }

    let cache = QueryCache::new();
    let notifications = NotificationCenter::new();
    let controller = AssistantController::new(cache.clone(), notifications.clone());

    let app = tui::app::App::new(
        controller,
        cache,
        notifications,
        api,
        session,
        log_buffer,
        event_tx,
        config.assistant.suggestion_limit,
    );

    tracing::info!("Starting TUI");
    if let Err(e) = tui::run_tui(app, event_rx).await {
        tracing::error!("TUI error: {:?}", e);
        return Err(e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize tracing with conditional output
///
/// In TUI mode logs go to the in-app buffer (writing to stdout would garble
/// the display); headless mode logs to stdout. File logging optionally adds
/// a rotating JSON log on top of either.
///
/// Precedence: RUST_LOG env var > config file > default "info"
fn init_tracing(config: &Config, log_buffer: &LogBuffer) {
    let default_filter = format!("corral={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // The guard must stay alive for the life of the program so buffered
    // writes flush; leaking it is the simplest way to pin it
    if config.logging.file_enabled {
        if let Err(e) = std::fs::create_dir_all(&config.logging.file_dir) {
            eprintln!(
                "Warning: Could not create log directory {:?}: {}",
                config.logging.file_dir, e
            );
            init_tracing_without_file(config, log_buffer, filter);
            return;
        }

        let file_appender = match config.logging.file_rotation {
            LogRotation::Hourly => tracing_appender::rolling::hourly(
                &config.logging.file_dir,
                &config.logging.file_prefix,
            ),
            LogRotation::Daily => tracing_appender::rolling::daily(
                &config.logging.file_dir,
                &config.logging.file_prefix,
            ),
            LogRotation::Never => tracing_appender::rolling::never(
                &config.logging.file_dir,
                &config.logging.file_prefix,
            ),
        };

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        if config.enable_tui {
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(TuiLogLayer::new(log_buffer.clone()))
                .with(file_layer)
                .init();
        } else {
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(file_layer)
                .init();
        }
    } else {
        init_tracing_without_file(config, log_buffer, filter);
    }
}

fn init_tracing_without_file(config: &Config, log_buffer: &LogBuffer, filter: EnvFilter) {
    if config.enable_tui {
        tracing_subscriber::registry()
            .with(filter)
            .with(TuiLogLayer::new(log_buffer.clone()))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
