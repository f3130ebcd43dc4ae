// Fantasy XI entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load the team catalog
// 4. Build the assistant and image capabilities
// 5. Create mpsc channels and the application state
// 6. Spawn app logic task
// 7. Run the console until the user quits
// 8. Cleanup on exit

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use xi_app::app::{self, AppState};
use xi_app::images::image_lookup_from_config;
use xi_cli::console;
use xi_core::catalog::Catalog;
use xi_core::config::{self, Config};
use xi_llm::client::LlmClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Fantasy XI starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: budget {}, {} players, {} teams, quotas {}",
        config.squad.budget_cap,
        config.squad.max_players,
        config.squad.max_teams,
        if config.squad.enforce_quotas { "enforced" } else { "display-only" }
    );

    // 3. Load the team catalog
    let catalog = load_catalog(&config).context("failed to load team catalog")?;
    info!("Catalog ready: {} teams", catalog.list_teams().len());

    // 4. Assistant and image capabilities
    let llm_client = LlmClient::from_config(&config);
    match &llm_client {
        LlmClient::Active(_) => info!("Assistant enabled (API key configured)"),
        LlmClient::Disabled => info!("Assistant disabled (no API key), using placeholder replies"),
    }
    let images = image_lookup_from_config(&config.images);

    // 5. Channels and state
    let (llm_tx, llm_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let state = AppState::new(config, catalog, Arc::new(llm_client), images, llm_tx);

    // 6. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(llm_rx, cmd_rx, ui_tx, state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. Console (returns when the user quits or stdin closes)
    if let Err(e) = console::run(ui_rx, cmd_tx).await {
        error!("Console error: {}", e);
    }

    // 8. Cleanup: wait for app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Fantasy XI shut down cleanly");
    Ok(())
}

/// Use the CSV files named in config, or the built-in catalog.
fn load_catalog(config: &Config) -> anyhow::Result<Catalog> {
    match (&config.data.teams, &config.data.players) {
        (Some(teams), Some(players)) => Ok(Catalog::from_paths(Path::new(teams), Path::new(players))?),
        _ => Ok(Catalog::builtin()?),
    }
}

/// Initialize tracing to log to a file (not the terminal, which is used by the console).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("fantasy-xi.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("xi_cli=info,xi_app=info,xi_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
