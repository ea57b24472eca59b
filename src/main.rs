//! convergence - multi-platform chat bot engine.
//!
//! Runs the engine with the console backend attached: type messages on
//! stdin, read the bot's replies on stdout. `!exit` stops it.

use convergence::config::{Config, validate};
use convergence::console::{self, ConsoleBackend};
use convergence::engine::Engine;
use convergence::store::JsonFileStore;
use convergence::{handlers, metrics};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "convergence.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {}",
            errors.len(),
            config_path
        ));
    }

    info!(
        delimiter = %config.bot.default_delimiter,
        state = %config.state.path,
        "Starting convergence"
    );

    metrics::init();

    let store = Arc::new(JsonFileStore::new(&config.state.path));
    let engine = Engine::new(config, store);
    handlers::register_defaults(&engine);

    let user_name = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
    let console = Arc::new(ConsoleBackend::new(user_name));
    engine.register_backend(console.clone());

    // Aliases bind to commands by name, so restore after registration.
    engine.restore()?;

    let scheduler = engine.spawn_scheduler();

    console::run(Arc::clone(&engine), console).await;

    engine.shutdown();
    if let Err(e) = scheduler.await {
        error!(error = %e, "Scheduler task failed");
    }
    engine.persist();
    info!("Goodbye");
    Ok(())
}
