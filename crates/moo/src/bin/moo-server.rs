//! Runs the Moo game service against a SQLite database until Ctrl-C.

use moo::prelude::*;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), MooError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,moo=debug".into()),
        )
        .init();

    let config = MooConfig::from_env()?;
    let store = SqliteStore::open(&config.db_path)?;
    info!(db_path = %config.db_path.display(), "database ready");

    let server = MooServer::new(store, DevAuthenticator, &config);
    server.start_cleanup();

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    info!("shutting down");
    server.shutdown().await;
    Ok(())
}
