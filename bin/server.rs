// Canvass - Voter-Contact Progress Tracker - Web Server

use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use canvass::{build_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    if !std::path::Path::new(&config.db_path).exists() {
        anyhow::bail!(
            "Database not found at {} - run `canvass seed` to provision it first",
            config.db_path
        );
    }

    let conn = Connection::open(&config.db_path)?;
    canvass::setup_database(&conn)?;
    tracing::info!(db = %config.db_path, "database opened");

    let addr = config.bind_addr.clone();
    let state = AppState::new(conn, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "canvass server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
