use poll_backend::config::Config;
use poll_backend::db::{InMemoryStore, PgStore, init_db};
use poll_backend::error::StartupError;
use poll_backend::startup::{AppState, build_router, spawn_health_check};
use std::sync::Arc;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();

    let app = match config.database_url.clone() {
        Some(database_url) => {
            let pool = init_db(&database_url, config.database_max_connections).await?;
            info!("Using PostgreSQL store");

            let session_store = PostgresStore::new(pool.clone());
            session_store
                .migrate()
                .await
                .map_err(|e| StartupError::SessionStore(e.to_string()))?;

            spawn_health_check(pool.clone());
            let app_state = AppState::new(Arc::new(PgStore::new(pool)), config);
            build_router(app_state, session_store)
        }
        None => {
            warn!("DATABASE_URL not set, polls and sessions are kept in memory");
            let app_state = AppState::new(Arc::new(InMemoryStore::new()), config);
            build_router(app_state, MemoryStore::default())
        }
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("listening on {bind_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
