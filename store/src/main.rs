use anyhow::{Context, Result};
use club_directory_store::{create_router, initialize_backend, ServerConfig, StoreConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store_config = StoreConfig::from_env()?;
    let server_config = ServerConfig::from_env()?;

    if let Some(parent) = store_config.database_file().as_deref().and_then(|file| file.parent()) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }
    }

    let app_state = initialize_backend(&store_config).await?;

    if server_config.seed_on_startup {
        match app_state.store.ensure_seeded().await {
            Ok(true) => info!("Loaded demo dataset"),
            Ok(false) => info!("Demo dataset already present"),
            Err(e) => warn!("Failed to seed demo dataset: {}", e),
        }
    }

    let store = app_state.store.clone();
    let router = create_router(app_state, &server_config.allowed_origin)?;

    info!("Starting server on {}", server_config.bind_addr);
    let listener = TcpListener::bind(server_config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", server_config.bind_addr))?;
    info!("Listening on {}", server_config.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutting down");
    store.close().await;
    Ok(())
}
