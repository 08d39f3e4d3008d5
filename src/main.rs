use marquee_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, Cache},
    logging::init_logging,
    services::TmdbProvider,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env()?;

    // Caching is optional; without Redis every request goes to TMDB
    let (cache, cache_handle) = match config.redis_url.as_deref() {
        Some(redis_url) => {
            let (cache, handle) = Cache::new(create_redis_client(redis_url)?).await;
            tracing::info!("Redis cache enabled");
            (Some(cache), Some(handle))
        }
        None => {
            tracing::warn!("REDIS_URL not set, caching disabled");
            (None, None)
        }
    };

    let provider = TmdbProvider::new(config.tmdb_api_key.clone(), config.tmdb_api_url.clone(), cache);
    let state = AppState::with_tmdb(provider, config.mutation_timeout())
        .with_view_limits(config.view_limits());
    let sweeper = state.spawn_view_sweeper();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
