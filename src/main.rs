use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use axum::Router;
use release_api::{
    config::AppConfig,
    routes,
    services::{
        cache::{CacheStore, RedisStore},
        object_store::{ObjectStore, S3Gateway},
        release_service::ReleaseService,
    },
};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::info!("Starting release-api with config: {:?}", cfg);

    // --- Object-store client ---
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = cfg.region.clone() {
        loader = loader.region(Region::new(region));
    }
    let aws_config = loader.load().await;
    let s3 = aws_sdk_s3::Client::new(&aws_config);
    let store: Arc<dyn ObjectStore> = Arc::new(S3Gateway::new(s3, cfg.bucket.clone()));

    // --- Cache connection pool ---
    let cache: Arc<dyn CacheStore> = Arc::new(
        RedisStore::connect(&cfg.redis_url, cfg.cache_pool_min, cfg.cache_pool_max).await?,
    );
    tracing::info!("Cache pool connected at {}", cfg.redis_url);

    // --- Initialize core service ---
    let service = ReleaseService::new(
        cache,
        store,
        cfg.releases_prefix.clone(),
        cfg.auth_secret.clone(),
    );

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolve when the process receives SIGINT or SIGTERM, letting in-flight
/// downloads finish before the listener closes.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down server...");
}
