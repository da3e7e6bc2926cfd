mod api;
mod assets;
mod auth;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState, UploadSettings},
    assets::LocalAssetStore,
    auth::{AdminCredentials, TokenService},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = catalog_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting catalog server");

    let pool_config = catalog_db::PoolConfig::from_app_config(&config);
    let pool = catalog_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = catalog_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let tokens = TokenService::from_config(&config)?;
    let auth = AuthState::new(tokens, AdminCredentials::from_config(&config));

    let uploads = UploadSettings::from_config(&config);
    tokio::fs::create_dir_all(&uploads.dir).await?;
    let assets = LocalAssetStore::new(
        uploads.dir.clone(),
        &config.public_base_url,
        config.upload_max_bytes,
    );

    let state = AppState {
        pool,
        assets: Arc::new(assets),
        auth,
    };
    let app = build_app(state, default_rate_limit_state(), &uploads);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
