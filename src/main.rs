mod actors;
mod auth;
mod cache;
mod comments;
mod config;
mod db;
mod entities;
mod error;
mod existence;
mod filter;
mod genres;
mod models;
mod movies;
mod pagination;
mod reconcile;
mod routes;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{cache::CacheManager, config::Config};

pub struct AppState {
    pub config: Arc<Config>,
    pub db: DatabaseConnection,
    pub cache: CacheManager,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,reelhouse=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url).await?;
    let cache = CacheManager::new(db.clone(), config.cache_ttl_seconds);

    let state = Arc::new(AppState { config: config.clone(), db, cache });

    let app = routes::router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .expose_headers([routes::TOTAL_RECORDS]),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
