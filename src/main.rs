mod appointments;
mod auth;
mod booking;
mod config;
mod db;
mod error;
mod lifecycle;
mod middleware;
mod models;
mod notify;
mod policy;
mod projection;
mod reports;
mod routes;
mod store;

use std::sync::Arc;

use crate::{
    config::Config,
    lifecycle::TransitionRules,
    models::AppState,
    notify::LogSink,
    store::postgres::PgStore,
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg.database_url, cfg.db_max_connections).await?;

    if cfg.run_migrations {
        db::run_migrations(&pool).await?;
        tracing::info!("migrations applied");
    }

    let store = Arc::new(PgStore::new(pool));
    let state = AppState {
        appointments: store.clone(),
        registry: store.clone(),
        sessions: store,
        notifier: Arc::new(LogSink),
        rules: TransitionRules {
            strict: cfg.strict_status_transitions,
        },
        low_stock_threshold: cfg.low_stock_threshold,
    };

    tracing::info!(
        strict_status_transitions = cfg.strict_status_transitions,
        low_stock_threshold = cfg.low_stock_threshold,
        "petshop core configured"
    );

    // Browser clients send a preflight before POST/PATCH/DELETE.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
