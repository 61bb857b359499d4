use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use abacus_client::AbacusClient;

mod config;
mod rest;

use config::Config;

pub struct AppState {
    pub abacus: AbacusClient,
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // REST API
        .route("/api/abacus/classify", post(rest::api_classify))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("analyzer_api=info".parse()?)
                .add_directive("abacus_client=info".parse()?),
        )
        .init();

    let config = Config::from_env();

    let mut abacus = AbacusClient::new(
        &config.abacus_deployment_token,
        &config.abacus_deployment_id,
        &config.abacus_api_key,
    );
    if let Some(url) = &config.abacus_api_url {
        abacus = abacus.with_base_url(url);
    }

    let state = Arc::new(AppState { abacus });

    let app = router(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path + status + latency only (no request body)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Content Analyzer API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
