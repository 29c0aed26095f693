use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use handlers::{health_check, schema_handler, translate_handler};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
};

use crate::config::ServerConfig;
use crate::schema_builder::CompiledSchema;

pub mod handlers;
pub mod models;

/// Shared by every handler. The compiled schema is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub schema: Arc<CompiledSchema>,
    pub config: ServerConfig,
}

pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .route("/health", get(health_check))
        .route("/schema", get(schema_handler))
        .route("/translate", post(translate_handler))
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(RequestBodyLimitLayer::new(body_limit))
                .layer(TimeoutLayer::new(timeout)),
        )
        .with_state(Arc::new(state))
}

/// Compile the configured type definitions and serve until Ctrl+C.
pub async fn run_with_config(config: ServerConfig) {
    log::info!(
        "Server configuration: http={}:{}, type_defs={}, max_depth={}",
        config.http_host,
        config.http_port,
        config.type_defs,
        config.max_depth
    );

    let type_defs = match std::fs::read_to_string(&config.type_defs) {
        Ok(type_defs) => type_defs,
        Err(e) => {
            log::error!("✗ Failed to read type definitions {}: {}", config.type_defs, e);
            std::process::exit(1);
        }
    };
    let schema = match CompiledSchema::from_sdl(&type_defs) {
        Ok(schema) => schema,
        Err(e) => {
            log::error!("✗ Failed to compile type definitions: {}", e);
            std::process::exit(1);
        }
    };
    log::info!(
        "✓ Compiled {} node types into {} root fields",
        schema.model.nodes().count(),
        schema.root_fields.len()
    );

    let http_bind_address = format!("{}:{}", config.http_host, config.http_port);
    let app = router(AppState {
        schema: Arc::new(schema),
        config: config.clone(),
    });

    let http_listener = match TcpListener::bind(&http_bind_address).await {
        Ok(listener) => {
            log::info!("Successfully bound HTTP listener to {}", http_bind_address);
            listener
        }
        Err(e) => {
            log::error!(
                "Failed to bind HTTP listener to {}: {}",
                http_bind_address,
                e
            );
            log::error!("  Is another process using port {}?", config.http_port);
            std::process::exit(1);
        }
    };

    println!("graphcypher server is running");
    println!("  HTTP API: http://{}", http_bind_address);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Shutdown signal received");
    };
    if let Err(e) = axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        log::error!("HTTP server error: {}", e);
    }
}
