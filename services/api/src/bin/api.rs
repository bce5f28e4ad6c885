//! services/api/src/bin/api.rs

use api_lib::{
    adapters::OpenAiDebateAdapter,
    config::Config,
    error::ApiError,
    web::{entitlements_handler, rest::ApiDoc, state::AppState, ws_handler},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use study_session_core::EntitlementPolicy;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Dialogue Adapter ---
    let mut openai_config = OpenAIConfig::new().with_api_key(config.require_openai_api_key()?);
    if let Some(base) = &config.openai_api_base {
        info!("Using OpenAI-compatible endpoint at {}", base);
        openai_config = openai_config.with_api_base(base);
    }
    let openai_client = Client::with_config(openai_config);

    let dialogue = Arc::new(
        OpenAiDebateAdapter::new(
            openai_client,
            config.debate_model.clone(),
            config.judge_model.clone(),
        )
        .with_limits(config.material_context_chars, config.history_window),
    );

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        dialogue,
        policy: EntitlementPolicy::default(),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Startup(format!(
            "Invalid CORS_ORIGIN '{}': {}",
            config.cors_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // --- 4. Create the Web Router ---
    let api_router = Router::new()
        .route("/entitlements", get(entitlements_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
