//! Parley API server entry point.

use std::sync::Arc;

use parley_api::config::Config;
use parley_api::error::AppError;
use parley_api::identity::HttpIdentityDirectory;
use parley_api::platform::Platform;
use parley_core::clock::SystemClock;
use parley_gateway::TokenVerifier;
use parley_projection::PgReadModelStore;
use parley_store::pg_chat_repository::PgChatRepository;
use parley_store::schema::MIGRATOR;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Parley API server");

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    let pem = tokio::fs::read(&config.jwt_public_key_path)
        .await
        .map_err(|e| AppError::Key(format!("{}: {e}", config.jwt_public_key_path.display())))?;
    let verifier = TokenVerifier::from_rsa_pem(&pem).map_err(|e| AppError::Key(e.to_string()))?;
    let identity = HttpIdentityDirectory::new(
        &config.identity_service_url,
        config.collaborator_policy.timeout,
    )?;

    let platform = Platform::start(
        &config,
        Arc::new(SystemClock),
        Arc::new(PgChatRepository::new(pool.clone())),
        Arc::new(PgReadModelStore::new(pool)),
        Arc::new(identity),
        verifier,
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = parley_api::router(platform.state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_address()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    platform.shutdown();
    Ok(())
}
