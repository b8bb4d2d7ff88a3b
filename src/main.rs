use std::sync::Arc;

use dotenvy::dotenv;
use log::info;
use tower_http::cors::{Any, CorsLayer};

use deskserver::api_router::configure_api_routes;
use deskserver::config::AppConfig;
use deskserver::shared::state::AppState;
use deskserver::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;
    let pool = create_conn(&config.database_url)?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;

    let app_state = Arc::new(AppState {
        conn: pool,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = configure_api_routes().layer(cors).with_state(app_state);

    info!(
        "Starting HTTP server on {}:{}",
        config.server.host, config.server.port
    );
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
