use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tracing::{error, info};

use sitekit_api::routes::api_router;
use sitekit_api::state::AppState;
use sitekit_core::domain::FeatureFlags;
use sitekit_core::services::{MenuService, PageService};
use sitekit_infrastructure::database::connection;
use sitekit_infrastructure::database::postgres::{
    PgMenuRepository, PgPageRepository, PgRedirectRepository,
};
use sitekit_shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize telemetry
    sitekit_shared::telemetry::init_telemetry();

    info!("SiteKit Server starting...");

    // Load configuration
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Connect to Database
    info!("Connecting to database...");
    let pool = connection::create_pool(&config.database.url, config.database.max_connections).await?;
    connection::run_migrations(&pool).await?;
    info!("Database connection established.");

    // Wire repositories and services
    let redirects = Arc::new(PgRedirectRepository::new(pool.clone()));
    let pages = Arc::new(PageService::new(
        Arc::new(PgPageRepository::new(pool.clone())),
        redirects.clone(),
    ));
    let menus = Arc::new(MenuService::new(
        Arc::new(PgMenuRepository::new(pool.clone())),
        redirects,
    ));

    let state = AppState {
        pages,
        menus,
        flags: FeatureFlags::new(config.features.clone()),
        config: config.clone(),
    };

    // Build router
    let app = api_router(state).layer(
        CorsLayer::new()
            .allow_origin("http://localhost:5173".parse::<axum::http::HeaderValue>()?)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::AUTHORIZATION,
            ]),
    );

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
