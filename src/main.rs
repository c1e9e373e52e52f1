use axum::{routing::get, Router};
use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod db;
mod error;
mod locale;
mod middleware;
mod routes;
mod state;

#[cfg(test)]
mod business_logic_tests;
#[cfg(test)]
mod integration_tests;

use state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SellerDesk backend...");

    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::error!("DATABASE_URL is not set");
            return;
        }
    };

    let pool = match db::init_pool(&database_url).await {
        Ok(pool) => {
            tracing::info!("Database connection established");
            if let Err(e) = db::init_database(&pool).await {
                tracing::error!("Failed to run migrations: {}", e);
            }
            pool
        }
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            return;
        }
    };

    let app_state = AppState { pool };

    let app = Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/ping", get(health))
        .merge(routes::create_router())
        .layer(axum::middleware::from_fn(middleware::auth::auth_middleware))
        .layer(axum::middleware::from_fn(
            middleware::response::wrap_response_middleware,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state);

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr_str = format!("0.0.0.0:{}", port);
    let addr = addr_str.parse::<SocketAddr>().expect("Invalid address");

    tracing::info!("listening on {}", addr);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}

async fn root() -> &'static str {
    "SellerDesk backend is running"
}

async fn health() -> &'static str {
    "ok"
}
