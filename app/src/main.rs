use axum::{middleware, Router};
use clap::Parser;
use common::{auth::auth_middleware, AppState, Config};
use database::Database;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // 1. Initialize Logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load Config from CLI args / environment
    let config = Config::parse();

    // 3. Initialize Database
    let db = Database::new(&config.database_url).await?;
    db.run_migrations().await?;

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
    });

    // 4. Routing: token-protected API behind the Bearer middleware,
    //    signup/signin stay public.
    let protected_routes = Router::<Arc<AppState>>::new()
        .nest("/users", users::handler::users_router(state.clone()))
        .nest("/cards", cards::handler::cards_router(state.clone()))
        .nest("/transfers", transfers::handler::transfers_router(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let app = Router::<Arc<AppState>>::new()
        .nest("/auth", users::handler::auth_router(state.clone()))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // 5. Start Server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
