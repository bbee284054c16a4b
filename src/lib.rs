mod authentication;
mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod handlers;
mod models;
pub mod ranking;
pub mod voting;

use anyhow::Context;
pub use anyhow::Result;
use axum::http::StatusCode;
use axum::{middleware, routing::*, Extension, Json, Router};
pub use authentication::AuthKeys;
pub use config::Config;
pub use data_formats::*;
pub use errors::{RequestError, RequestErrorJsonWrapper};
use handlers::*;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use std::{
    net::{SocketAddr, TcpListener},
    str::FromStr,
    sync::Arc,
    time::Duration,
};
use tower_http::trace::TraceLayer;

pub type JsonResponse<T> = (StatusCode, Json<T>);

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run_app(config: Config) -> Result<()> {
    let pool = init_db(&config.database_url).await?;
    let keys = AuthKeys::new(&config.jwt_secret, config.jwt_expiry_days);
    let listener = bind_listener(config.address)?;
    tracing::info!(address = %config.address, "server started");
    serve(listener, build_app(pool, keys)).await
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

/// Creates the database file if needed, then connects and migrates.
pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!(db_url, "creating database");
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("Failed to create database {db_url}"))?;
    } else {
        tracing::info!(db_url, "database already exists");
    }
    let options = SqliteConnectOptions::from_str(db_url).context("DATABASE_URL is not valid")?;
    connect_db_with(options).await
}

pub async fn connect_db_with(options: SqliteConnectOptions) -> Result<SqlitePool> {
    let options = options
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("migrations completed");
    Ok(pool)
}

pub fn bind_listener(address: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(address).with_context(|| format!("Could not bind {address}"))
}

pub fn build_app(pool: SqlitePool, keys: AuthKeys) -> Router {
    make_router()
        .layer(middleware::from_fn(authentication::reject_invalid_tokens))
        .layer(Extension(Arc::new(pool)))
        .layer(Extension(Arc::new(keys)))
        .layer(TraceLayer::new_for_http())
}

pub fn make_router() -> Router {
    Router::new()
        .route("/api/health", get(alive))
        .route("/api/register", post(register_user))
        .route("/api/login", post(login_user))
        .route("/api/user", get(get_current_user).put(update_user))
        .route("/api/users/:id", get(get_user_profile))
        .route("/api/tags", get(list_tags))
        .route("/api/prompts", get(list_prompts).post(create_prompt))
        .route(
            "/api/prompts/:id",
            get(get_prompt).put(update_prompt).delete(delete_prompt),
        )
        .route("/api/prompts/:id/versions", get(list_versions))
        .route("/api/prompts/:id/vote", post(vote_prompt))
        .route("/api/prompts/:id/vote-state", get(get_vote_state))
        .route("/api/prompts/:id/star", post(toggle_star))
        .route("/api/prompts/:id/stars", get(get_stars))
        .route("/api/prompts/:id/fork", post(fork_prompt))
        .route("/api/prompts/:id/forks", get(get_forks))
        .route(
            "/api/prompts/:id/comments",
            get(list_comments).post(add_comment),
        )
        .route("/api/prompts/:id/issues", get(list_issues).post(open_issue))
        .fallback(not_found)
}
