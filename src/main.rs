#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use anyhow::Result;
use axum::Extension;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::api::Sessions;
use crate::api::router;
use crate::config::Config;
use crate::storage::Memory;
use crate::storage::Postgres;
use crate::storage::Storage;

mod api;
mod config;
mod graceful_shutdown;
mod notes;
mod pagination;
mod password;
mod slug;
mod storage;
mod tags;
#[cfg(test)]
mod tests;
mod token;
mod users;

const DEFAULT_RUST_LOG: &str = "notesphere=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let config = Config::from_env()?;
    let address = config.address;

    let app = setup_app(&config).await?;

    let listener = TcpListener::bind(address).await?;
    tracing::info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` if the database connection or its migrations fail
pub async fn setup_app(config: &Config) -> Result<Router> {
    if let Some(database_url) = &config.database_url {
        let storage = Postgres::connect(database_url).await?;

        Ok(create_router(storage, config))
    } else {
        tracing::warn!("`DATABASE_URL` is not set, using in-memory storage");

        Ok(create_router(Memory::new(), config))
    }
}

/// Create the router for `NoteSphere`
fn create_router<S: Storage>(storage: S, config: &Config) -> Router {
    Router::new()
        .nest("/api", router::<S>())
        .fallback(api::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
        .layer(Extension(Sessions::from_config(config)))
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}
