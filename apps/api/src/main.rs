mod accounts_client;
mod auth;
mod config;
mod errors;
mod models;
mod routes;
mod signup;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::accounts_client::HttpAccountApi;
use crate::config::Config;
use crate::routes::build_router;
use crate::signup::persistence::{MemoryWizardStore, RedisWizardStore, WizardStore};
use crate::state::AppState;

const MEMORY_SWEEP_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Jobboard API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize session store
    let store: Arc<dyn WizardStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisWizardStore::connect(url, config.session_ttl_secs).await?),
        None => {
            warn!("REDIS_URL not set; signup sessions are kept in process memory");
            let memory = Arc::new(MemoryWizardStore::new(config.session_ttl_secs));
            let sweeper = Arc::clone(&memory);
            tokio::spawn(async move {
                let mut every = tokio::time::interval(Duration::from_secs(MEMORY_SWEEP_SECS));
                loop {
                    every.tick().await;
                    let purged = sweeper.purge_expired().await;
                    if purged > 0 {
                        debug!("Purged {purged} expired signup entries");
                    }
                }
            });
            memory
        }
    };

    // Initialize account backend client
    let accounts = Arc::new(HttpAccountApi::new(&config.accounts_api_url)?);
    info!("Account API client initialized ({})", config.accounts_api_url);
    info!(
        "Resend cooldown: {}s, session TTL: {}s",
        config.resend_cooldown_secs, config.session_ttl_secs
    );

    // Build app state
    let state = AppState {
        store,
        accounts,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the marketing and app domains

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
