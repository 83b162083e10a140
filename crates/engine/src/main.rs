//! Snowball Engine - Main entry point.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snowball_engine::api::http;
use snowball_engine::infrastructure::{
    accounts::InMemoryAccountRepo, auth::JwtTokenVerifier, clock::SystemRandom,
    settings::EngineConfig,
};
use snowball_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine is usually run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snowball_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Snowball Engine");

    // Load configuration
    let config = EngineConfig::from_env()?;

    let accounts = match &config.accounts_file {
        Some(path) => InMemoryAccountRepo::from_file(path)?,
        None => {
            tracing::warn!("ACCOUNTS_FILE not set, starting with no accounts");
            InMemoryAccountRepo::new()
        }
    };
    let tokens = JwtTokenVerifier::new(&config.secret_key);

    // Only in-process adapters ship in this binary. Starting one process per
    // shared backplane with them would split room membership.
    if let Some(url) = &config.backplane_url {
        anyhow::bail!("backplane configured at {url} but no shared relay adapter is available");
    }

    let bind_addr = config.bind_addr();
    let namespace = config.namespace.clone();
    let app = Arc::new(
        App::new(
            config,
            Arc::new(accounts),
            Arc::new(tokens),
            Arc::new(SystemRandom::new()),
        )
        .await,
    );

    let router = http::router(app);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(address = %bind_addr, namespace = %namespace, "Listening");

    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
