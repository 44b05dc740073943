use anyhow::Result;
use tracing::info;

use language_links::config::Config;
use language_links::server::{self, AppState};
use language_links::store::Database;
use language_links::token::TokenService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("language_links=info".parse()?),
        )
        .init();

    info!("Starting language links service");

    // Load configuration from environment
    let config = Config::from_env()?;

    // Open the store; Database::open logs the operator diagnostic on failure
    let db = Database::open(&config.database_path)?;

    let tokens = TokenService::new(config.token_secret.clone());
    let state = AppState::new(db, tokens, config.api_key.clone());

    server::serve(state, config.port).await
}
