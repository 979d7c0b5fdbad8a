use color_eyre::eyre::Result;
use echoprobe::{Coordinator, EchoHandler, EnvSource, Logger, ServerConfig, SharedHandler};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("echoprobe=info")),
        )
        .init();

    println!("Starting server...");

    let source = EnvSource::with_dotenv(".env").unwrap_or_else(|e| {
        warn!(error = %e, "Error loading .env file");
        EnvSource::new()
    });
    let config = ServerConfig::from_source(&source);
    for endpoint in &config.endpoints {
        info!(%endpoint, "Configured listener");
    }

    let handler: SharedHandler = Arc::new(Logger::new(EchoHandler::new()));
    let reason = Coordinator::new(config).run(handler).await;

    info!(%reason, "Server stopped");
    Ok(())
}
