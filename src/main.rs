use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use chat_relay::config::{Cli, Config};
use chat_relay::server::api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // `.env` is optional; real environment variables win.
    dotenvy::dotenv().ok();

    // Load configuration before logging so `DEBUG` can raise the level.
    let config = Config::load(&cli.config);

    let debug = cli.verbose || config.as_ref().map(|c| c.server.debug).unwrap_or(false);
    let filter = if debug {
        "chat_relay=debug,tower_http=debug"
    } else {
        "chat_relay=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("chat-relay v{}", env!("CARGO_PKG_VERSION"));

    if !cli.config.exists() {
        warn!("Config file not found at {:?}, using defaults", cli.config);
    }

    let mut config = config?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    let config = Arc::new(config);

    info!(
        llm = config.llm.base_url,
        model = config.llm.model,
        temperature = config.llm.temperature,
        tools_api = config.tools.base_url,
        summarize = config.llm.summarize_tool_results,
        "Configuration loaded"
    );

    // Build application state and the HTTP router.
    let state = Arc::new(AppState::new(config.clone())?);
    let app = build_router(state);

    let listen_addr = config.server.listen.clone();
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
