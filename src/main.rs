use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use suichat::Config;
use suichat::channels::web::{AppState, start_server};
use suichat::llm::OpenRouterProvider;
use suichat::media::{FreeImageHost, HuggingFaceImageGenerator};

#[derive(Debug, Parser)]
#[command(name = "suichat", version, about = "Conversational Sui wallet backend")]
struct Cli {
    /// Explicit TOML settings file (default: ~/.suichat/config.toml if present).
    #[arg(long, env = "SUICHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("suichat=info,tower_http=info"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    let mut config =
        Config::from_env_with_toml(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(host) = cli.host {
        config.http.host = host;
    }
    if let Some(port) = cli.port {
        config.http.port = port;
    }

    if config.llm.api_key.is_none() {
        tracing::warn!("OPEN_ROUTER_TOKEN is not set; chat requests will fail until it is");
    }
    if config.media.hf_token.is_none() {
        tracing::warn!("HF_TOKEN is not set; NFT images will be left empty");
    }

    let llm = Arc::new(OpenRouterProvider::new(&config.llm));
    let images = Arc::new(HuggingFaceImageGenerator::new(&config.media));
    let image_host = Arc::new(FreeImageHost::new(&config.media));
    let state = Arc::new(
        AppState::new(&config, llm, images, image_host).context("failed to build app state")?,
    );

    let addr: SocketAddr = format!("{}:{}", config.http.host, config.http.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.http.host, config.http.port
            )
        })?;
    let bound = start_server(addr, Arc::clone(&state)).await?;

    tracing::info!(
        %bound,
        model = %config.llm.model,
        network = %config.routing.network,
        strict_mode_routing = config.routing.strict_mode_routing,
        "suichat ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    if let Some(tx) = state.shutdown_tx.write().await.take() {
        let _ = tx.send(());
    }
    // Let in-flight requests drain.
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    Ok(())
}
