use anyhow::{bail, Context, Result};
use std::sync::Arc;

use mediagate::api::{self, AppState};
use mediagate::cli::{Cli, Commands};
use mediagate::core::{init_logger, Config};
use mediagate::extract::{MediaExtractor, YtDlpExtractor};
use mediagate::instagram::InstagramClient;
use mediagate::normalize::normalize;

fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(path) = cli.config.as_deref() {
        if !path.exists() {
            bail!("Config file {} does not exist", path.display());
        }
    }
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present, before figment reads them
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    let config = load_config(&cli)?;
    init_logger(&config.logging)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Extract { url, format } => extract_once(config, &url, &format).await,
    }
}

async fn run_server(config: Config) -> Result<()> {
    let extractor = YtDlpExtractor::new(config.extractor.clone());
    match extractor.version().await {
        Ok(version) => tracing::info!("Using yt-dlp {}", version),
        Err(e) => tracing::warn!("yt-dlp is not usable yet, /download will fail: {}", e),
    }

    let accounts = InstagramClient::new(config.instagram.clone()).context("Failed to build Instagram client")?;
    let state = AppState::new(config, Arc::new(extractor), Arc::new(accounts));

    api::serve(state).await.context("HTTP server failed")
}

async fn extract_once(config: Config, raw_url: &str, selector: &str) -> Result<()> {
    let url = api::handlers::validate_url(Some(raw_url))?;
    let selector = api::handlers::validate_selector(Some(selector))?;
    let extractor = YtDlpExtractor::new(config.extractor.clone());

    let Some(media) = extractor.extract(&url).await? else {
        bail!("No media information found for {}", url);
    };
    let normalized = normalize(&media, url.as_str(), &selector, &config.limits);
    println!("{}", serde_json::to_string_pretty(&normalized)?);
    Ok(())
}
