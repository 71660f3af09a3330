use clap::Parser;
use ernie_relay::{build_router, AppState, RelayConfig, TokenCache};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "ernie-relay",
    about = "Relay adapter for Baidu ERNIE: OpenAI-compatible API in, Wenxin Workshop out",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ernie_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = RelayConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }

    // Validate the credential eagerly; a bad env var should fail at boot,
    // not on the first request.
    let _credential = config.resolve_credential()?;

    info!("ernie-relay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Base URL:   {}", config.channel.base_url);
    info!("  Token URL:  {}", config.channel.token_url);
    info!("  Credential: ${}", config.channel.key_env);
    info!("  Port:       {}", config.port);
    info!("  Models:     {} overrides", config.models.len());

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let tokens = TokenCache::new(&config.channel.token_url)?;

    let state = Arc::new(AppState {
        config: config.clone(),
        client,
        tokens,
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
