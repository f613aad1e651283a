use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use royale_leaderboard::api::state::AppState;
use royale_leaderboard::api::{build_router, cors_layer};
use royale_leaderboard::config::AppConfig;
use royale_leaderboard::leaderboard::LeaderboardService;
use royale_leaderboard::upstream::ClashRoyaleClient;

#[derive(Parser)]
#[command(name = "royale-leaderboard")]
#[command(about = "Cached Clash Royale top-player leaderboard")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,
    },

    /// Fetch the leaderboard once and print it as JSON
    Fetch {
        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(Path::new(&cli.config))
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_tracing(log_level, cli.json_logs);

    tracing::info!("Starting royale-leaderboard v{}", env!("CARGO_PKG_VERSION"));

    let token = config.upstream.token()?;
    let client = ClashRoyaleClient::new(
        config.upstream.parsed_base_url()?,
        &token,
        config.upstream.timeout(),
    )?;
    let leaderboard = Arc::new(LeaderboardService::new(
        Arc::new(client),
        &config.leaderboard,
    ));

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let state = AppState { leaderboard };
            let app = build_router(state).layer(cors_layer(&config.server.cors_origin)?);

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind to {}", addr))?;
            tracing::info!("Server is running at http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Fetch { pretty } => {
            let players = leaderboard.refresh().await?;
            let output = if pretty {
                serde_json::to_string_pretty(players.as_ref())?
            } else {
                serde_json::to_string(players.as_ref())?
            };
            println!("{}", output);
        }
    }

    Ok(())
}
