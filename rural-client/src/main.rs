//! Point d'entrée CLI pour rural-client

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

use rural_client::cli::{self, Commands};
use rural_client::ClientConfig;

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Gérer les propriétés rurales: import CSV, analyses et rapports
#[derive(Parser)]
#[command(name = "rural")]
#[command(author, version)]
#[command(about = "Gérer les propriétés rurales: import CSV, analyses géospatiales et rapports")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier de configuration JSON
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// URL de l'API (défaut : env RURAL_API_URL / http://localhost:3000)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// URL du WebSocket (défaut : env RURAL_WS_URL / ws://localhost:3001)
    #[arg(long, global = true)]
    ws_url: Option<String>,

    /// Jeton d'accès (défaut : env RURAL_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    let mut config = ClientConfig::resolve(cli.config.as_deref())?;
    config.apply_overrides(cli.api_url, cli.ws_url, cli.token);
    debug!(api = %config.api_base_url, ws = %config.websocket_url, "Configuration loaded");

    cli::run(cli.command, &config).await
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
