use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use ogma_prime::config::{GatewayConfig, CONFIG_ENV_VAR};
use ogma_prime::store;

#[derive(Parser)]
#[command(name = "ogma", version)]
#[command(about = "HTTP gateway answering traversal queries from a graph store")]
struct Cli {
    /// Path to a configuration file
    #[arg(short, long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bootstrap and initialize the store
    Init,
    /// Show configuration settings and exit
    ShowConfig,
    /// Serve HTTP
    #[command(visible_aliases = ["s", "srv"])]
    Serve,
    /// Dump store contents
    Dump,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Warn)
        .filter_module("mongodb", log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GatewayConfig::load_from(cli.config.as_deref())
        .context("Cannot load configuration file")?;

    match cli.command {
        Command::Init => {
            store::init(&config)
                .await
                .context("Could not bootstrap database")?;
        }
        Command::ShowConfig => {
            let json = config
                .to_pretty_json()
                .context("Cannot dump configuration data")?;
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", json)?;
        }
        Command::Serve => {
            ogma_prime::run_server(&config).await?;
        }
        Command::Dump => {
            let handle = store::open(&config)
                .await
                .context("Cannot connect to store")?;
            let mut out = std::io::stdout().lock();
            let written = store::dump(handle.as_ref(), &mut out).await;
            handle.close().await;
            written?;
        }
    }

    Ok(())
}
