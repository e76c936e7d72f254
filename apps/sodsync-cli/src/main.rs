//! sodsync CLI
//!
//! Drives separation-of-duties policy reconciliation from the command line:
//! verify connectivity, reconcile the full configuration source, or
//! reconcile a single record by policy name.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::{env, fs};

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;

use sodsync::{ConnectorConfig, SodConnector};

/// Environment variable that overrides the client secret from the
/// configuration file.
const CLIENT_SECRET_ENV: &str = "SODSYNC_CLIENT_SECRET";

#[derive(Parser)]
#[command(name = "sodsync")]
#[command(author, version, about = "Separation-of-duties policy reconciliation")]
struct Cli {
    /// Path to the connector configuration file (JSON)
    #[arg(short, long, global = true, default_value = "sodsync.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify credentials and the policy configuration source
    TestConnection,

    /// Reconcile every SOD policy configuration record
    Reconcile,

    /// Reconcile a single record by policy name
    Policy {
        /// Policy name of the configuration record
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sodsync=debug")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli.config)?;
    let connector = SodConnector::new(config)?;

    match cli.command {
        Commands::TestConnection => {
            connector.test_connection().await?;
            println!("Test Successful");
        }
        Commands::Reconcile => {
            let results = connector.reconcile_all().await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Policy { name } => match connector.reconcile_by_name(&name).await? {
            Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
            None => eprintln!("No SOD policy configuration found by name [{name}]"),
        },
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<ConnectorConfig, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("unable to read {}: {error}", path.display()))?;
    let mut config: ConnectorConfig = serde_json::from_str(&raw)?;
    if let Ok(secret) = env::var(CLIENT_SECRET_ENV) {
        config.client_secret = SecretString::new(secret);
    }
    Ok(config)
}
