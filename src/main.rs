use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use idstriage::alert::Alert;
use idstriage::config::{Config, LoggingConfig};

#[derive(Parser)]
#[command(
    name = "idstriage",
    about = "Local-LLM triage for Suricata IDS alerts",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service (alert intake + query API)
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Triage a single alert JSON object and print the verdict
    Analyze {
        /// File holding the alert; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Check whether the inference endpoint is reachable
    Health,

    /// Replay a Suricata EVE JSON-lines file through the pipeline once
    Replay {
        /// EVE file (e.g. /var/log/suricata/eve.json)
        file: PathBuf,

        /// Pause between alerts in milliseconds (overrides config)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Submit every event, not only event_type "alert"
        #[arg(long)]
        all_events: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let resolved = Config::resolve(cli.config.as_deref())?;
    init_tracing(&resolved.config.logging);
    resolved.log();
    let mut config = resolved.config;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, model = %config.model.name, "Starting idstriage daemon");
            idstriage::serve(&config).await?;
        }
        Commands::Analyze { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read alert from stdin")?;
                    buf
                }
            };
            let value: serde_json::Value =
                serde_json::from_str(&raw).context("alert is not valid JSON")?;
            let alert = Alert::from_value(value)
                .ok_or_else(|| anyhow::anyhow!("alert must be a JSON object"))?;

            let resolver = idstriage::resolver_from_config(&config)?;
            let resolution = resolver.resolve(&alert).await;
            tracing::info!(source = %resolution.source, "verdict resolved");
            println!("{}", serde_json::to_string_pretty(&resolution.verdict)?);
        }
        Commands::Health => {
            let resolver = idstriage::resolver_from_config(&config)?;
            if resolver.check_model_health().await {
                println!("{}: online ({})", config.model.endpoint, config.model.name);
            } else {
                println!("{}: offline", config.model.endpoint);
                std::process::exit(1);
            }
        }
        Commands::Replay {
            file,
            delay_ms,
            all_events,
        } => {
            let pool = idstriage::storage::open_pool(&config.storage.db_path)?;
            let resolver = idstriage::resolver_from_config(&config)?;
            let opts = idstriage::replay::ReplayOptions {
                delay: Duration::from_millis(delay_ms.unwrap_or(config.replay.delay_ms)),
                all_events,
            };

            let summary = idstriage::replay::replay_file(&file, &pool, &resolver, &opts).await?;
            println!(
                "Replayed {}: {} submitted, {} skipped, {} invalid, {} failed",
                file.display(),
                summary.submitted,
                summary.skipped,
                summary.invalid,
                summary.failed
            );
        }
    }

    Ok(())
}
