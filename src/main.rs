use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stats_window::classify::KeyClassifier;
use stats_window::config::AppConfig;
use stats_window::fetch::HttpStatsSource;
use stats_window::report::{PlayerReporter, ReportMode, ReportOptions};
use stats_window::retrieve::RetrievalStrategy;
use stats_window::{parse_time, TimeWindow};

#[derive(Parser)]
#[command(name = "stats-window")]
#[command(about = "Player stats for any time window, from cumulative upstream snapshots")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
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
    /// Build a stats report for one account
    Report {
        /// Upstream account ID
        account_id: String,

        /// Window start (epoch seconds or YYYY-MM-DD); default is lifetime
        #[arg(long)]
        from: Option<String>,

        /// Window end (epoch seconds or YYYY-MM-DD); default is now
        #[arg(long)]
        to: Option<String>,

        /// Use a season from the config instead of --from/--to
        #[arg(long, conflicts_with_all = ["from", "to"])]
        season: Option<String>,

        /// Taxonomy filter token (e.g. solo, ranked, zeroBuild, bots)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Restrict raw output to this stat kind (e.g. kills, wins)
        #[arg(long = "stat")]
        stats: Vec<String>,

        /// Output shape: structured, raw or trn
        #[arg(long, default_value = "structured")]
        mode: ReportMode,

        /// Single upstream query instead of snapshot subtraction
        #[arg(long)]
        direct: bool,

        /// Write JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show how stat keys are classified
    Classify {
        keys: Vec<String>,
    },

    /// List configured seasons
    Seasons,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };

    // Initialize tracing
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("Starting stats-window v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Report {
            account_id,
            from,
            to,
            season,
            filters,
            stats,
            mode,
            direct,
            output,
        } => {
            let window = match season {
                Some(name) => config.season_window(&name)?,
                None => {
                    let start = match from {
                        Some(s) => parse_time(&s)
                            .with_context(|| format!("Invalid --from time: {}", s))?,
                        None => config.retrieval.origin_time,
                    };
                    let end = match to {
                        Some(s) => {
                            parse_time(&s).with_context(|| format!("Invalid --to time: {}", s))?
                        }
                        None => Utc::now().timestamp(),
                    };
                    TimeWindow::new(start, end)?
                }
            };

            let source = HttpStatsSource::new(config.api.source_config())?;
            let reporter = PlayerReporter::new(
                Arc::new(source),
                config.taxonomy.clone(),
                config.retrieval.origin_time,
            );

            let options = ReportOptions {
                filters,
                stat_kinds: stats,
                mode,
                strategy: if direct {
                    RetrievalStrategy::Direct
                } else {
                    config.retrieval.strategy
                },
            };

            let report = reporter
                .get_player_report(&account_id, window, &options)
                .await?;
            let json = serde_json::to_string_pretty(&report)?;

            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!("Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Classify { keys } => {
            if keys.is_empty() {
                bail!("Pass at least one stat key");
            }
            let classifier = KeyClassifier::new(config.taxonomy.clone());
            for key in keys {
                let class = classifier.classify(&key);
                println!("{}\t{}", key, serde_json::to_string(&class)?);
            }
        }
        Commands::Seasons => {
            if config.seasons.is_empty() {
                println!("No seasons configured.");
            } else {
                for season in &config.seasons {
                    println!("  {}: {} to {}", season.name, season.start, season.end);
                }
            }
        }
    }

    Ok(())
}
