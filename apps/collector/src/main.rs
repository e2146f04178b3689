use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modem_cell::{JsonLinesSink, LogSink, MetricSink, ModemCollectorService, PutvalSink};
use shared_config::{AppConfig, ModemInstanceConfig, SinkKind};

#[derive(Parser)]
#[command(name = "modem-collector", version, about = "Report LTE modem statistics to collectd")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run read cycles at the configured interval until interrupted (default)
    Run,
    /// Run a single read cycle and exit
    Once,
    /// Fetch one modem and print what would be reported without dispatching
    Probe {
        /// Modem root URL or hostname, e.g. http://192.168.1.254/
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // stdout carries the PUTVAL stream, so logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Once => {
            if !config.is_configured() {
                warn!("No modem instances configured, nothing to collect");
            }
            let collector = ModemCollectorService::new(&config, create_sink(&config));
            collector.run_cycle().await;
            Ok(())
        }
        Command::Probe { url } => probe(&config, &url).await,
    }
}

fn create_sink(config: &AppConfig) -> Arc<dyn MetricSink> {
    match config.sink {
        SinkKind::Putval => Arc::new(PutvalSink::stdout(
            config.collectd_hostname.clone(),
            config.interval_secs,
        )),
        SinkKind::Json => Arc::new(JsonLinesSink::stdout()),
        SinkKind::Log => Arc::new(LogSink),
    }
}

async fn run(config: &AppConfig) -> Result<()> {
    if !config.is_configured() {
        bail!("No modem instances configured, set MODEM_CONFIG_FILE or MODEM_INSTANCES");
    }

    let collector = ModemCollectorService::new(config, create_sink(config));
    info!(
        "Starting modem collector for {} modem(s), every {}s",
        collector.instances().len(),
        config.interval_secs
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                collector.run_cycle().await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn probe(config: &AppConfig, url: &str) -> Result<()> {
    let root = ModemInstanceConfig::new("probe", url).root_url();
    let collector = ModemCollectorService::new(config, Arc::new(LogSink));

    let report = collector
        .probe(&root)
        .await
        .with_context(|| format!("Failed to fetch stats from {}", root))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
