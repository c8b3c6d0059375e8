//! Screener CLI: polling, single-cycle, session and config commands.
//!
//! Commands:
//! - `watch`: refresh every candle boundary, re-reading the config file each cycle
//! - `once`: run a single cycle and exit
//! - `sessions`: run several configs as independent sessions, streaming their events
//! - `init`: write a starter config file
//! - `defaults`: print the default configuration as JSON

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::info;
use tracing_subscriber::EnvFilter;

use screener_core::config::{FileConfigSource, ScreenerConfig};
use screener_core::data::{CandleProvider, JsonFileStore, MexcProvider};
use screener_runner::{
    CommandNotifier, ConsoleSink, LogNotifier, Notifier, ProviderFactory, RunSignal, Scheduler,
    SchedulerOptions, ScreenerEvent, SessionRegistry, SWEEP_INTERVAL,
};

#[derive(Parser)]
#[command(
    name = "screener",
    about = "Candle screener: RSI, EMA, ATR, Stochastic and regression trend alerts"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    /// Logs go to stderr; stdout carries only command output.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh at every candle boundary until interrupted.
    Watch {
        /// Config file (TOML if the extension is .toml, JSON otherwise).
        #[arg(long, default_value = "config.json")]
        config: PathBuf,

        /// Market data cache file.
        #[arg(long, default_value = "market_data.json")]
        data: PathBuf,

        /// Program run as `PROGRAM TITLE MESSAGE` for each alert (e.g. notify-send).
        #[arg(long)]
        notify_cmd: Option<String>,
    },
    /// Run one refresh cycle and exit.
    Once {
        /// Config file (TOML if the extension is .toml, JSON otherwise).
        #[arg(long, default_value = "config.json")]
        config: PathBuf,

        /// Market data cache file.
        #[arg(long, default_value = "market_data.json")]
        data: PathBuf,

        /// Print the cycle's reports as JSON on stdout.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run each config as its own session and stream events as JSON lines.
    Sessions {
        /// One config file per session.
        #[arg(required = true)]
        configs: Vec<PathBuf>,
    },
    /// Write a starter config file.
    Init {
        #[arg(long, default_value = "config.json")]
        config: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Print the default configuration as JSON.
    Defaults,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Watch {
            config,
            data,
            notify_cmd,
        } => run_watch(&config, &data, notify_cmd),
        Commands::Once { config, data, json } => run_once(&config, &data, json),
        Commands::Sessions { configs } => run_sessions(&configs),
        Commands::Init { config, force } => run_init(&config, force),
        Commands::Defaults => {
            println!("{}", serde_json::to_string_pretty(&ScreenerConfig::default())?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn notifier(notify_cmd: Option<String>) -> Box<dyn Notifier> {
    match notify_cmd {
        Some(cmd) => Box::new(CommandNotifier::new(cmd)),
        None => Box::new(LogNotifier),
    }
}

fn run_watch(config: &Path, data: &Path, notify_cmd: Option<String>) -> Result<()> {
    let provider = MexcProvider::new().context("failed to set up the exchange client")?;
    let mut scheduler = Scheduler::new(
        Box::new(provider),
        Box::new(FileConfigSource::new(config)),
        Box::new(JsonFileStore::new(data)),
        Arc::new(ConsoleSink::new(notifier(notify_cmd))),
        SchedulerOptions::default(),
    );
    info!(config = %config.display(), data = %data.display(), "screener bot started");
    scheduler.run(&RunSignal::running());
    Ok(())
}

fn run_once(config_path: &Path, data: &Path, json: bool) -> Result<()> {
    let config = ScreenerConfig::from_file(config_path)
        .with_context(|| format!("cannot run without a config ({})", config_path.display()))?;
    if config.assets.is_empty() {
        bail!("no assets configured in {}", config_path.display());
    }

    let provider = MexcProvider::new().context("failed to set up the exchange client")?;
    let mut scheduler = Scheduler::new(
        Box::new(provider),
        Box::new(FileConfigSource::new(config_path)),
        Box::new(JsonFileStore::new(data)),
        Arc::new(ConsoleSink::new(Box::new(LogNotifier))),
        SchedulerOptions::default(),
    );
    let summary = scheduler.run_cycle(&config, &RunSignal::running());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary.reports)?);
    }

    if summary.refreshed == 0 && summary.total > 0 {
        bail!("no symbol could be refreshed");
    }
    Ok(())
}

fn run_sessions(configs: &[PathBuf]) -> Result<()> {
    let factory: ProviderFactory = Arc::new(|| {
        let provider: Box<dyn CandleProvider> = Box::new(MexcProvider::new()?);
        Ok(provider)
    });
    let registry = Arc::new(SessionRegistry::new(factory));
    let sweeper_signal = RunSignal::running();
    let sweeper = registry
        .spawn_sweeper(SWEEP_INTERVAL, sweeper_signal.clone())
        .context("failed to start session sweeper")?;

    let mut consumers = Vec::with_capacity(configs.len());
    for (index, path) in configs.iter().enumerate() {
        let config = ScreenerConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        let id = format!("session-{}", index + 1);
        registry
            .start(&id, Some(config))
            .with_context(|| format!("failed to start {id}"))?;
        info!(session = %id, config = %path.display(), "session started");

        let session = registry.get_or_create(&id);
        let consumer = thread::Builder::new()
            .name(format!("{id}-stream"))
            .spawn(move || loop {
                let event = session.next_event();
                let stopped = event == ScreenerEvent::Status { running: false };
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{{\"session\":\"{}\",\"event\":{line}}}", session.id()),
                    Err(e) => tracing::error!(error = %e, "failed to serialize event"),
                }
                if stopped {
                    break;
                }
            })
            .context("failed to spawn stream consumer")?;
        consumers.push(consumer);
    }

    for consumer in consumers {
        if consumer.join().is_err() {
            tracing::error!("stream consumer panicked");
        }
    }
    sweeper_signal.stop();
    if sweeper.join().is_err() {
        tracing::error!("session sweeper panicked");
    }
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let text = ScreenerConfig::starter().to_string_for(path)?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote starter config to {}", path.display());
    Ok(())
}
