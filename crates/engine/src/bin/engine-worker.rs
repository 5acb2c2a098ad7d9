//! engine-worker — the detection pipeline as a standalone process.
//!
//! Wires the snapshot poller file, the YAML rule directory (watched for
//! changes), the event history file, and the in-process broadcast
//! channel into one [`Engine`] and drives the tick loop until SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Notify;
use tracing::info;

use skywarden_core::config::{load_dotenv, Config};
use skywarden_core::SharedThresholds;
use skywarden_engine::{Engine, EngineSettings, JsonFileSource};
use skywarden_events::{BroadcastPublisher, EventSink, JsonlHistoryStore, LogDispatcher};
use skywarden_rules::{MemorySharedStore, RuleCache, RuleWatcher, YamlDirSource};

// ── CLI ─────────────────────────────────────────────────────────────

/// Aircraft event-detection engine worker.
#[derive(Parser, Debug)]
#[command(name = "engine-worker", version, about)]
struct Cli {
    /// Aircraft JSON file written by the position poller.
    #[arg(long, env = "SKYWARDEN_AIRCRAFT_JSON", default_value = "data/aircraft.json")]
    aircraft_json: PathBuf,

    /// Override the rules directory from config.
    #[arg(long, env = "SKYWARDEN_RULES_DIR")]
    rules_dir: Option<PathBuf>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let rules_dir = cli.rules_dir.unwrap_or_else(|| config.rules.rules_dir.clone());

    let source = Arc::new(JsonFileSource::new(cli.aircraft_json.clone()));
    let rule_source = Arc::new(YamlDirSource::new(rules_dir.clone()));
    let shared_store = Arc::new(MemorySharedStore::new());
    let cache = Arc::new(RuleCache::new(
        shared_store,
        rule_source,
        std::time::Duration::from_secs(config.cache.ttl_secs),
        std::time::Duration::from_millis(config.cache.shared_timeout_ms),
    ));

    // File changes from the rule-CRUD side invalidate the cache; held
    // for the lifetime of the process.
    let _watcher = RuleWatcher::start(&rules_dir, Arc::clone(&cache))?;

    let publisher = Arc::new(BroadcastPublisher::new(config.events.broadcast_capacity));
    let sink = Arc::new(EventSink::new(
        Arc::new(JsonlHistoryStore::new(config.events.history_path.clone())),
        Arc::clone(&publisher) as Arc<dyn skywarden_events::EventPublisher>,
        Arc::new(LogDispatcher),
        chrono::Duration::seconds(config.events.dedup_window_secs as i64),
    ));

    let settings = EngineSettings {
        tick_interval_secs: config.engine.tick_interval_secs,
        session_timeout_secs: config.engine.session_timeout_secs,
        local_offset_min: config.engine.local_offset_min,
    };
    let thresholds = SharedThresholds::new(config.thresholds.clone());
    let engine = Engine::new(settings, thresholds, source, cache, sink);

    let shutdown = Arc::new(Notify::new());
    let shutdown_signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            shutdown_signal.notify_waiters();
        }
    });

    info!(
        aircraft_json = %cli.aircraft_json.display(),
        rules_dir = %rules_dir.display(),
        "engine-worker starting"
    );
    engine.run(shutdown).await;
    info!("engine-worker exited cleanly");
    Ok(())
}
