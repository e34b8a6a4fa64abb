//! SENTINEL: token market monitor.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the observation store, wires the data sources and alert
//! channels into the pipeline, and polls on a fixed interval until
//! Ctrl+C.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use sentinel::alerts::telegram::{TelegramNotifier, TelegramTradeRelay};
use sentinel::alerts::Notifier;
use sentinel::config::AppConfig;
use sentinel::dashboard::{self, DashboardState};
use sentinel::engine::{AnomalyScanner, Collaborators, Pipeline, PipelineSettings};
use sentinel::sources::dexscreener::DexScreenerClient;
use sentinel::sources::rugcheck::RugcheckClient;
use sentinel::storage::ObservationStore;
use sentinel::strategy::Blacklist;

const BANNER: &str = r#"
 ____  _____ _   _ _____ ___ _   _ _____ _
/ ___|| ____| \ | |_   _|_ _| \ | | ____| |
\___ \|  _| |  \| | | |  | ||  \| |  _| | |
 ___) | |___| |\  | | |  | || |\  | |___| |___
|____/|_____|_| \_| |_| |___|_| \_|_____|_____|

  Token market monitor: rug & pump detection
  v0.1.0
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("SENTINEL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        name = %cfg.monitor.name,
        tokens = cfg.monitor.tracked_tokens.len(),
        interval_secs = cfg.monitor.update_interval_secs,
        "SENTINEL starting up"
    );

    // -- Initialise components -------------------------------------------

    let store = ObservationStore::open(&cfg.storage.database_path).await?;

    let blacklist =
        Blacklist::new(cfg.blacklist.coins.clone(), cfg.blacklist.devs.clone()).into_shared();

    let fetch_timeout = Duration::from_secs(cfg.sources.fetch_timeout_secs);
    let market = DexScreenerClient::new(&cfg.sources.dex_api_url, fetch_timeout)?;
    let risk = RugcheckClient::new(&cfg.sources.rugcheck_api_url, fetch_timeout)?;
    info!(market = market.name(), risk = risk.name(), "Data sources ready");

    let notifier: Arc<dyn Notifier> = Arc::new(build_notifier(&cfg)?);
    let trade_relay = TelegramTradeRelay::new(
        Arc::clone(&notifier),
        &cfg.trade_relay.command_prefix,
        &cfg.trade_relay.trade_command,
        cfg.trade_relay.enabled,
    );
    if !cfg.trade_relay.enabled {
        warn!("Trade relay disabled, pump trades will only be logged");
    }

    let pipeline = Pipeline::new(
        Collaborators {
            market: Arc::new(market),
            risk: Arc::new(risk),
            notifier,
            trade_relay: Arc::new(trade_relay),
        },
        store.clone(),
        Arc::clone(&blacklist),
        PipelineSettings::from_config(&cfg),
    );

    let dashboard_state = Arc::new(DashboardState::new(
        &cfg.monitor.name,
        cfg.monitor.tracked_tokens.len(),
        store.clone(),
        blacklist,
    ));
    if cfg.dashboard.enabled {
        let port = cfg.dashboard.port;
        if let Err(e) = dashboard::spawn_dashboard(Arc::clone(&dashboard_state), port).await {
            error!(error = %e, "Dashboard failed to start, continuing without it");
        }
    }

    let scanner = cfg
        .analytics
        .enabled
        .then(|| AnomalyScanner::from_config(&cfg.analytics));

    // -- Main loop -------------------------------------------------------

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut interval =
        tokio::time::interval(Duration::from_secs(cfg.monitor.update_interval_secs));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(
        interval_secs = cfg.monitor.update_interval_secs,
        "Entering main loop. Press Ctrl+C to stop."
    );

    let mut cycle: u64 = 0;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                cycle += 1;

                let cycle_fut = pipeline.run_cycle(cycle, &shutdown_rx);
                tokio::pin!(cycle_fut);

                // Tokens already in flight finish; the rest report Cancelled
                let report = tokio::select! {
                    report = &mut cycle_fut => report,
                    _ = &mut ctrl_c => {
                        info!("Shutdown signal received mid-cycle, draining in-flight tokens.");
                        let _ = shutdown_tx.send(true);
                        cycle_fut.await
                    }
                };
                info!(summary = %report, "Cycle summary");
                dashboard_state.record_cycle(report).await;

                if *shutdown_rx.borrow() {
                    break;
                }

                if let Some(scanner) = &scanner {
                    if let Err(e) = scanner.run(&store).await {
                        error!(error = %e, "Anomaly scan failed");
                    }
                }
            }
            _ = &mut ctrl_c => {
                info!("Shutdown signal received.");
                let _ = shutdown_tx.send(true);
                break;
            }
        }
    }

    info!(cycles = cycle, "SENTINEL shut down cleanly.");
    Ok(())
}

/// Telegram notifier from env-referenced credentials; log-only if unset.
fn build_notifier(cfg: &AppConfig) -> Result<TelegramNotifier> {
    let resolve = |env: &Option<String>| {
        env.as_deref()
            .and_then(|name| AppConfig::resolve_env(name).ok())
    };

    let token = resolve(&cfg.alerts.telegram_bot_token_env).map(SecretString::new);
    let chat_id = resolve(&cfg.alerts.telegram_chat_id_env);

    TelegramNotifier::new(token, chat_id).context("Failed to initialise Telegram notifier")
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sentinel=info"));

    let json_logging = std::env::var("SENTINEL_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
