//! # idlewatchd — idlewatch daemon
//!
//! Composition root that wires the adapters into the monitor engine and
//! drives it once per second.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise tracing
//! - Pick real or dry-run actions
//! - Load and prune the persisted activity log
//! - Start the configured session and tick it every second
//! - Ctrl-C cancels an armed action; otherwise it stops the daemon
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;
mod notifier;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use idlewatch_adapter_linux::{ProcIoActivity, ProcNetDev, linux_catalog};
use idlewatch_adapter_storage_json::JsonFileLogStore;
use idlewatch_adapter_virtual::{ExecutionLog, dry_run_catalog};
use idlewatch_app::activity_log::ActivityLog;
use idlewatch_app::engine::MonitorEngine;
use idlewatch_app::event_bus::InProcessEventBus;
use idlewatch_app::trigger::TriggerFactory;
use idlewatch_domain::session::SessionStatus;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

type Engine = MonitorEngine<ProcNetDev, ProcIoActivity, JsonFileLogStore, InProcessEventBus>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let catalog = if config.runtime.dry_run {
        tracing::warn!("dry run: actions will be recorded, not performed");
        dry_run_catalog(&ExecutionLog::default())
    } else {
        linux_catalog()
    };

    let event_bus = InProcessEventBus::new(256);
    tokio::spawn(notifier::run(
        event_bus.subscribe(),
        config.monitor.action.clone(),
    ));

    let engine: Engine = MonitorEngine::new(
        TriggerFactory::new(ProcNetDev::default(), ProcIoActivity::default()),
        catalog,
        Arc::new(ActivityLog::new(config.activity_log.capacity)),
        JsonFileLogStore::new(&config.activity_log.path),
        event_bus,
    )
    .with_max_consecutive_failures(config.runtime.max_consecutive_failures);

    report_capabilities(&engine);

    if let Err(err) = engine.load_activity_log().await {
        tracing::warn!(error = %err, "starting with an empty activity log");
    }
    if config.activity_log.retention_days > 0 {
        let pruned = engine.prune_log(config.activity_log.retention_days).await?;
        tracing::debug!(pruned, "old activity entries pruned");
    }

    engine
        .start_session(config.monitor.clone())
        .await
        .context("failed to start monitoring")?;

    drive(&engine, config.runtime.auto_resume_seconds).await
}

fn report_capabilities(engine: &Engine) {
    for kind in engine.list_trigger_kinds() {
        tracing::info!(trigger = %kind.id, available = kind.available, "{}", kind.name);
    }
    for action in engine.list_actions() {
        tracing::info!(action = %action.id, available = action.available, "{}", action.name);
    }
}

/// Tick once per second until the session finishes or the operator stops it.
async fn drive(engine: &Engine, auto_resume_seconds: u64) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut errored_for = 0_u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = engine.step().await?;
                match report.status {
                    SessionStatus::Finished => break,
                    SessionStatus::Errored if auto_resume_seconds > 0 => {
                        errored_for += 1;
                        if errored_for >= auto_resume_seconds {
                            errored_for = 0;
                            engine.resume().await?;
                        }
                    }
                    _ => errored_for = 0,
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                let armed = engine
                    .status()
                    .await
                    .is_some_and(|report| report.scheduler_state.is_in_flight());
                if armed {
                    engine.cancel_action().await?;
                    tracing::info!("action cancelled; monitoring continues (Ctrl-C again to quit)");
                } else {
                    engine.stop_session().await?;
                    break;
                }
            }
        }
    }
    Ok(())
}
