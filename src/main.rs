//! # Groundskeeper — Trade Ledger Caretaker Daemon
//!
//! ```text
//!  ┌───────────────┐  GET positions   ┌──────────────────────────────┐
//!  │   Brokerage   │ ◀─────────────── │  Reconciler    (ทุก 5 นาที)  │──┐
//!  └───────────────┘                  ├──────────────────────────────┤  │ PATCH/DELETE
//!                                     │  TTL Reaper    (ทุก 1 ชม.)   │──┤
//!  ┌───────────────┐                  ├──────────────────────────────┤  ▼
//!  │ open_trades   │ ─── read ──────▶ │  Monitor Loop  (ทุก 10 วิ)   │  Ledger Store
//!  │ live_prices   │                  ├──────────────────────────────┤  (hierarchical KV)
//!  └───────────────┘                  │  Rollover      (ทุก 1 ชม.)   │──┘
//!                                     └──────────────────────────────┘
//!                                        │ exit signals (mpsc)
//!                                        ▼
//!                                     order-submission collaborator
//! ```
//!
//! ทั้งสี่ loop อิสระต่อกัน วิ่งชน Ledger Store พร้อมกันได้ —
//! แต่ละตัวถือ namespace คนละชุดหรือเขียนแบบ idempotent เท่านั้น
//!
//! ## Operator one-shots
//! ```bash
//! groundskeeper                         # daemon
//! groundskeeper reap                    # กวาด ghost/zombie/archived หนึ่งรอบ
//! groundskeeper reconcile               # reconcile order_status หนึ่งรอบ
//! groundskeeper roll                    # เช็ค rollover ทุก root หนึ่งรอบ
//! groundskeeper archive MGC2510        # archive เทรดค้างของ symbol
//! groundskeeper set-active MGC MGC2512 # override active contract
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Router};
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod broker;
mod config;
mod engine;
mod error;
mod ledger;
mod models;
mod routes;
mod state;

use broker::BrokerClient;
use config::EngineConfig;
use engine::rollover::RolloverOutcome;
use error::EngineError;
use ledger::LedgerClient;
use models::monitor::ExitSignal;
use routes::status::{get_status, health_check};
use state::{build_state, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("groundskeeper=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    // ── 3. Config + Clients (สร้างครั้งเดียว ส่งต่อเป็น reference) ───────────
    let cfg = EngineConfig::from_env();
    let http = reqwest::Client::new();
    let ledger = LedgerClient::new(http.clone(), &cfg.ledger_base_url);
    let broker = BrokerClient::new(http, &cfg.broker_base_url, &cfg.broker_account);

    // ── 4. Operator one-shot? ─────────────────────────────────────────────────
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return run_one_shot(&args, &cfg, &ledger, &broker).await;
    }

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║         GROUNDSKEEPER — Ledger Caretaker              ║
  ║   Reaper · Reconciler · Rollover · Monitor            ║
  ╚═══════════════════════════════════════════════════════╝"#);

    // ── 5. Shared state + shutdown signal ─────────────────────────────────────
    let state = build_state();
    let (shutdown_tx, _) = watch::channel(false);
    let (exit_tx, mut exit_rx) = mpsc::channel::<ExitSignal>(64);

    // ── 6. Periodic tasks ─────────────────────────────────────────────────────
    let mut tasks = vec![
        tokio::spawn(reaper_task(
            ledger.clone(),
            state.clone(),
            cfg.clone(),
            shutdown_tx.subscribe(),
        )),
        tokio::spawn(reconciler_task(
            ledger.clone(),
            broker.clone(),
            state.clone(),
            cfg.clone(),
            shutdown_tx.subscribe(),
        )),
        tokio::spawn(rollover_task(
            ledger.clone(),
            state.clone(),
            cfg.clone(),
            shutdown_tx.subscribe(),
        )),
        tokio::spawn(monitor_task(
            state.clone(),
            cfg.clone(),
            exit_tx,
            shutdown_tx.subscribe(),
        )),
    ];

    // Exit signals ส่งต่อให้ order-submission collaborator — ฝั่งนั้นอยู่นอก
    // process นี้ ตรงนี้แค่ log ให้เห็นว่า signal ออกแล้ว
    tasks.push(tokio::spawn(async move {
        while let Some(signal) = exit_rx.recv().await {
            warn!(
                symbol    = %signal.symbol,
                direction = ?signal.direction,
                reason    = ?signal.reason,
                price     = signal.price,
                "⏏️ exit signal ready for order submission"
            );
        }
    }));

    // ── 7. Status server ──────────────────────────────────────────────────────
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let addr: SocketAddr = cfg.bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(?addr, "🚀 Groundskeeper started — status server listening");

    let mut server_shutdown = shutdown_tx.subscribe();
    tasks.push(tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await;
    }));

    // ── 8. Wait for ctrl-c → graceful shutdown ────────────────────────────────
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested — letting current sweeps finish");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        let _ = task.await;
    }
    info!("👋 Groundskeeper stopped");
    Ok(())
}

// ─── Periodic Tasks ───────────────────────────────────────────────────────────
// ทุก task หยุดเฉพาะที่ขอบ tick — sweep ที่กำลังวิ่งอยู่วิ่งจนจบเสมอ

async fn reaper_task(
    ledger: LedgerClient,
    state: SharedState,
    cfg: EngineConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(cfg.reap_interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let max_age = chrono::Duration::hours(cfg.reap_max_age_hours);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let report = engine::reaper::reap_all(&ledger, max_age).await;
                state.add_reaped(report.deleted as u64);
            }
            _ = shutdown.changed() => {
                info!("reaper task stopped");
                break;
            }
        }
    }
}

async fn reconciler_task(
    ledger: LedgerClient,
    broker: BrokerClient,
    state: SharedState,
    cfg: EngineConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(cfg.reconcile_interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match engine::reconciler::reconcile(&ledger, &broker).await {
                    Ok(updates) => state.add_repaired(updates as u64),
                    // transient — รอบหน้า re-scan เต็มอยู่แล้ว
                    Err(e) => error!(error = %e, "reconciliation failed — retrying next tick"),
                }
            }
            _ = shutdown.changed() => {
                info!("reconciler task stopped");
                break;
            }
        }
    }
}

async fn rollover_task(
    ledger: LedgerClient,
    state: SharedState,
    cfg: EngineConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(cfg.rollover_interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // "วันนี้" ตาม timezone ของ venue ไม่ใช่ UTC
                let today = Utc::now().with_timezone(&cfg.rollover_tz).date_naive();
                for root in &cfg.rollover_roots {
                    match engine::rollover::check_and_roll(&ledger, root, today).await {
                        Ok(RolloverOutcome::Rolled { .. }) => state.add_rolled(1),
                        Ok(RolloverOutcome::NotDue { .. }) => {}
                        Err(e @ EngineError::Config(_)) => {
                            // ห้ามเดา contract — root นี้หยุดจนกว่า operator จะแก้
                            error!(root = %root, error = %e, "🚨 rollover halted — operator attention required");
                        }
                        Err(e) => {
                            error!(root = %root, error = %e, "rollover check failed — retrying next tick");
                        }
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("rollover task stopped");
                break;
            }
        }
    }
}

async fn monitor_task(
    state: SharedState,
    cfg: EngineConfig,
    exit_tx: mpsc::Sender<ExitSignal>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(cfg.monitor_interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                state.tick_monitor();

                // File I/O เป็น blocking — ออกไปทำนอก async runtime
                let open_trades = cfg.open_trades_file.clone();
                let live_prices = cfg.live_prices_file.clone();
                let signals = match tokio::task::spawn_blocking(move || {
                    engine::monitor::tick(&open_trades, &live_prices)
                })
                .await
                {
                    Ok(signals) => signals,
                    Err(e) => {
                        error!(error = %e, "monitor tick aborted");
                        continue;
                    }
                };

                state.add_exit_signals(signals.len() as u64);
                for signal in signals {
                    if exit_tx.send(signal).await.is_err() {
                        debug!("exit-signal receiver dropped");
                        break;
                    }
                }
            }
            _ = shutdown.changed() => {
                info!("monitor task stopped");
                break;
            }
        }
    }
}

// ─── Operator One-shots ───────────────────────────────────────────────────────

async fn run_one_shot(
    args: &[String],
    cfg: &EngineConfig,
    ledger: &LedgerClient,
    broker: &BrokerClient,
) -> anyhow::Result<()> {
    match args {
        [cmd] if cmd == "reap" => {
            let report =
                engine::reaper::reap_all(ledger, chrono::Duration::hours(cfg.reap_max_age_hours))
                    .await;
            info!(?report, "reap finished");
        }
        [cmd] if cmd == "reconcile" => {
            let updates = engine::reconciler::reconcile(ledger, broker).await?;
            info!(updates, "reconcile finished");
        }
        [cmd] if cmd == "roll" => {
            let today = Utc::now().with_timezone(&cfg.rollover_tz).date_naive();
            for root in &cfg.rollover_roots {
                let outcome = engine::rollover::check_and_roll(ledger, root, today).await?;
                info!(root = %root, ?outcome, "rollover check finished");
            }
        }
        [cmd, symbol] if cmd == "archive" => {
            let report = engine::archiver::archive_leftover(ledger, symbol).await?;
            info!(?report, "archive finished");
        }
        [cmd, root, symbol] if cmd == "set-active" => {
            engine::rollover::set_active(ledger, root, symbol).await?;
        }
        _ => anyhow::bail!(
            "usage: groundskeeper [reap | reconcile | roll | archive <symbol> | set-active <root> <symbol>]"
        ),
    }
    Ok(())
}
