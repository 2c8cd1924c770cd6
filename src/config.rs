//! # config
//!
//! `EngineConfig::from_env()` — all tunables from environment variables with
//! defaults, loaded once in `main` and passed by value/reference to every
//! task. Follows the teacher's `env_u32`/`env_u64` helper idiom
//! (`examples/.../risk.rs`).
//!
//! | Env var                  | Default            | Meaning                         |
//! |--------------------------|--------------------|---------------------------------|
//! | `LEDGER_BASE_URL`        | `http://localhost:9000` | hierarchical-KV store root |
//! | `BROKER_BASE_URL`        | `http://localhost:8000` | brokerage position surface |
//! | `BROKER_ACCOUNT`         | `default`          | account id for position query   |
//! | `REAP_INTERVAL_SECS`     | `3600`             | ghost/zombie sweep period       |
//! | `RECONCILE_INTERVAL_SECS`| `300`              | order reconcile period          |
//! | `ROLLOVER_INTERVAL_SECS` | `3600`             | rollover check period           |
//! | `MONITOR_INTERVAL_SECS`  | `10`               | exit-monitor tick period        |
//! | `REAP_MAX_AGE_HOURS`     | `12`               | retention before reaping        |
//! | `ROLLOVER_TZ`            | `Pacific/Auckland` | venue trading timezone          |
//! | `ROLLOVER_ROOTS`         | `MGC`              | comma-separated product roots   |
//! | `OPEN_TRADES_FILE`       | `open_trades.csv`  | monitor input (CSV)             |
//! | `LIVE_PRICES_FILE`       | `live_prices.json` | monitor input (JSON)            |
//! | `BIND_ADDR`              | `0.0.0.0:3000`     | status server bind address      |

use std::path::PathBuf;

use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub ledger_base_url: String,
    pub broker_base_url: String,
    pub broker_account: String,

    pub reap_interval_secs: u64,
    pub reconcile_interval_secs: u64,
    pub rollover_interval_secs: u64,
    pub monitor_interval_secs: u64,

    pub reap_max_age_hours: i64,

    pub rollover_tz: Tz,
    pub rollover_roots: Vec<String>,

    pub open_trades_file: PathBuf,
    pub live_prices_file: PathBuf,

    pub bind_addr: String,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            ledger_base_url: env_str("LEDGER_BASE_URL", "http://localhost:9000"),
            broker_base_url: env_str("BROKER_BASE_URL", "http://localhost:8000"),
            broker_account: env_str("BROKER_ACCOUNT", "default"),

            reap_interval_secs: env_u64("REAP_INTERVAL_SECS", 3600),
            reconcile_interval_secs: env_u64("RECONCILE_INTERVAL_SECS", 300),
            rollover_interval_secs: env_u64("ROLLOVER_INTERVAL_SECS", 3600),
            monitor_interval_secs: env_u64("MONITOR_INTERVAL_SECS", 10),

            reap_max_age_hours: env_i64("REAP_MAX_AGE_HOURS", 12),

            rollover_tz: env_tz("ROLLOVER_TZ", chrono_tz::Pacific::Auckland),
            rollover_roots: env_roots("ROLLOVER_ROOTS", "MGC"),

            open_trades_file: env_path("OPEN_TRADES_FILE", "open_trades.csv"),
            live_prices_file: env_path("LIVE_PRICES_FILE", "live_prices.json"),

            bind_addr: env_str("BIND_ADDR", "0.0.0.0:3000"),
        }
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(std::env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn env_tz(key: &str, default: Tz) -> Tz {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_roots(key: &str, default: &str) -> Vec<String> {
    env_str(key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
