//! # state
//!
//! EngineState — ตัวเลขสะสมที่ทุก periodic task เขียนและ status surface อ่าน
//!
//! ใช้ atomic counters ล้วนๆ ไม่มี lock — แต่ละ task เพิ่มตัวเลขของตัวเอง
//! หลังจบ sweep แล้ว `/api/status` snapshot ออกมาอ่านได้ตลอดเวลา

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

// ─── EngineState ──────────────────────────────────────────────────────────────

pub struct EngineState {
    pub started_at: DateTime<Utc>,

    /// Records ที่ TTL Reaper ลบไปแล้วทั้งหมด
    pub records_reaped: AtomicU64,
    /// Ghost orders ที่ Reconciler แก้สถานะไปแล้วทั้งหมด
    pub orders_repaired: AtomicU64,
    /// จำนวนครั้งที่ active contract ถูก roll
    pub contracts_rolled: AtomicU64,
    /// Monitor loop วิ่งไปแล้วกี่ tick
    pub monitor_ticks: AtomicU64,
    /// Exit signals (TP/SL) ที่ผลิตออกไปแล้ว
    pub exit_signals: AtomicU64,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            started_at:       Utc::now(),
            records_reaped:   AtomicU64::new(0),
            orders_repaired:  AtomicU64::new(0),
            contracts_rolled: AtomicU64::new(0),
            monitor_ticks:    AtomicU64::new(0),
            exit_signals:     AtomicU64::new(0),
        }
    }

    // ── Helper Methods ────────────────────────────────────────────────────────

    pub fn add_reaped(&self, n: u64) {
        self.records_reaped.fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_repaired(&self, n: u64) {
        self.orders_repaired.fetch_add(n, Ordering::Relaxed);
    }
    pub fn add_rolled(&self, n: u64) {
        self.contracts_rolled.fetch_add(n, Ordering::Relaxed);
    }
    pub fn tick_monitor(&self) {
        self.monitor_ticks.fetch_add(1, Ordering::Relaxed);
    }
    pub fn add_exit_signals(&self, n: u64) {
        self.exit_signals.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            started_at:       self.started_at,
            uptime_secs:      (Utc::now() - self.started_at).num_seconds(),
            records_reaped:   self.records_reaped.load(Ordering::Relaxed),
            orders_repaired:  self.orders_repaired.load(Ordering::Relaxed),
            contracts_rolled: self.contracts_rolled.load(Ordering::Relaxed),
            monitor_ticks:    self.monitor_ticks.load(Ordering::Relaxed),
            exit_signals:     self.exit_signals.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineState {
    fn default() -> Self { Self::new() }
}

/// Snapshot สำหรับ serialize ออก `/api/status`
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub started_at:       DateTime<Utc>,
    pub uptime_secs:      i64,
    pub records_reaped:   u64,
    pub orders_repaired:  u64,
    pub contracts_rolled: u64,
    pub monitor_ticks:    u64,
    pub exit_signals:     u64,
}

/// Convenience type alias
pub type SharedState = Arc<EngineState>;

pub fn build_state() -> SharedState {
    Arc::new(EngineState::new())
}
