//! # engine::reaper
//!
//! **TTL Reaper** — กวาด trade records ที่แก่เกิน retention ออกจาก ledger
//!
//! ## นโยบาย
//! ```text
//! มี timestamp + age > max_age  → ลบ
//! มี timestamp + age ≤ max_age  → เก็บไว้
//! ไม่มี timestamp ที่ parse ได้  → เก็บไว้เสมอ (ไม่ลบของที่ไม่รู้อายุ)
//! ```
//!
//! Sweep เป็น batch เดี่ยวจบในตัว (ไม่ใช่ loop ต่อเนื่อง) และ idempotent —
//! รันซ้ำทันทีต้องไม่ลบเพิ่ม

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::EngineError;
use crate::ledger::LedgerClient;
use crate::models::trade::{extract_timestamp, TradeRecord};

/// Namespaces ที่โดนกวาดทุกรอบ
pub const REAPED_NAMESPACES: [&str; 3] =
    ["ghost_trades_log", "zombie_trades_log", "archived_trades_log"];

// ─── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReapReport {
    pub scanned: usize,
    pub deleted: usize,
    /// Records ที่ไม่มี timestamp — ถูกทิ้งไว้ในที่เดิม
    pub skipped: usize,
    /// Delete ที่ล้มเหลว (จะโดนเก็บใหม่รอบหน้า)
    pub failed: usize,
}

impl ReapReport {
    fn absorb(&mut self, other: ReapReport) {
        self.scanned += other.scanned;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

// ─── Per-record decision (pure) ───────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
pub enum ReapDecision {
    Delete { age_hours: i64 },
    KeepFresh,
    KeepNoTimestamp,
}

pub fn decide(record: &Value, now: DateTime<Utc>, max_age: Duration) -> ReapDecision {
    match extract_timestamp(record) {
        None => ReapDecision::KeepNoTimestamp,
        Some(ts) => {
            let age = now - ts;
            if age > max_age {
                ReapDecision::Delete { age_hours: age.num_hours() }
            } else {
                ReapDecision::KeepFresh
            }
        }
    }
}

// ─── Sweep ────────────────────────────────────────────────────────────────────

/// กวาดหนึ่ง namespace — ลบทีละ record อิสระต่อกัน
pub async fn reap(
    ledger: &LedgerClient,
    namespace: &str,
    max_age: Duration,
) -> Result<ReapReport, EngineError> {
    let records = ledger.get_subtree(namespace).await?;
    let now = Utc::now();
    let mut report = ReapReport { scanned: records.len(), ..ReapReport::default() };

    for (trade_id, value) in &records {
        match decide(value, now, max_age) {
            ReapDecision::KeepFresh => {}
            ReapDecision::KeepNoTimestamp => {
                debug!(namespace, %trade_id, "no timestamp — record left in place");
                report.skipped += 1;
            }
            ReapDecision::Delete { age_hours } => {
                match ledger.delete(&format!("{namespace}/{trade_id}")).await {
                    Ok(()) => {
                        let rec = TradeRecord::from_value(value);
                        info!(
                            namespace,
                            %trade_id,
                            symbol = rec.symbol.as_deref().unwrap_or("?"),
                            age_hours,
                            "🗑️ reaped stale trade record"
                        );
                        report.deleted += 1;
                    }
                    Err(e) => {
                        // record นี้ล้ม record ข้างๆ ไปต่อ
                        error!(namespace, %trade_id, error = %e, "delete failed");
                        report.failed += 1;
                    }
                }
            }
        }
    }
    Ok(report)
}

/// กวาดครบทั้งสาม namespace ในหนึ่ง invocation
pub async fn reap_all(ledger: &LedgerClient, max_age: Duration) -> ReapReport {
    let sweep = Uuid::new_v4();
    info!(%sweep, max_age_hours = max_age.num_hours(), "🧹 reap sweep starting");

    let mut total = ReapReport::default();
    for namespace in REAPED_NAMESPACES {
        match reap(ledger, namespace, max_age).await {
            Ok(report) => total.absorb(report),
            // namespace เดียวอ่านไม่ได้ — namespace ที่เหลือยังต้องโดนกวาด
            Err(e) => error!(%sweep, namespace, error = %e, "namespace sweep failed"),
        }
    }

    info!(
        %sweep,
        scanned = total.scanned,
        deleted = total.deleted,
        skipped = total.skipped,
        failed = total.failed,
        "🧹 reap sweep finished"
    );
    total
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_at(ts: &str) -> Value {
        json!({ "symbol": "MGC2510", "timestamp": ts })
    }

    #[test]
    fn test_stale_record_is_deleted() {
        let now = Utc::now();
        let stale = record_at(&(now - Duration::hours(13)).to_rfc3339());
        assert!(matches!(
            decide(&stale, now, Duration::hours(12)),
            ReapDecision::Delete { .. }
        ));
    }

    #[test]
    fn test_fresh_record_is_kept() {
        let now = Utc::now();
        let fresh = record_at(&(now - Duration::hours(1)).to_rfc3339());
        assert_eq!(decide(&fresh, now, Duration::hours(12)), ReapDecision::KeepFresh);
    }

    #[test]
    fn test_unknown_age_is_never_deleted() {
        let now = Utc::now();
        assert_eq!(
            decide(&json!({ "symbol": "MGC2510" }), now, Duration::hours(12)),
            ReapDecision::KeepNoTimestamp
        );
        assert_eq!(
            decide(&json!({ "timestamp": "garbage" }), now, Duration::hours(12)),
            ReapDecision::KeepNoTimestamp
        );
    }

    #[test]
    fn test_second_pass_deletes_nothing() {
        let now = Utc::now();
        let max_age = Duration::hours(12);
        let records = vec![
            record_at(&(now - Duration::hours(20)).to_rfc3339()),
            record_at(&(now - Duration::hours(2)).to_rfc3339()),
            json!({ "symbol": "MGC2510" }),
        ];

        // pass แรก: เหลือเฉพาะ record ที่ไม่โดนลบ
        let survivors: Vec<&Value> = records
            .iter()
            .filter(|r| !matches!(decide(r, now, max_age), ReapDecision::Delete { .. }))
            .collect();
        assert_eq!(survivors.len(), 2);

        // pass สอง: ไม่มีอะไรถูกลบเพิ่ม
        assert!(survivors
            .iter()
            .all(|r| !matches!(decide(r, now, max_age), ReapDecision::Delete { .. })));
    }
}
