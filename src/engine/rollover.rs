//! # engine::rollover
//!
//! **Rollover State Machine** — ดูแล active contract symbol ต่อ product root
//!
//! State มีแบบเดียวคือ `ActiveAt(symbol)` — rollover คือการสลับ symbol
//! ทีเดียวจบ (atomic replacement) ไม่มี state ครึ่งกลาง
//!
//! ```text
//! read active_contract/{root}
//!   ├─ หาย / ผิดรูป        → Config error (หยุด root นี้ — ห้ามเดา)
//!   ├─ today < expiry      → no-op
//!   └─ today ≥ expiry      → เขียน symbol ถัดไป (เดือน +2, carry ปี)
//! ```
//!
//! expiry = วันศุกร์ที่สามของเดือน delivery เทียบกับ "วันนี้" ใน timezone
//! ของ venue — ฝั่ง order submission อ่าน symbol จาก path เดียวกันนี้
//! contract ผิดตัวเดียวคือเทรดผิด instrument ทั้งระบบ

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::ledger::LedgerClient;
use crate::models::contract::ContractSymbol;

const ACTIVE_CONTRACT_PATH: &str = "active_contract";

// ─── Outcome ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RolloverOutcome {
    Rolled { from: String, to: String },
    NotDue { active: String, expires: NaiveDate },
}

// ─── Decision (pure) ──────────────────────────────────────────────────────────

pub fn decide(active: &ContractSymbol, today: NaiveDate) -> Result<RolloverOutcome, EngineError> {
    let expires = active
        .expiry()
        .ok_or_else(|| EngineError::Config(format!("no expiry date for {active}")))?;
    if today >= expires {
        Ok(RolloverOutcome::Rolled {
            from: active.to_string(),
            to:   active.next_contract().to_string(),
        })
    } else {
        Ok(RolloverOutcome::NotDue { active: active.to_string(), expires })
    }
}

// ─── Transitions ──────────────────────────────────────────────────────────────

/// เช็คและ roll ถ้าถึงเวลา — `today` คือวันที่ใน timezone ของ venue
///
/// Active contract ที่หายหรือผิดรูปคือ `Config` error: ไม่มี rollover target
/// ที่ deterministic ให้เดินต่อ ต้องส่งเสียงให้ operator มาแก้เอง
pub async fn check_and_roll(
    ledger: &LedgerClient,
    root: &str,
    today: NaiveDate,
) -> Result<RolloverOutcome, EngineError> {
    let raw = ledger
        .get(&format!("{ACTIVE_CONTRACT_PATH}/{root}"))
        .await?
        .and_then(|v| v.as_str().map(str::to_owned))
        .ok_or_else(|| EngineError::Config(format!("no active contract recorded for root {root}")))?;

    let active = ContractSymbol::parse(&raw)?;
    if active.root != root {
        return Err(EngineError::Config(format!(
            "active contract {raw} does not belong to root {root}"
        )));
    }

    let outcome = decide(&active, today)?;
    match &outcome {
        RolloverOutcome::Rolled { from, to } => {
            ledger
                .update(ACTIVE_CONTRACT_PATH, &HashMap::from([(root, to.as_str())]))
                .await?;
            info!(root, from = %from, to = %to, %today, "🔄 rolled active contract");
        }
        RolloverOutcome::NotDue { active, expires } => {
            debug!(root, active = %active, %expires, %today, "no rollover needed today");
        }
    }
    Ok(outcome)
}

/// Manual override — operator เขียนทับ symbol ตรงๆ ข้าม expiry logic ทั้งหมด
/// (ใช้ path เดียวกับ rollover อัตโนมัติ)
pub async fn set_active(ledger: &LedgerClient, root: &str, symbol: &str) -> Result<(), EngineError> {
    ledger
        .update(ACTIVE_CONTRACT_PATH, &HashMap::from([(root, symbol)]))
        .await?;
    info!(root, symbol, "✅ active contract set manually");
    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn contract(symbol: &str) -> ContractSymbol {
        ContractSymbol::parse(symbol).unwrap()
    }

    #[test]
    fn test_rolls_two_months_on_expiry_day() {
        // ศุกร์ที่สามของ ส.ค. 2025 = 15 ส.ค.
        let outcome = decide(&contract("MGC2508"), date(2025, 8, 15)).unwrap();
        assert_eq!(
            outcome,
            RolloverOutcome::Rolled { from: "MGC2508".to_string(), to: "MGC2510".to_string() }
        );
    }

    #[test]
    fn test_rolls_after_expiry_has_passed() {
        let outcome = decide(&contract("MGC2508"), date(2025, 9, 1)).unwrap();
        assert!(matches!(outcome, RolloverOutcome::Rolled { .. }));
    }

    #[test]
    fn test_no_op_before_expiry() {
        let outcome = decide(&contract("MGC2510"), date(2025, 10, 1)).unwrap();
        assert_eq!(
            outcome,
            RolloverOutcome::NotDue {
                active:  "MGC2510".to_string(),
                expires: date(2025, 10, 17),
            }
        );
    }

    #[test]
    fn test_year_carry_on_december_contract() {
        let outcome = decide(&contract("MGC2512"), date(2025, 12, 19)).unwrap();
        assert_eq!(
            outcome,
            RolloverOutcome::Rolled { from: "MGC2512".to_string(), to: "MGC2602".to_string() }
        );
    }
}
