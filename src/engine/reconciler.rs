//! # engine::reconciler
//!
//! **Reconciler** — เทียบ `order_status` ใน ledger กับ position จริงที่ brokerage
//! แล้วซ่อม drift
//!
//! ```text
//! 1. ถาม brokerage ครั้งเดียว → held-symbol set (point-in-time snapshot)
//! 2. อ่าน order_status ทั้งหมด
//! 3. record ที่ is_open=true แต่ symbol ไม่อยู่ใน set → GHOST:
//!       is_open=false, status="UNKNOWN", exit_reason="GHOST"
//!    (+ normalize margin reason ถ้าเข้าเงื่อนไข)
//! ```
//!
//! Repair เป็น update-only: ไม่สร้าง ไม่ลบ และไม่แตะ record ของ symbol
//! ที่ยังถืออยู่จริง — ทุกรอบ re-scan เต็ม ไม่มี incremental diff
//! ดังนั้นรอบไหนพลาด รอบถัดไปก็แก้ให้เอง

use std::collections::HashSet;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::broker::BrokerClient;
use crate::error::EngineError;
use crate::ledger::LedgerClient;
use crate::models::order::{normalize_reason, OrderRepair, OrderStatusRecord};

const ORDER_STATUS_PATH: &str = "order_status";

// ─── Repair planning (pure) ───────────────────────────────────────────────────

/// ตัดสินว่า record นี้ต้องซ่อมไหม — logic ทั้งหมดอยู่ตรงนี้
///
/// Record ที่เปิดอยู่แต่ไม่มี symbol เลยก็นับเป็น ghost เหมือนกัน:
/// ไม่มีทางมี position จริงให้ symbol ที่ไม่รู้จัก
pub fn plan_repair(order: &OrderStatusRecord, held: &HashSet<String>) -> Option<OrderRepair> {
    if !order.is_open {
        return None;
    }
    if let Some(symbol) = order.symbol.as_deref() {
        if held.contains(symbol) {
            return None;
        }
    }
    let reason = order.reason.as_deref().and_then(normalize_reason);
    Some(OrderRepair::ghost(reason))
}

// ─── Reconcile run ────────────────────────────────────────────────────────────

/// หนึ่งรอบ reconciliation — คืนจำนวน record ที่ถูกแก้
pub async fn reconcile(ledger: &LedgerClient, broker: &BrokerClient) -> Result<usize, EngineError> {
    let run = Uuid::new_v4();

    // snapshot เดียวต่อรอบ — ห้าม query ใหม่ระหว่างไล่ record
    let held = broker.held_symbols().await?;
    let orders = ledger.get_subtree(ORDER_STATUS_PATH).await?;
    info!(%run, held = held.len(), scanned = orders.len(), "🔍 reconciliation starting");

    let mut updates = 0usize;
    for (order_id, value) in &orders {
        let record: OrderStatusRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!(%run, %order_id, error = %e, "unreadable order_status record — skipped");
                continue;
            }
        };

        let Some(repair) = plan_repair(&record, &held) else {
            continue;
        };

        let symbol = record.symbol.as_deref().unwrap_or("?");
        info!(%run, %order_id, symbol, "👻 ghost order — marking closed");
        match ledger.update(&format!("{ORDER_STATUS_PATH}/{order_id}"), &repair).await {
            Ok(()) => updates += 1,
            // record นี้ล้ม record ข้างๆ ไปต่อ
            Err(e) => error!(%run, %order_id, symbol, error = %e, "repair update failed"),
        }
    }

    info!(%run, updates, "✅ reconciliation complete");
    Ok(updates)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::{EXIT_REASON_GHOST, REASON_LACK_OF_MARGIN, STATUS_UNKNOWN};

    fn open_order(symbol: &str) -> OrderStatusRecord {
        OrderStatusRecord {
            symbol: Some(symbol.to_string()),
            is_open: true,
            status: Some("FILLED".to_string()),
            reason: None,
            exit_reason: None,
        }
    }

    fn held(symbols: &[&str]) -> HashSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_held_symbol_is_untouched() {
        assert_eq!(plan_repair(&open_order("MGC2510"), &held(&["MGC2510"])), None);
    }

    #[test]
    fn test_closed_record_is_untouched() {
        let order = OrderStatusRecord { is_open: false, ..open_order("MGC2510") };
        assert_eq!(plan_repair(&order, &held(&[])), None);
    }

    #[test]
    fn test_orphaned_open_record_becomes_ghost() {
        let repair = plan_repair(&open_order("MGC2510"), &held(&["MGC2512"])).unwrap();
        assert!(!repair.is_open);
        assert_eq!(repair.status, STATUS_UNKNOWN);
        assert_eq!(repair.exit_reason, EXIT_REASON_GHOST);
        assert_eq!(repair.reason, None);
    }

    #[test]
    fn test_margin_reason_is_normalized() {
        let order = OrderStatusRecord {
            reason: Some("可用资金不足，无法下单".to_string()),
            ..open_order("MGC2510")
        };
        let repair = plan_repair(&order, &held(&[])).unwrap();
        assert_eq!(repair.reason, Some(REASON_LACK_OF_MARGIN));
    }

    #[test]
    fn test_other_reasons_are_not_rewritten() {
        let order = OrderStatusRecord {
            reason: Some("rejected by exchange".to_string()),
            ..open_order("MGC2510")
        };
        let repair = plan_repair(&order, &held(&[])).unwrap();
        assert_eq!(repair.reason, None);
    }

    #[test]
    fn test_open_record_without_symbol_is_ghost() {
        let order = OrderStatusRecord { symbol: None, ..open_order("x") };
        assert!(plan_repair(&order, &held(&["MGC2510"])).is_some());
    }

    #[test]
    fn test_consistent_ledger_needs_zero_repairs() {
        let held = held(&["MGC2510", "MGC2512"]);
        let orders = [
            open_order("MGC2510"),
            open_order("MGC2512"),
            OrderStatusRecord { is_open: false, ..open_order("MGC2508") },
        ];
        let repairs = orders.iter().filter_map(|o| plan_repair(o, &held)).count();
        assert_eq!(repairs, 0);
    }
}
