//! # engine::archiver
//!
//! ย้าย trade ที่ค้างอยู่ใน `open_active_trades/{symbol}` เข้า
//! `archived_trades_log/{symbol}` — copy แล้วค่อย delete (ไม่ใช่ rename)
//!
//! ลำดับต่อ record ตายตัว: copy สำเร็จก่อนเท่านั้นถึงจะ delete ต้นทาง —
//! พังกลางทางแล้ว record โผล่สองที่ได้ แต่หายไปเลยไม่ได้

use tracing::{error, info};

use crate::error::EngineError;
use crate::ledger::LedgerClient;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveReport {
    pub archived: usize,
    pub failed:   usize,
}

/// Archive ทุก record ใต้ symbol เดียว — ต่อ record อิสระกัน
pub async fn archive_leftover(
    ledger: &LedgerClient,
    symbol: &str,
) -> Result<ArchiveReport, EngineError> {
    let open_path = format!("open_active_trades/{symbol}");
    let records = ledger.get_subtree(&open_path).await?;
    if records.is_empty() {
        info!(symbol, "no leftover open trades");
        return Ok(ArchiveReport::default());
    }

    let mut report = ArchiveReport::default();
    for (trade_id, value) in &records {
        let result = async {
            ledger
                .put(&format!("archived_trades_log/{symbol}/{trade_id}"), value)
                .await?;
            ledger.delete(&format!("{open_path}/{trade_id}")).await
        }
        .await;

        match result {
            Ok(()) => {
                info!(symbol, %trade_id, "📦 archived leftover trade");
                report.archived += 1;
            }
            Err(e) => {
                error!(symbol, %trade_id, error = %e, "archive failed — record stays in open_active_trades");
                report.failed += 1;
            }
        }
    }

    info!(symbol, archived = report.archived, failed = report.failed, "archival finished");
    Ok(report)
}
