//! # engine::monitor
//!
//! **Trade Monitor Loop** — จับตา open trades เทียบ live price ทุก tick
//! แล้วผลิต exit signal เมื่อราคาข้าม TP/SL
//!
//! ## หนึ่ง tick
//! ```text
//! 1. โหลดตารางเทรดเปิด (CSV — upstream เป็นเจ้าของ)
//! 2. โหลด live price snapshot (JSON: symbol → price)
//! 3. ประเมินทุกแถว → ExitSignal สำหรับแถวที่เข้าเงื่อนไข
//! ```
//!
//! อ่านไฟล์พังทุกรูปแบบ = log แล้วรอ tick หน้า — monitor loop ห้ามพา
//! process ตายด้วย transient read error และไม่แก้ตารางเองด้วย
//! (execution ฝั่ง order submission เป็นคนปิดจริง)

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::models::monitor::{ExitSignal, OpenTradeRow};

// ─── Table loading ────────────────────────────────────────────────────────────

/// อ่านตารางเทรดเปิดจาก CSV — แถวที่อ่านไม่ออกถูกข้าม ไม่ล้มทั้งไฟล์
pub fn load_open_trades(path: &Path) -> anyhow::Result<Vec<OpenTradeRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for (idx, row) in reader.deserialize::<OpenTradeRow>().enumerate() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) => warn!(row = idx + 1, error = %e, "unreadable open-trade row — skipped"),
        }
    }
    Ok(rows)
}

/// อ่าน live price snapshot — รองรับทั้ง `{"MGC2510": 2450.5}` และ
/// `{"MGC2510": {"price": 2450.5}}` (producer สองรุ่นเขียนคนละแบบ)
pub fn load_live_prices(path: &Path) -> anyhow::Result<HashMap<String, f64>> {
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    let Value::Object(entries) = value else {
        anyhow::bail!("live price snapshot is not a JSON object");
    };

    let mut prices = HashMap::new();
    for (symbol, entry) in entries {
        let price = match &entry {
            Value::Object(inner) => inner.get("price").and_then(Value::as_f64),
            other => other.as_f64(),
        };
        match price {
            Some(price) => {
                prices.insert(symbol, price);
            }
            None => warn!(%symbol, "live price entry has no numeric price — skipped"),
        }
    }
    Ok(prices)
}

// ─── Per-tick evaluation ──────────────────────────────────────────────────────

/// ประเมินทั้งตารางกับ snapshot เดียว — สัญญาที่สังเกตได้ของ loop นี้
/// คือรายการ signal ต่อ tick
pub fn run_cycle(rows: &[OpenTradeRow], prices: &HashMap<String, f64>) -> Vec<ExitSignal> {
    let mut signals = Vec::new();
    for row in rows {
        let Some(&price) = prices.get(&row.symbol) else {
            warn!(symbol = %row.symbol, "no live price for open trade — skipped this tick");
            continue;
        };
        debug!(symbol = %row.symbol, price, tp = row.tp_price, sl = row.sl_price, "monitor check");

        if let Some(reason) = row.evaluate_exit(price) {
            info!(symbol = %row.symbol, ?reason, price, "📣 exit condition met");
            signals.push(ExitSignal {
                symbol:    row.symbol.clone(),
                direction: row.direction,
                reason,
                price,
            });
        }
    }
    signals
}

/// หนึ่ง tick เต็ม: โหลดทั้งสองไฟล์แล้วประเมิน — ล้มตรงไหนก็คืนลิสต์ว่าง
/// แล้วไปต่อ tick หน้า
pub fn tick(open_trades: &Path, live_prices: &Path) -> Vec<ExitSignal> {
    let rows = match load_open_trades(open_trades) {
        Ok(rows) => rows,
        Err(e) => {
            error!(path = %open_trades.display(), error = %e, "failed to read open-trades table — retrying next tick");
            return Vec::new();
        }
    };
    if rows.is_empty() {
        debug!("no open trades — monitor still awake");
        return Vec::new();
    }

    let prices = match load_live_prices(live_prices) {
        Ok(prices) => prices,
        Err(e) => {
            error!(path = %live_prices.display(), error = %e, "failed to read live prices — retrying next tick");
            return Vec::new();
        }
    };

    run_cycle(&rows, &prices)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::monitor::{Direction, ExitReason};
    use std::io::Write;

    fn long_row(tp: f64, sl: f64) -> OpenTradeRow {
        OpenTradeRow {
            symbol:      "MGC2510".to_string(),
            entry_price: 100.0,
            tp_price:    tp,
            sl_price:    sl,
            direction:   Direction::Long,
        }
    }

    fn prices(price: f64) -> HashMap<String, f64> {
        HashMap::from([("MGC2510".to_string(), price)])
    }

    #[test]
    fn test_cycle_signals_tp_then_sl_across_price_sequence() {
        let rows = vec![long_row(110.0, 95.0)];

        assert!(run_cycle(&rows, &prices(100.0)).is_empty());

        let tp = run_cycle(&rows, &prices(112.0));
        assert_eq!(tp.len(), 1);
        assert_eq!(tp[0].reason, ExitReason::TakeProfit);
        assert_eq!(tp[0].price, 112.0);

        // ถ้ายังไม่ถูกปิด tick ต่อมาก็ยังผลิต signal ได้อิสระจากกัน
        let sl = run_cycle(&rows, &prices(90.0));
        assert_eq!(sl.len(), 1);
        assert_eq!(sl[0].reason, ExitReason::StopLoss);
    }

    #[test]
    fn test_cycle_skips_rows_without_live_price() {
        let rows = vec![long_row(110.0, 95.0)];
        let signals = run_cycle(&rows, &HashMap::from([("NQ2512".to_string(), 1.0)]));
        assert!(signals.is_empty());
    }

    #[test]
    fn test_load_open_trades_accepts_legacy_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("open_trades.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "symbol,entry_price,tp_price,sl_price,action,contracts_remaining").unwrap();
        writeln!(file, "MGC2510,2450.5,2460.0,2440.0,BUY,1").unwrap();
        writeln!(file, "MGC2510,oops,2460.0,2440.0,SELL,1").unwrap();

        let rows = load_open_trades(&path).unwrap();
        assert_eq!(rows.len(), 1); // แถวพังถูกข้าม
        assert_eq!(rows[0].direction, Direction::Long);
        assert_eq!(rows[0].tp_price, 2460.0);
    }

    #[test]
    fn test_load_live_prices_accepts_both_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live_prices.json");
        std::fs::write(
            &path,
            r#"{ "MGC2510": 2450.5, "NQ2512": {"price": 21000.0}, "BAD": {"note": "x"} }"#,
        )
        .unwrap();

        let prices = load_live_prices(&path).unwrap();
        assert_eq!(prices.get("MGC2510"), Some(&2450.5));
        assert_eq!(prices.get("NQ2512"), Some(&21000.0));
        assert!(!prices.contains_key("BAD"));
    }

    #[test]
    fn test_tick_survives_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let signals = tick(&dir.path().join("nope.csv"), &dir.path().join("nope.json"));
        assert!(signals.is_empty());
    }
}
