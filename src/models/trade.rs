//! # models::trade
//!
//! Trade record ใน ledger มาจากหลาย producer — รูปร่างไม่นิ่ง:
//! บางตัวห่อ field ไว้ใต้ `trade_data` อีกชั้น, ชื่อ field เวลาก็ไม่ตรงกัน
//! (`timestamp` / `time` / `transacted_at` / ...)
//!
//! Module นี้ normalize ความเละตรงนั้นไว้ที่เดียว: แกะ envelope หนึ่งครั้ง
//! ตอน ingest แล้วหา timestamp ตามลำดับ synonym ที่ตกลงกันไว้ —
//! consumer ที่เหลือไม่ต้องรู้จักรูปร่างดิบอีก

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// ลำดับ field ที่ไล่หา timestamp — เจอตัวแรกที่ parse ได้ก็จบ
const TIMESTAMP_FIELDS: [&str; 6] = [
    "timestamp",
    "time",
    "transacted_at",
    "entry_timestamp",
    "exit_timestamp",
    "executed_timestamp",
];

// ─── Envelope Normalization ───────────────────────────────────────────────────

/// แกะ `trade_data` envelope หนึ่งชั้น (ถ้ามี) — producer บางตัวห่อมา
pub fn normalize_envelope(record: &Value) -> &Value {
    match record.get("trade_data") {
        Some(inner @ Value::Object(_)) => inner,
        _ => record,
    }
}

// ─── TradeRecord ──────────────────────────────────────────────────────────────

/// มุมมองแบบ typed ของ trade record หนึ่งรายการ (ทุก field optional —
/// record ดิบจาก ledger ขาด field ได้เสมอ) — `trade_id` คือ key ใน namespace
/// ไม่ได้อยู่ในตัว record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeRecord {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, alias = "action")]
    pub direction: Option<String>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
}

impl TradeRecord {
    /// อ่านจาก record ดิบ — แกะ envelope ก่อน, field ที่อ่านไม่ออกกลายเป็น `None`
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(normalize_envelope(value).clone()).unwrap_or_default()
    }
}

// ─── Timestamp Extractor ──────────────────────────────────────────────────────

/// หา timestamp แรกที่ parse ได้ใน record (pure query — ไม่แตะ store)
///
/// - field ที่ไม่มี → ข้ามเงียบๆ
/// - field ที่มีแต่ parse ไม่ได้ → log แล้วไล่ synonym ตัวถัดไป
/// - ไม่เจอเลย → `None` ("no timestamp")
pub fn extract_timestamp(record: &Value) -> Option<DateTime<Utc>> {
    let record = normalize_envelope(record);
    for field in TIMESTAMP_FIELDS {
        let Some(raw) = record.get(field).and_then(Value::as_str) else {
            continue;
        };
        match parse_timestamp(raw) {
            Some(ts) => return Some(ts),
            None => warn!(field, raw, "unparsable timestamp field — trying next synonym"),
        }
    }
    None
}

/// รับ RFC 3339 (รวม `Z` ต่อท้าย) และ naive datetime ที่ตีความเป็น UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_extract_prefers_timestamp_field() {
        let record = json!({
            "timestamp": "2025-08-01T10:00:00Z",
            "time":      "2025-08-02T10:00:00Z",
        });
        assert_eq!(extract_timestamp(&record), Some(utc(2025, 8, 1, 10, 0, 0)));
    }

    #[test]
    fn test_extract_falls_back_through_synonyms() {
        let record = json!({ "transacted_at": "2025-08-03T09:30:00+00:00" });
        assert_eq!(extract_timestamp(&record), Some(utc(2025, 8, 3, 9, 30, 0)));
    }

    #[test]
    fn test_extract_skips_unparsable_and_continues() {
        let record = json!({
            "timestamp": "not a date",
            "time":      "2025-08-02T10:00:00Z",
        });
        assert_eq!(extract_timestamp(&record), Some(utc(2025, 8, 2, 10, 0, 0)));
    }

    #[test]
    fn test_extract_unwraps_trade_data_envelope() {
        let record = json!({
            "trade_data": { "entry_timestamp": "2025-08-04T01:02:03Z" }
        });
        assert_eq!(extract_timestamp(&record), Some(utc(2025, 8, 4, 1, 2, 3)));
    }

    #[test]
    fn test_extract_accepts_naive_datetime_as_utc() {
        let record = json!({ "time": "2025-08-05 14:00:00" });
        assert_eq!(extract_timestamp(&record), Some(utc(2025, 8, 5, 14, 0, 0)));
    }

    #[test]
    fn test_extract_none_when_no_field_parses() {
        assert_eq!(extract_timestamp(&json!({ "symbol": "MGC2510" })), None);
        assert_eq!(extract_timestamp(&json!({ "timestamp": "???" })), None);
    }

    #[test]
    fn test_trade_record_reads_nested_action() {
        let record = json!({
            "trade_data": { "symbol": "MGC2510", "action": "BUY", "entry_price": 2450.5 }
        });
        let rec = TradeRecord::from_value(&record);
        assert_eq!(rec.symbol.as_deref(), Some("MGC2510"));
        assert_eq!(rec.direction.as_deref(), Some("BUY"));
        assert_eq!(rec.entry_price, Some(2450.5));
    }
}
