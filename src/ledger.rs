//! # ledger
//!
//! **Ledger Store client** — hierarchical KV database ที่ทุก component ใช้ร่วมกัน
//! พูดผ่าน REST: `GET/PATCH/PUT/DELETE {base}/{path}.json`
//!
//! ## Path layout
//! ```text
//! active_contract/{root}           → active contract symbol ("MGC2510")
//! open_active_trades/{symbol}/{id} → trade records ที่ยังเปิดอยู่
//! archived_trades_log/{symbol}/{id}
//! ghost_trades_log/{id}
//! zombie_trades_log/{id}
//! order_status/{order_id}          → mirror สถานะ order จาก brokerage
//! ```
//!
//! Client สร้างครั้งเดียวใน `main` แล้วส่ง reference ให้ทุก engine —
//! ไม่มี global singleton, ไม่มี hidden init order

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;

/// ทุก call ไป store ต้องจบภายในเวลานี้ — ห้ามค้างไม่มีกำหนด
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct LedgerClient {
    http:     reqwest::Client,
    base_url: String,
}

impl LedgerClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// อ่านค่าเดียว — `None` ถ้า path นั้นไม่มีข้อมูล (store ตอบ `null`)
    pub async fn get(&self, path: &str) -> Result<Option<Value>, EngineError> {
        let resp = self
            .http
            .get(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(EngineError::Ledger(format!("GET {path}: HTTP {}", resp.status())));
        }
        let value: Value = resp.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    /// อ่านทั้ง subtree เป็น map ของ `{key → record}` — path ว่าง = map ว่าง
    pub async fn get_subtree(&self, path: &str) -> Result<HashMap<String, Value>, EngineError> {
        match self.get(path).await? {
            Some(Value::Object(map)) => Ok(map.into_iter().collect()),
            Some(_) => Err(EngineError::Ledger(format!("GET {path}: expected an object"))),
            None => Ok(HashMap::new()),
        }
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    /// Merge update (PATCH) — แตะเฉพาะ field ที่ส่งไป field อื่นคงเดิม
    pub async fn update<T: Serialize + ?Sized>(&self, path: &str, fields: &T) -> Result<(), EngineError> {
        let resp = self
            .http
            .patch(self.url(path))
            .json(fields)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(EngineError::Ledger(format!("PATCH {path}: HTTP {}", resp.status())));
        }
        Ok(())
    }

    /// Full set (PUT) — ทับทั้ง node
    pub async fn put<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<(), EngineError> {
        let resp = self
            .http
            .put(self.url(path))
            .json(value)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(EngineError::Ledger(format!("PUT {path}: HTTP {}", resp.status())));
        }
        Ok(())
    }

    /// ลบ node (และ subtree ใต้มันทั้งหมด)
    pub async fn delete(&self, path: &str) -> Result<(), EngineError> {
        let resp = self
            .http
            .delete(self.url(path))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(EngineError::Ledger(format!("DELETE {path}: HTTP {}", resp.status())));
        }
        Ok(())
    }
}
