//! # broker
//!
//! **Position Source** — read-only query surface ไปยัง brokerage
//!
//! Reconciler ใช้แค่คำถามเดียว: "ตอนนี้ถืออะไรอยู่จริงบ้าง" —
//! position list จาก brokerage คือ truth, ledger เป็นแค่ projection

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use crate::error::EngineError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ─── BrokerPosition ───────────────────────────────────────────────────────────

/// Position หนึ่งรายการจาก brokerage (field อื่นๆ ที่ API ส่งมาถูก ignore)
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerPosition {
    pub symbol: String,
    #[serde(default)]
    pub quantity: f64,
}

// ─── BrokerClient ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct BrokerClient {
    http:     reqwest::Client,
    base_url: String,
    account:  String,
}

impl BrokerClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, account: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url, account: account.into() }
    }

    /// ดึง position ทั้งหมดของ account
    pub async fn list_positions(&self) -> Result<Vec<BrokerPosition>, EngineError> {
        let url = format!("{}/positions", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("account", self.account.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(EngineError::Brokerage(format!(
                "GET /positions: HTTP {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }

    /// Snapshot ของ symbols ที่ถืออยู่จริง (quantity != 0) ณ จุดเวลานี้
    ///
    /// Reconciler เรียกครั้งเดียวต่อรอบ — record ที่เปลี่ยนสถานะกลางรอบ
    /// จะถูกเก็บตกในรอบถัดไป
    pub async fn held_symbols(&self) -> Result<HashSet<String>, EngineError> {
        Ok(self
            .list_positions()
            .await?
            .into_iter()
            .filter(|p| p.quantity != 0.0)
            .map(|p| p.symbol)
            .collect())
    }
}
