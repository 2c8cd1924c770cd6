//! # routes::status
//!
//! Operational probe endpoints — สำหรับ liveness check กับดูตัวเลขสะสม
//! ไม่ใช่ trading API (core นี้ไม่รับคำสั่งเทรดทาง network)
//!
//! | Method | Path          | Description                       |
//! |--------|---------------|-----------------------------------|
//! | GET    | `/health`     | liveness probe                    |
//! | GET    | `/api/status` | uptime + ตัวเลขสะสมของทุก engine  |

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::SharedState;

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// GET /api/status
pub async fn get_status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "ok":     true,
        "status": state.snapshot(),
    }))
}
