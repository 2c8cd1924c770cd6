//! Engine layer — งานดูแล ledger ทั้งสี่ตัว + archival one-shot
//!
//! ทุกตัวเป็น batch sweep อิสระต่อกัน: ล้มหนึ่ง record ไม่ล้มทั้ง sweep,
//! ล้มทั้ง sweep ไม่ล้ม process — รอบถัดไปว่ากันใหม่

pub mod archiver;
pub mod monitor;
pub mod reaper;
pub mod reconciler;
pub mod rollover;
