//! Domain models shared across the entire Groundskeeper system.

pub mod contract;
pub mod monitor;
pub mod order;
pub mod trade;

#[allow(unused_imports)]
pub use contract::{third_friday, ContractSymbol};
pub use monitor::{Direction, ExitReason, ExitSignal, OpenTradeRow};
pub use order::{OrderRepair, OrderStatusRecord};
pub use trade::{extract_timestamp, TradeRecord};
