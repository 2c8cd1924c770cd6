//! # error
//!
//! Central error type for the groundskeeper core. One `thiserror` enum splits
//! transient transport failures (`Http`) from store-level (`Ledger`),
//! brokerage (`Brokerage`), fatal precondition (`Config`), and a catch-all
//! (`Internal`). This core owns no request/response surface, so — unlike the
//! teacher's `AppError` — there is no `IntoResponse` impl.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Transient transport failure talking to the store or brokerage.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ledger store returned an unexpected status or shape.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Brokerage position query failed.
    #[error("brokerage error: {0}")]
    Brokerage(String),

    /// Fatal precondition — never defaulted, surfaced loudly.
    #[error("config error: {0}")]
    Config(String),

    /// Catch-all for unexpected failures.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
