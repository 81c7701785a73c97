use thiserror::Error;

use swap_proto::ValidationError;

use crate::trade::TradeStatus;

#[derive(Debug, Error)]
pub enum Error {
    #[error("protocol error: {0}")]
    Protocol(#[from] swap_proto::Error),

    #[error("swap validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("no trade found for {0}")]
    TradeNotFound(String),

    #[error("trade is {actual:?}, cannot {action}")]
    IllegalTransition {
        actual: TradeStatus,
        action: &'static str,
    },

    #[error("market not served: {0}")]
    MarketNotFound(String),

    #[error("request assets do not match side {declared:?} of market {market}")]
    SideMismatch {
        market: String,
        declared: crate::market::TradeSide,
    },

    #[error("pricing error: {0}")]
    Pricing(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("broadcast error: {0}")]
    Broadcast(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("a task failed to join: {0}")]
    Task(String),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
