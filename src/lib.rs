pub mod config;
pub mod error;
pub mod market;
pub mod ports;
pub mod repository;
pub mod service;
pub mod trade;
pub mod watchdog;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use market::{Market, TradeSide};
pub use ports::{ElectrumBroadcaster, PriceSource, Quote, SwapWallet, TxBroadcaster, WalletSwapOutput};
pub use repository::{InMemoryTradeRepository, Page, TradeRepository, UpdateOutcome};
pub use service::{TradeReply, TradeService};
pub use trade::{Trade, TradeId, TradeStatus};
pub use watchdog::{ExpiryEvent, ExpiryWatchdogHandle, spawn_expiry_watchdog};

// Re-export the protocol crate for callers that build or decode messages.
pub use swap_proto;
