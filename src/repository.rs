//! Trade persistence behind a trait so the engine never touches storage
//! directly. Ships with an in-memory implementation guarded by a mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::market::Market;
use crate::trade::{Trade, TradeId, TradeStatus};

/// Page window for listings.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

/// Result of a compare-and-set update.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The trade matched the expected status and the update was applied.
    Updated(Trade),
    /// Another writer moved the trade first.
    Conflict { actual: TradeStatus },
    NotFound,
}

pub trait TradeRepository: Send + Sync {
    fn get(&self, id: &TradeId) -> Result<Option<Trade>>;

    fn save(&self, trade: &Trade) -> Result<()>;

    /// Look a trade up by any swap message id it has seen, inbound or
    /// outbound. Drives idempotent replay.
    fn find_by_message_id(&self, message_id: &str) -> Result<Option<Trade>>;

    /// Trades ordered by creation time, optionally filtered and paged.
    fn list(&self, market: Option<&Market>, page: Option<Page>) -> Result<Vec<Trade>>;

    /// Accepted trades whose completion deadline is at or before `now`.
    fn accepted_before(&self, now: DateTime<Utc>) -> Result<Vec<Trade>>;

    /// Apply `apply` to the trade only if it is still in `expected` status,
    /// atomically with respect to other writers. Racing transitions (for
    /// example settlement against expiry) are resolved here: exactly one
    /// writer sees `Updated`, the rest see `Conflict`.
    fn update_if_status(
        &self,
        id: &TradeId,
        expected: TradeStatus,
        apply: &mut dyn FnMut(&mut Trade) -> Result<()>,
    ) -> Result<UpdateOutcome>;
}

// ── In-memory implementation ────────────────────────────────────────────

#[derive(Default)]
struct Inner {
    trades: HashMap<TradeId, Trade>,
    by_message: HashMap<String, TradeId>,
}

#[derive(Default)]
pub struct InMemoryTradeRepository {
    inner: Mutex<Inner>,
}

impl InMemoryTradeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// All message ids attached to a trade, for the lookup index.
fn message_ids(trade: &Trade) -> Vec<String> {
    let mut ids = Vec::new();
    if let Some(request) = &trade.request {
        ids.push(request.id.as_str().to_string());
    }
    if let Some(accept) = &trade.accept {
        ids.push(accept.id.as_str().to_string());
    }
    if let Some(complete) = &trade.complete {
        ids.push(complete.id.as_str().to_string());
    }
    if let Some(fail) = &trade.fail {
        ids.push(fail.id.as_str().to_string());
    }
    ids
}

impl Inner {
    fn index(&mut self, trade: &Trade) {
        for id in message_ids(trade) {
            self.by_message.insert(id, trade.id.clone());
        }
    }
}

impl TradeRepository for InMemoryTradeRepository {
    fn get(&self, id: &TradeId) -> Result<Option<Trade>> {
        let inner = self.lock()?;
        Ok(inner.trades.get(id).cloned())
    }

    fn save(&self, trade: &Trade) -> Result<()> {
        let mut inner = self.lock()?;
        inner.index(trade);
        inner.trades.insert(trade.id.clone(), trade.clone());
        Ok(())
    }

    fn find_by_message_id(&self, message_id: &str) -> Result<Option<Trade>> {
        let inner = self.lock()?;
        Ok(inner
            .by_message
            .get(message_id)
            .and_then(|id| inner.trades.get(id))
            .cloned())
    }

    fn list(&self, market: Option<&Market>, page: Option<Page>) -> Result<Vec<Trade>> {
        let inner = self.lock()?;
        let mut trades: Vec<Trade> = inner
            .trades
            .values()
            .filter(|t| market.map_or(true, |m| t.market == *m))
            .cloned()
            .collect();
        trades.sort_by_key(|t| t.created_at);
        if let Some(page) = page {
            trades = trades
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect();
        }
        Ok(trades)
    }

    fn accepted_before(&self, now: DateTime<Utc>) -> Result<Vec<Trade>> {
        let inner = self.lock()?;
        Ok(inner
            .trades
            .values()
            .filter(|t| t.is_expired(now))
            .cloned()
            .collect())
    }

    fn update_if_status(
        &self,
        id: &TradeId,
        expected: TradeStatus,
        apply: &mut dyn FnMut(&mut Trade) -> Result<()>,
    ) -> Result<UpdateOutcome> {
        let mut inner = self.lock()?;
        let Some(current) = inner.trades.get(id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if current.status != expected {
            return Ok(UpdateOutcome::Conflict {
                actual: current.status,
            });
        }
        let mut updated = current.clone();
        apply(&mut updated)?;
        inner.index(&updated);
        inner.trades.insert(id.clone(), updated.clone());
        Ok(UpdateOutcome::Updated(updated))
    }
}

impl InMemoryTradeRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::Repository("trade store mutex poisoned".to_string()))
    }
}
