//! Trade aggregate: one negotiation from first Request to a terminal state.
//!
//! Every transition is a method that checks the current status and returns
//! [`Error::IllegalTransition`] when the move is not allowed, so callers
//! never mutate status directly.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use swap_proto::{FailureCode, SwapAccept, SwapComplete, SwapFail, SwapRequest};

use crate::error::{Error, Result};
use crate::market::{Market, TradeSide};
use crate::ports::Quote;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(String);

impl TradeId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TradeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TradeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Created, no message ingested yet.
    Empty,
    /// A valid Request has been recorded.
    Request,
    /// We answered with an Accept and armed the completion deadline.
    Accept,
    /// The counterparty's Complete has been recorded.
    Complete,
    /// The final transaction was broadcast.
    Settled,
    /// The completion deadline passed without a Complete.
    Expired,
    /// The negotiation failed, on either side.
    Failed,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Settled | TradeStatus::Expired | TradeStatus::Failed
        )
    }
}

/// A reply already sent for an inbound message, kept for idempotent replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReply {
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub market: Market,
    pub side: TradeSide,
    pub status: TradeStatus,
    /// Price snapshot taken when the request arrived. Settlement uses this
    /// snapshot even if the live price has moved since.
    pub quote: Quote,
    pub request: Option<SwapRequest>,
    pub accept: Option<SwapAccept>,
    pub complete: Option<SwapComplete>,
    pub fail: Option<SwapFail>,
    pub txid: Option<String>,
    pub failure_code: Option<FailureCode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Completion deadline, armed exactly once when the Accept is recorded.
    pub expires_at: Option<DateTime<Utc>>,
    replies: HashMap<String, StoredReply>,
}

impl Trade {
    pub fn new(market: Market, side: TradeSide, quote: Quote) -> Self {
        let now = Utc::now();
        Self {
            id: TradeId::generate(),
            market,
            side,
            status: TradeStatus::Empty,
            quote,
            request: None,
            accept: None,
            complete: None,
            fail: None,
            txid: None,
            failure_code: None,
            created_at: now,
            updated_at: now,
            expires_at: None,
            replies: HashMap::new(),
        }
    }

    pub fn ingest_request(&mut self, request: SwapRequest) -> Result<()> {
        self.guard(TradeStatus::Empty, "ingest a request")?;
        self.request = Some(request);
        self.advance(TradeStatus::Request);
        Ok(())
    }

    pub fn ingest_accept(&mut self, accept: SwapAccept, completion_ttl: Duration) -> Result<()> {
        self.guard(TradeStatus::Request, "record an accept")?;
        let ttl = chrono::Duration::from_std(completion_ttl)
            .map_err(|e| Error::Config(format!("completion ttl out of range: {e}")))?;
        self.accept = Some(accept);
        if self.expires_at.is_none() {
            self.expires_at = Some(Utc::now() + ttl);
        }
        self.advance(TradeStatus::Accept);
        Ok(())
    }

    pub fn ingest_complete(&mut self, complete: SwapComplete) -> Result<()> {
        self.guard(TradeStatus::Accept, "record a complete")?;
        self.complete = Some(complete);
        self.advance(TradeStatus::Complete);
        Ok(())
    }

    pub fn settle(&mut self, txid: String) -> Result<()> {
        self.guard(TradeStatus::Complete, "settle")?;
        self.txid = Some(txid);
        self.advance(TradeStatus::Settled);
        Ok(())
    }

    /// Expire an accepted trade whose completion deadline passed.
    pub fn expire(&mut self) -> Result<()> {
        self.guard(TradeStatus::Accept, "expire")?;
        self.advance(TradeStatus::Expired);
        Ok(())
    }

    /// Fail a live trade. Terminal trades cannot fail again.
    pub fn fail(&mut self, code: FailureCode, fail: Option<SwapFail>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::IllegalTransition {
                actual: self.status,
                action: "fail",
            });
        }
        self.failure_code = Some(code);
        self.fail = fail;
        self.advance(TradeStatus::Failed);
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == TradeStatus::Accept
            && self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    /// Record the reply sent for an inbound message id.
    pub fn record_reply(&mut self, message_id: &str, payload: Vec<u8>) {
        self.replies
            .insert(message_id.to_string(), StoredReply { payload });
        self.updated_at = Utc::now();
    }

    /// The reply previously sent for this message id, if any.
    pub fn reply_for(&self, message_id: &str) -> Option<&StoredReply> {
        self.replies.get(message_id)
    }

    fn guard(&self, expected: TradeStatus, action: &'static str) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(Error::IllegalTransition {
                actual: self.status,
                action,
            })
        }
    }

    fn advance(&mut self, next: TradeStatus) {
        log::debug!("trade {}: {:?} -> {next:?}", self.id, self.status);
        self.status = next;
        self.updated_at = Utc::now();
    }
}
