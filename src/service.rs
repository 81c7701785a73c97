//! `TradeService` — the trade lifecycle orchestrator.
//!
//! Owns the collaborator ports and the expiry watchdog, and drives every
//! trade from inbound Request to a terminal state. Potentially slow
//! collaborator calls (pricing, wallet, broadcast) run on the blocking
//! thread pool so the async caller is never stalled.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use swap_proto::{
    AcceptOpts, BlindingMaterial, FailureCode, ProtocolVersion, SwapCodec, SwapComplete, SwapFail,
    SwapId, SwapMessage, SwapRequest, ValidatedSwapRequest, validate_request,
};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::market::{Market, TradeSide};
use crate::ports::{PriceSource, Quote, SwapWallet, TxBroadcaster};
use crate::repository::{TradeRepository, UpdateOutcome};
use crate::trade::{Trade, TradeId, TradeStatus};
use crate::watchdog::{ExpiryEvent, ExpiryWatchdogHandle, spawn_expiry_watchdog};

/// What the caller should send back to the counterparty, if anything.
#[derive(Debug)]
pub enum TradeReply {
    /// We accepted: forward the serialized Accept. `expires_at` is the
    /// deadline by which the Complete must arrive.
    Accept {
        trade_id: TradeId,
        payload: Vec<u8>,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
    },
    /// The final transaction hit the network.
    Settled { trade_id: TradeId, txid: String },
    /// The negotiation failed: forward the serialized Fail.
    Fail {
        trade_id: Option<TradeId>,
        code: FailureCode,
        payload: Vec<u8>,
    },
    /// An inbound failure was recorded, nothing to send back.
    Acknowledged { trade_id: TradeId },
}

pub struct TradeService {
    config: EngineConfig,
    codec: SwapCodec,
    pricing: Arc<dyn PriceSource>,
    wallet: Arc<dyn SwapWallet>,
    broadcaster: Arc<dyn TxBroadcaster>,
    repository: Arc<dyn TradeRepository>,
    watchdog: ExpiryWatchdogHandle,
    /// One gate per in-flight request id, so concurrent deliveries of the
    /// same request serialize and the losers replay instead of proposing.
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TradeService {
    /// Build the service and spawn its expiry watchdog on the current
    /// runtime. The returned receiver carries watchdog expiry events.
    pub fn start(
        config: EngineConfig,
        pricing: Arc<dyn PriceSource>,
        wallet: Arc<dyn SwapWallet>,
        broadcaster: Arc<dyn TxBroadcaster>,
        repository: Arc<dyn TradeRepository>,
    ) -> (Self, tokio::sync::mpsc::UnboundedReceiver<ExpiryEvent>) {
        let (watchdog, events) = spawn_expiry_watchdog(&config, repository.clone());
        (
            Self {
                config,
                codec: SwapCodec::new(),
                pricing,
                wallet,
                broadcaster,
                repository,
                watchdog,
                in_flight: Mutex::new(HashMap::new()),
            },
            events,
        )
    }

    pub fn shutdown(&self) {
        self.watchdog.shutdown();
    }

    // ── Propose ─────────────────────────────────────────────────────────

    /// Handle an inbound swap request for `market`, trading `side`.
    ///
    /// Negotiation failures (bad pricing, invalid transaction, wallet
    /// refusal) come back as [`TradeReply::Fail`] and leave a Failed trade
    /// behind. Infrastructure failures come back as `Err` and leave nothing.
    pub async fn propose(
        &self,
        market: Market,
        side: TradeSide,
        bytes: &[u8],
        version: ProtocolVersion,
    ) -> Result<TradeReply> {
        let request = self.codec.decode_request(bytes, version)?;

        // Deliveries of one request id never run side by side: the first
        // holds the gate while it works, the rest wait on it and then hit
        // the replay check below instead of minting a second trade.
        let gate = self.request_gate(request.id.as_str());
        let result = {
            let _held = gate.lock().await;
            self.propose_serialized(market, side, request.clone(), version)
                .await
        };
        self.release_request_gate(request.id.as_str(), &gate);
        result
    }

    async fn propose_serialized(
        &self,
        market: Market,
        side: TradeSide,
        request: SwapRequest,
        version: ProtocolVersion,
    ) -> Result<TradeReply> {
        // Seen before? Replay the recorded reply verbatim.
        if let Some(trade) = self.repository.find_by_message_id(request.id.as_str())? {
            if let Some(reply) = replay(&trade, request.id.as_str()) {
                log::info!("trade {}: replaying reply for request {}", trade.id, request.id);
                return Ok(reply);
            }
        }

        // The route names the market and side; the request's asset
        // orientation must agree with both.
        match market.side_of(&request) {
            None => return Err(Error::MarketNotFound(market.to_string())),
            Some(derived) if derived != side => {
                return Err(Error::SideMismatch {
                    market: market.to_string(),
                    declared: side,
                });
            }
            Some(_) => {}
        }

        let quote = {
            let pricing = self.pricing.clone();
            let amount = request.amount_to_send;
            blocking(move || pricing.quote(&market, side, amount)).await?
        };

        let validated = {
            let request = request.clone();
            let terms = quote.terms();
            blocking(move || {
                let material = BlindingMaterial::Declared(&request.unblinded_inputs);
                Ok(validate_request(&request, &terms, &material))
            })
            .await?
        };
        let validated = match validated {
            Ok(validated) => validated,
            Err(e) => {
                log::info!("request {} rejected: {e}", request.id);
                return self.reject(market, side, quote, request, e.failure_code(), version);
            }
        };

        let funded = {
            let wallet = self.wallet.clone();
            let validated = validated.clone();
            let quote = quote.clone();
            blocking(move || wallet.complete_counter_tx(&validated, &quote)).await
        };
        let funded = match funded {
            Ok(funded) => funded,
            Err(e) => {
                log::warn!("request {}: wallet could not fund our side: {e}", request.id);
                return self.reject(
                    market,
                    side,
                    quote,
                    request,
                    FailureCode::FailedToComplete,
                    version,
                );
            }
        };

        let (accept, payload) = self.codec.build_accept(
            &validated,
            AcceptOpts {
                transaction: funded.transaction,
                unblinded_inputs: funded.unblinded_inputs,
            },
            version,
        )?;

        let mut trade = Trade::new(market, side, quote);
        trade.ingest_request(request.clone())?;
        trade.ingest_accept(accept, self.config.completion_ttl)?;
        trade.record_reply(request.id.as_str(), payload.clone());
        self.repository.save(&trade)?;

        if let Some(deadline) = trade.expires_at {
            self.watchdog.track(trade.id.clone(), deadline);
        }
        log::info!("trade {}: accepted request {}", trade.id, request.id);

        Ok(TradeReply::Accept {
            trade_id: trade.id,
            payload,
            expires_at: trade.expires_at,
        })
    }

    // ── Complete ────────────────────────────────────────────────────────

    /// Handle the second inbound message, either a Complete or a Fail.
    pub async fn complete(&self, bytes: &[u8], version: ProtocolVersion) -> Result<TradeReply> {
        match self.codec.decode(bytes, version)? {
            SwapMessage::SwapComplete(complete) => self.handle_complete(complete, version).await,
            SwapMessage::SwapFail(fail) => self.handle_inbound_fail(fail),
            other => Err(Error::Protocol(swap_proto::Error::UnexpectedMessage {
                expected: "swap_complete or swap_fail",
                found: other.kind(),
            })),
        }
    }

    async fn handle_complete(
        &self,
        complete: SwapComplete,
        version: ProtocolVersion,
    ) -> Result<TradeReply> {
        let Some(trade) = self
            .repository
            .find_by_message_id(complete.accept_id.as_str())?
        else {
            // An accept id we never issued is a protocol outcome, not a
            // transport fault. No trade to record it on, but the
            // counterparty still gets a Fail payload.
            log::warn!(
                "complete {} references unknown accept {}",
                complete.id,
                complete.accept_id
            );
            let (_, payload) = self.codec.build_fail(
                complete.id.clone(),
                FailureCode::FailedToComplete,
                version,
            )?;
            return Ok(TradeReply::Fail {
                trade_id: None,
                code: FailureCode::FailedToComplete,
                payload,
            });
        };

        if let Some(reply) = replay(&trade, complete.id.as_str()) {
            log::info!("trade {}: replaying reply for complete {}", trade.id, complete.id);
            return Ok(reply);
        }

        let trade_id = trade.id.clone();
        let outcome = self.repository.update_if_status(
            &trade_id,
            TradeStatus::Accept,
            &mut |t| t.ingest_complete(complete.clone()),
        )?;
        match outcome {
            UpdateOutcome::Updated(_) => {}
            UpdateOutcome::Conflict {
                actual: TradeStatus::Expired,
            } => {
                // The completion deadline won the race.
                return self.abort_reply(&trade_id, &complete.id, version);
            }
            UpdateOutcome::Conflict { actual } => {
                return Err(Error::IllegalTransition {
                    actual,
                    action: "complete",
                });
            }
            UpdateOutcome::NotFound => {
                return Err(Error::TradeNotFound(trade_id.to_string()));
            }
        }

        let final_tx = swap_proto::parse_pset(&complete.transaction)
            .and_then(|pset| swap_proto::extract_final_tx(&pset));
        let final_tx = match final_tx {
            Ok(tx) => tx,
            Err(e) => {
                log::warn!("trade {trade_id}: complete carries a bad transaction: {e}");
                return self.fail_completed_trade(
                    &trade_id,
                    &complete.id,
                    FailureCode::InvalidTransaction,
                    version,
                );
            }
        };

        let broadcast = {
            let broadcaster = self.broadcaster.clone();
            blocking(move || Ok(broadcaster.broadcast(&final_tx))).await?
        };
        match broadcast {
            Ok(txid) => {
                let txid = txid.to_string();
                self.repository.update_if_status(
                    &trade_id,
                    TradeStatus::Complete,
                    &mut |t| {
                        t.settle(txid.clone())?;
                        t.record_reply(complete.id.as_str(), txid.clone().into_bytes());
                        Ok(())
                    },
                )?;
                self.watchdog.cancel(trade_id.clone());
                log::info!("trade {trade_id}: settled as {txid}");
                Ok(TradeReply::Settled {
                    trade_id,
                    txid,
                })
            }
            Err(e) => {
                // One shot. A transaction that did not propagate is not retried.
                log::error!("trade {trade_id}: broadcast failed: {e}");
                self.fail_completed_trade(
                    &trade_id,
                    &complete.id,
                    FailureCode::FailedToBroadcast,
                    version,
                )
            }
        }
    }

    /// Record an inbound failure from the counterparty.
    fn handle_inbound_fail(&self, fail: SwapFail) -> Result<TradeReply> {
        let trade = self
            .repository
            .find_by_message_id(fail.message_id.as_str())?
            .ok_or_else(|| Error::TradeNotFound(fail.message_id.to_string()))?;

        if trade.status.is_terminal() {
            log::info!("trade {}: failure for already terminal trade, ignored", trade.id);
            return Ok(TradeReply::Acknowledged { trade_id: trade.id });
        }

        let trade_id = trade.id.clone();
        let code = fail.failure_code;
        let outcome =
            self.repository
                .update_if_status(&trade_id, trade.status, &mut |t| {
                    t.fail(code, Some(fail.clone()))
                })?;
        match outcome {
            UpdateOutcome::Updated(_) => {
                self.watchdog.cancel(trade_id.clone());
                log::info!("trade {trade_id}: counterparty failed the swap ({code})");
            }
            UpdateOutcome::Conflict { actual } => {
                log::debug!("trade {trade_id}: moved to {actual:?} before the failure landed");
            }
            UpdateOutcome::NotFound => {
                return Err(Error::TradeNotFound(trade_id.to_string()));
            }
        }
        Ok(TradeReply::Acknowledged { trade_id })
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn get_trade(&self, id: &TradeId) -> Result<Trade> {
        self.repository
            .get(id)?
            .ok_or_else(|| Error::TradeNotFound(id.to_string()))
    }

    pub fn list_trades(
        &self,
        market: Option<&Market>,
        page: Option<crate::repository::Page>,
    ) -> Result<Vec<Trade>> {
        self.repository.list(market, page)
    }

    pub fn tradable_markets(&self) -> Result<Vec<Market>> {
        self.pricing.tradable_markets()
    }

    /// Peer capability exchange. Not wired up yet.
    pub fn handshake_info(&self) -> Result<()> {
        Err(Error::NotImplemented("handshake info"))
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Persist a Failed trade for a rejected request and hand back the Fail
    /// payload to forward.
    fn reject(
        &self,
        market: Market,
        side: TradeSide,
        quote: Quote,
        request: SwapRequest,
        code: FailureCode,
        version: ProtocolVersion,
    ) -> Result<TradeReply> {
        let (_, payload) = self
            .codec
            .build_fail(request.id.clone(), code, version)?;
        let message_id = request.id.as_str().to_string();
        let mut trade = Trade::new(market, side, quote);
        trade.ingest_request(request)?;
        trade.fail(code, None)?;
        trade.record_reply(&message_id, payload.clone());
        self.repository.save(&trade)?;
        Ok(TradeReply::Fail {
            trade_id: Some(trade.id),
            code,
            payload,
        })
    }

    /// Reply to a Complete that lost the race against expiry.
    fn abort_reply(
        &self,
        trade_id: &TradeId,
        complete_id: &SwapId,
        version: ProtocolVersion,
    ) -> Result<TradeReply> {
        log::info!("trade {trade_id}: complete arrived after expiry");
        let (_, payload) =
            self.codec
                .build_fail(complete_id.clone(), FailureCode::Aborted, version)?;
        self.record_reply_on(trade_id, complete_id.as_str(), payload.clone())?;
        Ok(TradeReply::Fail {
            trade_id: Some(trade_id.clone()),
            code: FailureCode::Aborted,
            payload,
        })
    }

    /// Move a Complete trade to Failed and hand back the Fail payload.
    fn fail_completed_trade(
        &self,
        trade_id: &TradeId,
        complete_id: &SwapId,
        code: FailureCode,
        version: ProtocolVersion,
    ) -> Result<TradeReply> {
        let (fail, payload) = self
            .codec
            .build_fail(complete_id.clone(), code, version)?;
        self.repository
            .update_if_status(trade_id, TradeStatus::Complete, &mut |t| {
                t.fail(code, Some(fail.clone()))?;
                t.record_reply(complete_id.as_str(), payload.clone());
                Ok(())
            })?;
        self.watchdog.cancel(trade_id.clone());
        Ok(TradeReply::Fail {
            trade_id: Some(trade_id.clone()),
            code,
            payload,
        })
    }

    /// Attach a reply to a trade without changing its status.
    fn record_reply_on(&self, trade_id: &TradeId, message_id: &str, payload: Vec<u8>) -> Result<()> {
        if let Some(trade) = self.repository.get(trade_id)? {
            // Only terminal trades get replies attached this way, so the
            // compare below cannot move under us.
            self.repository
                .update_if_status(trade_id, trade.status, &mut |t| {
                    t.record_reply(message_id, payload.clone());
                    Ok(())
                })?;
        }
        Ok(())
    }

    fn request_gate(&self, message_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        // A poisoned map only loses gates; the replay check still holds.
        let mut gates = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        gates.entry(message_id.to_string()).or_default().clone()
    }

    fn release_request_gate(&self, message_id: &str, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut gates = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        // Two strong refs left means the map's and ours: nobody is waiting.
        if Arc::strong_count(gate) == 2 {
            gates.remove(message_id);
        }
    }
}

/// Rebuild the reply previously sent for `message_id`, if one was recorded.
fn replay(trade: &Trade, message_id: &str) -> Option<TradeReply> {
    let stored = trade.reply_for(message_id)?;
    let payload = stored.payload.clone();
    Some(match trade.status {
        TradeStatus::Settled => TradeReply::Settled {
            trade_id: trade.id.clone(),
            txid: trade.txid.clone().unwrap_or_default(),
        },
        TradeStatus::Failed | TradeStatus::Expired => TradeReply::Fail {
            trade_id: Some(trade.id.clone()),
            code: trade.failure_code.unwrap_or(FailureCode::Aborted),
            payload,
        },
        _ => TradeReply::Accept {
            trade_id: trade.id.clone(),
            payload,
            expires_at: trade.expires_at,
        },
    })
}

/// Run a collaborator call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}
