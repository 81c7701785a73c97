//! Expiry watchdog: a background task that moves accepted trades to
//! `Expired` once their completion deadline passes.
//!
//! Expiry goes through the repository's compare-and-set, so a Complete
//! landing at the same instant is resolved there: whichever transition
//! commits first wins and the loser becomes a no-op.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::repository::{TradeRepository, UpdateOutcome};
use crate::trade::{TradeId, TradeStatus};

/// Commands sent from the service to the watchdog task.
#[derive(Debug)]
pub enum WatchCmd {
    /// Start watching a trade that just reached Accept.
    Track {
        trade_id: TradeId,
        deadline: DateTime<Utc>,
    },
    /// Stop watching a trade that reached a terminal state.
    Cancel { trade_id: TradeId },
    Shutdown,
}

/// Events emitted by the watchdog task.
#[derive(Debug, Clone)]
pub enum ExpiryEvent {
    Expired { trade_id: TradeId },
}

/// Handle for sending commands to a running watchdog task.
#[derive(Clone)]
pub struct ExpiryWatchdogHandle {
    cmd_tx: tokio::sync::mpsc::UnboundedSender<WatchCmd>,
}

impl ExpiryWatchdogHandle {
    pub fn track(&self, trade_id: TradeId, deadline: DateTime<Utc>) {
        let _ = self.cmd_tx.send(WatchCmd::Track { trade_id, deadline });
    }

    pub fn cancel(&self, trade_id: TradeId) {
        let _ = self.cmd_tx.send(WatchCmd::Cancel { trade_id });
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(WatchCmd::Shutdown);
    }
}

/// Spawn the watchdog on the current tokio runtime.
///
/// Returns a handle for sending commands, and a receiver for expiry events.
pub fn spawn_expiry_watchdog(
    config: &EngineConfig,
    repository: Arc<dyn TradeRepository>,
) -> (
    ExpiryWatchdogHandle,
    tokio::sync::mpsc::UnboundedReceiver<ExpiryEvent>,
) {
    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
    let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();

    let handle = ExpiryWatchdogHandle { cmd_tx };
    let poll_interval = config.watchdog_poll_interval;

    tokio::spawn(async move {
        watchdog_main(poll_interval, repository, cmd_rx, event_tx).await;
    });

    (handle, event_rx)
}

async fn watchdog_main(
    poll_interval: std::time::Duration,
    repository: Arc<dyn TradeRepository>,
    mut cmd_rx: tokio::sync::mpsc::UnboundedReceiver<WatchCmd>,
    event_tx: tokio::sync::mpsc::UnboundedSender<ExpiryEvent>,
) {
    let mut deadlines: HashMap<TradeId, DateTime<Utc>> = HashMap::new();
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(WatchCmd::Track { trade_id, deadline }) => {
                        log::debug!("watchdog: tracking {trade_id} until {deadline}");
                        deadlines.insert(trade_id, deadline);
                    }
                    Some(WatchCmd::Cancel { trade_id }) => {
                        log::debug!("watchdog: cancelled {trade_id}");
                        deadlines.remove(&trade_id);
                    }
                    Some(WatchCmd::Shutdown) | None => {
                        log::info!("watchdog: shutting down");
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                sweep(&repository, &mut deadlines, &event_tx);
            }
        }
    }
}

/// One pass: expire due tracked trades, then catch anything accepted before
/// this task started (for example trades loaded from storage on restart).
fn sweep(
    repository: &Arc<dyn TradeRepository>,
    deadlines: &mut HashMap<TradeId, DateTime<Utc>>,
    event_tx: &tokio::sync::mpsc::UnboundedSender<ExpiryEvent>,
) {
    let now = Utc::now();

    let due: Vec<TradeId> = deadlines
        .iter()
        .filter(|(_, deadline)| **deadline <= now)
        .map(|(id, _)| id.clone())
        .collect();
    for trade_id in due {
        deadlines.remove(&trade_id);
        try_expire(repository, &trade_id, event_tx);
    }

    match repository.accepted_before(now) {
        Ok(overdue) => {
            for trade in overdue {
                try_expire(repository, &trade.id, event_tx);
            }
        }
        Err(e) => log::warn!("watchdog: sweep query failed: {e}"),
    }
}

fn try_expire(
    repository: &Arc<dyn TradeRepository>,
    trade_id: &TradeId,
    event_tx: &tokio::sync::mpsc::UnboundedSender<ExpiryEvent>,
) {
    match repository.update_if_status(trade_id, TradeStatus::Accept, &mut |t| t.expire()) {
        Ok(UpdateOutcome::Updated(_)) => {
            log::info!("watchdog: trade {trade_id} expired");
            let _ = event_tx.send(ExpiryEvent::Expired {
                trade_id: trade_id.clone(),
            });
        }
        Ok(UpdateOutcome::Conflict { actual }) => {
            // Completion won the race. Nothing to do.
            log::debug!("watchdog: trade {trade_id} moved to {actual:?} before expiry");
        }
        Ok(UpdateOutcome::NotFound) => {
            log::warn!("watchdog: tracked trade {trade_id} is gone");
        }
        Err(e) => log::warn!("watchdog: expiring {trade_id} failed: {e}"),
    }
}
