//! Ledger aggregate and live broadcaster.
//!
//! The ledger is derived, never stored: settled money is the sum of orders
//! in `Paid`, pending money is the sum of everything else. After every
//! order write the totals are recomputed and pushed to subscribers over a
//! process-local broadcast channel.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};

use crate::api::metrics::record_ledger_broadcast;
use crate::db::{from_minor_units, DbPool, OrderStatus};
use crate::error::Result;

/// Buffered updates per subscriber before it starts lagging
const CHANNEL_CAPACITY: usize = 64;

/// Totals in integer minor units, exact and independent of order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub settled_minor: i64,
    pub pending_minor: i64,
}

/// Totals as observers see them, in major units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerUpdate {
    pub bank_balance: f64,
    pub expected_cash: f64,
}

impl From<LedgerTotals> for LedgerUpdate {
    fn from(totals: LedgerTotals) -> Self {
        Self {
            bank_balance: from_minor_units(totals.settled_minor),
            expected_cash: from_minor_units(totals.pending_minor),
        }
    }
}

/// Settled and pending totals over every order.
///
/// `TOTAL()` accumulates as a float and never raises on overflow, unlike
/// `SUM()`. Totals are exact up to 2^53 minor units and saturate beyond.
pub async fn aggregate(db: &DbPool) -> Result<LedgerTotals> {
    let (settled, pending): (f64, f64) = sqlx::query_as(
        r#"
        SELECT
            TOTAL(CASE WHEN status = ? THEN amount_minor ELSE 0 END),
            TOTAL(CASE WHEN status <> ? THEN amount_minor ELSE 0 END)
        FROM orders
        "#,
    )
    .bind(OrderStatus::Paid.to_string())
    .bind(OrderStatus::Paid.to_string())
    .fetch_one(db)
    .await?;

    Ok(LedgerTotals {
        settled_minor: settled as i64,
        pending_minor: pending as i64,
    })
}

pub struct LedgerBroadcaster {
    db: DbPool,
    tx: broadcast::Sender<LedgerUpdate>,
    /// Serializes recompute+send so a stale snapshot is never sent after a
    /// fresher one
    publish: Mutex<()>,
}

impl LedgerBroadcaster {
    pub fn new(db: DbPool) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            db,
            tx,
            publish: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerUpdate> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Current totals without notifying anyone
    pub async fn snapshot(&self) -> Result<LedgerUpdate> {
        Ok(aggregate(&self.db).await?.into())
    }

    /// Recompute totals and push them to every observer.
    ///
    /// Called after an order write has committed, so a failure here is
    /// logged and swallowed: the write stands either way.
    pub async fn recompute_and_broadcast(&self) -> Option<LedgerUpdate> {
        let _guard = self.publish.lock().await;

        let update: LedgerUpdate = match aggregate(&self.db).await {
            Ok(totals) => totals.into(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to recompute ledger totals");
                return None;
            }
        };

        // No observers is fine
        let delivered = self.tx.send(update).unwrap_or(0);
        record_ledger_broadcast();
        tracing::info!(
            bank_balance = update.bank_balance,
            expected_cash = update.expected_cash,
            observers = delivered,
            "Ledger update broadcast"
        );

        Some(update)
    }
}
