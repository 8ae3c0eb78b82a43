pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod customers;
pub mod db;
pub mod error;
pub mod ledger;
pub mod notifications;
pub mod payments;

#[cfg(test)]
pub(crate) mod test_support;

pub use db::DbPool;

use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::auth::SessionIssuer;
use crate::ledger::LedgerBroadcaster;
use crate::notifications::Notifier;
use crate::payments::{PaymentProvider, Reconciliation};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub sessions: SessionIssuer,
    pub payments: Arc<dyn PaymentProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub ledger: Arc<LedgerBroadcaster>,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: DbPool,
        payments: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let sessions = SessionIssuer::from_config(&config.auth);
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let ledger = Arc::new(LedgerBroadcaster::new(db.clone()));
        Self {
            config,
            db,
            sessions,
            payments,
            notifier,
            ledger,
            rate_limiter,
            metrics_handle: None,
        }
    }

    /// Set the Prometheus metrics handle
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Checkout flow wired to this state's collaborators
    pub fn reconciliation(&self) -> Reconciliation<'_> {
        Reconciliation {
            db: &self.db,
            provider: self.payments.as_ref(),
            notifier: &self.notifier,
            ledger: &self.ledger,
            payments: &self.config.payments,
            orders: &self.config.orders,
        }
    }
}
