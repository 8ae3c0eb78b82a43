//! Outgoing customer notifications.
//!
//! Every message goes through the [`Notifier`] trait so the checkout and
//! account flows never depend on a concrete mail relay. Callers decide
//! whether a failure matters: order confirmations are best-effort, one-time
//! codes are not.

mod email;

pub use email::EmailNotifier;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::EmailConfig;
use crate::db::OrderResponse;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Receipt for a verified, persisted order
    async fn order_confirmation(&self, order: &OrderResponse) -> Result<()>;

    /// Deliver a one-time code for password reset or passwordless login
    async fn one_time_code(&self, email: &str, name: &str, code: &str, ttl_minutes: i64)
        -> Result<()>;

    async fn welcome(&self, email: &str, name: &str) -> Result<()>;
}

/// Notifier used when no mail relay is configured. Logs and drops.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn order_confirmation(&self, order: &OrderResponse) -> Result<()> {
        tracing::warn!(order_id = %order.id, "Email not configured, skipping order confirmation");
        Ok(())
    }

    async fn one_time_code(&self, email: &str, _name: &str, _code: &str, _ttl: i64) -> Result<()> {
        anyhow::bail!("Email not configured, cannot deliver code to {}", email)
    }

    async fn welcome(&self, email: &str, _name: &str) -> Result<()> {
        tracing::warn!(to = %email, "Email not configured, skipping welcome email");
        Ok(())
    }
}

/// Pick the SMTP notifier when the relay is configured, else the no-op one
pub fn from_config(config: &EmailConfig) -> Arc<dyn Notifier> {
    if config.is_configured() {
        Arc::new(EmailNotifier::new(config.clone()))
    } else {
        Arc::new(NoopNotifier)
    }
}

/// Spawn a notification whose failure must never reach the caller.
pub fn spawn_best_effort<F>(what: &'static str, fut: F)
where
    F: std::future::Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            tracing::error!(notification = what, error = %e, "Failed to send notification");
        }
    });
}
