//! Payment reconciliation.
//!
//! A checkout moves through: intent requested, intent created on the
//! gateway, signature verified, order persisted, ledger broadcast and
//! finally a best-effort confirmation e-mail. A submission whose signature
//! does not verify stops before anything is written.

mod provider;
mod signature;

pub use provider::{PaymentProvider, ProviderOrder, ProviderOrderRequest, RazorpayProvider};
pub use signature::{expected_signature, verify_signature};

use serde::Serialize;
use std::sync::Arc;

use crate::api::metrics::{record_checkout_rejected, record_checkout_verified, record_status_update};
use crate::api::validation::{normalize_email, validate_email};
use crate::config::{OrdersConfig, PaymentConfig};
use crate::db::{
    from_minor_units, new_id, now_timestamp, to_json, to_minor_units, CheckoutSubmission, DbPool,
    Order, OrderResponse, OrderStatus, User, MAX_AMOUNT_MINOR,
};
use crate::error::{Error, Result};
use crate::ledger::LedgerBroadcaster;
use crate::notifications::{spawn_best_effort, Notifier};

/// What the storefront needs to open the gateway's checkout widget
#[derive(Debug, Clone, Serialize)]
pub struct ProviderOrderRef {
    pub id: String,
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub key_id: String,
}

fn new_receipt() -> String {
    let bytes: [u8; 4] = rand::random();
    format!("rcpt_{}", hex::encode(bytes))
}

/// Borrowed view over the collaborators one checkout touches
pub struct Reconciliation<'a> {
    pub db: &'a DbPool,
    pub provider: &'a dyn PaymentProvider,
    pub notifier: &'a Arc<dyn Notifier>,
    pub ledger: &'a LedgerBroadcaster,
    pub payments: &'a PaymentConfig,
    pub orders: &'a OrdersConfig,
}

fn amount_message() -> String {
    format!(
        "Amount must be a positive number no greater than {}",
        from_minor_units(MAX_AMOUNT_MINOR)
    )
}

impl<'a> Reconciliation<'a> {
    /// Create a gateway order for `amount` (major units). Nothing is stored
    /// locally until the payment comes back signed.
    pub async fn create_payment_intent(&self, amount: f64) -> Result<ProviderOrderRef> {
        let amount_minor = match to_minor_units(amount) {
            Some(minor) if minor > 0 => minor,
            _ => {
                return Err(Error::validation("amount", amount_message()))
            }
        };

        let request = ProviderOrderRequest {
            amount: amount_minor,
            currency: self.payments.currency.clone(),
            receipt: new_receipt(),
        };

        let order = self.provider.create_order(&request).await.map_err(|e| {
            tracing::error!(error = %e, receipt = %request.receipt, "Gateway order creation failed");
            Error::Provider(e.to_string())
        })?;

        tracing::info!(
            provider_order_id = %order.id,
            amount_minor = order.amount,
            "Payment intent created"
        );

        Ok(ProviderOrderRef {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt.unwrap_or(request.receipt),
            key_id: self.payments.key_id.clone(),
        })
    }

    /// Verify a signed checkout and record it as a `Paid` order.
    pub async fn verify_and_persist(
        &self,
        submission: CheckoutSubmission,
        user: Option<&User>,
    ) -> Result<OrderResponse> {
        if !verify_signature(
            &self.payments.key_secret,
            &submission.provider_order_id,
            &submission.provider_payment_id,
            &submission.signature,
        ) {
            record_checkout_rejected();
            tracing::warn!(
                provider_order_id = %submission.provider_order_id,
                "Rejected checkout with invalid signature"
            );
            return Err(Error::InvalidSignature);
        }

        let email = normalize_email(&submission.email);
        validate_email(&email).map_err(|m| Error::validation("email", m))?;
        let amount_minor = to_minor_units(submission.amount)
            .filter(|m| *m > 0)
            .ok_or_else(|| Error::validation("amount", amount_message()))?;

        let id = new_id();
        let now = now_timestamp();
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, email, provider_order_id, provider_payment_id,
                                amount_minor, items, address, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user.map(|u| u.id.as_str()))
        .bind(&email)
        .bind(&submission.provider_order_id)
        .bind(&submission.provider_payment_id)
        .bind(amount_minor)
        .bind(to_json(&submission.items))
        .bind(to_json(&submission.address))
        .bind(OrderStatus::Paid.to_string())
        .bind(&now)
        .bind(&now)
        .execute(self.db)
        .await?;

        record_checkout_verified();
        tracing::info!(
            order_id = %id,
            provider_payment_id = %submission.provider_payment_id,
            amount_minor,
            "Order recorded"
        );

        self.ledger.recompute_and_broadcast().await;

        let order = self.find(&id).await?;
        let notifier = self.notifier.clone();
        let receipt = order.clone();
        spawn_best_effort("order_confirmation", async move {
            notifier.order_confirmation(&receipt).await
        });

        Ok(order)
    }

    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<OrderResponse> {
        let current = self.find(order_id).await?.status;

        if status.is_backward_from(current) {
            if !self.orders.allow_backward_transitions {
                return Err(Error::validation(
                    "status",
                    format!("Cannot move an order from {} back to {}", current, status),
                ));
            }
            tracing::warn!(order_id = %order_id, from = %current, to = %status, "Order status moved backwards");
        }

        sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(now_timestamp())
            .bind(order_id)
            .execute(self.db)
            .await?;

        record_status_update();
        tracing::info!(order_id = %order_id, status = %status, "Order status updated");

        self.ledger.recompute_and_broadcast().await;
        self.find(order_id).await
    }

    /// Orders placed under the user's e-mail or account, newest first
    pub async fn orders_for(&self, user: &User) -> Result<Vec<OrderResponse>> {
        let orders: Vec<Order> = sqlx::query_as(
            "SELECT * FROM orders WHERE email = ? OR user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(&user.email)
        .bind(&user.id)
        .fetch_all(self.db)
        .await?;
        Ok(orders.into_iter().map(OrderResponse::from).collect())
    }

    pub async fn all_orders(&self) -> Result<Vec<OrderResponse>> {
        let orders: Vec<Order> =
            sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, id DESC")
                .fetch_all(self.db)
                .await?;
        Ok(orders.into_iter().map(OrderResponse::from).collect())
    }

    async fn find(&self, order_id: &str) -> Result<OrderResponse> {
        let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE id = ?")
            .bind(order_id)
            .fetch_optional(self.db)
            .await?;
        order
            .map(OrderResponse::from)
            .ok_or_else(|| Error::not_found("Order"))
    }
}
