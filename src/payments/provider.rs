//! Payment gateway client.
//!
//! The gateway only has to create orders: the storefront's checkout widget
//! collects the payment and hands back a signed confirmation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::PaymentConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ProviderOrderRequest {
    /// Minor units (paise)
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

/// Order as created on the gateway side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_order(&self, request: &ProviderOrderRequest) -> Result<ProviderOrder>;
}

/// Razorpay Orders API over HTTPS with basic auth
pub struct RazorpayProvider {
    api_base: String,
    key_id: String,
    key_secret: String,
    client: reqwest::Client,
}

impl RazorpayProvider {
    pub fn new(config: &PaymentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("shoplane/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build payment gateway HTTP client")?;

        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            client,
        })
    }
}

#[async_trait]
impl PaymentProvider for RazorpayProvider {
    async fn create_order(&self, request: &ProviderOrderRequest) -> Result<ProviderOrder> {
        let url = format!("{}/orders", self.api_base);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .context("Failed to reach payment gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Payment gateway error: {} - {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse payment gateway response")
    }
}
