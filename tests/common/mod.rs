//! Router harness for end-to-end tests.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use shoplane::config::Config;
use shoplane::db::{self, OrderResponse};
use shoplane::notifications::Notifier;
use shoplane::payments::{PaymentProvider, ProviderOrder, ProviderOrderRequest};
use shoplane::{AppState, DbPool};

pub const KEY_SECRET: &str = "integration_key_secret";

#[derive(Default)]
pub struct MailSpy {
    codes: Mutex<HashMap<String, String>>,
}

impl MailSpy {
    pub fn code_for(&self, email: &str) -> Option<String> {
        self.codes.lock().unwrap().get(email).cloned()
    }
}

#[async_trait]
impl Notifier for MailSpy {
    async fn order_confirmation(&self, _order: &OrderResponse) -> Result<()> {
        Ok(())
    }

    async fn one_time_code(&self, email: &str, _name: &str, code: &str, _ttl: i64) -> Result<()> {
        self.codes
            .lock()
            .unwrap()
            .insert(email.to_string(), code.to_string());
        Ok(())
    }

    async fn welcome(&self, _email: &str, _name: &str) -> Result<()> {
        Ok(())
    }
}

pub struct StubGateway;

#[async_trait]
impl PaymentProvider for StubGateway {
    async fn create_order(&self, request: &ProviderOrderRequest) -> Result<ProviderOrder> {
        Ok(ProviderOrder {
            id: "order_stub".to_string(),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".to_string()),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub db: DbPool,
    pub mail: Arc<MailSpy>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut config = Config::default();
        config.payments.key_id = "rzp_test_key".to_string();
        config.payments.key_secret = KEY_SECRET.to_string();
        config.rate_limit.enabled = false;
        config.auth.admin_email = Some("admin@shop.test".to_string());
        config.auth.admin_password = Some("admin-password".to_string());

        let db = db::init_in_memory().await.unwrap();
        shoplane::auth::ensure_admin(&db, "admin@shop.test", "admin-password")
            .await
            .unwrap();

        let mail = Arc::new(MailSpy::default());
        let state = Arc::new(AppState::new(
            config,
            db.clone(),
            Arc::new(StubGateway),
            mail.clone(),
        ));
        let router = shoplane::api::create_router(state.clone());

        Self {
            router,
            state,
            db,
            mail,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin@shop.test", "admin-password").await
    }
}
