//! Fakes and fixtures shared by the unit tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::auth::hash_password;
use crate::catalog;
use crate::db::{
    new_id, now_timestamp, DbPool, NewProduct, OrderResponse, OrderStatus, ProductResponse, Role,
    StringList, User,
};
use crate::notifications::Notifier;
use crate::payments::{PaymentProvider, ProviderOrder, ProviderOrderRequest};

/// Notifier that remembers what it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    codes: Mutex<HashMap<String, String>>,
    orders: Mutex<Vec<String>>,
    fail_codes: AtomicBool,
    fail_orders: AtomicBool,
}

impl RecordingNotifier {
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.codes.lock().unwrap().get(email).cloned()
    }

    /// Ids of orders a confirmation was sent for
    pub fn orders(&self) -> Vec<String> {
        self.orders.lock().unwrap().clone()
    }

    pub fn fail_codes(&self, fail: bool) {
        self.fail_codes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_orders(&self, fail: bool) {
        self.fail_orders.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn order_confirmation(&self, order: &OrderResponse) -> Result<()> {
        if self.fail_orders.load(Ordering::SeqCst) {
            anyhow::bail!("SMTP unavailable");
        }
        self.orders.lock().unwrap().push(order.id.clone());
        Ok(())
    }

    async fn one_time_code(&self, email: &str, _name: &str, code: &str, _ttl: i64) -> Result<()> {
        if self.fail_codes.load(Ordering::SeqCst) {
            anyhow::bail!("SMTP unavailable");
        }
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

/// Gateway that hands out sequential order ids
#[derive(Default)]
pub struct FakeProvider {
    requests: Mutex<Vec<ProviderOrderRequest>>,
    fail: AtomicBool,
}

impl FakeProvider {
    pub fn requests(&self) -> Vec<ProviderOrderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_order(&self, request: &ProviderOrderRequest) -> Result<ProviderOrder> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("Payment gateway error: 503 Service Unavailable");
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(ProviderOrder {
            id: format!("order_test{}", requests.len()),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".into()),
        })
    }
}

pub async fn seed_user(pool: &DbPool, email: &str) -> User {
    let id = new_id();
    let now = now_timestamp();
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind("Test User")
    .bind(email)
    .bind(hash_password("password123").unwrap())
    .bind(Role::User.to_string())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();

    crate::auth::find_user_by_id(pool, &id).await.unwrap().unwrap()
}

pub async fn seed_product(pool: &DbPool, name: &str, price: f64) -> ProductResponse {
    catalog::create(
        pool,
        NewProduct {
            name: name.into(),
            brand: "Acme".into(),
            description: format!("{} description", name),
            price: Some(price),
            section: "men".into(),
            category: "topwear".into(),
            images: Some(StringList::Many(vec![format!(
                "https://cdn.example.com/{}.jpg",
                name.to_lowercase()
            )])),
            stock: 10,
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

pub async fn insert_order(pool: &DbPool, amount_minor: i64, status: OrderStatus) -> String {
    let id = new_id();
    let now = now_timestamp();
    sqlx::query(
        r#"
        INSERT INTO orders (id, email, provider_order_id, provider_payment_id, amount_minor,
                            status, created_at, updated_at)
        VALUES (?, 'seed@example.com', ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(format!("order_{}", id))
    .bind(format!("pay_{}", id))
    .bind(amount_minor)
    .bind(status.to_string())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .unwrap();
    id
}
