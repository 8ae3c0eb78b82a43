mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{TestApp, KEY_SECRET};
use shoplane::payments::expected_signature;

fn checkout(signature: &str) -> Value {
    json!({
        "razorpay_order_id": "order_stub",
        "razorpay_payment_id": "pay_42",
        "razorpay_signature": signature,
        "email": "buyer@example.com",
        "amount": 499,
        "items": [{ "name": "Linen Shirt", "price": 499, "quantity": 1, "size": "M" }],
        "address": { "fullName": "Buyer", "city": "Pune", "pincode": "411001" }
    })
}

#[tokio::test]
async fn intent_is_created_in_minor_units() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(Method::POST, "/api/payment/order", None, Some(json!({ "amount": 499 })))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["id"], "order_stub");
    assert_eq!(body["amount"], 49_900);
    assert_eq!(body["key_id"], "rzp_test_key");

    let (status, body) = app
        .request(Method::POST, "/api/payment/order", None, Some(json!({ "amount": 0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = app
        .request(Method::POST, "/api/payment/order", None, Some(json!({ "amount": 4.0e16 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forged_signature_records_nothing() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let forged = expected_signature("not-the-secret", "order_stub", "pay_42").unwrap();
    let (status, body) = app
        .request(Method::POST, "/api/payment/verify", None, Some(checkout(&forged)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "payment_verification_failed");

    let (status, orders) = app
        .request(Method::GET, "/api/payment/all-orders", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(orders.as_array().unwrap().is_empty());

    let (_, ledger) = app
        .request(Method::GET, "/api/admin/ledger", Some(&admin), None)
        .await;
    assert_eq!(ledger["bankBalance"], 0.0);
}

#[tokio::test]
async fn valid_checkout_settles_and_broadcasts() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let mut observer = app.state.ledger.subscribe();

    let (_, before) = app
        .request(Method::GET, "/api/admin/ledger", Some(&admin), None)
        .await;

    let signature = expected_signature(KEY_SECRET, "order_stub", "pay_42").unwrap();
    let (status, order) = app
        .request(Method::POST, "/api/payment/verify", None, Some(checkout(&signature)))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "Paid");
    assert_eq!(order["amount"], 499.0);
    assert_eq!(order["items"][0]["qty"], 1);
    assert_eq!(order["address"]["full_name"], "Buyer");
    assert_eq!(order["address"]["phone"], "N/A");

    let pushed = observer.recv().await.unwrap();
    assert_eq!(pushed.bank_balance, 499.0);

    let (_, after) = app
        .request(Method::GET, "/api/admin/ledger", Some(&admin), None)
        .await;
    let delta = after["bankBalance"].as_f64().unwrap() - before["bankBalance"].as_f64().unwrap();
    assert_eq!(delta, 499.0);

    // Shipping moves the money out of the settled bucket
    let id = order["id"].as_str().unwrap();
    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/payment/update-status/{}", id),
            Some(&admin),
            Some(json!({ "status": "Shipped" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "Shipped");

    let (_, ledger) = app
        .request(Method::GET, "/api/admin/ledger", Some(&admin), None)
        .await;
    assert_eq!(ledger["bankBalance"], 0.0);
    assert_eq!(ledger["expectedCash"], 499.0);

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/payment/update-status/{}", id),
            Some(&admin),
            Some(json!({ "status": "Lost" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn signed_in_buyer_sees_own_orders() {
    let app = TestApp::new().await;
    app.request(
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Buyer", "email": "buyer@example.com", "password": "buyer-pass" })),
    )
    .await;
    let token = app.login("buyer@example.com", "buyer-pass").await;

    let signature = expected_signature(KEY_SECRET, "order_stub", "pay_42").unwrap();
    let (status, _) = app
        .request(Method::POST, "/api/payment/verify", Some(&token), Some(checkout(&signature)))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, orders) = app
        .request(Method::GET, "/api/payment/my-orders", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert!(orders[0]["user_id"].is_string());

    let (status, _) = app
        .request(Method::GET, "/api/payment/all-orders", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
