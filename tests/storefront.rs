mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

async fn shopper(app: &TestApp) -> String {
    app.request(
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Eve", "email": "eve@example.com", "password": "eve-password" })),
    )
    .await;
    app.login("eve@example.com", "eve-password").await
}

#[tokio::test]
async fn catalog_cart_and_wishlist() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let user = shopper(&app).await;

    let (status, product) = app
        .request(
            Method::POST,
            "/api/products/add",
            Some(&admin),
            Some(json!({
                "name": "Linen Shirt",
                "brand": "Weave",
                "Description": "Breathable linen",
                "price": 1499,
                "section": "Men",
                "category": "Shirts",
                "externalImageUrls": "https://cdn.example.com/a.jpg, https://cdn.example.com/b.jpg",
                "sizes": ["S", "M", "L"]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    assert_eq!(product["section"], "men");
    assert_eq!(product["images"].as_array().unwrap().len(), 2);
    let id = product["id"].as_str().unwrap().to_string();

    // Shoppers cannot write the catalog
    let (status, _) = app
        .request(Method::DELETE, &format!("/api/products/delete/{}", id), Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, page) = app
        .request(Method::GET, "/api/products?section=MEN&search=linen", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["has_more"], false);

    // Same product and size twice is one line with quantity 2
    for _ in 0..2 {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/cart/add",
                Some(&user),
                Some(json!({ "productId": id, "size": "M" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, cart) = app.request(Method::GET, "/api/cart", Some(&user), None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 2);
    assert_eq!(cart["items"][0]["product"]["name"], "Linen Shirt");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/cart/update",
            Some(&user),
            Some(json!({ "product_id": id, "size": "M", "quantity": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    // Removing an absent variant changes nothing
    let (status, cart) = app
        .request(
            Method::DELETE,
            &format!("/api/cart/remove/{}?size=XL", id),
            Some(&user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 2);

    let (_, cart) = app
        .request(
            Method::DELETE,
            &format!("/api/cart/remove/{}?size=M", id),
            Some(&user),
            None,
        )
        .await;
    assert_eq!(cart["item_count"], 0);

    let (status, wishlist) = app
        .request(
            Method::POST,
            "/api/wishlist/add",
            Some(&user),
            Some(json!({ "productId": id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wishlist["items"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/products/delete/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .request(Method::GET, &format!("/api/products/{}", id), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .request(Method::GET, "/api/products/not-a-product", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn bulk_import_fills_placeholders() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let products: Vec<_> = (0..5)
        .map(|i| {
            let mut p = json!({
                "name": format!("Tee {}", i),
                "brand": "Basics",
                "description": "Cotton tee",
                "price": 299
            });
            if i % 2 == 0 {
                p["images"] = json!([format!("https://cdn.example.com/{}.jpg", i)]);
            }
            p
        })
        .collect();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/products/bulk-add",
            Some(&admin),
            Some(json!({ "products": products })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["inserted_count"], 5);

    let (_, page) = app
        .request(Method::GET, "/api/products?limit=10", None, None)
        .await;
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    let placeholders = items
        .iter()
        .filter(|p| p["images"][0].as_str().unwrap().contains("placehold.co"))
        .count();
    assert_eq!(placeholders, 2);
    assert!(items.iter().all(|p| p["sizes"] == json!(["Free Size"])));
}

#[tokio::test]
async fn address_book_reports_every_bad_field() {
    let app = TestApp::new().await;
    let user = shopper(&app).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/customers/addresses",
            Some(&user),
            Some(json!({
                "name": "", "phone": "12", "pincode": "4110",
                "locality": "Baner", "address": "5 Hill Rd", "city": "Pune", "state": "MH"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["error"]["details"].as_object().unwrap();
    assert!(details.contains_key("name"));
    assert!(details.contains_key("phone"));
    assert!(details.contains_key("pincode"));

    let (status, book) = app
        .request(
            Method::POST,
            "/api/customers/addresses",
            Some(&user),
            Some(json!({
                "name": "Eve", "phone": "9876543210", "pincode": "411045",
                "locality": "Baner", "address": "5 Hill Rd", "city": "Pune", "state": "MH",
                "type": "Work"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{book}");
    assert_eq!(book[0]["type"], "Work");

    let address_id = book[0]["id"].as_str().unwrap();
    let (_, book) = app
        .request(
            Method::DELETE,
            &format!("/api/customers/addresses/{}", address_id),
            Some(&user),
            None,
        )
        .await;
    assert!(book.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_and_metrics_are_public() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
