//! Order ledger models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::common::{from_minor_units, parse_json};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Paid,
    Packed,
    Ready,
    Shipped,
    Delivered,
    Completed,
}

impl OrderStatus {
    /// Position in the fulfillment lifecycle. `Ready` shares a rank with
    /// `Packed` and `Completed` with `Delivered`.
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Paid => 1,
            OrderStatus::Packed | OrderStatus::Ready => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::Delivered | OrderStatus::Completed => 4,
        }
    }

    pub fn is_backward_from(&self, current: OrderStatus) -> bool {
        self.rank() < current.rank()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Packed => "Packed",
            OrderStatus::Ready => "Ready",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Completed => "Completed",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "packed" => Ok(OrderStatus::Packed),
            "ready" => Ok(OrderStatus::Ready),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "completed" => Ok(OrderStatus::Completed),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: String,
    pub user_id: Option<String>,
    pub email: String,
    pub provider_order_id: String,
    pub provider_payment_id: String,
    /// Integer paise
    pub amount_minor: i64,
    /// JSON array of LineItem
    pub items: String,
    /// JSON ShippingAddress
    pub address: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Order {
    /// Parsed lifecycle status. A value this build does not know is read as
    /// `Pending`, matching how the ledger buckets it, and logged.
    pub fn status(&self) -> OrderStatus {
        match self.status.parse() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(order_id = %self.id, error = %e, "Unreadable stored order status, treating as Pending");
                OrderStatus::Pending
            }
        }
    }
}

/// Purchased product snapshot taken at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub price: f64,
    #[serde(default = "default_qty", alias = "quantity")]
    pub qty: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn default_qty() -> u32 {
    1
}

/// Delivery address snapshot taken at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingAddress {
    #[serde(default = "default_full_name", alias = "fullName")]
    pub full_name: String,
    #[serde(default = "default_unknown")]
    pub phone: String,
    #[serde(default = "default_unknown")]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
}

impl Default for ShippingAddress {
    fn default() -> Self {
        Self {
            full_name: default_full_name(),
            phone: default_unknown(),
            street: default_unknown(),
            city: String::new(),
            state: String::new(),
            pincode: String::new(),
        }
    }
}

fn default_full_name() -> String {
    "Customer".to_string()
}

fn default_unknown() -> String {
    "N/A".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: Option<String>,
    pub email: String,
    pub provider_order_id: String,
    pub provider_payment_id: String,
    pub amount: f64,
    pub items: Vec<LineItem>,
    pub address: ShippingAddress,
    pub status: OrderStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            status: o.status(),
            amount: from_minor_units(o.amount_minor),
            items: parse_json(&o.items),
            address: parse_json(&o.address),
            id: o.id,
            user_id: o.user_id,
            email: o.email,
            provider_order_id: o.provider_order_id,
            provider_payment_id: o.provider_payment_id,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

/// What the storefront posts back after the gateway's checkout widget
/// completes
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSubmission {
    #[serde(alias = "razorpay_order_id")]
    pub provider_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub provider_payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
    pub email: String,
    pub amount: f64,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub address: ShippingAddress,
}

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(status: &str) -> Order {
        Order {
            id: "o1".into(),
            user_id: None,
            email: "a@b.com".into(),
            provider_order_id: "order_1".into(),
            provider_payment_id: "pay_1".into(),
            amount_minor: 49_900,
            items: "[]".into(),
            address: "{}".into(),
            status: status.into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_stored_status() {
        assert_eq!(stored("Shipped").status(), OrderStatus::Shipped);
        assert_eq!(stored("delivered").status(), OrderStatus::Delivered);
        assert_eq!(stored("Lost in transit").status(), OrderStatus::Pending);
        assert_eq!(OrderResponse::from(stored("")).status, OrderStatus::Pending);
    }

    #[test]
    fn test_status_rank() {
        assert!(OrderStatus::Paid.is_backward_from(OrderStatus::Delivered));
        assert!(!OrderStatus::Ready.is_backward_from(OrderStatus::Packed));
        assert!(!OrderStatus::Completed.is_backward_from(OrderStatus::Delivered));
        assert!(!OrderStatus::Shipped.is_backward_from(OrderStatus::Paid));
        assert_eq!("shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("Lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_submission_with_gateway_names_and_defaults() {
        let sub: CheckoutSubmission = serde_json::from_str(
            r#"{"razorpay_order_id":"order_1","razorpay_payment_id":"pay_1",
                "razorpay_signature":"abc","email":"a@b.com","amount":499,
                "items":[{"name":"Tee","price":499,"quantity":2}],
                "address":{"fullName":"Ann","city":"Pune"}}"#,
        )
        .unwrap();

        assert_eq!(sub.provider_order_id, "order_1");
        assert_eq!(sub.items[0].qty, 2);
        assert_eq!(sub.address.full_name, "Ann");
        assert_eq!(sub.address.phone, "N/A");
        assert_eq!(sub.address.street, "N/A");
        assert_eq!(sub.address.pincode, "");
    }

    #[test]
    fn test_missing_address_defaults() {
        let sub: CheckoutSubmission = serde_json::from_str(
            r#"{"provider_order_id":"o","provider_payment_id":"p","signature":"s",
                "email":"a@b.com","amount":1}"#,
        )
        .unwrap();
        assert_eq!(sub.address, ShippingAddress::default());
        assert!(sub.items.is_empty());
    }
}
