use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    InProgress,
    InDelivery,
    Done,
    Cancelled,
}

impl OrderStatus {
    /// Statuses that count towards the one-active-order-per-customer rule.
    pub const ACTIVE: [OrderStatus; 3] = [
        OrderStatus::Created,
        OrderStatus::InProgress,
        OrderStatus::InDelivery,
    ];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::InDelivery => "in_delivery",
            OrderStatus::Done => "done",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "in_progress" => Ok(OrderStatus::InProgress),
            "in_delivery" => Ok(OrderStatus::InDelivery),
            "done" => Ok(OrderStatus::Done),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::BadRequest(format!("unknown order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TempOrderStatus {
    Pending,
    Accepted,
    Rejected,
}

impl TempOrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TempOrderStatus::Pending => "pending",
            TempOrderStatus::Accepted => "accepted",
            TempOrderStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TempOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TempOrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TempOrderStatus::Pending),
            "accepted" => Ok(TempOrderStatus::Accepted),
            "rejected" => Ok(TempOrderStatus::Rejected),
            other => Err(AppError::BadRequest(format!(
                "unknown temp order status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub total_price: i64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TempOrder {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub total_price: i64,
    pub status: TempOrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TempOrderItem {
    pub id: Uuid,
    pub temp_order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub price: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl TempOrderItem {
    pub fn line_total(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

/// Sum of `price * quantity` over a set of order lines.
pub fn items_total<'a>(items: impl IntoIterator<Item = &'a OrderItem>) -> i64 {
    items.into_iter().map(OrderItem::line_total).sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub shop_id: Uuid,
    pub customer_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTempOrder {
    pub shop_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
}

/// Sparse update of an order; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct OrderPatch {
    pub total_price: Option<i64>,
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
}

/// Sparse update of an order line. Changing `product_id` refreshes the
/// name and price snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct OrderItemPatch {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i32>,
}

/// Listing filter handed to the repositories as-is.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
pub struct ListFilter {
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_statuses() {
        assert!(OrderStatus::Created.is_active());
        assert!(OrderStatus::InProgress.is_active());
        assert!(OrderStatus::InDelivery.is_active());
        assert!(!OrderStatus::Done.is_active());
        assert!(!OrderStatus::Cancelled.is_active());
    }

    #[test]
    fn status_parses_from_stored_text() {
        assert_eq!(
            "in_delivery".parse::<OrderStatus>().ok(),
            Some(OrderStatus::InDelivery)
        );
        assert_eq!(
            "rejected".parse::<TempOrderStatus>().ok(),
            Some(TempOrderStatus::Rejected)
        );
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn items_total_multiplies_price_by_quantity() {
        let now = Utc::now();
        let line = |price, quantity| OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            product_name: "Tea".into(),
            price,
            quantity,
            created_at: now,
            updated_at: now,
        };
        let items = [line(1500, 2), line(250, 4)];
        assert_eq!(items_total(&items), 4000);
    }
}
