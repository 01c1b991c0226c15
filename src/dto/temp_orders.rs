use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{TempOrder, TempOrderItem};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TempOrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTempOrderRequest {
    pub customer_name: String,
    pub customer_phone: String,
    /// Lines for the same product are combined into one.
    #[serde(default)]
    pub items: Vec<TempOrderLine>,
}

/// Staff decision on a pending temp order. Without `active_order_id` a new
/// order is created for the customer; with it the lines are folded into
/// that order.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MergeTempOrderRequest {
    pub customer_id: Uuid,
    pub active_order_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TempOrderWithItems {
    pub temp_order: TempOrder,
    pub items: Vec<TempOrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TempOrderList {
    pub items: Vec<TempOrder>,
}
