//! Storage ports used by the order services.
//!
//! Every repository names the transaction type it works with. Reads take an
//! optional transaction so that a multi-step operation sees its own
//! uncommitted writes; writes that must be atomic with others take one
//! unconditionally.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        ListFilter, NewOrder, NewTempOrder, Order, OrderItem, OrderItemPatch, OrderPatch,
        TempOrder, TempOrderItem, TempOrderStatus,
    },
};

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod orm;

#[cfg(any(test, feature = "test-util"))]
pub use memory::{FailPoint, MemoryStore, MemoryTx};
pub use orm::{OrmOrderItemRepository, OrmOrderRepository};

#[cfg_attr(test, mockall::automock(type Tx = memory::MemoryTx;))]
#[async_trait]
pub trait TransactionSource: Send + Sync {
    type Tx: Send + Sync;

    async fn begin(&self) -> AppResult<Self::Tx>;

    async fn commit(&self, tx: Self::Tx) -> AppResult<()>;

    async fn rollback(&self, tx: Self::Tx) -> AppResult<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    type Tx: Send + Sync;

    /// Inserts an order with status `created` and a zero total. The customer
    /// name is snapshotted from the customer record.
    async fn create_order(&self, tx: Option<&Self::Tx>, order: NewOrder) -> AppResult<Order>;

    async fn get_order_by_id(
        &self,
        tx: Option<&Self::Tx>,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<Order>>;

    async fn get_orders_by_shop(&self, shop_id: Uuid, filter: &ListFilter)
    -> AppResult<Vec<Order>>;

    async fn update_order(
        &self,
        tx: Option<&Self::Tx>,
        id: Uuid,
        patch: OrderPatch,
    ) -> AppResult<Option<Order>>;

    /// Returns the number of rows removed.
    async fn delete_order(&self, tx: &Self::Tx, id: Uuid) -> AppResult<u64>;

    /// Reads the order and holds its row lock until `tx` ends. Concurrent
    /// lockers wait and then see the committed row.
    async fn lock_order(
        &self,
        tx: &Self::Tx,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<Order>>;

    async fn get_active_order_by_customer(
        &self,
        customer_id: Uuid,
        shop_id: Uuid,
    ) -> AppResult<Option<Order>>;

    async fn create_temp_order(&self, tx: &Self::Tx, order: NewTempOrder) -> AppResult<TempOrder>;

    async fn get_temp_order_by_id(
        &self,
        tx: Option<&Self::Tx>,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<TempOrder>>;

    /// Reads the temp order and holds its row lock until `tx` ends.
    async fn lock_temp_order(
        &self,
        tx: &Self::Tx,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<TempOrder>>;

    async fn get_temp_orders_by_shop(
        &self,
        shop_id: Uuid,
        filter: &ListFilter,
    ) -> AppResult<Vec<TempOrder>>;

    async fn update_temp_order_status(
        &self,
        tx: Option<&Self::Tx>,
        id: Uuid,
        status: TempOrderStatus,
    ) -> AppResult<Option<TempOrder>>;

    async fn update_temp_order_total_price(
        &self,
        tx: &Self::Tx,
        id: Uuid,
        total_price: i64,
    ) -> AppResult<Option<TempOrder>>;

    /// Resolves a public share token to the shop it belongs to.
    async fn find_shop_by_share_token(&self, token: &str) -> AppResult<Option<Uuid>>;
}

#[async_trait]
pub trait OrderItemRepository: Send + Sync {
    type Tx: Send + Sync;

    /// Inserts a line, snapshotting the product's current name and price.
    /// The product must belong to the order's shop.
    async fn create_order_item(
        &self,
        tx: Option<&Self::Tx>,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<OrderItem>;

    async fn get_order_item_by_id(&self, id: Uuid) -> AppResult<Option<OrderItem>>;

    /// Lines of an order, oldest first.
    async fn get_order_items_by_order(
        &self,
        tx: Option<&Self::Tx>,
        order_id: Uuid,
    ) -> AppResult<Vec<OrderItem>>;

    async fn get_order_item_by_product(
        &self,
        tx: Option<&Self::Tx>,
        product_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<OrderItem>>;

    /// Returns `None` when no line with `item_id` belongs to `order_id`.
    async fn update_order_item(
        &self,
        tx: Option<&Self::Tx>,
        item_id: Uuid,
        order_id: Uuid,
        patch: OrderItemPatch,
    ) -> AppResult<Option<OrderItem>>;

    async fn delete_order_item(&self, item_id: Uuid, order_id: Uuid) -> AppResult<u64>;

    async fn delete_order_items_by_order(&self, tx: &Self::Tx, order_id: Uuid) -> AppResult<u64>;

    async fn create_temp_order_item(
        &self,
        tx: &Self::Tx,
        temp_order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<TempOrderItem>;

    async fn get_temp_order_items_by_temp_order(
        &self,
        tx: Option<&Self::Tx>,
        temp_order_id: Uuid,
    ) -> AppResult<Vec<TempOrderItem>>;
}
