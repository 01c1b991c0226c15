//! Folding customer temp orders into staff orders.
//!
//! A pending temp order is either turned into a fresh order for the customer
//! or merged into the customer's running order, where lines for a product
//! already on the order have their quantities summed. Either way the whole
//! merge, including accepting the temp order, is one transaction.
//!
//! The temp order row is locked before its status is checked, so two
//! merges of the same temp order serialize and the second one sees it
//! accepted. Merging into a running order also locks that order, which
//! serializes the read-modify-write of its line quantities.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    config::MergeTotals,
    dto::orders::OrderWithItems,
    error::{AppError, AppResult},
    models::{
        NewOrder, Order, OrderItem, OrderItemPatch, OrderPatch, TempOrder, TempOrderItem,
        TempOrderStatus, items_total,
    },
    repository::{OrderItemRepository, OrderRepository, TransactionSource},
    services::{
        order_service::{OrderService, require_id},
        temp_order_service::ensure_pending,
    },
};

impl<D, O, I> OrderService<D, O, I>
where
    D: TransactionSource,
    O: OrderRepository<Tx = D::Tx>,
    I: OrderItemRepository<Tx = D::Tx>,
{
    /// Accepts a pending temp order on behalf of `customer_id`.
    ///
    /// With `active_order_id` the temp lines are merged into that order;
    /// without it a new order is opened. The returned order carries the total
    /// of the lines returned alongside it. Whether that total is also stored
    /// depends on [`MergeTotals`].
    pub async fn merge_temp_order(
        &self,
        temp_order_id: Uuid,
        customer_id: Uuid,
        shop_id: Uuid,
        active_order_id: Option<Uuid>,
    ) -> AppResult<OrderWithItems> {
        require_id(temp_order_id, "temp order")?;
        require_id(customer_id, "customer")?;
        require_id(shop_id, "shop")?;

        let tx = self.db.begin().await?;
        let result = self
            .merge_in(&tx, temp_order_id, customer_id, shop_id, active_order_id)
            .await;
        let merged = self.finish(tx, result).await?;

        tracing::info!(
            temp_order_id = %temp_order_id,
            order_id = %merged.order.id,
            into_active = active_order_id.is_some(),
            lines = merged.items.len(),
            total_price = merged.order.total_price,
            "temp order merged"
        );
        Ok(merged)
    }

    async fn merge_in(
        &self,
        tx: &D::Tx,
        temp_order_id: Uuid,
        customer_id: Uuid,
        shop_id: Uuid,
        active_order_id: Option<Uuid>,
    ) -> AppResult<OrderWithItems> {
        let temp_order = self
            .orders
            .lock_temp_order(tx, temp_order_id, Some(shop_id))
            .await?
            .ok_or(AppError::NotFound("temp order"))?;
        ensure_pending(&temp_order)?;
        let temp_items = self
            .items
            .get_temp_order_items_by_temp_order(Some(tx), temp_order.id)
            .await?;

        match active_order_id {
            None => {
                self.merge_into_new_order(tx, &temp_order, customer_id, &temp_items)
                    .await
            }
            Some(order_id) => {
                self.merge_into_active_order(tx, &temp_order, order_id, shop_id, &temp_items)
                    .await
            }
        }
    }

    async fn merge_into_new_order(
        &self,
        tx: &D::Tx,
        temp_order: &TempOrder,
        customer_id: Uuid,
        temp_items: &[TempOrderItem],
    ) -> AppResult<OrderWithItems> {
        let order = self
            .orders
            .create_order(
                Some(tx),
                NewOrder {
                    shop_id: temp_order.shop_id,
                    customer_id,
                    notes: None,
                },
            )
            .await?;

        let mut items = Vec::with_capacity(temp_items.len());
        for temp_item in temp_items {
            let item = self
                .items
                .create_order_item(Some(tx), order.id, temp_item.product_id, temp_item.quantity)
                .await?;
            items.push(item);
        }

        let order = self.settle_total(tx, order, items_total(&items)).await?;
        self.accept_temp_order(tx, temp_order.id).await?;
        Ok(OrderWithItems { order, items })
    }

    async fn merge_into_active_order(
        &self,
        tx: &D::Tx,
        temp_order: &TempOrder,
        order_id: Uuid,
        shop_id: Uuid,
        temp_items: &[TempOrderItem],
    ) -> AppResult<OrderWithItems> {
        let order = self
            .orders
            .lock_order(tx, order_id, Some(shop_id))
            .await?
            .ok_or(AppError::NotFound("order"))?;

        let before: HashMap<Uuid, i32> = self
            .items
            .get_order_items_by_order(Some(tx), order.id)
            .await?
            .into_iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();

        for temp_item in temp_items {
            let line = self
                .aggregate_item(tx, order.id, temp_item.product_id, temp_item.quantity)
                .await?;
            tracing::debug!(
                order_id = %order.id,
                product_id = %line.product_id,
                previous_quantity = before.get(&line.product_id).copied().unwrap_or(0),
                quantity = line.quantity,
                "temp order line applied"
            );
        }

        let items = self.items.get_order_items_by_order(Some(tx), order.id).await?;
        let order = self.settle_total(tx, order, items_total(&items)).await?;
        self.accept_temp_order(tx, temp_order.id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Adds `quantity` of `product_id` to the order: the existing line for
    /// that product is bumped, or a new line is inserted. Exactly one write
    /// per call.
    pub(crate) async fn aggregate_item(
        &self,
        tx: &D::Tx,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<OrderItem> {
        let existing = self
            .items
            .get_order_item_by_product(Some(tx), product_id, order_id)
            .await?;

        match existing {
            Some(existing) => {
                let quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
                self.items
                    .update_order_item(
                        Some(tx),
                        existing.id,
                        order_id,
                        OrderItemPatch {
                            product_id: None,
                            quantity: Some(quantity),
                        },
                    )
                    .await?
                    .ok_or(AppError::NotFound("order item"))
            }
            None => {
                self.items
                    .create_order_item(Some(tx), order_id, product_id, quantity)
                    .await
            }
        }
    }

    async fn settle_total(
        &self,
        tx: &D::Tx,
        mut order: Order,
        total_price: i64,
    ) -> AppResult<Order> {
        match self.merge_totals {
            MergeTotals::DisplayOnly => {
                order.total_price = total_price;
                Ok(order)
            }
            MergeTotals::WriteBack => self
                .orders
                .update_order(
                    Some(tx),
                    order.id,
                    OrderPatch {
                        total_price: Some(total_price),
                        ..OrderPatch::default()
                    },
                )
                .await?
                .ok_or(AppError::NotFound("order")),
        }
    }

    async fn accept_temp_order(&self, tx: &D::Tx, temp_order_id: Uuid) -> AppResult<TempOrder> {
        self.orders
            .update_temp_order_status(Some(tx), temp_order_id, TempOrderStatus::Accepted)
            .await?
            .ok_or(AppError::NotFound("temp order"))
    }
}
