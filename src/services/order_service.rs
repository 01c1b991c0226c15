use uuid::Uuid;

use crate::{
    config::MergeTotals,
    dto::orders::OrderWithItems,
    error::{AppError, AppResult},
    models::{ListFilter, NewOrder, Order, OrderPatch},
    repository::{OrderItemRepository, OrderRepository, TransactionSource},
};

/// Orders, order lines and temp orders for the shops of one deployment.
///
/// Storage is injected: `D` hands out transactions, `O` and `I` are the
/// order and order-line repositories sharing `D`'s transaction type.
#[derive(Debug, Clone)]
pub struct OrderService<D, O, I> {
    pub(crate) db: D,
    pub(crate) orders: O,
    pub(crate) items: I,
    pub(crate) merge_totals: MergeTotals,
}

impl<D, O, I> OrderService<D, O, I>
where
    D: TransactionSource,
    O: OrderRepository<Tx = D::Tx>,
    I: OrderItemRepository<Tx = D::Tx>,
{
    pub fn new(db: D, orders: O, items: I) -> Self {
        Self {
            db,
            orders,
            items,
            merge_totals: MergeTotals::default(),
        }
    }

    pub fn with_merge_totals(mut self, merge_totals: MergeTotals) -> Self {
        self.merge_totals = merge_totals;
        self
    }

    /// Commits `tx` when `result` is ok; otherwise rolls it back and returns
    /// the original error. A failed rollback is only logged.
    pub(crate) async fn finish<T>(&self, tx: D::Tx, result: AppResult<T>) -> AppResult<T> {
        match result {
            Ok(value) => {
                self.db.commit(tx).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.db.rollback(tx).await {
                    tracing::warn!(error = %rollback_err, cause = %err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    pub(crate) async fn require_order(&self, id: Uuid, shop_id: Option<Uuid>) -> AppResult<Order> {
        self.orders
            .get_order_by_id(None, id, shop_id)
            .await?
            .ok_or(AppError::NotFound("order"))
    }

    pub async fn create_order(
        &self,
        customer_id: Uuid,
        shop_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<Order> {
        require_id(customer_id, "customer")?;
        require_id(shop_id, "shop")?;

        if let Some(active) = self
            .orders
            .get_active_order_by_customer(customer_id, shop_id)
            .await?
        {
            tracing::info!(
                customer_id = %customer_id,
                active_order_id = %active.id,
                "refusing second active order"
            );
            return Err(AppError::Conflict(
                "customer already has an active order".into(),
            ));
        }

        let order = self
            .orders
            .create_order(
                None,
                NewOrder {
                    shop_id,
                    customer_id,
                    notes,
                },
            )
            .await?;

        tracing::info!(
            order_id = %order.id,
            customer_id = %customer_id,
            shop_id = %shop_id,
            "order created"
        );
        Ok(order)
    }

    pub async fn get_order_by_id(
        &self,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<OrderWithItems> {
        require_id(id, "order")?;
        let order = self.require_order(id, shop_id).await?;
        let items = self.items.get_order_items_by_order(None, order.id).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn get_orders_by_shop(
        &self,
        shop_id: Uuid,
        filter: ListFilter,
    ) -> AppResult<Vec<Order>> {
        require_id(shop_id, "shop")?;
        self.orders.get_orders_by_shop(shop_id, &filter).await
    }

    pub async fn update_order_by_id(
        &self,
        id: Uuid,
        shop_id: Option<Uuid>,
        patch: OrderPatch,
    ) -> AppResult<Order> {
        require_id(id, "order")?;
        let order = self.require_order(id, shop_id).await?;
        let updated = self
            .orders
            .update_order(None, order.id, patch)
            .await?
            .ok_or(AppError::NotFound("order"))?;

        tracing::info!(order_id = %updated.id, status = %updated.status, "order updated");
        Ok(updated)
    }

    /// Removes the order and all of its lines in one transaction.
    pub async fn delete_order_by_id(&self, id: Uuid, shop_id: Option<Uuid>) -> AppResult<()> {
        require_id(id, "order")?;

        let tx = self.db.begin().await?;
        let result = self.delete_order_in(&tx, id, shop_id).await;
        let removed_items = self.finish(tx, result).await?;

        tracing::info!(order_id = %id, removed_items, "order deleted");
        Ok(())
    }

    async fn delete_order_in(&self, tx: &D::Tx, id: Uuid, shop_id: Option<Uuid>) -> AppResult<u64> {
        if self
            .orders
            .get_order_by_id(Some(tx), id, shop_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("order"));
        }

        let removed_items = self.items.delete_order_items_by_order(tx, id).await?;
        if self.orders.delete_order(tx, id).await? == 0 {
            return Err(AppError::NotFound("order"));
        }
        Ok(removed_items)
    }
}

pub(crate) fn require_id(id: Uuid, what: &str) -> AppResult<()> {
    if id.is_nil() {
        return Err(AppError::BadRequest(format!("{what} id is required")));
    }
    Ok(())
}
