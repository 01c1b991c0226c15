use uuid::Uuid;

use crate::{
    dto::temp_orders::{CreateTempOrderRequest, TempOrderLine, TempOrderWithItems},
    error::{AppError, AppResult},
    models::{ListFilter, NewTempOrder, TempOrder, TempOrderStatus},
    repository::{OrderItemRepository, OrderRepository, TransactionSource},
    services::{
        order_item_service::require_positive,
        order_service::{OrderService, require_id},
    },
};

impl<D, O, I> OrderService<D, O, I>
where
    D: TransactionSource,
    O: OrderRepository<Tx = D::Tx>,
    I: OrderItemRepository<Tx = D::Tx>,
{
    /// Records a customer's draft order for the shop behind `share_token`.
    ///
    /// The temp order, its lines and its total are written in one
    /// transaction. Lines naming the same product are combined.
    pub async fn create_temp_order(
        &self,
        share_token: &str,
        payload: CreateTempOrderRequest,
    ) -> AppResult<TempOrderWithItems> {
        let customer_name = payload.customer_name.trim();
        if customer_name.is_empty() {
            return Err(AppError::BadRequest("customer_name is required".into()));
        }
        for line in &payload.items {
            require_id(line.product_id, "product")?;
            require_positive(line.quantity)?;
        }
        let lines = combine_lines(&payload.items)?;

        let shop_id = self
            .orders
            .find_shop_by_share_token(share_token)
            .await?
            .ok_or(AppError::NotFound("shop"))?;

        let new_order = NewTempOrder {
            shop_id,
            customer_name: customer_name.to_string(),
            customer_phone: payload.customer_phone.trim().to_string(),
        };

        let tx = self.db.begin().await?;
        let result = self.create_temp_order_in(&tx, new_order, &lines).await;
        let created = self.finish(tx, result).await?;

        tracing::info!(
            temp_order_id = %created.temp_order.id,
            shop_id = %shop_id,
            lines = created.items.len(),
            total_price = created.temp_order.total_price,
            "temp order submitted"
        );
        Ok(created)
    }

    async fn create_temp_order_in(
        &self,
        tx: &D::Tx,
        new_order: NewTempOrder,
        lines: &[TempOrderLine],
    ) -> AppResult<TempOrderWithItems> {
        let temp_order = self.orders.create_temp_order(tx, new_order).await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let item = self
                .items
                .create_temp_order_item(tx, temp_order.id, line.product_id, line.quantity)
                .await?;
            items.push(item);
        }

        let total_price = items.iter().map(|item| item.line_total()).sum();
        let temp_order = self
            .orders
            .update_temp_order_total_price(tx, temp_order.id, total_price)
            .await?
            .ok_or(AppError::NotFound("temp order"))?;

        Ok(TempOrderWithItems { temp_order, items })
    }

    pub async fn get_temp_order_by_id(
        &self,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<TempOrderWithItems> {
        require_id(id, "temp order")?;
        let temp_order = self
            .orders
            .get_temp_order_by_id(None, id, shop_id)
            .await?
            .ok_or(AppError::NotFound("temp order"))?;
        let items = self
            .items
            .get_temp_order_items_by_temp_order(None, temp_order.id)
            .await?;
        Ok(TempOrderWithItems { temp_order, items })
    }

    pub async fn get_temp_orders_by_shop(
        &self,
        shop_id: Uuid,
        filter: ListFilter,
    ) -> AppResult<Vec<TempOrder>> {
        require_id(shop_id, "shop")?;
        self.orders.get_temp_orders_by_shop(shop_id, &filter).await
    }

    /// Declines a pending temp order. Its lines are kept for reference.
    pub async fn reject_temp_order(&self, id: Uuid, shop_id: Uuid) -> AppResult<TempOrder> {
        require_id(id, "temp order")?;

        let tx = self.db.begin().await?;
        let result = self.reject_temp_order_in(&tx, id, shop_id).await;
        let rejected = self.finish(tx, result).await?;

        tracing::info!(temp_order_id = %rejected.id, "temp order rejected");
        Ok(rejected)
    }

    async fn reject_temp_order_in(
        &self,
        tx: &D::Tx,
        id: Uuid,
        shop_id: Uuid,
    ) -> AppResult<TempOrder> {
        let temp_order = self
            .orders
            .lock_temp_order(tx, id, Some(shop_id))
            .await?
            .ok_or(AppError::NotFound("temp order"))?;
        ensure_pending(&temp_order)?;

        self.orders
            .update_temp_order_status(Some(tx), temp_order.id, TempOrderStatus::Rejected)
            .await?
            .ok_or(AppError::NotFound("temp order"))
    }
}

pub(crate) fn ensure_pending(temp_order: &TempOrder) -> AppResult<()> {
    if temp_order.status != TempOrderStatus::Pending {
        return Err(AppError::Conflict(format!(
            "temp order is already {}",
            temp_order.status
        )));
    }
    Ok(())
}

/// Sums quantities of lines that name the same product, keeping the order in
/// which products first appear.
fn combine_lines(lines: &[TempOrderLine]) -> AppResult<Vec<TempOrderLine>> {
    let mut combined: Vec<TempOrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match combined.iter_mut().find(|c| c.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
            }
            None => combined.push(line.clone()),
        }
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_lines_sums_repeated_products() {
        let tea = Uuid::new_v4();
        let cake = Uuid::new_v4();
        let lines = vec![
            TempOrderLine { product_id: tea, quantity: 1 },
            TempOrderLine { product_id: cake, quantity: 2 },
            TempOrderLine { product_id: tea, quantity: 3 },
        ];

        let combined = combine_lines(&lines).unwrap();

        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].product_id, tea);
        assert_eq!(combined[0].quantity, 4);
        assert_eq!(combined[1].quantity, 2);
    }

    #[test]
    fn combine_lines_rejects_overflow() {
        let tea = Uuid::new_v4();
        let lines = vec![
            TempOrderLine { product_id: tea, quantity: i32::MAX },
            TempOrderLine { product_id: tea, quantity: 1 },
        ];
        assert!(combine_lines(&lines).is_err());
    }
}
