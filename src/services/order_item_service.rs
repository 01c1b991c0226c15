use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{OrderItem, OrderItemPatch},
    repository::{OrderItemRepository, OrderRepository, TransactionSource},
    services::order_service::{OrderService, require_id},
};

// Every line operation names the owning order so a line can never be read
// or changed through a different order.
impl<D, O, I> OrderService<D, O, I>
where
    D: TransactionSource,
    O: OrderRepository<Tx = D::Tx>,
    I: OrderItemRepository<Tx = D::Tx>,
{
    pub async fn create_order_item(
        &self,
        order_id: Uuid,
        shop_id: Option<Uuid>,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<OrderItem> {
        require_id(order_id, "order")?;
        require_id(product_id, "product")?;
        require_positive(quantity)?;

        let order = self.require_order(order_id, shop_id).await?;
        let item = self
            .items
            .create_order_item(None, order.id, product_id, quantity)
            .await?;

        tracing::info!(
            order_id = %order.id,
            item_id = %item.id,
            product_id = %product_id,
            quantity,
            "order item created"
        );
        Ok(item)
    }

    pub async fn get_order_item_by_id(
        &self,
        order_id: Uuid,
        shop_id: Option<Uuid>,
        item_id: Uuid,
    ) -> AppResult<OrderItem> {
        require_id(order_id, "order")?;
        require_id(item_id, "order item")?;

        let order = self.require_order(order_id, shop_id).await?;
        self.items
            .get_order_item_by_id(item_id)
            .await?
            .filter(|item| item.order_id == order.id)
            .ok_or(AppError::NotFound("order item"))
    }

    pub async fn get_order_items_by_order(
        &self,
        order_id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Vec<OrderItem>> {
        require_id(order_id, "order")?;
        let order = self.require_order(order_id, shop_id).await?;
        self.items.get_order_items_by_order(None, order.id).await
    }

    pub async fn update_order_item_by_id(
        &self,
        order_id: Uuid,
        shop_id: Option<Uuid>,
        item_id: Uuid,
        patch: OrderItemPatch,
    ) -> AppResult<OrderItem> {
        require_id(order_id, "order")?;
        require_id(item_id, "order item")?;
        if let Some(quantity) = patch.quantity {
            require_positive(quantity)?;
        }

        let order = self.require_order(order_id, shop_id).await?;
        let item = self
            .items
            .update_order_item(None, item_id, order.id, patch)
            .await?
            .ok_or(AppError::NotFound("order item"))?;

        tracing::info!(
            order_id = %order.id,
            item_id = %item.id,
            quantity = item.quantity,
            "order item updated"
        );
        Ok(item)
    }

    pub async fn delete_order_item_by_id(
        &self,
        order_id: Uuid,
        shop_id: Option<Uuid>,
        item_id: Uuid,
    ) -> AppResult<()> {
        require_id(order_id, "order")?;
        require_id(item_id, "order item")?;

        let order = self.require_order(order_id, shop_id).await?;
        if self.items.delete_order_item(item_id, order.id).await? == 0 {
            return Err(AppError::NotFound("order item"));
        }

        tracing::info!(order_id = %order.id, item_id = %item_id, "order item deleted");
        Ok(())
    }
}

pub(crate) fn require_positive(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
