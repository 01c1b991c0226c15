//! Postgres implementation of the storage ports on top of sea-orm.

use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::{
    entity::{
        customers::{Column as CustomerCol, Entity as Customers},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{Column as ProductCol, Entity as Products, Model as ProductModel},
        shops::{Column as ShopCol, Entity as Shops},
        temp_order_items::{
            ActiveModel as TempItemActive, Column as TempItemCol, Entity as TempOrderItems,
            Model as TempItemModel,
        },
        temp_orders::{
            ActiveModel as TempOrderActive, Column as TempOrderCol, Entity as TempOrders,
            Model as TempOrderModel,
        },
    },
    error::{AppError, AppResult},
    models::{
        ListFilter, NewOrder, NewTempOrder, Order, OrderItem, OrderItemPatch, OrderPatch,
        OrderStatus, TempOrder, TempOrderItem, TempOrderStatus,
    },
    repository::{OrderItemRepository, OrderRepository, TransactionSource},
};

#[async_trait]
impl TransactionSource for DatabaseConnection {
    type Tx = DatabaseTransaction;

    async fn begin(&self) -> AppResult<DatabaseTransaction> {
        Ok(TransactionTrait::begin(self).await?)
    }

    async fn commit(&self, tx: DatabaseTransaction) -> AppResult<()> {
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: DatabaseTransaction) -> AppResult<()> {
        tx.rollback().await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OrmOrderRepository {
    conn: DatabaseConnection,
}

impl OrmOrderRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[derive(Debug, Clone)]
pub struct OrmOrderItemRepository {
    conn: DatabaseConnection,
}

impl OrmOrderItemRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// A product of `shop_id`. Other shops' products read as not found.
    async fn product(
        &self,
        tx: Option<&DatabaseTransaction>,
        product_id: Uuid,
        shop_id: Uuid,
    ) -> AppResult<ProductModel> {
        let finder = Products::find().filter(
            Condition::all()
                .add(ProductCol::Id.eq(product_id))
                .add(ProductCol::ShopId.eq(shop_id)),
        );
        let product = match tx {
            Some(tx) => finder.one(tx).await?,
            None => finder.one(&self.conn).await?,
        };
        product.ok_or(AppError::NotFound("product"))
    }

    async fn order_shop(
        &self,
        tx: Option<&DatabaseTransaction>,
        order_id: Uuid,
    ) -> AppResult<Uuid> {
        let finder = Orders::find_by_id(order_id);
        let order = match tx {
            Some(tx) => finder.one(tx).await?,
            None => finder.one(&self.conn).await?,
        };
        order.map(|o| o.shop_id).ok_or(AppError::NotFound("order"))
    }
}

/// `LIKE` pattern matching `search` as a literal substring.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Case-insensitive substring match over the given columns.
fn search_condition<C: ColumnTrait>(columns: &[C], filter: &ListFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(search) = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let pattern = like_pattern(search);
        let mut any = Condition::any();
        for column in columns {
            any = any.add(Expr::expr(Func::lower(Expr::col(*column))).like(pattern.clone()));
        }
        condition = condition.add(any);
    }
    condition
}

/// Inclusive calendar-day bounds on a timestamp column.
fn date_condition<C: ColumnTrait>(column: C, filter: &ListFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(from) = filter.date_from {
        condition = condition.add(column.gte(from.and_time(NaiveTime::MIN).and_utc()));
    }
    if let Some(to) = filter.date_to {
        let end = to.and_time(NaiveTime::MIN).and_utc() + Duration::days(1);
        condition = condition.add(column.lt(end));
    }
    condition
}

#[async_trait]
impl OrderRepository for OrmOrderRepository {
    type Tx = DatabaseTransaction;

    async fn create_order(
        &self,
        tx: Option<&DatabaseTransaction>,
        order: NewOrder,
    ) -> AppResult<Order> {
        let finder = Customers::find().filter(
            Condition::all()
                .add(CustomerCol::Id.eq(order.customer_id))
                .add(CustomerCol::ShopId.eq(order.shop_id)),
        );
        let customer = match tx {
            Some(tx) => finder.one(tx).await?,
            None => finder.one(&self.conn).await?,
        }
        .ok_or(AppError::NotFound("customer"))?;

        let now = Utc::now();
        let active = OrderActive {
            id: Set(Uuid::new_v4()),
            shop_id: Set(order.shop_id),
            customer_id: Set(order.customer_id),
            customer_name: Set(customer.name),
            total_price: Set(0),
            status: Set(OrderStatus::Created.as_str().to_string()),
            notes: Set(order.notes),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let model = match tx {
            Some(tx) => active.insert(tx).await?,
            None => active.insert(&self.conn).await?,
        };
        order_from_entity(model)
    }

    async fn get_order_by_id(
        &self,
        tx: Option<&DatabaseTransaction>,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<Order>> {
        let mut condition = Condition::all().add(OrderCol::Id.eq(id));
        if let Some(shop_id) = shop_id {
            condition = condition.add(OrderCol::ShopId.eq(shop_id));
        }
        let finder = Orders::find().filter(condition);
        let model = match tx {
            Some(tx) => finder.one(tx).await?,
            None => finder.one(&self.conn).await?,
        };
        model.map(order_from_entity).transpose()
    }

    async fn get_orders_by_shop(
        &self,
        shop_id: Uuid,
        filter: &ListFilter,
    ) -> AppResult<Vec<Order>> {
        Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::ShopId.eq(shop_id))
                    .add(search_condition(&[OrderCol::CustomerName], filter))
                    .add(date_condition(OrderCol::CreatedAt, filter)),
            )
            .order_by_desc(OrderCol::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect()
    }

    async fn update_order(
        &self,
        tx: Option<&DatabaseTransaction>,
        id: Uuid,
        patch: OrderPatch,
    ) -> AppResult<Option<Order>> {
        let finder = Orders::find_by_id(id);
        let existing = match tx {
            Some(tx) => finder.one(tx).await?,
            None => finder.one(&self.conn).await?,
        };
        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: OrderActive = existing.into();
        if let Some(total_price) = patch.total_price {
            active.total_price = Set(total_price);
        }
        if let Some(status) = patch.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Utc::now().into());

        let model = match tx {
            Some(tx) => active.update(tx).await?,
            None => active.update(&self.conn).await?,
        };
        order_from_entity(model).map(Some)
    }

    async fn delete_order(&self, tx: &DatabaseTransaction, id: Uuid) -> AppResult<u64> {
        let result = Orders::delete_by_id(id).exec(tx).await?;
        Ok(result.rows_affected)
    }

    async fn lock_order(
        &self,
        tx: &DatabaseTransaction,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<Order>> {
        let mut condition = Condition::all().add(OrderCol::Id.eq(id));
        if let Some(shop_id) = shop_id {
            condition = condition.add(OrderCol::ShopId.eq(shop_id));
        }
        Orders::find()
            .filter(condition)
            .lock_exclusive()
            .one(tx)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn get_active_order_by_customer(
        &self,
        customer_id: Uuid,
        shop_id: Uuid,
    ) -> AppResult<Option<Order>> {
        Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::CustomerId.eq(customer_id))
                    .add(OrderCol::ShopId.eq(shop_id))
                    .add(OrderCol::Status.is_in(OrderStatus::ACTIVE.map(OrderStatus::as_str))),
            )
            .one(&self.conn)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn create_temp_order(
        &self,
        tx: &DatabaseTransaction,
        order: NewTempOrder,
    ) -> AppResult<TempOrder> {
        let now = Utc::now();
        let model = TempOrderActive {
            id: Set(Uuid::new_v4()),
            shop_id: Set(order.shop_id),
            customer_name: Set(order.customer_name),
            customer_phone: Set(order.customer_phone),
            total_price: Set(0),
            status: Set(TempOrderStatus::Pending.as_str().to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(tx)
        .await?;
        temp_order_from_entity(model)
    }

    async fn get_temp_order_by_id(
        &self,
        tx: Option<&DatabaseTransaction>,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<TempOrder>> {
        let mut condition = Condition::all().add(TempOrderCol::Id.eq(id));
        if let Some(shop_id) = shop_id {
            condition = condition.add(TempOrderCol::ShopId.eq(shop_id));
        }
        let finder = TempOrders::find().filter(condition);
        let model = match tx {
            Some(tx) => finder.one(tx).await?,
            None => finder.one(&self.conn).await?,
        };
        model.map(temp_order_from_entity).transpose()
    }

    async fn lock_temp_order(
        &self,
        tx: &DatabaseTransaction,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<TempOrder>> {
        let mut condition = Condition::all().add(TempOrderCol::Id.eq(id));
        if let Some(shop_id) = shop_id {
            condition = condition.add(TempOrderCol::ShopId.eq(shop_id));
        }
        TempOrders::find()
            .filter(condition)
            .lock_exclusive()
            .one(tx)
            .await?
            .map(temp_order_from_entity)
            .transpose()
    }

    async fn get_temp_orders_by_shop(
        &self,
        shop_id: Uuid,
        filter: &ListFilter,
    ) -> AppResult<Vec<TempOrder>> {
        TempOrders::find()
            .filter(
                Condition::all()
                    .add(TempOrderCol::ShopId.eq(shop_id))
                    .add(search_condition(
                        &[TempOrderCol::CustomerName, TempOrderCol::CustomerPhone],
                        filter,
                    ))
                    .add(date_condition(TempOrderCol::CreatedAt, filter)),
            )
            .order_by_desc(TempOrderCol::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(temp_order_from_entity)
            .collect()
    }

    async fn update_temp_order_status(
        &self,
        tx: Option<&DatabaseTransaction>,
        id: Uuid,
        status: TempOrderStatus,
    ) -> AppResult<Option<TempOrder>> {
        let finder = TempOrders::find_by_id(id);
        let existing = match tx {
            Some(tx) => finder.one(tx).await?,
            None => finder.one(&self.conn).await?,
        };
        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: TempOrderActive = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let model = match tx {
            Some(tx) => active.update(tx).await?,
            None => active.update(&self.conn).await?,
        };
        temp_order_from_entity(model).map(Some)
    }

    async fn update_temp_order_total_price(
        &self,
        tx: &DatabaseTransaction,
        id: Uuid,
        total_price: i64,
    ) -> AppResult<Option<TempOrder>> {
        let Some(existing) = TempOrders::find_by_id(id).one(tx).await? else {
            return Ok(None);
        };

        let mut active: TempOrderActive = existing.into();
        active.total_price = Set(total_price);
        active.updated_at = Set(Utc::now().into());
        let model = active.update(tx).await?;
        temp_order_from_entity(model).map(Some)
    }

    async fn find_shop_by_share_token(&self, token: &str) -> AppResult<Option<Uuid>> {
        let shop = Shops::find()
            .filter(ShopCol::ShareToken.eq(token))
            .one(&self.conn)
            .await?;
        Ok(shop.map(|s| s.id))
    }
}

#[async_trait]
impl OrderItemRepository for OrmOrderItemRepository {
    type Tx = DatabaseTransaction;

    async fn create_order_item(
        &self,
        tx: Option<&DatabaseTransaction>,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<OrderItem> {
        let shop_id = self.order_shop(tx, order_id).await?;
        let product = self.product(tx, product_id, shop_id).await?;
        let now = Utc::now();
        let active = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product.id),
            product_name: Set(product.name),
            price: Set(product.price),
            quantity: Set(quantity),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let model = match tx {
            Some(tx) => active.insert(tx).await?,
            None => active.insert(&self.conn).await?,
        };
        Ok(order_item_from_entity(model))
    }

    async fn get_order_item_by_id(&self, id: Uuid) -> AppResult<Option<OrderItem>> {
        let model = OrderItems::find_by_id(id).one(&self.conn).await?;
        Ok(model.map(order_item_from_entity))
    }

    async fn get_order_items_by_order(
        &self,
        tx: Option<&DatabaseTransaction>,
        order_id: Uuid,
    ) -> AppResult<Vec<OrderItem>> {
        let finder = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::CreatedAt)
            .order_by_asc(OrderItemCol::Id);
        let models = match tx {
            Some(tx) => finder.all(tx).await?,
            None => finder.all(&self.conn).await?,
        };
        Ok(models.into_iter().map(order_item_from_entity).collect())
    }

    async fn get_order_item_by_product(
        &self,
        tx: Option<&DatabaseTransaction>,
        product_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<OrderItem>> {
        let finder = OrderItems::find().filter(
            Condition::all()
                .add(OrderItemCol::ProductId.eq(product_id))
                .add(OrderItemCol::OrderId.eq(order_id)),
        );
        let model = match tx {
            Some(tx) => finder.one(tx).await?,
            None => finder.one(&self.conn).await?,
        };
        Ok(model.map(order_item_from_entity))
    }

    async fn update_order_item(
        &self,
        tx: Option<&DatabaseTransaction>,
        item_id: Uuid,
        order_id: Uuid,
        patch: OrderItemPatch,
    ) -> AppResult<Option<OrderItem>> {
        let finder = OrderItems::find().filter(
            Condition::all()
                .add(OrderItemCol::Id.eq(item_id))
                .add(OrderItemCol::OrderId.eq(order_id)),
        );
        let existing = match tx {
            Some(tx) => finder.one(tx).await?,
            None => finder.one(&self.conn).await?,
        };
        let Some(existing) = existing else {
            return Ok(None);
        };

        let current_product = existing.product_id;
        let mut active: OrderItemActive = existing.into();
        if let Some(product_id) = patch.product_id.filter(|id| *id != current_product) {
            let shop_id = self.order_shop(tx, order_id).await?;
            let product = self.product(tx, product_id, shop_id).await?;
            active.product_id = Set(product.id);
            active.product_name = Set(product.name);
            active.price = Set(product.price);
        }
        if let Some(quantity) = patch.quantity {
            active.quantity = Set(quantity);
        }
        active.updated_at = Set(Utc::now().into());

        let model = match tx {
            Some(tx) => active.update(tx).await?,
            None => active.update(&self.conn).await?,
        };
        Ok(Some(order_item_from_entity(model)))
    }

    async fn delete_order_item(&self, item_id: Uuid, order_id: Uuid) -> AppResult<u64> {
        let result = OrderItems::delete_many()
            .filter(
                Condition::all()
                    .add(OrderItemCol::Id.eq(item_id))
                    .add(OrderItemCol::OrderId.eq(order_id)),
            )
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn delete_order_items_by_order(
        &self,
        tx: &DatabaseTransaction,
        order_id: Uuid,
    ) -> AppResult<u64> {
        let result = OrderItems::delete_many()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .exec(tx)
            .await?;
        Ok(result.rows_affected)
    }

    async fn create_temp_order_item(
        &self,
        tx: &DatabaseTransaction,
        temp_order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<TempOrderItem> {
        let temp_order = TempOrders::find_by_id(temp_order_id)
            .one(tx)
            .await?
            .ok_or(AppError::NotFound("temp order"))?;
        let product = self.product(Some(tx), product_id, temp_order.shop_id).await?;
        let model = TempItemActive {
            id: Set(Uuid::new_v4()),
            temp_order_id: Set(temp_order_id),
            product_id: Set(product.id),
            product_name: Set(product.name),
            price: Set(product.price),
            quantity: Set(quantity),
            created_at: Set(Utc::now().into()),
        }
        .insert(tx)
        .await?;
        Ok(temp_item_from_entity(model))
    }

    async fn get_temp_order_items_by_temp_order(
        &self,
        tx: Option<&DatabaseTransaction>,
        temp_order_id: Uuid,
    ) -> AppResult<Vec<TempOrderItem>> {
        let finder = TempOrderItems::find()
            .filter(TempItemCol::TempOrderId.eq(temp_order_id))
            .order_by_asc(TempItemCol::CreatedAt)
            .order_by_asc(TempItemCol::Id);
        let models = match tx {
            Some(tx) => finder.all(tx).await?,
            None => finder.all(&self.conn).await?,
        };
        Ok(models.into_iter().map(temp_item_from_entity).collect())
    }
}

fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        shop_id: model.shop_id,
        customer_id: model.customer_id,
        customer_name: model.customer_name,
        total_price: model.total_price,
        status: model.status.parse()?,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        price: model.price,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn temp_order_from_entity(model: TempOrderModel) -> AppResult<TempOrder> {
    Ok(TempOrder {
        id: model.id,
        shop_id: model.shop_id,
        customer_name: model.customer_name,
        customer_phone: model.customer_phone,
        total_price: model.total_price,
        status: model.status.parse()?,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn temp_item_from_entity(model: TempItemModel) -> TempOrderItem {
    TempOrderItem {
        id: model.id,
        temp_order_id: model.temp_order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        price: model.price,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Ana"), "%ana%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }
}
