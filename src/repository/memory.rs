//! In-memory implementation of the storage ports, for tests.
//!
//! A transaction works on a private copy of the tables taken at `begin`;
//! `commit` publishes that copy and `rollback` drops it. A commit is refused
//! with a conflict when another write was committed after the transaction
//! began, so interleaved transactions never overwrite each other. Locking
//! reads return the latest committed row, as `SELECT ... FOR UPDATE` does.
//!
//! Inserts and updates apply the unique rules of the Postgres schema: one
//! active order per customer and shop, one line per product and order.
//! Customers and products belong to a shop and are invisible to the others.
//!
//! Individual operations can be made to fail with [`MemoryStore::fail_on`]
//! to exercise rollback paths.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        ListFilter, NewOrder, NewTempOrder, Order, OrderItem, OrderItemPatch, OrderPatch,
        OrderStatus, TempOrder, TempOrderItem, TempOrderStatus,
    },
    repository::{OrderItemRepository, OrderRepository, TransactionSource},
};

/// Operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    Commit,
    CreateOrder,
    UpdateOrder,
    DeleteOrder,
    CreateTempOrder,
    UpdateTempOrderStatus,
    UpdateTempOrderTotalPrice,
    CreateOrderItem,
    UpdateOrderItem,
    DeleteOrderItem,
    DeleteOrderItemsByOrder,
    CreateTempOrderItem,
}

#[derive(Debug, Clone)]
struct ShopRecord {
    id: Uuid,
    share_token: String,
}

#[derive(Debug, Clone)]
struct CustomerRecord {
    id: Uuid,
    shop_id: Uuid,
    name: String,
}

#[derive(Debug, Clone)]
struct ProductRecord {
    id: Uuid,
    shop_id: Uuid,
    name: String,
    price: i64,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    // Bumped on every committed write.
    version: u64,
    shops: Vec<ShopRecord>,
    customers: Vec<CustomerRecord>,
    products: Vec<ProductRecord>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    temp_orders: Vec<TempOrder>,
    temp_order_items: Vec<TempOrderItem>,
}

impl Tables {
    fn product(&self, id: Uuid, shop_id: Uuid) -> AppResult<ProductRecord> {
        self.products
            .iter()
            .find(|p| p.id == id && p.shop_id == shop_id)
            .cloned()
            .ok_or(AppError::NotFound("product"))
    }

    fn order_shop(&self, order_id: Uuid) -> AppResult<Uuid> {
        self.orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| o.shop_id)
            .ok_or(AppError::NotFound("order"))
    }

    fn has_other_active_order(&self, id: Uuid, customer_id: Uuid, shop_id: Uuid) -> bool {
        self.orders.iter().any(|o| {
            o.id != id
                && o.customer_id == customer_id
                && o.shop_id == shop_id
                && o.status.is_active()
        })
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: Mutex<Tables>,
    failures: Mutex<HashSet<FailPoint>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
pub struct MemoryTx {
    staged: Mutex<Tables>,
}

fn lock<T>(mutex: &Mutex<T>) -> AppResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal(anyhow!("memory store lock poisoned")))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shop(&self, share_token: &str) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        self.write_tables(None, |t| {
            t.shops.push(ShopRecord {
                id,
                share_token: share_token.to_string(),
            });
            Ok(id)
        })
    }

    pub fn add_customer(&self, shop_id: Uuid, name: &str) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        self.write_tables(None, |t| {
            t.customers.push(CustomerRecord {
                id,
                shop_id,
                name: name.to_string(),
            });
            Ok(id)
        })
    }

    pub fn add_product(&self, shop_id: Uuid, name: &str, price: i64) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        self.write_tables(None, |t| {
            t.products.push(ProductRecord {
                id,
                shop_id,
                name: name.to_string(),
                price,
            });
            Ok(id)
        })
    }

    /// Makes every later call of `point` fail with a storage error.
    pub fn fail_on(&self, point: FailPoint) -> AppResult<()> {
        lock(&self.inner.failures)?.insert(point);
        Ok(())
    }

    pub fn clear_failures(&self) -> AppResult<()> {
        lock(&self.inner.failures)?.clear();
        Ok(())
    }

    /// Opens a transaction over a copy of the committed tables.
    pub fn open_tx(&self) -> AppResult<MemoryTx> {
        self.check(FailPoint::Begin)?;
        let snapshot = lock(&self.inner.tables)?.clone();
        Ok(MemoryTx {
            staged: Mutex::new(snapshot),
        })
    }

    /// Makes the writes staged in `tx` the committed state.
    ///
    /// Fails with a conflict if anything was committed since `tx` began.
    pub fn publish(&self, tx: MemoryTx) -> AppResult<()> {
        self.check(FailPoint::Commit)?;
        let mut staged = tx
            .staged
            .into_inner()
            .map_err(|_| AppError::Internal(anyhow!("memory transaction lock poisoned")))?;
        let mut committed = lock(&self.inner.tables)?;
        if committed.version != staged.version {
            return Err(AppError::Conflict(
                "could not serialize access due to concurrent update".into(),
            ));
        }
        staged.version += 1;
        *committed = staged;
        Ok(())
    }

    /// Committed orders.
    pub fn orders(&self) -> AppResult<Vec<Order>> {
        Ok(lock(&self.inner.tables)?.orders.clone())
    }

    /// Committed order lines across all orders.
    pub fn order_items(&self) -> AppResult<Vec<OrderItem>> {
        Ok(lock(&self.inner.tables)?.order_items.clone())
    }

    /// Committed temp orders.
    pub fn temp_orders(&self) -> AppResult<Vec<TempOrder>> {
        Ok(lock(&self.inner.tables)?.temp_orders.clone())
    }

    pub fn temp_order_items(&self) -> AppResult<Vec<TempOrderItem>> {
        Ok(lock(&self.inner.tables)?.temp_order_items.clone())
    }

    fn check(&self, point: FailPoint) -> AppResult<()> {
        if lock(&self.inner.failures)?.contains(&point) {
            return Err(AppError::Storage(DbErr::Custom(format!(
                "injected failure at {point:?}"
            ))));
        }
        Ok(())
    }

    fn with_tables<R>(
        &self,
        tx: Option<&MemoryTx>,
        f: impl FnOnce(&mut Tables) -> AppResult<R>,
    ) -> AppResult<R> {
        match tx {
            Some(tx) => f(&mut *lock(&tx.staged)?),
            None => f(&mut *lock(&self.inner.tables)?),
        }
    }

    /// Like `with_tables`, but a write outside a transaction counts as a
    /// commit.
    fn write_tables<R>(
        &self,
        tx: Option<&MemoryTx>,
        f: impl FnOnce(&mut Tables) -> AppResult<R>,
    ) -> AppResult<R> {
        match tx {
            Some(tx) => f(&mut *lock(&tx.staged)?),
            None => {
                let mut committed = lock(&self.inner.tables)?;
                let value = f(&mut committed)?;
                committed.version += 1;
                Ok(value)
            }
        }
    }

    /// Copies the committed row picked by `pick` into the transaction.
    fn refresh<R: Clone>(
        &self,
        tx: &MemoryTx,
        pick: impl Fn(&mut Tables) -> &mut Vec<R>,
        matches: impl Fn(&R) -> bool,
    ) -> AppResult<()> {
        let latest = {
            let mut committed = lock(&self.inner.tables)?;
            pick(&mut *committed).iter().find(|row| matches(*row)).cloned()
        };
        let Some(latest) = latest else {
            return Ok(());
        };
        let mut staged = lock(&tx.staged)?;
        let rows = pick(&mut *staged);
        match rows.iter_mut().find(|row| matches(&**row)) {
            Some(row) => *row = latest,
            None => rows.push(latest),
        }
        Ok(())
    }
}

fn matches_filter(
    name: &str,
    phone: Option<&str>,
    created: chrono::NaiveDate,
    filter: &ListFilter,
) -> bool {
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        let hit = name.to_lowercase().contains(&needle)
            || phone.is_some_and(|p| p.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    if filter.date_from.is_some_and(|from| created < from) {
        return false;
    }
    if filter.date_to.is_some_and(|to| created > to) {
        return false;
    }
    true
}

#[async_trait]
impl TransactionSource for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        self.open_tx()
    }

    async fn commit(&self, tx: MemoryTx) -> AppResult<()> {
        self.publish(tx)
    }

    async fn rollback(&self, tx: MemoryTx) -> AppResult<()> {
        drop(tx);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    type Tx = MemoryTx;

    async fn create_order(&self, tx: Option<&MemoryTx>, order: NewOrder) -> AppResult<Order> {
        self.check(FailPoint::CreateOrder)?;
        self.write_tables(tx, |t| {
            let customer = t
                .customers
                .iter()
                .find(|c| c.id == order.customer_id && c.shop_id == order.shop_id)
                .ok_or(AppError::NotFound("customer"))?;
            let customer_name = customer.name.clone();
            if t.has_other_active_order(Uuid::nil(), order.customer_id, order.shop_id) {
                return Err(AppError::Conflict(
                    "orders_one_active_per_customer".into(),
                ));
            }
            let now = Utc::now();
            let created = Order {
                id: Uuid::new_v4(),
                shop_id: order.shop_id,
                customer_id: order.customer_id,
                customer_name,
                total_price: 0,
                status: OrderStatus::Created,
                notes: order.notes,
                created_at: now,
                updated_at: now,
            };
            t.orders.push(created.clone());
            Ok(created)
        })
    }

    async fn get_order_by_id(
        &self,
        tx: Option<&MemoryTx>,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<Order>> {
        self.with_tables(tx, |t| {
            Ok(t.orders
                .iter()
                .find(|o| o.id == id && shop_id.is_none_or(|s| o.shop_id == s))
                .cloned())
        })
    }

    async fn get_orders_by_shop(
        &self,
        shop_id: Uuid,
        filter: &ListFilter,
    ) -> AppResult<Vec<Order>> {
        self.with_tables(None, |t| {
            let mut orders: Vec<Order> = t
                .orders
                .iter()
                .filter(|o| o.shop_id == shop_id)
                .filter(|o| {
                    matches_filter(&o.customer_name, None, o.created_at.date_naive(), filter)
                })
                .cloned()
                .collect();
            orders.reverse();
            Ok(orders)
        })
    }

    async fn update_order(
        &self,
        tx: Option<&MemoryTx>,
        id: Uuid,
        patch: OrderPatch,
    ) -> AppResult<Option<Order>> {
        self.check(FailPoint::UpdateOrder)?;
        self.write_tables(tx, |t| {
            let Some(index) = t.orders.iter().position(|o| o.id == id) else {
                return Ok(None);
            };
            let (customer_id, shop_id) = (t.orders[index].customer_id, t.orders[index].shop_id);
            if patch.status.is_some_and(OrderStatus::is_active)
                && t.has_other_active_order(id, customer_id, shop_id)
            {
                return Err(AppError::Conflict(
                    "orders_one_active_per_customer".into(),
                ));
            }

            let order = &mut t.orders[index];
            if let Some(total_price) = patch.total_price {
                order.total_price = total_price;
            }
            if let Some(status) = patch.status {
                order.status = status;
            }
            if let Some(notes) = patch.notes {
                order.notes = Some(notes);
            }
            order.updated_at = Utc::now();
            Ok(Some(order.clone()))
        })
    }

    async fn delete_order(&self, tx: &MemoryTx, id: Uuid) -> AppResult<u64> {
        self.check(FailPoint::DeleteOrder)?;
        self.with_tables(Some(tx), |t| {
            let before = t.orders.len();
            t.orders.retain(|o| o.id != id);
            Ok((before - t.orders.len()) as u64)
        })
    }

    async fn lock_order(
        &self,
        tx: &MemoryTx,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<Order>> {
        self.refresh(tx, |t| &mut t.orders, |o| o.id == id)?;
        self.get_order_by_id(Some(tx), id, shop_id).await
    }

    async fn get_active_order_by_customer(
        &self,
        customer_id: Uuid,
        shop_id: Uuid,
    ) -> AppResult<Option<Order>> {
        self.with_tables(None, |t| {
            Ok(t.orders
                .iter()
                .find(|o| {
                    o.customer_id == customer_id && o.shop_id == shop_id && o.status.is_active()
                })
                .cloned())
        })
    }

    async fn create_temp_order(&self, tx: &MemoryTx, order: NewTempOrder) -> AppResult<TempOrder> {
        self.check(FailPoint::CreateTempOrder)?;
        self.with_tables(Some(tx), |t| {
            let now = Utc::now();
            let created = TempOrder {
                id: Uuid::new_v4(),
                shop_id: order.shop_id,
                customer_name: order.customer_name,
                customer_phone: order.customer_phone,
                total_price: 0,
                status: TempOrderStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            t.temp_orders.push(created.clone());
            Ok(created)
        })
    }

    async fn get_temp_order_by_id(
        &self,
        tx: Option<&MemoryTx>,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<TempOrder>> {
        self.with_tables(tx, |t| {
            Ok(t.temp_orders
                .iter()
                .find(|o| o.id == id && shop_id.is_none_or(|s| o.shop_id == s))
                .cloned())
        })
    }

    async fn lock_temp_order(
        &self,
        tx: &MemoryTx,
        id: Uuid,
        shop_id: Option<Uuid>,
    ) -> AppResult<Option<TempOrder>> {
        self.refresh(tx, |t| &mut t.temp_orders, |o| o.id == id)?;
        self.get_temp_order_by_id(Some(tx), id, shop_id).await
    }

    async fn get_temp_orders_by_shop(
        &self,
        shop_id: Uuid,
        filter: &ListFilter,
    ) -> AppResult<Vec<TempOrder>> {
        self.with_tables(None, |t| {
            let mut orders: Vec<TempOrder> = t
                .temp_orders
                .iter()
                .filter(|o| o.shop_id == shop_id)
                .filter(|o| {
                    matches_filter(
                        &o.customer_name,
                        Some(o.customer_phone.as_str()),
                        o.created_at.date_naive(),
                        filter,
                    )
                })
                .cloned()
                .collect();
            orders.reverse();
            Ok(orders)
        })
    }

    async fn update_temp_order_status(
        &self,
        tx: Option<&MemoryTx>,
        id: Uuid,
        status: TempOrderStatus,
    ) -> AppResult<Option<TempOrder>> {
        self.check(FailPoint::UpdateTempOrderStatus)?;
        self.write_tables(tx, |t| {
            Ok(t.temp_orders.iter_mut().find(|o| o.id == id).map(|o| {
                o.status = status;
                o.updated_at = Utc::now();
                o.clone()
            }))
        })
    }

    async fn update_temp_order_total_price(
        &self,
        tx: &MemoryTx,
        id: Uuid,
        total_price: i64,
    ) -> AppResult<Option<TempOrder>> {
        self.check(FailPoint::UpdateTempOrderTotalPrice)?;
        self.with_tables(Some(tx), |t| {
            Ok(t.temp_orders.iter_mut().find(|o| o.id == id).map(|o| {
                o.total_price = total_price;
                o.updated_at = Utc::now();
                o.clone()
            }))
        })
    }

    async fn find_shop_by_share_token(&self, token: &str) -> AppResult<Option<Uuid>> {
        self.with_tables(None, |t| {
            Ok(t.shops.iter().find(|s| s.share_token == token).map(|s| s.id))
        })
    }
}

#[async_trait]
impl OrderItemRepository for MemoryStore {
    type Tx = MemoryTx;

    async fn create_order_item(
        &self,
        tx: Option<&MemoryTx>,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<OrderItem> {
        self.check(FailPoint::CreateOrderItem)?;
        self.write_tables(tx, |t| {
            let product = t.product(product_id, t.order_shop(order_id)?)?;
            if t
                .order_items
                .iter()
                .any(|i| i.order_id == order_id && i.product_id == product_id)
            {
                return Err(AppError::Conflict("order_items_order_product_key".into()));
            }
            let now = Utc::now();
            let item = OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id,
                product_name: product.name,
                price: product.price,
                quantity,
                created_at: now,
                updated_at: now,
            };
            t.order_items.push(item.clone());
            Ok(item)
        })
    }

    async fn get_order_item_by_id(&self, id: Uuid) -> AppResult<Option<OrderItem>> {
        self.with_tables(None, |t| {
            Ok(t.order_items.iter().find(|i| i.id == id).cloned())
        })
    }

    async fn get_order_items_by_order(
        &self,
        tx: Option<&MemoryTx>,
        order_id: Uuid,
    ) -> AppResult<Vec<OrderItem>> {
        self.with_tables(tx, |t| {
            Ok(t.order_items
                .iter()
                .filter(|i| i.order_id == order_id)
                .cloned()
                .collect())
        })
    }

    async fn get_order_item_by_product(
        &self,
        tx: Option<&MemoryTx>,
        product_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<OrderItem>> {
        self.with_tables(tx, |t| {
            Ok(t.order_items
                .iter()
                .find(|i| i.order_id == order_id && i.product_id == product_id)
                .cloned())
        })
    }

    async fn update_order_item(
        &self,
        tx: Option<&MemoryTx>,
        item_id: Uuid,
        order_id: Uuid,
        patch: OrderItemPatch,
    ) -> AppResult<Option<OrderItem>> {
        self.check(FailPoint::UpdateOrderItem)?;
        self.write_tables(tx, |t| {
            let Some(index) = t
                .order_items
                .iter()
                .position(|i| i.id == item_id && i.order_id == order_id)
            else {
                return Ok(None);
            };
            let product = match patch.product_id {
                Some(product_id) if product_id != t.order_items[index].product_id => {
                    let product = t.product(product_id, t.order_shop(order_id)?)?;
                    if t
                        .order_items
                        .iter()
                        .any(|i| i.order_id == order_id && i.product_id == product_id)
                    {
                        return Err(AppError::Conflict("order_items_order_product_key".into()));
                    }
                    Some(product)
                }
                _ => None,
            };

            let item = &mut t.order_items[index];
            if let Some(product) = product {
                item.product_id = product.id;
                item.product_name = product.name;
                item.price = product.price;
            }
            if let Some(quantity) = patch.quantity {
                item.quantity = quantity;
            }
            item.updated_at = Utc::now();
            Ok(Some(item.clone()))
        })
    }

    async fn delete_order_item(&self, item_id: Uuid, order_id: Uuid) -> AppResult<u64> {
        self.check(FailPoint::DeleteOrderItem)?;
        self.write_tables(None, |t| {
            let before = t.order_items.len();
            t.order_items
                .retain(|i| !(i.id == item_id && i.order_id == order_id));
            Ok((before - t.order_items.len()) as u64)
        })
    }

    async fn delete_order_items_by_order(&self, tx: &MemoryTx, order_id: Uuid) -> AppResult<u64> {
        self.check(FailPoint::DeleteOrderItemsByOrder)?;
        self.with_tables(Some(tx), |t| {
            let before = t.order_items.len();
            t.order_items.retain(|i| i.order_id != order_id);
            Ok((before - t.order_items.len()) as u64)
        })
    }

    async fn create_temp_order_item(
        &self,
        tx: &MemoryTx,
        temp_order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<TempOrderItem> {
        self.check(FailPoint::CreateTempOrderItem)?;
        self.with_tables(Some(tx), |t| {
            let shop_id = t
                .temp_orders
                .iter()
                .find(|o| o.id == temp_order_id)
                .map(|o| o.shop_id)
                .ok_or(AppError::NotFound("temp order"))?;
            let product = t.product(product_id, shop_id)?;
            let item = TempOrderItem {
                id: Uuid::new_v4(),
                temp_order_id,
                product_id,
                product_name: product.name,
                price: product.price,
                quantity,
                created_at: Utc::now(),
            };
            t.temp_order_items.push(item.clone());
            Ok(item)
        })
    }

    async fn get_temp_order_items_by_temp_order(
        &self,
        tx: Option<&MemoryTx>,
        temp_order_id: Uuid,
    ) -> AppResult<Vec<TempOrderItem>> {
        self.with_tables(tx, |t| {
            Ok(t.temp_order_items
                .iter()
                .filter(|i| i.temp_order_id == temp_order_id)
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Seed {
        store: MemoryStore,
        shop_id: Uuid,
        customer_id: Uuid,
    }

    fn seed() -> anyhow::Result<Seed> {
        let store = MemoryStore::new();
        let shop_id = store.add_shop("tok")?;
        let customer_id = store.add_customer(shop_id, "Dana")?;
        Ok(Seed {
            store,
            shop_id,
            customer_id,
        })
    }

    async fn open_order(seed: &Seed) -> anyhow::Result<Order> {
        Ok(seed
            .store
            .create_order(
                None,
                NewOrder {
                    shop_id: seed.shop_id,
                    customer_id: seed.customer_id,
                    notes: None,
                },
            )
            .await?)
    }

    #[tokio::test]
    async fn rolled_back_writes_are_not_visible() -> anyhow::Result<()> {
        let seed = seed()?;
        let store = &seed.store;

        let tx = store.begin().await?;
        store
            .create_order(
                Some(&tx),
                NewOrder {
                    shop_id: seed.shop_id,
                    customer_id: seed.customer_id,
                    notes: None,
                },
            )
            .await?;
        let listed = store
            .get_orders_by_shop(seed.shop_id, &ListFilter::default())
            .await?;
        assert_eq!(listed.len(), 0);
        store.rollback(tx).await?;

        assert!(store.orders()?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn reads_inside_a_transaction_see_its_writes() -> anyhow::Result<()> {
        let seed = seed()?;
        let store = &seed.store;
        let product = store.add_product(seed.shop_id, "Bread", 300)?;
        let order = open_order(&seed).await?;

        let tx = store.begin().await?;
        store.create_order_item(Some(&tx), order.id, product, 1).await?;
        let staged = store.get_order_items_by_order(Some(&tx), order.id).await?;
        assert_eq!(staged.len(), 1);
        store.commit(tx).await?;

        assert_eq!(store.order_items()?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_product_line_is_a_conflict() -> anyhow::Result<()> {
        let seed = seed()?;
        let store = &seed.store;
        let product = store.add_product(seed.shop_id, "Bread", 300)?;
        let order = open_order(&seed).await?;

        store.create_order_item(None, order.id, product, 1).await?;
        let err = store
            .create_order_item(None, order.id, product, 1)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        Ok(())
    }

    #[tokio::test]
    async fn moving_a_line_onto_a_listed_product_is_a_conflict() -> anyhow::Result<()> {
        let seed = seed()?;
        let store = &seed.store;
        let tea = store.add_product(seed.shop_id, "Tea", 400)?;
        let cake = store.add_product(seed.shop_id, "Cake", 900)?;
        let order = open_order(&seed).await?;
        store.create_order_item(None, order.id, tea, 1).await?;
        let cake_line = store.create_order_item(None, order.id, cake, 2).await?;

        let err = store
            .update_order_item(
                None,
                cake_line.id,
                order.id,
                OrderItemPatch {
                    product_id: Some(tea),
                    quantity: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // Naming the line's own product is not a change.
        let same = store
            .update_order_item(
                None,
                cake_line.id,
                order.id,
                OrderItemPatch {
                    product_id: Some(cake),
                    quantity: Some(4),
                },
            )
            .await?;
        assert_eq!(same.map(|i| i.quantity), Some(4));
        Ok(())
    }

    #[tokio::test]
    async fn reactivating_an_order_respects_the_active_rule() -> anyhow::Result<()> {
        let seed = seed()?;
        let store = &seed.store;
        let first = open_order(&seed).await?;
        let done = OrderPatch {
            status: Some(OrderStatus::Done),
            ..OrderPatch::default()
        };
        store.update_order(None, first.id, done).await?;
        let second = open_order(&seed).await?;

        let reopen = OrderPatch {
            status: Some(OrderStatus::InProgress),
            ..OrderPatch::default()
        };
        let err = store
            .update_order(None, first.id, reopen.clone())
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // The active order itself can move between active states.
        let moved = store.update_order(None, second.id, reopen).await?;
        assert_eq!(moved.map(|o| o.status), Some(OrderStatus::InProgress));
        Ok(())
    }

    #[tokio::test]
    async fn other_shops_records_are_not_found() -> anyhow::Result<()> {
        let seed = seed()?;
        let store = &seed.store;
        let other_shop = store.add_shop("elsewhere")?;
        let foreign_product = store.add_product(other_shop, "Cheese", 700)?;
        let foreign_customer = store.add_customer(other_shop, "Rita")?;
        let order = open_order(&seed).await?;

        let err = store
            .create_order_item(None, order.id, foreign_product, 1)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = store
            .create_order(
                None,
                NewOrder {
                    shop_id: seed.shop_id,
                    customer_id: foreign_customer,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn commit_after_a_concurrent_commit_is_refused() -> anyhow::Result<()> {
        let seed = seed()?;
        let store = &seed.store;
        let first = store.begin().await?;
        let second = store.begin().await?;
        store
            .create_order(
                Some(&first),
                NewOrder {
                    shop_id: seed.shop_id,
                    customer_id: seed.customer_id,
                    notes: None,
                },
            )
            .await?;
        store
            .create_order(
                Some(&second),
                NewOrder {
                    shop_id: seed.shop_id,
                    customer_id: seed.customer_id,
                    notes: Some("second".into()),
                },
            )
            .await?;

        store.commit(first).await?;
        let err = store.commit(second).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.orders()?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn locking_read_sees_the_latest_commit() -> anyhow::Result<()> {
        let seed = seed()?;
        let store = &seed.store;
        let setup = store.begin().await?;
        let temp_order = store
            .create_temp_order(
                &setup,
                NewTempOrder {
                    shop_id: seed.shop_id,
                    customer_name: "Dana".into(),
                    customer_phone: "555".into(),
                },
            )
            .await?;
        store.commit(setup).await?;

        let tx = store.begin().await?;
        store
            .update_temp_order_status(None, temp_order.id, TempOrderStatus::Accepted)
            .await?;

        let plain = store
            .get_temp_order_by_id(Some(&tx), temp_order.id, None)
            .await?;
        assert_eq!(plain.map(|o| o.status), Some(TempOrderStatus::Pending));
        let locked = store
            .lock_temp_order(&tx, temp_order.id, Some(seed.shop_id))
            .await?;
        assert_eq!(locked.map(|o| o.status), Some(TempOrderStatus::Accepted));
        Ok(())
    }

    #[test]
    fn filter_matches_name_phone_and_inclusive_dates() {
        let day = chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let filter = ListFilter {
            search: Some("ANA".into()),
            date_from: Some(day),
            date_to: Some(day),
        };
        assert!(matches_filter("Ana Lima", None, day, &filter));
        assert!(!matches_filter("Bob", Some("555"), day, &filter));

        let by_phone = ListFilter {
            search: Some("555".into()),
            ..ListFilter::default()
        };
        assert!(matches_filter("Bob", Some("+1 555 0100"), day, &by_phone));

        let next_day = day.succ_opt().unwrap();
        assert!(!matches_filter("Ana", None, next_day, &filter));
    }
}
