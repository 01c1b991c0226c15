use shop_orders::{
    error::AppError,
    models::{ListFilter, OrderItemPatch, OrderPatch, OrderStatus},
    repository::{FailPoint, MemoryStore},
    services::OrderService,
};
use uuid::Uuid;

type MemoryService = OrderService<MemoryStore, MemoryStore, MemoryStore>;

struct Fixture {
    store: MemoryStore,
    service: MemoryService,
    shop_id: Uuid,
    customer_id: Uuid,
}

fn fixture() -> anyhow::Result<Fixture> {
    let store = MemoryStore::new();
    let shop_id = store.add_shop("north-street")?;
    let customer_id = store.add_customer(shop_id, "Marta Silva")?;
    let service = OrderService::new(store.clone(), store.clone(), store.clone());
    Ok(Fixture {
        store,
        service,
        shop_id,
        customer_id,
    })
}

#[tokio::test]
async fn one_active_order_per_customer_and_shop() -> anyhow::Result<()> {
    let fx = fixture()?;

    let order = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, Some("ring twice".into()))
        .await?;
    assert_eq!(order.status, OrderStatus::Created);
    assert_eq!(order.total_price, 0);
    assert_eq!(order.customer_name, "Marta Silva");

    let err = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // A customer of another shop is unknown here.
    let other_shop = fx.store.add_shop("south-street")?;
    let err = fx
        .service
        .create_order(fx.customer_id, other_shop, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    // Closing the order frees the slot.
    fx.service
        .update_order_by_id(
            order.id,
            Some(fx.shop_id),
            OrderPatch {
                status: Some(OrderStatus::Done),
                ..OrderPatch::default()
            },
        )
        .await?;
    let next = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;
    assert_ne!(next.id, order.id);
    Ok(())
}

#[tokio::test]
async fn get_order_is_scoped_and_carries_items() -> anyhow::Result<()> {
    let fx = fixture()?;
    let order = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;

    let fetched = fx.service.get_order_by_id(order.id, Some(fx.shop_id)).await?;
    assert_eq!(fetched.order.id, order.id);
    assert!(fetched.items.is_empty());

    // Unscoped lookups are allowed.
    fx.service.get_order_by_id(order.id, None).await?;

    let err = fx
        .service
        .get_order_by_id(order.id, Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn list_orders_filters_by_shop_and_name() -> anyhow::Result<()> {
    let fx = fixture()?;
    let jorge = fx.store.add_customer(fx.shop_id, "Jorge Pinto")?;
    fx.service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;
    fx.service.create_order(jorge, fx.shop_id, None).await?;
    let elsewhere = fx.store.add_shop("elsewhere")?;
    let remote = fx.store.add_customer(elsewhere, "Jorge Pinto")?;
    fx.service.create_order(remote, elsewhere, None).await?;

    let all = fx
        .service
        .get_orders_by_shop(fx.shop_id, ListFilter::default())
        .await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].customer_id, jorge, "newest first");

    let filtered = fx
        .service
        .get_orders_by_shop(
            fx.shop_id,
            ListFilter {
                search: Some("marta".into()),
                ..ListFilter::default()
            },
        )
        .await?;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].customer_id, fx.customer_id);
    Ok(())
}

#[tokio::test]
async fn update_order_touches_only_given_fields() -> anyhow::Result<()> {
    let fx = fixture()?;
    let order = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, Some("leave at door".into()))
        .await?;

    let updated = fx
        .service
        .update_order_by_id(
            order.id,
            None,
            OrderPatch {
                total_price: Some(4200),
                ..OrderPatch::default()
            },
        )
        .await?;
    assert_eq!(updated.total_price, 4200);
    assert_eq!(updated.status, OrderStatus::Created);
    assert_eq!(updated.notes.as_deref(), Some("leave at door"));

    let err = fx
        .service
        .update_order_by_id(Uuid::new_v4(), None, OrderPatch::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn order_items_belong_to_their_order() -> anyhow::Result<()> {
    let fx = fixture()?;
    let bread = fx.store.add_product(fx.shop_id, "Bread", 300)?;
    let milk = fx.store.add_product(fx.shop_id, "Milk", 120)?;
    let order = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;
    let other_customer = fx.store.add_customer(fx.shop_id, "Jorge Pinto")?;
    let other = fx
        .service
        .create_order(other_customer, fx.shop_id, None)
        .await?;

    let item = fx
        .service
        .create_order_item(order.id, Some(fx.shop_id), bread, 2)
        .await?;
    assert_eq!(item.product_name, "Bread");
    assert_eq!(item.price, 300);

    let dup = fx
        .service
        .create_order_item(order.id, Some(fx.shop_id), bread, 1)
        .await
        .unwrap_err();
    assert!(dup.is_conflict());

    let zero = fx
        .service
        .create_order_item(order.id, Some(fx.shop_id), milk, 0)
        .await
        .unwrap_err();
    assert!(matches!(zero, AppError::BadRequest(_)));

    // The line is invisible through another order.
    let err = fx
        .service
        .get_order_item_by_id(other.id, Some(fx.shop_id), item.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let err = fx
        .service
        .delete_order_item_by_id(other.id, Some(fx.shop_id), item.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let swapped = fx
        .service
        .update_order_item_by_id(
            order.id,
            Some(fx.shop_id),
            item.id,
            OrderItemPatch {
                product_id: Some(milk),
                quantity: Some(3),
            },
        )
        .await?;
    assert_eq!(swapped.product_name, "Milk");
    assert_eq!(swapped.price, 120);
    assert_eq!(swapped.quantity, 3);

    // Moving the line onto a product already on the order is refused.
    let bread_line = fx
        .service
        .create_order_item(order.id, Some(fx.shop_id), bread, 1)
        .await?;
    let err = fx
        .service
        .update_order_item_by_id(
            order.id,
            Some(fx.shop_id),
            bread_line.id,
            OrderItemPatch {
                product_id: Some(milk),
                quantity: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());
    fx.service
        .delete_order_item_by_id(order.id, Some(fx.shop_id), bread_line.id)
        .await?;

    let items = fx
        .service
        .get_order_items_by_order(order.id, Some(fx.shop_id))
        .await?;
    assert_eq!(items.len(), 1);

    fx.service
        .delete_order_item_by_id(order.id, Some(fx.shop_id), item.id)
        .await?;
    assert!(fx.store.order_items()?.is_empty());
    Ok(())
}

#[tokio::test]
async fn delete_order_removes_its_items() -> anyhow::Result<()> {
    let fx = fixture()?;
    let bread = fx.store.add_product(fx.shop_id, "Bread", 300)?;
    let milk = fx.store.add_product(fx.shop_id, "Milk", 120)?;
    let order = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;
    fx.service
        .create_order_item(order.id, None, bread, 1)
        .await?;
    fx.service.create_order_item(order.id, None, milk, 2).await?;

    fx.service.delete_order_by_id(order.id, Some(fx.shop_id)).await?;

    assert!(fx.store.orders()?.is_empty());
    assert!(fx.store.order_items()?.is_empty());

    let err = fx
        .service
        .delete_order_by_id(order.id, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn failed_delete_leaves_order_and_items() -> anyhow::Result<()> {
    let fx = fixture()?;
    let bread = fx.store.add_product(fx.shop_id, "Bread", 300)?;
    let order = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;
    fx.service
        .create_order_item(order.id, None, bread, 1)
        .await?;

    fx.store.fail_on(FailPoint::DeleteOrder)?;
    let err = fx
        .service
        .delete_order_by_id(order.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));

    // Items were deleted inside the rolled back transaction only.
    assert_eq!(fx.store.orders()?.len(), 1);
    assert_eq!(fx.store.order_items()?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn delete_in_another_shop_is_not_found() -> anyhow::Result<()> {
    let fx = fixture()?;
    let order = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;

    let err = fx
        .service
        .delete_order_by_id(order.id, Some(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fx.store.orders()?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn reopening_a_closed_order_conflicts_with_the_active_one() -> anyhow::Result<()> {
    let fx = fixture()?;
    let first = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;
    fx.service
        .update_order_by_id(
            first.id,
            None,
            OrderPatch {
                status: Some(OrderStatus::Cancelled),
                ..OrderPatch::default()
            },
        )
        .await?;
    let second = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;

    let err = fx
        .service
        .update_order_by_id(
            first.id,
            Some(fx.shop_id),
            OrderPatch {
                status: Some(OrderStatus::Created),
                ..OrderPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let active: Vec<_> = fx
        .store
        .orders()?
        .into_iter()
        .filter(|o| o.status.is_active())
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);
    Ok(())
}

#[tokio::test]
async fn products_of_another_shop_cannot_be_ordered() -> anyhow::Result<()> {
    let fx = fixture()?;
    let elsewhere = fx.store.add_shop("elsewhere")?;
    let foreign = fx.store.add_product(elsewhere, "Cheese", 700)?;
    let local = fx.store.add_product(fx.shop_id, "Bread", 300)?;
    let order = fx
        .service
        .create_order(fx.customer_id, fx.shop_id, None)
        .await?;

    let err = fx
        .service
        .create_order_item(order.id, Some(fx.shop_id), foreign, 1)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let line = fx
        .service
        .create_order_item(order.id, Some(fx.shop_id), local, 1)
        .await?;
    let err = fx
        .service
        .update_order_item_by_id(
            order.id,
            Some(fx.shop_id),
            line.id,
            OrderItemPatch {
                product_id: Some(foreign),
                quantity: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(fx.store.order_items()?, vec![line]);
    Ok(())
}
