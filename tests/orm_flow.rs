use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use shop_orders::{
    config::MergeTotals,
    db::{create_orm_conn, run_migrations},
    dto::temp_orders::{CreateTempOrderRequest, TempOrderLine},
    entity::{
        customers::ActiveModel as CustomerActive, products::ActiveModel as ProductActive,
        shops::ActiveModel as ShopActive,
    },
    models::{ListFilter, TempOrderStatus},
    state::AppState,
};
use uuid::Uuid;

// Postgres flow: customer submits a temp order, staff merges it into a new
// order, a second temp order is folded into that order.
#[tokio::test]
async fn submit_and_merge_against_postgres() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run the Postgres flow."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;
    let share_token = format!("test-{}", Uuid::new_v4());

    let shop = ShopActive {
        id: Set(Uuid::new_v4()),
        name: Set("Test Bakery".into()),
        share_token: Set(share_token.clone()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    let customer = CustomerActive {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shop.id),
        name: Set("Ana Lima".into()),
        phone: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    let loaf = create_product(&state, shop.id, "Sourdough loaf", 450).await?;
    let roll = create_product(&state, shop.id, "Cinnamon roll", 250).await?;

    let first = state
        .orders
        .create_temp_order(&share_token, request(&[(loaf, 2)]))
        .await?;
    assert_eq!(first.temp_order.total_price, 900);

    let merged = state
        .orders
        .merge_temp_order(first.temp_order.id, customer.id, shop.id, None)
        .await?;
    assert_eq!(merged.items.len(), 1);
    assert_eq!(merged.order.total_price, 900);

    // A second active order for the same customer is refused by the service.
    let err = state
        .orders
        .create_order(customer.id, shop.id, None)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let second = state
        .orders
        .create_temp_order(&share_token, request(&[(loaf, 3), (roll, 1)]))
        .await?;
    let merged = state
        .orders
        .merge_temp_order(
            second.temp_order.id,
            customer.id,
            shop.id,
            Some(merged.order.id),
        )
        .await?;
    assert_eq!(merged.items.len(), 2);
    let loaves = merged
        .items
        .iter()
        .find(|i| i.product_id == loaf)
        .map(|i| i.quantity);
    assert_eq!(loaves, Some(5));
    assert_eq!(merged.order.total_price, 450 * 5 + 250);

    let stored = state
        .orders
        .get_temp_order_by_id(second.temp_order.id, Some(shop.id))
        .await?;
    assert_eq!(stored.temp_order.status, TempOrderStatus::Accepted);

    let listed = state
        .orders
        .get_orders_by_shop(
            shop.id,
            ListFilter {
                search: Some("ana".into()),
                ..ListFilter::default()
            },
        )
        .await?;
    assert_eq!(listed.len(), 1);

    // Wildcards in the search term are matched literally.
    let listed = state
        .orders
        .get_orders_by_shop(
            shop.id,
            ListFilter {
                search: Some("a%a".into()),
                ..ListFilter::default()
            },
        )
        .await?;
    assert!(listed.is_empty());

    // Products of another shop are not orderable through this shop's token.
    let other_shop = ShopActive {
        id: Set(Uuid::new_v4()),
        name: Set("Other Bakery".into()),
        share_token: Set(format!("test-{}", Uuid::new_v4())),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    let foreign = create_product(&state, other_shop.id, "Baguette", 300).await?;
    let err = state
        .orders
        .create_temp_order(&share_token, request(&[(foreign, 1)]))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    state
        .orders
        .delete_order_by_id(merged.order.id, Some(shop.id))
        .await?;
    let err = state
        .orders
        .get_order_by_id(merged.order.id, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

fn request(lines: &[(Uuid, i32)]) -> CreateTempOrderRequest {
    CreateTempOrderRequest {
        customer_name: "Ana Lima".into(),
        customer_phone: "+351 910 000 001".into(),
        items: lines
            .iter()
            .map(|&(product_id, quantity)| TempOrderLine {
                product_id,
                quantity,
            })
            .collect(),
    }
}

async fn create_product(
    state: &AppState,
    shop_id: Uuid,
    name: &str,
    price: i64,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        shop_id: Set(shop_id),
        name: Set(name.into()),
        price: Set(price),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE temp_order_items, temp_orders, order_items, orders, products, \
         customers, shops CASCADE",
    ))
    .await?;

    Ok(AppState::new(orm, "test-secret", MergeTotals::DisplayOnly))
}
