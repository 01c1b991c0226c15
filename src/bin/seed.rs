use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    ActiveValue::NotSet,
};
use shop_orders::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::auth::Claims,
    entity::{
        customers::ActiveModel as CustomerActive,
        products::ActiveModel as ProductActive,
        shops::{ActiveModel as ShopActive, Column as ShopCol, Entity as Shops},
    },
};
use uuid::Uuid;

const SHARE_TOKEN: &str = "demo-shop";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let shop_id = match Shops::find()
        .filter(ShopCol::ShareToken.eq(SHARE_TOKEN))
        .one(&orm)
        .await?
    {
        Some(shop) => {
            println!("Shop '{SHARE_TOKEN}' already seeded");
            shop.id
        }
        None => seed_shop(&orm).await?,
    };

    let token = staff_token(&config.jwt_secret, shop_id)?;
    println!("Seed completed. Shop ID: {shop_id}");
    println!("Staff token (24h): {token}");
    Ok(())
}

async fn seed_shop(orm: &DatabaseConnection) -> anyhow::Result<Uuid> {
    let shop = ShopActive {
        id: Set(Uuid::new_v4()),
        name: Set("Demo Bakery".into()),
        share_token: Set(SHARE_TOKEN.into()),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    let customers = [("Ana Lima", "+351 910 000 001"), ("Rui Costa", "+351 910 000 002")];
    for (name, phone) in customers {
        CustomerActive {
            id: Set(Uuid::new_v4()),
            shop_id: Set(shop.id),
            name: Set(name.into()),
            phone: Set(Some(phone.into())),
            created_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    let products = [
        ("Sourdough loaf", 450),
        ("Croissant", 180),
        ("Rye bread", 390),
        ("Cinnamon roll", 250),
    ];
    for (name, price) in products {
        ProductActive {
            id: Set(Uuid::new_v4()),
            shop_id: Set(shop.id),
            name: Set(name.into()),
            price: Set(price),
            created_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded shop, customers and products");
    Ok(shop.id)
}

fn staff_token(secret: &str, shop_id: Uuid) -> anyhow::Result<String> {
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        shop_id: shop_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 24 * 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}
