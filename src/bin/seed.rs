use argon2::{
    Argon2, PasswordHasher,
    password_hash::{rand_core::OsRng, SaltString},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::OnConflict,
};
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{self, Entity as Products},
        users::{self, Entity as Users},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let user_id = ensure_user(&orm, "user@example.com", "user123").await?;
    seed_products(&orm).await?;

    println!("Seed completed. User ID: {user_id}");
    Ok(())
}

async fn ensure_user(orm: &DatabaseConnection, email: &str, password: &str) -> anyhow::Result<i32> {
    if let Some(existing) = Users::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let user = users::ActiveModel {
        id: NotSet,
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        name: Set(Some("Demo User".to_string())),
        registered_at: Set(Utc::now().into()),
    };
    let result = Users::insert(user).exec(orm).await?;

    println!("Created user {email}");
    Ok(result.last_insert_id)
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let products = [
        ("HOOD-001", "Axum Hoodie", "Warm hoodie for Rustaceans", Decimal::new(5500, 2)),
        ("MUG-001", "Ferris Mug", "Coffee tastes better with Ferris", Decimal::new(1200, 2)),
        ("STICK-001", "Rust Sticker Pack", "Decorate your laptop", Decimal::new(500, 2)),
        ("BOOK-001", "E-book: Async Rust", "Learn async Rust patterns", Decimal::new(2499, 2)),
    ];

    for (sku, name, desc, price) in products {
        let row = products::ActiveModel {
            id: NotSet,
            sku: Set(sku.to_string()),
            name: Set(name.to_string()),
            description: Set(Some(desc.to_string())),
            price: Set(price),
        };
        Products::insert(row)
            .on_conflict(
                OnConflict::column(products::Column::Sku)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(orm)
            .await?;
    }

    println!("Seeded products");
    Ok(())
}
