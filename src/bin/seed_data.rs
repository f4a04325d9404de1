//! Seed data script: an admin account, the default payment methods and a few
//! catalog entries so a fresh database can take orders immediately.
//!
//! Run with: cargo run --bin seed-data -- --admin-email admin@example.com

use chrono::Utc;
use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use bookstore_api::{
    auth::{AuthConfig, AuthService},
    config,
    entities::{book, cart, category, payment_method, user, UserRole},
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Populate the bookstore database with starter data")]
struct Args {
    /// Email for the admin account
    #[arg(long, env = "SEED_ADMIN_EMAIL", default_value = "admin@bookstore.local")]
    admin_email: String,

    /// Password for the admin account
    #[arg(long, env = "SEED_ADMIN_PASSWORD")]
    admin_password: String,

    /// Skip the sample books
    #[arg(long)]
    no_books: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = config::load_config()?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    let db = bookstore_api::db::establish_connection_from_app_config(&cfg).await?;
    bookstore_api::db::run_migrations(&db).await?;
    let auth = AuthService::new(AuthConfig::from(&cfg));

    seed_admin(&db, &auth, &args.admin_email, &args.admin_password).await?;
    let methods = seed_payment_methods(&db).await?;
    info!(created = methods, "payment methods seeded");

    if !args.no_books {
        let books = seed_books(&db).await?;
        info!(created = books, "books seeded");
    }

    info!("Seed data complete");
    Ok(())
}

async fn seed_admin(
    db: &DatabaseConnection,
    auth: &AuthService,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();
    if user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        info!(%email, "admin already present");
        return Ok(());
    }

    let now = Utc::now();
    let admin = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set("admin".to_string()),
        email: Set(email),
        password_hash: Set(auth.hash_password(password).await?),
        full_name: Set("Store Administrator".to_string()),
        phone: Set(None),
        address: Set(None),
        role: Set(UserRole::Admin),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(admin.id),
        total: Set(Decimal::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!(user_id = %admin.id, "admin account created");
    Ok(())
}

async fn seed_payment_methods(db: &DatabaseConnection) -> anyhow::Result<usize> {
    let methods = [
        ("Credit Card", "Visa, Mastercard and American Express"),
        ("PayPal", "Pay with a PayPal account"),
        ("Cash on Delivery", "Pay the courier on arrival"),
    ];

    let mut created = 0;
    for (name, description) in methods {
        let exists = payment_method::Entity::find()
            .filter(payment_method::Column::Name.eq(name))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        payment_method::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(description.to_string())),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;
        created += 1;
    }
    Ok(created)
}

/// Returns the id of each category by name, creating the missing ones.
async fn seed_categories(db: &DatabaseConnection) -> anyhow::Result<HashMap<&'static str, Uuid>> {
    let categories = [
        ("Programming", "Languages, tools and craft"),
        ("Science Fiction", "Other worlds and futures"),
    ];

    let mut ids = HashMap::new();
    for (name, description) in categories {
        let existing = category::Entity::find()
            .filter(category::Column::Name.eq(name))
            .one(db)
            .await?;
        let id = match existing {
            Some(found) => found.id,
            None => {
                category::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name.to_string()),
                    description: Set(Some(description.to_string())),
                    created_at: Set(Utc::now()),
                }
                .insert(db)
                .await?
                .id
            }
        };
        ids.insert(name, id);
    }
    Ok(ids)
}

async fn seed_books(db: &DatabaseConnection) -> anyhow::Result<usize> {
    let categories = seed_categories(db).await?;
    let books = [
        ("The Rust Programming Language", "The official book on Rust.", dec!(39.95), 25, "Programming"),
        ("Designing Data-Intensive Applications", "Reliable, scalable and maintainable systems.", dec!(49.99), 12, "Programming"),
        ("Dune", "Desert planet, spice and politics.", dec!(10.99), 40, "Science Fiction"),
        ("The Pragmatic Programmer", "Your journey to mastery.", dec!(44.50), 8, "Programming"),
    ];

    let mut created = 0;
    let now = Utc::now();
    for (title, description, price, stock, category_name) in books {
        let exists = book::Entity::find()
            .filter(book::Column::Title.eq(title))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        book::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            description: Set(Some(description.to_string())),
            price: Set(price),
            stock: Set(stock),
            image_url: Set(None),
            category_id: Set(categories.get(category_name).copied()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        created += 1;
    }
    Ok(created)
}
