use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use std::sync::Arc;
use tracing::info;

use thrift_market_api::{
    auth::SharedSecretIdentityProvider,
    config, db,
    entities::user::{self, UserRole},
    services::{
        items::{ItemService, NewItem},
        outfits::OutfitService,
        stores::{NewStore, StoreService},
    },
    storage::InMemoryBlobStore,
};

const OWNER_UID: &str = "demo-owner";
const CUSTOMER_UID: &str = "demo-customer";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("=== Thrift Market Seed Data ===");

    let pool = Arc::new(db::establish_connection_from_app_config(&cfg).await?);
    db::run_migrations(&pool).await?;

    if user::Entity::find_by_id(OWNER_UID.to_string())
        .one(&*pool)
        .await?
        .is_some()
    {
        info!("Demo data already present; nothing to do");
        return Ok(());
    }

    ensure_user(&pool, OWNER_UID, "owner@example.com", "Demo Owner", UserRole::StoreOwner).await?;
    ensure_user(&pool, CUSTOMER_UID, "shopper@example.com", "Demo Shopper", UserRole::Customer)
        .await?;

    // Seeded items carry no images, so the blob store is never touched
    let blobs = Arc::new(InMemoryBlobStore::new());
    let stores = StoreService::new(pool.clone(), blobs.clone());
    let items = ItemService::new(pool.clone(), blobs);
    let outfits = OutfitService::new(pool.clone());

    let store = stores
        .create(
            OWNER_UID,
            NewStore {
                name: Some("Second Chance Closet".into()),
                description: Some("Vintage denim, knits and outerwear".into()),
                address: Some("12 Market Street".into()),
                latitude: Some(40.7128),
                longitude: Some(-74.0060),
            },
        )
        .await?;
    info!(store_id = %store.store_id, "Created store");

    let catalog = [
        ("Levi's 501 jeans", "Bottoms", "Vintage", "Women", "28", dec!(24.00), 1),
        ("Wool cable knit sweater", "Tops", "Cozy", "Unisex", "M", dec!(18.50), 2),
        ("Suede trucker jacket", "Outerwear", "Western", "Men", "L", dec!(45.00), 1),
        ("Leather ankle boots", "Shoes", "Classic", "Women", "38", dec!(30.00), 0),
    ];

    let mut item_ids = Vec::new();
    for (name, category, style, department, size, price, quantity) in catalog {
        let view = items
            .create(
                OWNER_UID,
                NewItem {
                    name: Some(name.into()),
                    description: Some(format!("{} in good condition", name)),
                    category: Some(category.into()),
                    style: Some(style.into()),
                    department: Some(department.into()),
                    size: Some(size.into()),
                    price: Some(price),
                    quantity: Some(quantity),
                },
                Vec::new(),
            )
            .await?;
        info!(item_id = %view.item.item_id, status = ?view.item.status, "Created item");
        item_ids.push(view.item.item_id);
    }

    let mut slots: Vec<Option<String>> = vec![None; 9];
    for (slot, item_id) in slots.iter_mut().zip(item_ids.iter()) {
        *slot = Some(item_id.clone());
    }
    outfits
        .create(CUSTOMER_UID, Some("Weekend layers".into()), slots)
        .await?;

    info!("=== Seed Data Complete ===");
    if let Some(secret) = cfg.jwt_secret.as_deref().filter(|_| !cfg.uses_firebase()) {
        let identity = SharedSecretIdentityProvider::new(secret, cfg.jwt_expiration);
        let owner_token =
            identity.issue_token(OWNER_UID, Some("owner@example.com"), Some("Demo Owner"))?;
        let customer_token =
            identity.issue_token(CUSTOMER_UID, Some("shopper@example.com"), Some("Demo Shopper"))?;
        info!("Store owner token: {}", owner_token);
        info!("Customer token: {}", customer_token);
    }
    info!("Try: curl http://localhost:{}/api/items", cfg.port);

    Ok(())
}

async fn ensure_user(
    pool: &sea_orm::DatabaseConnection,
    uid: &str,
    email: &str,
    name: &str,
    role: UserRole,
) -> anyhow::Result<()> {
    let now = Utc::now();
    user::ActiveModel {
        uid: Set(uid.to_string()),
        email: Set(email.to_string()),
        name: Set(name.to_string()),
        role: Set(role),
        profile_image_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(pool)
    .await?;
    Ok(())
}
