#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_marketplace_api::{
    clients::{
        email::Mailer,
        images::ImageStore,
        payments::{PaymentGateway, PaymentIntent},
    },
    db::{create_orm_conn, create_pool},
    entity::{products, users},
    error::AppResult,
    models::Role,
    state::AppState,
};
use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

/// Gateway stub that records requested amounts and returns a fixed secret.
pub struct StaticGateway {
    pub amounts: Mutex<Vec<i64>>,
}

#[async_trait]
impl PaymentGateway for StaticGateway {
    async fn create_intent(&self, amount_minor: i64, _user_id: &str) -> AppResult<PaymentIntent> {
        self.amounts.lock().unwrap().push(amount_minor);
        Ok(PaymentIntent {
            client_secret: "pi_test_secret".into(),
        })
    }
}

/// Mailer stub that records (to, subject) pairs.
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push((to.into(), subject.into()));
        Ok(())
    }
}

/// Image-store stub that records deleted public ids.
pub struct RecordingImageStore {
    pub deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn delete(&self, public_id: &str) -> AppResult<()> {
        self.deleted.lock().unwrap().push(public_id.into());
        Ok(())
    }
}

pub struct TestEnv {
    pub state: AppState,
    pub gateway: Arc<StaticGateway>,
    pub mailer: Arc<RecordingMailer>,
    pub images: Arc<RecordingImageStore>,
}

/// Connect, migrate and wipe the tables. Returns None (skip) when neither
/// TEST_DATABASE_URL nor DATABASE_URL is set.
pub async fn setup_env() -> anyhow::Result<Option<TestEnv>> {
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    sqlx::query("TRUNCATE TABLE order_items, orders, reviews, products, users CASCADE")
        .execute(&pool)
        .await?;

    let orm = create_orm_conn(&database_url).await?;

    let gateway = Arc::new(StaticGateway {
        amounts: Mutex::new(Vec::new()),
    });
    let mailer = Arc::new(RecordingMailer {
        sent: Mutex::new(Vec::new()),
    });
    let images = Arc::new(RecordingImageStore {
        deleted: Mutex::new(Vec::new()),
    });

    let state = AppState {
        pool,
        orm,
        payments: gateway.clone(),
        mailer: mailer.clone(),
        images: images.clone(),
    };

    Ok(Some(TestEnv {
        state,
        gateway,
        mailer,
        images,
    }))
}

pub async fn create_user(
    state: &AppState,
    role: Role,
    email: &str,
    approved: bool,
) -> anyhow::Result<Uuid> {
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(email.split('@').next().unwrap_or("user").to_string()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.as_str().to_string()),
        shop_name: Set(None),
        shop_description: Set(None),
        is_approved: Set(approved),
        address: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

/// Seed a product. `age_secs` pushes created_at into the past so newest-first
/// ordering is deterministic.
pub async fn create_product(
    state: &AppState,
    vendor_id: Uuid,
    name: &str,
    category: &str,
    price: f64,
    stock: i32,
    age_secs: i64,
) -> anyhow::Result<products::Model> {
    let now = Utc::now() - Duration::seconds(age_secs);
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(vendor_id),
        name: Set(name.to_string()),
        description: Set(format!("{name} description")),
        price: Set(price),
        compare_price: Set(None),
        category: Set(category.to_string()),
        images: Set(serde_json::json!([])),
        stock: Set(stock),
        sold: Set(0),
        rating: Set(0.0),
        num_reviews: Set(0),
        is_active: Set(true),
        tags: Set(serde_json::json!([])),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(product)
}
