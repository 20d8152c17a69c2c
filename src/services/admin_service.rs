use chrono::{Months, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use sea_orm::{ActiveModelTrait, IntoActiveModel};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{AdminDashboard, MonthlyRevenue, UserList},
        orders::OrderList,
        products::ProductList,
    },
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{ImageRef, Role},
    response::{ApiResponse, Meta},
    services::convert::{order_from_entity, product_from_entity, user_from_entity},
    state::AppState,
};

const RECENT_USERS_LIMIT: u64 = 5;
const REVENUE_WINDOW_MONTHS: u32 = 6;

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AdminDashboard>> {
    ensure_admin(user)?;

    let total_customers = Users::find()
        .filter(UserCol::Role.eq(Role::Customer.as_str()))
        .count(&state.orm)
        .await? as i64;
    let total_vendors = Users::find()
        .filter(UserCol::Role.eq(Role::Vendor.as_str()))
        .count(&state.orm)
        .await? as i64;
    let total_products = Products::find().count(&state.orm).await? as i64;
    let total_orders = Orders::find().count(&state.orm).await? as i64;

    let (total_revenue,): (f64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total_price), 0) FROM orders WHERE is_paid = TRUE",
    )
    .fetch_one(&state.pool)
    .await?;

    let recent_users = Users::find()
        .order_by_desc(UserCol::CreatedAt)
        .limit(RECENT_USERS_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let window_start = Utc::now()
        .checked_sub_months(Months::new(REVENUE_WINDOW_MONTHS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("revenue window underflow")))?;

    let rows: Vec<(i32, i32, f64, i64)> = sqlx::query_as(
        r#"
        SELECT EXTRACT(YEAR FROM created_at)::INT AS year,
               EXTRACT(MONTH FROM created_at)::INT AS month,
               COALESCE(SUM(total_price), 0) AS revenue,
               COUNT(*) AS count
        FROM orders
        WHERE is_paid = TRUE AND created_at >= $1
        GROUP BY 1, 2
        ORDER BY 1, 2
        "#,
    )
    .bind(window_start)
    .fetch_all(&state.pool)
    .await?;

    let monthly_revenue = rows
        .into_iter()
        .map(|(year, month, revenue, count)| MonthlyRevenue {
            year,
            month,
            revenue,
            count,
        })
        .collect();

    Ok(ApiResponse::success(
        "Dashboard",
        AdminDashboard {
            total_customers,
            total_vendors,
            total_products,
            total_orders,
            total_revenue,
            recent_users,
            monthly_revenue,
        },
        None,
    ))
}

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let items = Users::find()
        .order_by_desc(UserCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(ApiResponse::success("Users", UserList { items }, None))
}

/// Admin accounts are exempt from deletion.
pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let target = Users::find_by_id(id).one(&state.orm).await?;
    let target = match target {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    if Role::parse(&target.role)? == Role::Admin {
        return Err(AppError::Validation("Cannot delete admin users".into()));
    }

    target.delete(&state.orm).await?;
    tracing::info!(user_id = %id, "user deleted");

    Ok(ApiResponse::success(
        "User removed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn approve_vendor(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let target = Users::find_by_id(id).one(&state.orm).await?;
    let target = match target {
        Some(u) if u.role == Role::Vendor.as_str() => u,
        _ => return Err(AppError::NotFound),
    };

    let email = target.email.clone();
    let name = target.name.clone();

    let mut active = target.into_active_model();
    active.is_approved = Set(true);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    let html = format!(
        "<h1>Congratulations {name}!</h1>\
         <p>Your vendor account has been approved. You can now start listing products.</p>"
    );
    if let Err(err) = state
        .mailer
        .send(&email, "Vendor Account Approved", &html)
        .await
    {
        tracing::warn!(error = %err, vendor_id = %id, "vendor approval email failed");
    }

    tracing::info!(vendor_id = %id, "vendor approved");

    Ok(ApiResponse::success(
        "Vendor approved successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_all_products(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let items = Products::find()
        .order_by_desc(ProdCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(ApiResponse::success("Products", ProductList { items }, None))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let images: Vec<ImageRef> =
        serde_json::from_value(product.images.clone()).unwrap_or_default();
    for image in images {
        if let Some(public_id) = image.public_id {
            state.images.delete(&public_id).await?;
        }
    }

    product.delete(&state.orm).await?;
    tracing::info!(product_id = %id, "product deleted by admin");

    Ok(ApiResponse::success(
        "Product removed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let items = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(ApiResponse::success("Orders", OrderList { items }, None))
}
