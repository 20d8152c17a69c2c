use std::collections::HashSet;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::OrderList,
        products::ProductList,
        vendor::{
            CreateProductRequest, UpdateProductRequest, UpdateOrderStatusRequest, VendorDashboard,
        },
    },
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
        users::{Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_vendor},
    models::{ImageRef, Order, OrderStatus, Product},
    response::{ApiResponse, Meta},
    routes::params::Page,
    services::convert::{order_from_entity, product_from_entity},
    state::AppState,
};

/// Vendor catalog page size.
pub const VENDOR_PAGE_SIZE: i64 = 10;

const LOW_STOCK_THRESHOLD: i32 = 10;
const DASHBOARD_LIMIT: u64 = 5;

/// Vendor routes require an approved vendor account; approval lives on the
/// user row, not in the token.
async fn load_approved_vendor(state: &AppState, user: &AuthUser) -> AppResult<UserModel> {
    ensure_vendor(user)?;
    let vendor = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let vendor = match vendor {
        Some(v) => v,
        None => return Err(AppError::Forbidden),
    };
    if !vendor.is_approved {
        return Err(AppError::Forbidden);
    }
    Ok(vendor)
}

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<VendorDashboard>> {
    let vendor = load_approved_vendor(state, user).await?;

    let total_products = Products::find()
        .filter(ProdCol::VendorId.eq(vendor.id))
        .count(&state.orm)
        .await? as i64;

    let vendor_items = OrderItems::find()
        .filter(OrderItemCol::VendorId.eq(vendor.id))
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = vendor_items
        .iter()
        .map(|item| item.order_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let participating_orders = if order_ids.is_empty() {
        Vec::new()
    } else {
        Orders::find()
            .filter(OrderCol::Id.is_in(order_ids))
            .order_by_desc(OrderCol::CreatedAt)
            .all(&state.orm)
            .await?
    };

    let paid_ids: HashSet<Uuid> = participating_orders
        .iter()
        .filter(|o| o.is_paid)
        .map(|o| o.id)
        .collect();

    // Revenue and order-line count over this vendor's lines in paid orders.
    let mut total_revenue = 0.0;
    let mut total_orders = 0i64;
    for item in &vendor_items {
        if paid_ids.contains(&item.order_id) {
            total_revenue += item.price * item.quantity as f64;
            total_orders += 1;
        }
    }

    let recent_orders = participating_orders
        .into_iter()
        .take(DASHBOARD_LIMIT as usize)
        .map(order_from_entity)
        .collect::<AppResult<Vec<Order>>>()?;

    let low_stock_products = Products::find()
        .filter(
            Condition::all()
                .add(ProdCol::VendorId.eq(vendor.id))
                .add(ProdCol::Stock.lt(LOW_STOCK_THRESHOLD)),
        )
        .limit(DASHBOARD_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<Product>>>()?;

    Ok(ApiResponse::success(
        "Dashboard",
        VendorDashboard {
            total_products,
            total_revenue,
            total_orders,
            recent_orders,
            low_stock_products,
        },
        None,
    ))
}

pub async fn list_products(
    state: &AppState,
    user: &AuthUser,
    page: Page,
) -> AppResult<ApiResponse<ProductList>> {
    let vendor = load_approved_vendor(state, user).await?;
    let (page, offset) = page.normalize(VENDOR_PAGE_SIZE);

    let finder = Products::find()
        .filter(ProdCol::VendorId.eq(vendor.id))
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(VENDOR_PAGE_SIZE as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::paginated(page, VENDOR_PAGE_SIZE, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let vendor = load_approved_vendor(state, user).await?;

    if payload.price < 0.0 {
        return Err(AppError::Validation("Price must not be negative".into()));
    }
    if payload.stock < 0 {
        return Err(AppError::Validation("Stock must not be negative".into()));
    }

    let images = serde_json::to_value(payload.images.unwrap_or_default())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    let tags = serde_json::to_value(payload.tags.unwrap_or_default())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        vendor_id: Set(vendor.id),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        compare_price: Set(payload.compare_price),
        category: Set(payload.category.as_str().to_string()),
        images: Set(images),
        stock: Set(payload.stock),
        sold: Set(0),
        rating: Set(0.0),
        num_reviews: Set(0),
        is_active: Set(true),
        tags: Set(tags),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(product_id = %product.id, vendor_id = %vendor.id, "product created");

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let vendor = load_approved_vendor(state, user).await?;
    let existing = find_owned_product(state, &vendor, id).await?;

    let mut active: ProductActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        if price < 0.0 {
            return Err(AppError::Validation("Price must not be negative".into()));
        }
        active.price = Set(price);
    }
    if let Some(compare_price) = payload.compare_price {
        active.compare_price = Set(compare_price);
    }
    if let Some(category) = payload.category {
        active.category = Set(category.as_str().to_string());
    }
    if let Some(stock) = payload.stock {
        if stock < 0 {
            return Err(AppError::Validation("Stock must not be negative".into()));
        }
        active.stock = Set(stock);
    }
    if let Some(tags) = payload.tags {
        active.tags =
            Set(serde_json::to_value(tags).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?);
    }
    if let Some(images) = payload.images {
        active.images =
            Set(serde_json::to_value(images).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let vendor = load_approved_vendor(state, user).await?;
    let product = find_owned_product(state, &vendor, id).await?;

    // Cascade stored images before dropping the row.
    let images: Vec<ImageRef> =
        serde_json::from_value(product.images.clone()).unwrap_or_default();
    for image in images {
        if let Some(public_id) = image.public_id {
            state.images.delete(&public_id).await?;
        }
    }

    product.delete(&state.orm).await?;
    tracing::info!(product_id = %id, vendor_id = %vendor.id, "product deleted");

    Ok(ApiResponse::success(
        "Product removed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let vendor = load_approved_vendor(state, user).await?;

    let order_ids: Vec<Uuid> = OrderItems::find()
        .filter(OrderItemCol::VendorId.eq(vendor.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|item| item.order_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let items = if order_ids.is_empty() {
        Vec::new()
    } else {
        Orders::find()
            .filter(OrderCol::Id.is_in(order_ids))
            .order_by_desc(OrderCol::CreatedAt)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect::<AppResult<Vec<_>>>()?
    };

    Ok(ApiResponse::success("Orders", OrderList { items }, None))
}

/// Change an order's fulfillment status. Requires at least one line item
/// owned by the calling vendor; a partially participating vendor still
/// changes the whole order's status. The transition set is open.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let vendor = load_approved_vendor(state, user).await?;

    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let has_vendor_items = OrderItems::find()
        .filter(
            Condition::all()
                .add(OrderItemCol::OrderId.eq(order.id))
                .add(OrderItemCol::VendorId.eq(vendor.id)),
        )
        .count(&state.orm)
        .await?
        > 0;
    if !has_vendor_items {
        return Err(AppError::Forbidden);
    }

    let mut active: OrderActive = order.into();
    active.status = Set(payload.status.as_str().to_string());
    if payload.status == OrderStatus::Delivered {
        active.is_delivered = Set(true);
        active.delivered_at = Set(Some(Utc::now().into()));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, status = %order.status, "order status updated");

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order)?,
        Some(Meta::empty()),
    ))
}

async fn find_owned_product(
    state: &AppState,
    vendor: &UserModel,
    id: Uuid,
) -> AppResult<ProductModel> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    if product.vendor_id != vendor.id {
        return Err(AppError::Forbidden);
    }
    Ok(product)
}
