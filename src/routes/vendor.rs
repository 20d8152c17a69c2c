use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::OrderList,
        products::ProductList,
        vendor::{
            CreateProductRequest, UpdateOrderStatusRequest, UpdateProductRequest, VendorDashboard,
        },
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, Product},
    response::ApiResponse,
    routes::params::Page,
    services::vendor_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/products", get(list_products))
        .route("/products", post(create_product))
        .route("/products/{id}", put(update_product))
        .route("/products/{id}", delete(delete_product))
        .route("/orders", get(list_orders))
        .route("/orders/{id}", put(update_order_status))
}

#[utoipa::path(
    get,
    path = "/api/vendor/dashboard",
    responses(
        (status = 200, description = "Vendor stats", body = ApiResponse<VendorDashboard>),
        (status = 403, description = "Not an approved vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<VendorDashboard>>> {
    let resp = vendor_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendor/products",
    params(("page" = Option<i64>, Query, description = "Page number, default 1")),
    responses(
        (status = 200, description = "Vendor's products, newest first", body = ApiResponse<ProductList>),
        (status = 403, description = "Not an approved vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<Page>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = vendor_service::list_products(&state, &user, page).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendor/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<Product>),
        (status = 400, description = "Invalid category or negative price/stock"),
        (status = 403, description = "Not an approved vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = vendor_service::create_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/vendor/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Product>),
        (status = 403, description = "Not the owning vendor"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = vendor_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/vendor/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product and stored images removed"),
        (status = 403, description = "Not the owning vendor"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = vendor_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendor/orders",
    responses(
        (status = 200, description = "Orders containing the vendor's line items", body = ApiResponse<OrderList>),
        (status = 403, description = "Not an approved vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = vendor_service::list_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/vendor/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 403, description = "No line item in this order belongs to the caller"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vendor"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = vendor_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
