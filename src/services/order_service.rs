use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    clients::payments::to_minor_units,
    dto::orders::{
        CreateOrderRequest, OrderList, OrderWithItems, PayOrderRequest, PaymentIntentRequest,
        PaymentIntentResponse,
    },
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{ImageRef, OrderStatus, Role},
    response::{ApiResponse, Meta},
    services::convert::{order_from_entity, order_item_from_entity},
    state::AppState,
};

/// Place an order: validate every line against current stock before any
/// mutation, persist the order with snapshot line items, then reconcile
/// stock per product.
///
/// The decrements run after the order commit as individual statements, so
/// they are not atomic with the order or with each other. Two concurrent
/// orders can pass validation against the same stale read; the conditional
/// guard on each decrement then keeps stock non-negative but the late order
/// keeps its committed record with no decrement applied (logged).
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if payload.order_items.is_empty() {
        return Err(AppError::Validation("No order items".into()));
    }

    // Pass 1: every referenced product must exist.
    let mut products: Vec<ProductModel> = Vec::with_capacity(payload.order_items.len());
    for item in &payload.order_items {
        if item.quantity <= 0 {
            return Err(AppError::Validation("Quantity must be positive".into()));
        }
        let product = Products::find_by_id(item.product_id).one(&state.orm).await?;
        match product {
            Some(p) => products.push(p),
            None => return Err(AppError::NotFound),
        }
    }

    // Pass 2: all-or-nothing stock gate before any write. Lines referencing
    // the same product count against its stock together.
    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    for item in &payload.order_items {
        *requested.entry(item.product_id).or_insert(0) += item.quantity;
    }
    for product in &products {
        if let Some(total) = requested.remove(&product.id) {
            if product.stock < total {
                return Err(AppError::InsufficientStock {
                    name: product.name.clone(),
                    available: product.stock,
                });
            }
        }
    }

    let shipping_address = serde_json::to_value(&payload.shipping_address)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    // Price breakdown is stored as supplied by the caller, not recomputed.
    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        shipping_address: Set(shipping_address),
        payment_method: Set(payload.payment_method),
        items_price: Set(payload.items_price),
        tax_price: Set(payload.tax_price),
        shipping_price: Set(payload.shipping_price),
        total_price: Set(payload.total_price),
        is_paid: Set(false),
        paid_at: Set(None),
        payment_result: Set(None),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        is_delivered: Set(false),
        delivered_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(payload.order_items.len());
    for (item, product) in payload.order_items.iter().zip(&products) {
        // Snapshot name, price, image and the owning vendor at order time.
        let image = serde_json::from_value::<Vec<ImageRef>>(product.images.clone())
            .ok()
            .and_then(|imgs| imgs.into_iter().next())
            .map(|img| img.url);

        let inserted = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            vendor_id: Set(product.vendor_id),
            name: Set(product.name.clone()),
            image: Set(image),
            price: Set(product.price),
            quantity: Set(item.quantity),
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(inserted));
    }

    txn.commit().await?;

    // Stock reconciliation: one guarded statement per product, outside the
    // order transaction.
    for (item, product) in payload.order_items.iter().zip(&products) {
        let result = Products::update_many()
            .col_expr(
                ProdCol::Stock,
                Expr::col(ProdCol::Stock).sub(item.quantity),
            )
            .col_expr(ProdCol::Sold, Expr::col(ProdCol::Sold).add(item.quantity))
            .filter(
                Condition::all()
                    .add(ProdCol::Id.eq(product.id))
                    .add(ProdCol::Stock.gte(item.quantity)),
            )
            .exec(&state.orm)
            .await?;

        if result.rows_affected == 0 {
            tracing::warn!(
                order_id = %order.id,
                product_id = %product.id,
                quantity = item.quantity,
                "stock decrement skipped, concurrent order consumed the stock"
            );
        }
    }

    // Best-effort confirmation email; the order is already committed.
    if let Some(customer) = Users::find_by_id(user.user_id).one(&state.orm).await? {
        let html = format!(
            "<h1>Thank you for your order!</h1>\
             <p>Order ID: {}</p>\
             <p>Total: ${:.2}</p>\
             <p>We'll send you updates about your order status.</p>",
            order.id, order.total_price
        );
        if let Err(err) = state
            .mailer
            .send(&customer.email, "Order Confirmation", &html)
            .await
        {
            tracing::warn!(error = %err, order_id = %order.id, "order confirmation email failed");
        }
    }

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn create_payment_intent(
    state: &AppState,
    user: &AuthUser,
    payload: PaymentIntentRequest,
) -> AppResult<ApiResponse<PaymentIntentResponse>> {
    if payload.amount <= 0.0 {
        return Err(AppError::Validation("Amount must be positive".into()));
    }

    let intent = state
        .payments
        .create_intent(to_minor_units(payload.amount), &user.user_id.to_string())
        .await?;

    Ok(ApiResponse::success(
        "Payment intent created",
        PaymentIntentResponse {
            client_secret: intent.client_secret,
        },
        None,
    ))
}

/// Mark an order paid and advance it to processing, storing the gateway's
/// result blob verbatim. No ownership check is performed here; the gateway
/// result is treated as the trust anchor.
pub async fn pay_order(
    state: &AppState,
    id: Uuid,
    payload: PayOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let mut active: OrderActive = order.into();
    active.is_paid = Set(true);
    active.paid_at = Set(Some(Utc::now().into()));
    active.status = Set(OrderStatus::Processing.as_str().to_string());
    active.payment_result = Set(Some(payload.0));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    tracing::info!(order_id = %order.id, "payment recorded");

    Ok(ApiResponse::success(
        "Payment recorded",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn my_orders(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderList>> {
    let items = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success("Ok", OrderList { items }, None))
}

/// Visible to the owning customer, any vendor with a line item in the order,
/// or an admin.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items: Vec<_> = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    let is_owner = order.user_id == user.user_id;
    let is_participating_vendor = items.iter().any(|item| item.vendor_id == user.user_id);
    if !is_owner && user.role != Role::Admin && !is_participating_vendor {
        return Err(AppError::Forbidden);
    }

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}
