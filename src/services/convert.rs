//! Entity-to-model conversions. Stored role/category/status strings are
//! parsed into their sum types here; a value that fails to parse means the
//! row predates the current closed set and is surfaced as an internal error.

use chrono::Utc;

use crate::{
    entity::{
        order_items::Model as OrderItemModel, orders::Model as OrderModel,
        products::Model as ProductModel, reviews::Model as ReviewModel, users::Model as UserModel,
    },
    error::{AppError, AppResult},
    models::{Category, Order, OrderItem, OrderStatus, Product, Review, Role, User},
};

pub(crate) fn user_from_entity(model: UserModel) -> AppResult<User> {
    let address = model
        .address
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bad address payload: {e}")))?;
    Ok(User {
        id: model.id,
        name: model.name,
        email: model.email,
        role: Role::parse(&model.role)?,
        shop_name: model.shop_name,
        shop_description: model.shop_description,
        is_approved: model.is_approved,
        address,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn product_from_entity(model: ProductModel) -> AppResult<Product> {
    let images = serde_json::from_value(model.images)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bad images payload: {e}")))?;
    let tags = serde_json::from_value(model.tags)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bad tags payload: {e}")))?;
    Ok(Product {
        id: model.id,
        vendor_id: model.vendor_id,
        name: model.name,
        description: model.description,
        price: model.price,
        compare_price: model.compare_price,
        category: Category::parse(&model.category)?,
        images,
        stock: model.stock,
        sold: model.sold,
        rating: model.rating,
        num_reviews: model.num_reviews,
        is_active: model.is_active,
        tags,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let shipping_address = serde_json::from_value(model.shipping_address)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bad shipping address payload: {e}")))?;
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        shipping_address,
        payment_method: model.payment_method,
        items_price: model.items_price,
        tax_price: model.tax_price,
        shipping_price: model.shipping_price,
        total_price: model.total_price,
        is_paid: model.is_paid,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        payment_result: model.payment_result,
        status: OrderStatus::parse(&model.status)?,
        is_delivered: model.is_delivered,
        delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    })
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        vendor_id: model.vendor_id,
        name: model.name,
        image: model.image,
        price: model.price,
        quantity: model.quantity,
    }
}

pub(crate) fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
