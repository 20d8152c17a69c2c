use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, ShippingAddress};

/// One requested line. The vendor reference is never taken from the client;
/// it is resolved from the product at order-creation time.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Price breakdown is accepted as computed by the caller and stored verbatim.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub order_items: Vec<OrderItemInput>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: f64,
    pub tax_price: f64,
    pub shipping_price: f64,
    pub total_price: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentIntentRequest {
    /// Amount in dollars; converted to the gateway's minor units server-side.
    pub amount: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// Gateway payment result, stored on the order as an opaque blob.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PayOrderRequest(pub serde_json::Value);

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
