use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::models::{Category, ImageRef, Order, OrderStatus, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub compare_price: Option<f64>,
    pub category: Category,
    pub stock: i32,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<ImageRef>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    /// Omit to keep the current compare-price; send `null` to clear it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub compare_price: Option<Option<f64>>,
    pub category: Option<Category>,
    pub stock: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<ImageRef>>,
    pub is_active: Option<bool>,
}

// Distinguishes an absent field (None) from an explicit null (Some(None)).
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VendorDashboard {
    pub total_products: i64,
    pub total_revenue: f64,
    pub total_orders: i64,
    pub recent_orders: Vec<Order>,
    pub low_stock_products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_price_absent_null_and_value_are_distinct() {
        let patch: UpdateProductRequest = serde_json::from_str(r#"{"price": 10.0}"#).unwrap();
        assert_eq!(patch.compare_price, None);

        let patch: UpdateProductRequest =
            serde_json::from_str(r#"{"compare_price": null}"#).unwrap();
        assert_eq!(patch.compare_price, Some(None));

        let patch: UpdateProductRequest =
            serde_json::from_str(r#"{"compare_price": 12.5}"#).unwrap();
        assert_eq!(patch.compare_price, Some(Some(12.5)));
    }
}
