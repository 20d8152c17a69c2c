use serde::Serialize;
use utoipa::ToSchema;

use crate::models::User;

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthlyRevenue {
    pub year: i32,
    pub month: i32,
    pub revenue: f64,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminDashboard {
    pub total_customers: i64,
    pub total_vendors: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub total_revenue: f64,
    pub recent_users: Vec<User>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<User>,
}
