use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{AdminDashboard, MonthlyRevenue, UserList},
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        orders::{
            CreateOrderRequest, OrderItemInput, OrderList, OrderWithItems, PaymentIntentRequest,
            PaymentIntentResponse,
        },
        products::{CreateReviewRequest, ProductDetail, ProductList, ReviewCreated},
        vendor::{
            CreateProductRequest, UpdateOrderStatusRequest, UpdateProductRequest, VendorDashboard,
        },
    },
    models::{
        Category, ImageRef, Order, OrderItem, OrderStatus, Product, Review, Role,
        ShippingAddress, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, health, orders, params, products, vendor},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::top_products,
        products::get_product,
        products::create_review,
        orders::create_order,
        orders::my_orders,
        orders::create_payment_intent,
        orders::get_order,
        orders::pay_order,
        vendor::dashboard,
        vendor::list_products,
        vendor::create_product,
        vendor::update_product,
        vendor::delete_product,
        vendor::list_orders,
        vendor::update_order_status,
        admin::dashboard,
        admin::list_users,
        admin::delete_user,
        admin::approve_vendor,
        admin::list_all_products,
        admin::delete_product,
        admin::list_all_orders,
    ),
    components(
        schemas(
            User,
            Product,
            Order,
            OrderItem,
            Review,
            Role,
            Category,
            OrderStatus,
            ShippingAddress,
            ImageRef,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            ProductList,
            ProductDetail,
            CreateReviewRequest,
            ReviewCreated,
            CreateOrderRequest,
            OrderItemInput,
            OrderList,
            OrderWithItems,
            PaymentIntentRequest,
            PaymentIntentResponse,
            CreateProductRequest,
            UpdateProductRequest,
            UpdateOrderStatusRequest,
            VendorDashboard,
            AdminDashboard,
            MonthlyRevenue,
            UserList,
            params::Page,
            params::ProductQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<AdminDashboard>,
            ApiResponse<VendorDashboard>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Public catalog and reviews"),
        (name = "Orders", description = "Order placement and payment"),
        (name = "Vendor", description = "Vendor catalog and fulfillment"),
        (name = "Admin", description = "Platform administration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
