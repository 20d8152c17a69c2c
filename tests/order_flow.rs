mod common;

use axum_marketplace_api::{
    dto::orders::{CreateOrderRequest, OrderItemInput, PayOrderRequest, PaymentIntentRequest},
    dto::vendor::UpdateOrderStatusRequest,
    entity::{orders::Entity as Orders, products::Entity as Products},
    error::AppError,
    middleware::auth::AuthUser,
    models::{OrderStatus, Role, ShippingAddress},
    services::{order_service, vendor_service},
    state::AppState,
};
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        address: "1 Main St".into(),
        city: "Springfield".into(),
        postal_code: "12345".into(),
        country: "US".into(),
    }
}

fn order_request(items: Vec<OrderItemInput>, total: f64) -> CreateOrderRequest {
    CreateOrderRequest {
        order_items: items,
        shipping_address: shipping_address(),
        payment_method: "card".into(),
        items_price: total,
        tax_price: 0.0,
        shipping_price: 0.0,
        total_price: total,
    }
}

async fn product_stock(state: &AppState, id: Uuid) -> (i32, i32) {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await
        .unwrap()
        .unwrap();
    (product.stock, product.sold)
}

// Order placement, stock reconciliation, payment and vendor fulfillment in
// one flow against a real database.
#[tokio::test]
async fn order_placement_payment_and_fulfillment_flow() -> anyhow::Result<()> {
    let Some(env) = common::setup_env().await? else {
        return Ok(());
    };
    let state = &env.state;

    let customer_id =
        common::create_user(state, Role::Customer, "customer@example.com", false).await?;
    let vendor_a = common::create_user(state, Role::Vendor, "vendor-a@example.com", true).await?;
    let vendor_b = common::create_user(state, Role::Vendor, "vendor-b@example.com", true).await?;

    let product_a =
        common::create_product(state, vendor_a, "Widget A", "Electronics", 10.0, 5, 10).await?;
    let product_b =
        common::create_product(state, vendor_b, "Widget B", "Toys", 5.0, 5, 20).await?;

    let customer = AuthUser {
        user_id: customer_id,
        role: Role::Customer,
    };

    // Empty order is rejected outright.
    let err = order_service::place_order(state, &customer, order_request(vec![], 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Unknown product fails the existence pass.
    let err = order_service::place_order(
        state,
        &customer,
        order_request(
            vec![OrderItemInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
            }],
            10.0,
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // One over-stock line fails the whole order before any mutation.
    let err = order_service::place_order(
        state,
        &customer,
        order_request(
            vec![
                OrderItemInput {
                    product_id: product_a.id,
                    quantity: 2,
                },
                OrderItemInput {
                    product_id: product_b.id,
                    quantity: 6,
                },
            ],
            50.0,
        ),
    )
    .await
    .unwrap_err();
    match err {
        AppError::InsufficientStock { name, available } => {
            assert_eq!(name, "Widget B");
            assert_eq!(available, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(product_stock(state, product_a.id).await, (5, 0));
    assert_eq!(product_stock(state, product_b.id).await, (5, 0));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);

    // Lines referencing the same product count against its stock together:
    // 3 + 3 must not pass a stock of 5 even though each line alone would.
    let err = order_service::place_order(
        state,
        &customer,
        order_request(
            vec![
                OrderItemInput {
                    product_id: product_a.id,
                    quantity: 3,
                },
                OrderItemInput {
                    product_id: product_a.id,
                    quantity: 3,
                },
            ],
            60.0,
        ),
    )
    .await
    .unwrap_err();
    match err {
        AppError::InsufficientStock { name, available } => {
            assert_eq!(name, "Widget A");
            assert_eq!(available, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(product_stock(state, product_a.id).await, (5, 0));
    assert_eq!(Orders::find().count(&state.orm).await?, 0);

    // Valid two-vendor order: stock and sold reconcile per product.
    let resp = order_service::place_order(
        state,
        &customer,
        order_request(
            vec![
                OrderItemInput {
                    product_id: product_a.id,
                    quantity: 2,
                },
                OrderItemInput {
                    product_id: product_b.id,
                    quantity: 1,
                },
            ],
            25.0,
        ),
    )
    .await?;
    let placed = resp.data.unwrap();
    assert_eq!(placed.items.len(), 2);
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert!(!placed.order.is_paid);
    assert_eq!(product_stock(state, product_a.id).await, (3, 2));
    assert_eq!(product_stock(state, product_b.id).await, (4, 1));

    // Line items snapshot the owning vendor at creation time.
    let item_a = placed
        .items
        .iter()
        .find(|i| i.product_id == product_a.id)
        .unwrap();
    assert_eq!(item_a.vendor_id, vendor_a);
    assert_eq!(item_a.price, 10.0);

    // Confirmation email went out to the customer.
    {
        let sent = env.mailer.sent.lock().unwrap();
        assert!(
            sent.iter()
                .any(|(to, subject)| to == "customer@example.com"
                    && subject == "Order Confirmation")
        );
    }

    // Payment intent converts dollars to minor units.
    let intent = order_service::create_payment_intent(
        state,
        &customer,
        PaymentIntentRequest { amount: 19.99 },
    )
    .await?;
    assert_eq!(intent.data.unwrap().client_secret, "pi_test_secret");
    assert_eq!(*env.gateway.amounts.lock().unwrap(), vec![1999]);

    // Confirm payment: paid flag, timestamp, processing status, verbatim blob.
    let result = serde_json::json!({
        "id": "pi_123",
        "status": "succeeded",
        "email_address": "customer@example.com",
    });
    let paid = order_service::pay_order(state, placed.order.id, PayOrderRequest(result.clone()))
        .await?
        .data
        .unwrap();
    assert!(paid.order.is_paid);
    assert!(paid.order.paid_at.is_some());
    assert_eq!(paid.order.status, OrderStatus::Processing);
    assert_eq!(paid.order.payment_result, Some(result));

    // A vendor with no line items may not touch the order's status.
    let outsider_id =
        common::create_user(state, Role::Vendor, "outsider@example.com", true).await?;
    let outsider = AuthUser {
        user_id: outsider_id,
        role: Role::Vendor,
    };
    let err = vendor_service::update_order_status(
        state,
        &outsider,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    // A partially participating vendor changes the whole order's status.
    let participant = AuthUser {
        user_id: vendor_a,
        role: Role::Vendor,
    };
    let shipped = vendor_service::update_order_status(
        state,
        &participant,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert!(!shipped.is_delivered);

    // Delivered stamps the delivered flag and timestamp.
    let delivered = vendor_service::update_order_status(
        state,
        &participant,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(delivered.is_delivered);
    assert!(delivered.delivered_at.is_some());

    // The transition set is open: delivered back to pending is accepted.
    let reopened = vendor_service::update_order_status(
        state,
        &participant,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Pending,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(reopened.status, OrderStatus::Pending);

    // Order visibility: owner and participating vendor see it, others do not.
    order_service::get_order(state, &customer, placed.order.id).await?;
    order_service::get_order(state, &participant, placed.order.id).await?;
    let err = order_service::get_order(state, &outsider, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let mine = order_service::my_orders(state, &customer).await?.data.unwrap();
    assert_eq!(mine.items.len(), 1);

    Ok(())
}
