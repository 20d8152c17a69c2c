mod common;

use axum_marketplace_api::{
    dto::{products::CreateReviewRequest, vendor::UpdateProductRequest},
    entity::products::Entity as Products,
    error::AppError,
    middleware::auth::AuthUser,
    models::{Category, Role},
    routes::params::{Page, ProductQuery},
    services::{admin_service, catalog_service, vendor_service},
};
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};

// Review aggregation, catalog filtering and admin moderation in one flow.
#[tokio::test]
async fn review_aggregation_catalog_filters_and_admin_flow() -> anyhow::Result<()> {
    let Some(env) = common::setup_env().await? else {
        return Ok(());
    };
    let state = &env.state;

    let vendor_id = common::create_user(state, Role::Vendor, "vendor@example.com", true).await?;
    let admin_id = common::create_user(state, Role::Admin, "admin@example.com", false).await?;
    let alice_id = common::create_user(state, Role::Customer, "alice@example.com", false).await?;
    let bob_id = common::create_user(state, Role::Customer, "bob@example.com", false).await?;

    let alice = AuthUser {
        user_id: alice_id,
        role: Role::Customer,
    };
    let bob = AuthUser {
        user_id: bob_id,
        role: Role::Customer,
    };
    let admin = AuthUser {
        user_id: admin_id,
        role: Role::Admin,
    };

    let product =
        common::create_product(state, vendor_id, "Headphones", "Electronics", 99.0, 10, 0).await?;

    // First review seeds the aggregate.
    catalog_service::add_review(
        state,
        &alice,
        product.id,
        CreateReviewRequest {
            rating: 2,
            comment: "Meh".into(),
        },
    )
    .await?;

    // Same user reviewing again conflicts and leaves the count unchanged.
    let err = catalog_service::add_review(
        state,
        &alice,
        product.id,
        CreateReviewRequest {
            rating: 5,
            comment: "Changed my mind".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let detail = catalog_service::get_product(state, product.id)
        .await?
        .data
        .unwrap();
    assert_eq!(detail.product.num_reviews, 1);
    assert_eq!(detail.product.rating, 2.0);

    // A second reviewer moves the mean to 3.0 over 2 reviews.
    catalog_service::add_review(
        state,
        &bob,
        product.id,
        CreateReviewRequest {
            rating: 4,
            comment: "Decent".into(),
        },
    )
    .await?;
    let detail = catalog_service::get_product(state, product.id)
        .await?
        .data
        .unwrap();
    assert_eq!(detail.product.num_reviews, 2);
    assert_eq!(detail.product.rating, 3.0);
    assert_eq!(detail.reviews.len(), 2);

    // Out-of-range ratings are rejected.
    let err = catalog_service::add_review(
        state,
        &admin,
        product.id,
        CreateReviewRequest {
            rating: 6,
            comment: "Too good".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Catalog filters: category + price range + implicit active flag.
    let _cheap =
        common::create_product(state, vendor_id, "Cheap Cable", "Electronics", 10.0, 5, 30).await?;
    let _pricey =
        common::create_product(state, vendor_id, "Amp", "Electronics", 500.0, 5, 40).await?;
    let book = common::create_product(state, vendor_id, "Novel", "Books", 99.0, 5, 50).await?;
    let hidden =
        common::create_product(state, vendor_id, "Old Radio", "Electronics", 99.0, 5, 60).await?;
    let mut hidden_active = Products::find_by_id(hidden.id)
        .one(&state.orm)
        .await?
        .unwrap()
        .into_active_model();
    hidden_active.is_active = Set(false);
    hidden_active.update(&state.orm).await?;

    let listed = catalog_service::list_products(
        state,
        ProductQuery {
            page: Some(1),
            keyword: None,
            category: Some(Category::Electronics),
            min_price: Some(50.0),
            max_price: Some(150.0),
        },
    )
    .await?;
    let meta = listed.meta.clone().unwrap();
    let items = listed.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, product.id);
    assert_eq!(meta.total, Some(1));
    assert_eq!(meta.total_pages, Some(1));

    // Keyword search spans name and description, newest first.
    let by_keyword = catalog_service::list_products(
        state,
        ProductQuery {
            page: None,
            keyword: Some("cable".into()),
            category: None,
            min_price: None,
            max_price: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(by_keyword.items.len(), 1);
    assert_eq!(by_keyword.items[0].name, "Cheap Cable");

    // Unfiltered listing excludes the inactive product and sorts newest first.
    let all = catalog_service::list_products(
        state,
        ProductQuery {
            page: None,
            keyword: None,
            category: None,
            min_price: None,
            max_price: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(all.items.len(), 4);
    assert!(all.items.iter().all(|p| p.id != hidden.id));
    assert_eq!(all.items[0].id, product.id);

    // Compare-price updates: an absent field keeps it, an explicit null
    // clears it. Patches go through JSON to exercise the wire semantics.
    let vendor = AuthUser {
        user_id: vendor_id,
        role: Role::Vendor,
    };
    let patch: UpdateProductRequest =
        serde_json::from_value(serde_json::json!({"compare_price": 129.0}))?;
    let updated = vendor_service::update_product(state, &vendor, product.id, patch)
        .await?
        .data
        .unwrap();
    assert_eq!(updated.compare_price, Some(129.0));

    let patch: UpdateProductRequest = serde_json::from_value(serde_json::json!({"price": 89.0}))?;
    let updated = vendor_service::update_product(state, &vendor, product.id, patch)
        .await?
        .data
        .unwrap();
    assert_eq!(updated.price, 89.0);
    assert_eq!(updated.compare_price, Some(129.0));

    let patch: UpdateProductRequest =
        serde_json::from_value(serde_json::json!({"compare_price": null}))?;
    let updated = vendor_service::update_product(state, &vendor, product.id, patch)
        .await?
        .data
        .unwrap();
    assert_eq!(updated.compare_price, None);

    // Admin moderation: admins cannot be deleted, customers can.
    let err = admin_service::delete_user(state, &admin, admin_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    admin_service::delete_user(state, &admin, bob_id).await?;
    let users = admin_service::list_users(state, &admin).await?.data.unwrap();
    assert!(users.items.iter().all(|u| u.id != bob_id));

    // An unapproved vendor is fenced off the vendor surface yet can still be
    // deleted by an admin.
    let pending_id =
        common::create_user(state, Role::Vendor, "pendingshop@example.com", false).await?;
    let pending = AuthUser {
        user_id: pending_id,
        role: Role::Vendor,
    };
    let err = vendor_service::list_products(state, &pending, Page { page: None })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    admin_service::delete_user(state, &admin, pending_id).await?;
    let users = admin_service::list_users(state, &admin).await?.data.unwrap();
    assert!(users.items.iter().all(|u| u.id != pending_id));

    // Vendor approval flips the flag and notifies the vendor.
    let pending_vendor =
        common::create_user(state, Role::Vendor, "newshop@example.com", false).await?;
    admin_service::approve_vendor(state, &admin, pending_vendor).await?;
    let users = admin_service::list_users(state, &admin).await?.data.unwrap();
    let approved = users.items.iter().find(|u| u.id == pending_vendor).unwrap();
    assert!(approved.is_approved);
    {
        let sent = env.mailer.sent.lock().unwrap();
        assert!(
            sent.iter()
                .any(|(to, subject)| to == "newshop@example.com"
                    && subject == "Vendor Account Approved")
        );
    }

    // Approving a customer account is a 404, not a silent no-op.
    let err = admin_service::approve_vendor(state, &admin, alice_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    // Admin product deletion cascades stored images.
    let mut with_images = Products::find_by_id(book.id)
        .one(&state.orm)
        .await?
        .unwrap()
        .into_active_model();
    with_images.images = Set(serde_json::json!([
        {"url": "https://img.example/1.jpg", "public_id": "products/one"}
    ]));
    with_images.update(&state.orm).await?;

    admin_service::delete_product(state, &admin, book.id).await?;
    assert!(Products::find_by_id(book.id).one(&state.orm).await?.is_none());
    assert_eq!(
        *env.images.deleted.lock().unwrap(),
        vec!["products/one".to_string()]
    );

    Ok(())
}
