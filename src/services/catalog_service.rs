use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateReviewRequest, ProductDetail, ProductList, ReviewCreated},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    services::convert::{product_from_entity, review_from_entity},
    state::AppState,
};

/// Public catalog page size, matching the storefront grid.
pub const CATALOG_PAGE_SIZE: i64 = 12;

const TOP_PRODUCTS_LIMIT: u64 = 8;

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, offset) = query.pagination().normalize(CATALOG_PAGE_SIZE);

    // Filters intersect; the active flag is implicit and not client-controlled.
    let mut condition = Condition::all().add(ProdCol::IsActive.eq(true));

    if let Some(keyword) = query.keyword.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{keyword}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ProdCol::Name).ilike(pattern.clone()))
                .add(Expr::col(ProdCol::Description).ilike(pattern.clone()))
                .add(Expr::cust("tags::text").ilike(pattern)),
        );
    }

    if let Some(category) = query.category {
        condition = condition.add(ProdCol::Category.eq(category.as_str()));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(ProdCol::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(ProdCol::Price.lte(max_price));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(CATALOG_PAGE_SIZE as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::paginated(page, CATALOG_PAGE_SIZE, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => product_from_entity(p)?,
        None => return Err(AppError::NotFound),
    };

    let reviews = Reviews::find()
        .filter(ReviewCol::ProductId.eq(id))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Product",
        ProductDetail { product, reviews },
        None,
    ))
}

pub async fn top_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let items = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .order_by_desc(ProdCol::Rating)
        .limit(TOP_PRODUCTS_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success("Top products", ProductList { items }, None))
}

pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<ReviewCreated>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::Validation("Rating must be between 1 and 5".into()));
    }

    let product = Products::find_by_id(product_id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    // Enforced by query, not a storage constraint; concurrent duplicate
    // submissions can both pass this check.
    let existing = Reviews::find()
        .filter(
            Condition::all()
                .add(ReviewCol::ProductId.eq(product_id))
                .add(ReviewCol::UserId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Product already reviewed".into()));
    }

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(user.user_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Full recompute over all reviews, not an incremental update.
    let ratings: Vec<i32> = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();

    let mut active: ProductActive = product.into();
    active.num_reviews = Set(ratings.len() as i32);
    active.rating = Set(mean_rating(&ratings));
    active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Review added",
        ReviewCreated {
            review: review_from_entity(review),
        },
        Some(Meta::empty()),
    ))
}

fn mean_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_two_and_four_is_three() {
        assert_eq!(mean_rating(&[2, 4]), 3.0);
    }

    #[test]
    fn mean_of_single_rating_is_itself() {
        assert_eq!(mean_rating(&[5]), 5.0);
    }

    #[test]
    fn mean_of_no_ratings_is_zero() {
        assert_eq!(mean_rating(&[]), 0.0);
    }
}
