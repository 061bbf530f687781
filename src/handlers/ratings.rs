use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::Utc;
use model::entities::{rating, store, user};
use sea_orm::sea_query::{Expr, Func, OnConflict, SimpleExpr};
use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, JoinType, Order, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use sea_orm::{prelude::DateTimeUtc, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{rbac, Action, CurrentUser};
use crate::error::ApiError;
use crate::handlers::stores::average_rating_expr;
use crate::schemas::{AppState, ErrorResponse, MessageResponse};

/// Request body for submitting a rating
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct SubmitRatingRequest {
    /// Rating value (1-5)
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
}

/// Response body for submitting a rating
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitRatingResponse {
    /// Confirmation message
    pub message: String,
    /// The stored rating value
    pub rating: i32,
}

/// The caller's rating for one store, null when they have not rated it
#[derive(Debug, Serialize, ToSchema)]
pub struct RatingEnvelope {
    pub rating: Option<i32>,
}

/// Request body for deleting a user's rating of a store
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct DeleteRatingRequest {
    /// The user whose rating should be removed
    #[serde(rename = "userId")]
    pub user_id: i32,
}

/// One rating of a store together with the rater's details
#[derive(Debug, Serialize, FromQueryResult, ToSchema)]
pub struct StoreRatingEntry {
    pub id: i32,
    pub rating: i32,
    pub created_at: DateTimeUtc,
    pub user_name: String,
    pub user_email: String,
    pub user_address: Option<String>,
}

/// Response body for the per-store rating listing
#[derive(Debug, Serialize, ToSchema)]
pub struct StoreRatingsResponse {
    pub ratings: Vec<StoreRatingEntry>,
}

/// Ratings per star value
#[derive(Debug, Serialize, ToSchema)]
pub struct RatingDistribution {
    pub five_star: i64,
    pub four_star: i64,
    pub three_star: i64,
    pub two_star: i64,
    pub one_star: i64,
}

/// Aggregate statistics over one store's ratings
#[derive(Debug, Serialize, ToSchema)]
pub struct RatingStats {
    pub total_ratings: i64,
    /// Average rating rendered with one decimal, "0.0" when unrated
    pub average_rating: String,
    pub min_rating: i32,
    pub max_rating: i32,
    pub rating_distribution: RatingDistribution,
}

/// Response body for the per-store statistics endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsEnvelope {
    pub stats: RatingStats,
}

#[derive(Debug, FromQueryResult)]
struct StatsRow {
    total_ratings: i64,
    average_rating: f64,
    min_rating: Option<i32>,
    max_rating: Option<i32>,
    five_star: i64,
    four_star: i64,
    three_star: i64,
    two_star: i64,
    one_star: i64,
}

/// COUNT over ratings matching one star value.
fn star_count(value: i32) -> SimpleExpr {
    Func::count(Expr::case(
        Expr::col((rating::Entity, rating::Column::Rating)).eq(value),
        Expr::val(1),
    ))
    .into()
}

/// Resolve the store and check the caller may see its rating details.
async fn load_store_for_owner(
    state: &AppState,
    caller: &CurrentUser,
    store_id: i32,
) -> Result<store::Model, ApiError> {
    caller.authorize(Action::ViewStoreRatings)?;
    let store_model = store::Entity::find_by_id(store_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))?;
    rbac::ensure_store_access(&caller.0, &store_model)?;
    Ok(store_model)
}

/// Submit or update the caller's rating for a store
#[utoipa::path(
    post,
    path = "/api/ratings/{store_id}",
    tag = "ratings",
    params(
        ("store_id" = i32, Path, description = "Store ID"),
    ),
    request_body = SubmitRatingRequest,
    responses(
        (status = 201, description = "Rating submitted successfully", body = SubmitRatingResponse),
        (status = 200, description = "Rating updated successfully", body = SubmitRatingResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Store not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn submit_rating(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(store_id): Path<i32>,
    Valid(Json(request)): Valid<Json<SubmitRatingRequest>>,
) -> Result<(StatusCode, Json<SubmitRatingResponse>), ApiError> {
    trace!("Entering submit_rating function for store_id: {}", store_id);
    caller.authorize(Action::SubmitRating)?;
    debug!(
        "User {} rating store {} with {}",
        caller.0.id, store_id, request.rating
    );

    store::Entity::find_by_id(store_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))?;

    // Single statement so two submissions for the same (user, store) pair
    // cannot race into a duplicate-key failure.
    let now = Utc::now();
    let submitted = rating::ActiveModel {
        user_id: Set(caller.0.id),
        store_id: Set(store_id),
        rating: Set(request.rating),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let stored = rating::Entity::insert(submitted)
        .on_conflict(
            OnConflict::columns([rating::Column::UserId, rating::Column::StoreId])
                .update_columns([rating::Column::Rating, rating::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_with_returning(&state.db)
        .await?;

    // A fresh insert keeps both timestamps identical; the conflict branch
    // only touches updated_at.
    let created = stored.created_at == stored.updated_at;
    let (status, message) = if created {
        (StatusCode::CREATED, "Rating submitted successfully")
    } else {
        (StatusCode::OK, "Rating updated successfully")
    };
    info!(
        "User {} {} store {} with rating {}",
        caller.0.id,
        if created { "rated" } else { "re-rated" },
        store_id,
        stored.rating
    );

    Ok((
        status,
        Json(SubmitRatingResponse {
            message: message.to_string(),
            rating: stored.rating,
        }),
    ))
}

/// Get the caller's rating for a store
#[utoipa::path(
    get,
    path = "/api/ratings/{store_id}",
    tag = "ratings",
    params(
        ("store_id" = i32, Path, description = "Store ID"),
    ),
    responses(
        (status = 200, description = "The caller's rating, null when absent", body = RatingEnvelope),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_my_rating(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(store_id): Path<i32>,
) -> Result<Json<RatingEnvelope>, ApiError> {
    trace!("Entering get_my_rating function for store_id: {}", store_id);
    caller.authorize(Action::ViewOwnRatings)?;

    let found = rating::Entity::find()
        .filter(rating::Column::UserId.eq(caller.0.id))
        .filter(rating::Column::StoreId.eq(store_id))
        .one(&state.db)
        .await?;

    Ok(Json(RatingEnvelope {
        rating: found.map(|r| r.rating),
    }))
}

/// List all ratings for a store
#[utoipa::path(
    get,
    path = "/api/ratings/store/{store_id}",
    tag = "ratings",
    params(
        ("store_id" = i32, Path, description = "Store ID"),
    ),
    responses(
        (status = 200, description = "Ratings retrieved successfully", body = StoreRatingsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller does not own this store", body = ErrorResponse),
        (status = 404, description = "Store not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_store_ratings(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(store_id): Path<i32>,
) -> Result<Json<StoreRatingsResponse>, ApiError> {
    trace!("Entering get_store_ratings function for store_id: {}", store_id);
    load_store_for_owner(&state, &caller, store_id).await?;

    let ratings = rating::Entity::find()
        .select_only()
        .column(rating::Column::Id)
        .column(rating::Column::Rating)
        .column(rating::Column::CreatedAt)
        .column_as(user::Column::Name, "user_name")
        .column_as(user::Column::Email, "user_email")
        .column_as(user::Column::Address, "user_address")
        .join(JoinType::InnerJoin, rating::Relation::User.def())
        .filter(rating::Column::StoreId.eq(store_id))
        .order_by(rating::Column::CreatedAt, Order::Desc)
        .into_model::<StoreRatingEntry>()
        .all(&state.db)
        .await?;

    debug!("Retrieved {} ratings for store {}", ratings.len(), store_id);
    Ok(Json(StoreRatingsResponse { ratings }))
}

/// Get aggregate rating statistics for a store
#[utoipa::path(
    get,
    path = "/api/ratings/store/{store_id}/stats",
    tag = "ratings",
    params(
        ("store_id" = i32, Path, description = "Store ID"),
    ),
    responses(
        (status = 200, description = "Statistics retrieved successfully", body = StatsEnvelope),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller does not own this store", body = ErrorResponse),
        (status = 404, description = "Store not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_store_rating_stats(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(store_id): Path<i32>,
) -> Result<Json<StatsEnvelope>, ApiError> {
    trace!(
        "Entering get_store_rating_stats function for store_id: {}",
        store_id
    );
    load_store_for_owner(&state, &caller, store_id).await?;

    let row = rating::Entity::find()
        .select_only()
        .column_as(rating::Column::Id.count(), "total_ratings")
        .column_as(average_rating_expr(), "average_rating")
        .column_as(
            Expr::expr(Func::min(Expr::col((rating::Entity, rating::Column::Rating)))),
            "min_rating",
        )
        .column_as(
            Expr::expr(Func::max(Expr::col((rating::Entity, rating::Column::Rating)))),
            "max_rating",
        )
        .column_as(star_count(5), "five_star")
        .column_as(star_count(4), "four_star")
        .column_as(star_count(3), "three_star")
        .column_as(star_count(2), "two_star")
        .column_as(star_count(1), "one_star")
        .filter(rating::Column::StoreId.eq(store_id))
        .into_model::<StatsRow>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::Internal("Aggregate query returned no row".to_string()))?;

    let stats = RatingStats {
        total_ratings: row.total_ratings,
        average_rating: format!("{:.1}", row.average_rating),
        min_rating: row.min_rating.unwrap_or(0),
        max_rating: row.max_rating.unwrap_or(0),
        rating_distribution: RatingDistribution {
            five_star: row.five_star,
            four_star: row.four_star,
            three_star: row.three_star,
            two_star: row.two_star,
            one_star: row.one_star,
        },
    };
    debug!(
        "Store {} stats: {} ratings, average {}",
        store_id, stats.total_ratings, stats.average_rating
    );

    Ok(Json(StatsEnvelope { stats }))
}

/// Delete a user's rating of a store
#[utoipa::path(
    delete,
    path = "/api/ratings/{store_id}",
    tag = "ratings",
    params(
        ("store_id" = i32, Path, description = "Store ID"),
    ),
    request_body = DeleteRatingRequest,
    responses(
        (status = 200, description = "Rating deleted successfully", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Rating not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_rating(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(store_id): Path<i32>,
    Json(request): Json<DeleteRatingRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    trace!("Entering delete_rating function for store_id: {}", store_id);
    caller.authorize(Action::ManageRatings)?;
    debug!(
        "Deleting rating of store {} by user {}",
        store_id, request.user_id
    );

    let result = rating::Entity::delete_many()
        .filter(rating::Column::StoreId.eq(store_id))
        .filter(rating::Column::UserId.eq(request.user_id))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        warn!(
            "No rating of store {} by user {} to delete",
            store_id, request.user_id
        );
        return Err(ApiError::NotFound("Rating not found".to_string()));
    }

    info!(
        "Rating of store {} by user {} deleted",
        store_id, request.user_id
    );
    Ok(Json(MessageResponse {
        message: "Rating deleted successfully".to_string(),
    }))
}
