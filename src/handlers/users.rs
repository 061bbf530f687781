use axum::{extract::State, response::Json};
use axum_valid::Valid;
use chrono::Utc;
use model::entities::{rating, store, user};
use sea_orm::{
    prelude::DateTimeUtc, ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult, JoinType,
    Order, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_complexity, verify_password};
use crate::auth::{Action, CurrentUser};
use crate::error::ApiError;
use crate::handlers::auth::UserResponse;
use crate::handlers::stores::average_rating_expr;
use crate::schemas::{AppState, ErrorResponse, MessageResponse};

/// One of the caller's own stores with rating aggregates
#[derive(Debug, Serialize, ToSchema)]
pub struct OwnedStore {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    /// Average rating rendered with one decimal, "0.0" when unrated
    pub average_rating: String,
    pub total_ratings: i64,
}

/// Response body for the owned-store listing
#[derive(Debug, Serialize, ToSchema)]
pub struct MyStoresResponse {
    pub stores: Vec<OwnedStore>,
}

/// One of the caller's ratings together with the rated store
#[derive(Debug, Serialize, FromQueryResult, ToSchema)]
pub struct MyRatingEntry {
    pub id: i32,
    pub rating: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub store_id: i32,
    pub store_name: String,
    pub store_address: Option<String>,
}

/// Response body for the caller's rating history
#[derive(Debug, Serialize, ToSchema)]
pub struct MyRatingsResponse {
    pub ratings: Vec<MyRatingEntry>,
}

/// Request body for updating the caller's profile
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    /// Full name (20-60 characters)
    #[validate(length(min = 20, max = 60, message = "Name must be between 20 and 60 characters"))]
    pub name: Option<String>,
    /// Postal address (up to 400 characters)
    #[validate(length(max = 400, message = "Address must be at most 400 characters"))]
    pub address: Option<String>,
}

/// Response body for a profile update
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    /// Confirmation message
    pub message: String,
    /// The updated user
    pub user: UserResponse,
}

/// Request body for changing the caller's password
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    /// The caller's current password
    #[serde(rename = "currentPassword")]
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    /// New password (8-16 characters with an uppercase letter and a special character)
    #[serde(rename = "newPassword")]
    #[validate(
        length(min = 8, max = 16, message = "Password must be between 8 and 16 characters"),
        custom(function = "validate_password_complexity")
    )]
    pub new_password: String,
}

#[derive(Debug, FromQueryResult)]
struct OwnedStoreRow {
    id: i32,
    name: String,
    email: String,
    address: Option<String>,
    average_rating: f64,
    total_ratings: i64,
}

impl From<OwnedStoreRow> for OwnedStore {
    fn from(row: OwnedStoreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            address: row.address,
            average_rating: format!("{:.1}", row.average_rating),
            total_ratings: row.total_ratings,
        }
    }
}

/// List the caller's own stores
#[utoipa::path(
    get,
    path = "/api/users/my-stores",
    tag = "users",
    responses(
        (status = 200, description = "Stores retrieved successfully", body = MyStoresResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Caller is not a store owner", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_my_stores(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<MyStoresResponse>, ApiError> {
    trace!("Entering get_my_stores function");
    caller.authorize(Action::ViewOwnedStores)?;

    let rows = store::Entity::find()
        .select_only()
        .column(store::Column::Id)
        .column(store::Column::Name)
        .column(store::Column::Email)
        .column(store::Column::Address)
        .column_as(average_rating_expr(), "average_rating")
        .column_as(rating::Column::Id.count(), "total_ratings")
        .join(JoinType::LeftJoin, store::Relation::Rating.def())
        .filter(store::Column::OwnerId.eq(caller.0.id))
        .group_by(store::Column::Id)
        .group_by(store::Column::Name)
        .group_by(store::Column::Email)
        .group_by(store::Column::Address)
        .order_by(store::Column::Name, Order::Asc)
        .into_model::<OwnedStoreRow>()
        .all(&state.db)
        .await?;

    debug!("User {} owns {} stores", caller.0.id, rows.len());
    Ok(Json(MyStoresResponse {
        stores: rows.into_iter().map(OwnedStore::from).collect(),
    }))
}

/// List the caller's rating history
#[utoipa::path(
    get,
    path = "/api/users/my-ratings",
    tag = "users",
    responses(
        (status = 200, description = "Ratings retrieved successfully", body = MyRatingsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_my_ratings(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<MyRatingsResponse>, ApiError> {
    trace!("Entering get_my_ratings function");
    caller.authorize(Action::ViewOwnRatings)?;

    let ratings = rating::Entity::find()
        .select_only()
        .column(rating::Column::Id)
        .column(rating::Column::Rating)
        .column(rating::Column::CreatedAt)
        .column(rating::Column::UpdatedAt)
        .column_as(store::Column::Id, "store_id")
        .column_as(store::Column::Name, "store_name")
        .column_as(store::Column::Address, "store_address")
        .join(JoinType::InnerJoin, rating::Relation::Store.def())
        .filter(rating::Column::UserId.eq(caller.0.id))
        .order_by(rating::Column::UpdatedAt, Order::Desc)
        .into_model::<MyRatingEntry>()
        .all(&state.db)
        .await?;

    debug!("User {} has {} ratings", caller.0.id, ratings.len());
    Ok(Json(MyRatingsResponse { ratings }))
}

/// Update the caller's name and address
#[utoipa::path(
    put,
    path = "/api/users/profile",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated successfully", body = ProfileResponse),
        (status = 400, description = "Invalid request or nothing to update", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_profile(
    State(state): State<AppState>,
    caller: CurrentUser,
    Valid(Json(request)): Valid<Json<UpdateProfileRequest>>,
) -> Result<Json<ProfileResponse>, ApiError> {
    trace!("Entering update_profile function");
    let user_id = caller.0.id;
    debug!("Updating profile for user {}", user_id);

    if request.name.is_none() && request.address.is_none() {
        return Err(ApiError::InvalidArgument("No fields to update".to_string()));
    }

    let mut user_active: user::ActiveModel = caller.0.into();
    if let Some(name) = request.name {
        user_active.name = Set(name);
    }
    if let Some(address) = request.address {
        user_active.address = Set(Some(address));
    }
    user_active.updated_at = Set(Utc::now());

    let updated = user_active.update(&state.db).await?;
    info!("Profile updated for user {}", user_id);

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: UserResponse::from(updated),
    }))
}

/// Change the caller's password
#[utoipa::path(
    put,
    path = "/api/users/password",
    tag = "users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated successfully", body = MessageResponse),
        (status = 400, description = "Current password is incorrect or new password invalid", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn change_password(
    State(state): State<AppState>,
    caller: CurrentUser,
    Valid(Json(request)): Valid<Json<ChangePasswordRequest>>,
) -> Result<Json<MessageResponse>, ApiError> {
    trace!("Entering change_password function");
    let user_id = caller.0.id;
    debug!("Password change requested by user {}", user_id);

    if !verify_password(&request.current_password, &caller.0.password_hash) {
        warn!("Wrong current password for user {}", user_id);
        return Err(ApiError::InvalidArgument(
            "Current password is incorrect".to_string(),
        ));
    }

    let mut user_active: user::ActiveModel = caller.0.into();
    user_active.password_hash = Set(hash_password(&request.new_password)?);
    user_active.updated_at = Set(Utc::now());
    user_active.update(&state.db).await?;

    info!("Password updated for user {}", user_id);
    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}
