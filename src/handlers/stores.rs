use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::Utc;
use model::entities::{
    rating, store,
    user::{self, Role},
};
use sea_orm::sea_query::{Alias, Expr, Func, IntoCondition, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    JoinType, Order, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::{Action, CurrentUser};
use crate::error::ApiError;
use crate::schemas::{AppState, ErrorResponse, MessageResponse};

/// Query parameters for listing stores
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct StoreQuery {
    /// Substring match against store name or address
    pub search: Option<String>,
    /// Sort field: name, email, address or average_rating (default: name)
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    /// Sort direction: asc or desc (default: asc)
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

/// A store with its rating aggregates and the caller's own rating
#[derive(Debug, Serialize, ToSchema)]
pub struct StoreWithRatings {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    /// Average rating rendered with one decimal, "0.0" when unrated
    pub average_rating: String,
    pub total_ratings: i64,
    /// Rating the caller gave this store, if any
    pub user_rating: Option<i32>,
}

/// Response body for the store listing
#[derive(Debug, Serialize, ToSchema)]
pub struct StoresResponse {
    pub stores: Vec<StoreWithRatings>,
}

/// Response body for a single store lookup
#[derive(Debug, Serialize, ToSchema)]
pub struct StoreEnvelope {
    pub store: StoreWithRatings,
}

/// Request body for creating a store
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateStoreRequest {
    /// Store name (1-100 characters)
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    /// Store contact email (must be unique)
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Store address (up to 400 characters)
    #[validate(length(max = 400, message = "Address must be at most 400 characters"))]
    pub address: Option<String>,
    /// Owning user; must reference an existing store_owner
    #[serde(rename = "ownerId")]
    pub owner_id: Option<i32>,
}

/// Request body for updating a store. All fields are replaced, an absent
/// owner clears the ownership link.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateStoreRequest {
    /// Store name (1-100 characters)
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    /// Store contact email (must be unique)
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Store address (up to 400 characters)
    #[validate(length(max = 400, message = "Address must be at most 400 characters"))]
    pub address: Option<String>,
    /// Owning user; must reference an existing store_owner
    #[serde(rename = "ownerId")]
    pub owner_id: Option<i32>,
}

/// Bare store row as stored, without aggregates
#[derive(Debug, Serialize, ToSchema)]
pub struct StoreRecord {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub owner_id: Option<i32>,
}

impl From<store::Model> for StoreRecord {
    fn from(model: store::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            address: model.address,
            owner_id: model.owner_id,
        }
    }
}

/// Response body for store create and update
#[derive(Debug, Serialize, ToSchema)]
pub struct StoreMutationResponse {
    /// Confirmation message
    pub message: String,
    /// The stored row
    pub store: StoreRecord,
}

#[derive(Debug, FromQueryResult)]
struct StoreAggRow {
    id: i32,
    name: String,
    email: String,
    address: Option<String>,
    average_rating: f64,
    total_ratings: i64,
    user_rating: Option<i32>,
}

impl From<StoreAggRow> for StoreWithRatings {
    fn from(row: StoreAggRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            address: row.address,
            average_rating: format!("{:.1}", row.average_rating),
            total_ratings: row.total_ratings,
            user_rating: row.user_rating,
        }
    }
}

fn user_ratings_alias() -> Alias {
    Alias::new("user_ratings")
}

/// AVG over the joined ratings, cast so both backends hand back a float,
/// with NULL folded to 0 so unrated stores sort below one-star ones.
pub(crate) fn average_rating_expr() -> SimpleExpr {
    Func::coalesce([
        Expr::expr(Func::avg(Expr::col((rating::Entity, rating::Column::Rating))))
            .cast_as(Alias::new("double precision")),
        Expr::val(0.0_f64).into(),
    ])
    .into()
}

/// Base query joining each store to all its ratings plus, under a second
/// alias, the single rating the calling user gave it.
fn store_with_ratings_query(user_id: i32) -> Select<store::Entity> {
    let user_ratings = user_ratings_alias();
    store::Entity::find()
        .select_only()
        .column(store::Column::Id)
        .column(store::Column::Name)
        .column(store::Column::Email)
        .column(store::Column::Address)
        .column_as(average_rating_expr(), "average_rating")
        .column_as(rating::Column::Id.count(), "total_ratings")
        .column_as(
            Expr::col((user_ratings.clone(), rating::Column::Rating)),
            "user_rating",
        )
        .join(JoinType::LeftJoin, store::Relation::Rating.def())
        .join_as(
            JoinType::LeftJoin,
            store::Entity::belongs_to(rating::Entity)
                .from(store::Column::Id)
                .to(rating::Column::StoreId)
                .on_condition(move |_left, right| {
                    Expr::col((right, rating::Column::UserId))
                        .eq(user_id)
                        .into_condition()
                })
                .into(),
            user_ratings.clone(),
        )
        .group_by(store::Column::Id)
        .group_by(store::Column::Name)
        .group_by(store::Column::Email)
        .group_by(store::Column::Address)
        .group_by(Expr::col((user_ratings, rating::Column::Rating)))
}

/// Reject a store email already used by another store.
async fn ensure_store_email_free(
    db: &DatabaseConnection,
    email: &str,
    exclude_id: Option<i32>,
) -> Result<(), ApiError> {
    let mut lookup = store::Entity::find().filter(store::Column::Email.eq(email));
    if let Some(id) = exclude_id {
        lookup = lookup.filter(store::Column::Id.ne(id));
    }
    if lookup.one(db).await?.is_some() {
        warn!("Store email already in use: {}", email);
        return Err(ApiError::Conflict(
            "Store with this email already exists".to_string(),
        ));
    }
    Ok(())
}

/// An explicit owner must exist and actually hold the store_owner role.
async fn ensure_valid_owner(db: &DatabaseConnection, owner_id: i32) -> Result<(), ApiError> {
    let owner = user::Entity::find_by_id(owner_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::InvalidArgument("Owner not found".to_string()))?;
    if owner.role != Role::StoreOwner {
        return Err(ApiError::InvalidArgument(
            "Owner must be a store owner".to_string(),
        ));
    }
    Ok(())
}

/// List stores with aggregated ratings
#[utoipa::path(
    get,
    path = "/api/stores",
    tag = "stores",
    params(StoreQuery),
    responses(
        (status = 200, description = "Stores retrieved successfully", body = StoresResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_stores(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<StoreQuery>,
) -> Result<Json<StoresResponse>, ApiError> {
    trace!("Entering get_stores function");
    caller.authorize(Action::BrowseStores)?;
    debug!(
        "Listing stores for user {} (search: {:?}, sort: {:?} {:?})",
        caller.0.id, query.search, query.sort_by, query.sort_order
    );

    let mut select = store_with_ratings_query(caller.0.id);

    if let Some(term) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", term.to_lowercase());
        select = select.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col((store::Entity, store::Column::Name))))
                        .like(pattern.clone()),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col((
                        store::Entity,
                        store::Column::Address,
                    ))))
                    .like(pattern),
                ),
        );
    }

    let order = sort_order(query.sort_order.as_deref());
    // Unknown sort fields silently fall back to name.
    select = match query.sort_by.as_deref() {
        Some("email") => select.order_by(store::Column::Email, order),
        Some("address") => select.order_by(store::Column::Address, order),
        Some("average_rating") => select.order_by(Expr::col(Alias::new("average_rating")), order),
        _ => select.order_by(store::Column::Name, order),
    };

    let rows = select.into_model::<StoreAggRow>().all(&state.db).await?;
    info!("Retrieved {} stores for user {}", rows.len(), caller.0.id);

    Ok(Json(StoresResponse {
        stores: rows.into_iter().map(StoreWithRatings::from).collect(),
    }))
}

/// Get a single store with aggregated ratings
#[utoipa::path(
    get,
    path = "/api/stores/{id}",
    tag = "stores",
    params(
        ("id" = i32, Path, description = "Store ID"),
    ),
    responses(
        (status = 200, description = "Store retrieved successfully", body = StoreEnvelope),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Store not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_store(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<StoreEnvelope>, ApiError> {
    trace!("Entering get_store function for store_id: {}", id);
    caller.authorize(Action::BrowseStores)?;

    let row = store_with_ratings_query(caller.0.id)
        .filter(store::Column::Id.eq(id))
        .into_model::<StoreAggRow>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))?;

    debug!("Retrieved store {} for user {}", id, caller.0.id);
    Ok(Json(StoreEnvelope {
        store: StoreWithRatings::from(row),
    }))
}

/// Create a new store
#[utoipa::path(
    post,
    path = "/api/stores",
    tag = "stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created successfully", body = StoreMutationResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Store email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn create_store(
    State(state): State<AppState>,
    caller: CurrentUser,
    Valid(Json(request)): Valid<Json<CreateStoreRequest>>,
) -> Result<(StatusCode, Json<StoreMutationResponse>), ApiError> {
    trace!("Entering create_store function");
    caller.authorize(Action::ManageStores)?;
    debug!("Creating store with name: {}", request.name);

    ensure_store_email_free(&state.db, &request.email, None).await?;
    if let Some(owner_id) = request.owner_id {
        ensure_valid_owner(&state.db, owner_id).await?;
    }

    let now = Utc::now();
    let new_store = store::ActiveModel {
        name: Set(request.name),
        email: Set(request.email),
        address: Set(request.address),
        owner_id: Set(request.owner_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let store_model = new_store.insert(&state.db).await?;
    info!(
        "Store created successfully with ID: {}, name: {}",
        store_model.id, store_model.name
    );

    let response = StoreMutationResponse {
        message: "Store created successfully".to_string(),
        store: StoreRecord::from(store_model),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Update a store
#[utoipa::path(
    put,
    path = "/api/stores/{id}",
    tag = "stores",
    params(
        ("id" = i32, Path, description = "Store ID"),
    ),
    request_body = UpdateStoreRequest,
    responses(
        (status = 200, description = "Store updated successfully", body = StoreMutationResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Store not found", body = ErrorResponse),
        (status = 409, description = "Store email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_store(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateStoreRequest>>,
) -> Result<Json<StoreMutationResponse>, ApiError> {
    trace!("Entering update_store function for store_id: {}", id);
    caller.authorize(Action::ManageStores)?;
    debug!("Updating store with ID: {}", id);

    let existing = store::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))?;

    ensure_store_email_free(&state.db, &request.email, Some(id)).await?;
    if let Some(owner_id) = request.owner_id {
        ensure_valid_owner(&state.db, owner_id).await?;
    }

    let mut store_active: store::ActiveModel = existing.into();
    store_active.name = Set(request.name);
    store_active.email = Set(request.email);
    store_active.address = Set(request.address);
    store_active.owner_id = Set(request.owner_id);
    store_active.updated_at = Set(Utc::now());

    let updated = store_active.update(&state.db).await?;
    info!("Store with ID {} updated successfully", id);

    Ok(Json(StoreMutationResponse {
        message: "Store updated successfully".to_string(),
        store: StoreRecord::from(updated),
    }))
}

/// Delete a store
#[utoipa::path(
    delete,
    path = "/api/stores/{id}",
    tag = "stores",
    params(
        ("id" = i32, Path, description = "Store ID"),
    ),
    responses(
        (status = 200, description = "Store deleted successfully", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Store not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_store(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    trace!("Entering delete_store function for store_id: {}", id);
    caller.authorize(Action::ManageStores)?;
    debug!("Attempting to delete store with ID: {}", id);

    let result = store::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        warn!("Store with ID {} not found for deletion", id);
        return Err(ApiError::NotFound("Store not found".to_string()));
    }

    info!("Store with ID {} deleted successfully", id);
    Ok(Json(MessageResponse {
        message: "Store deleted successfully".to_string(),
    }))
}

/// Parse a sort direction, defaulting to ascending.
pub(crate) fn sort_order(raw: Option<&str>) -> Order {
    match raw {
        Some(o) if o.eq_ignore_ascii_case("desc") => Order::Desc,
        _ => Order::Asc,
    }
}
