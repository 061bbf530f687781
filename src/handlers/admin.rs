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
use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{
    prelude::DateTimeUtc, ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Select, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_complexity};
use crate::auth::{Action, CurrentUser};
use crate::error::ApiError;
use crate::handlers::auth::UserResponse;
use crate::handlers::stores::{average_rating_expr, sort_order, StoreQuery};
use crate::schemas::{AppState, ErrorResponse, MessageResponse};

/// Platform-wide row counts for the admin dashboard
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_stores: u64,
    pub total_ratings: u64,
}

/// Response body for the dashboard endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardEnvelope {
    pub stats: DashboardStats,
}

/// Query parameters for the admin user listing
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct UserQuery {
    /// Substring match against name, email or address
    pub search: Option<String>,
    /// Exact role filter
    pub role: Option<String>,
    /// Sort field: name, email, address, role or created_at (default: name)
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    /// Sort direction: asc or desc (default: asc)
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

/// User row as the admin listing shows it
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub role: String,
    pub created_at: DateTimeUtc,
}

impl From<user::Model> for AdminUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            address: model.address,
            role: model.role.to_value(),
            created_at: model.created_at,
        }
    }
}

/// Response body for the admin user listing
#[derive(Debug, Serialize, ToSchema)]
pub struct UsersResponse {
    pub users: Vec<AdminUser>,
}

/// Detailed user view; store owners additionally carry the average rating
/// across all their stores
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserDetail {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub role: String,
    pub created_at: DateTimeUtc,
    /// One-decimal average over all stores owned, null for non-owners
    pub average_rating: Option<String>,
}

/// Response body for the admin user detail endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserEnvelope {
    pub user: AdminUserDetail,
}

/// Request body for creating a user as admin
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    /// Full name (20-60 characters)
    #[validate(length(min = 20, max = 60, message = "Name must be between 20 and 60 characters"))]
    pub name: String,
    /// Email address (must be unique)
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Password (8-16 characters with an uppercase letter and a special character)
    #[validate(
        length(min = 8, max = 16, message = "Password must be between 8 and 16 characters"),
        custom(function = "validate_password_complexity")
    )]
    pub password: String,
    /// Postal address (up to 400 characters)
    #[validate(length(max = 400, message = "Address must be at most 400 characters"))]
    pub address: Option<String>,
    /// Role: user, store_owner or admin (default: user)
    pub role: Option<String>,
}

/// Request body for updating a user as admin. All fields are replaced.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateUserRequest {
    /// Full name (20-60 characters)
    #[validate(length(min = 20, max = 60, message = "Name must be between 20 and 60 characters"))]
    pub name: String,
    /// Email address (must be unique)
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Postal address (up to 400 characters)
    #[validate(length(max = 400, message = "Address must be at most 400 characters"))]
    pub address: Option<String>,
    /// Role: user, store_owner or admin
    pub role: String,
}

/// Response body for admin user create and update
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMutationResponse {
    /// Confirmation message
    pub message: String,
    /// The stored user
    pub user: UserResponse,
}

/// Store row as the admin listing shows it, including the owner's name
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStore {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub owner_id: Option<i32>,
    pub owner_name: Option<String>,
    /// Average rating rendered with one decimal, "0.0" when unrated
    pub average_rating: String,
    pub total_ratings: i64,
}

/// Response body for the admin store listing
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStoresResponse {
    pub stores: Vec<AdminStore>,
}

/// Response body for the admin store detail endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStoreEnvelope {
    pub store: AdminStore,
}

#[derive(Debug, FromQueryResult)]
struct AdminUserDetailRow {
    id: i32,
    name: String,
    email: String,
    address: Option<String>,
    role: Role,
    created_at: DateTimeUtc,
    average_rating: f64,
}

#[derive(Debug, FromQueryResult)]
struct AdminStoreRow {
    id: i32,
    name: String,
    email: String,
    address: Option<String>,
    owner_id: Option<i32>,
    owner_name: Option<String>,
    average_rating: f64,
    total_ratings: i64,
}

impl From<AdminStoreRow> for AdminStore {
    fn from(row: AdminStoreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            address: row.address,
            owner_id: row.owner_id,
            owner_name: row.owner_name,
            average_rating: format!("{:.1}", row.average_rating),
            total_ratings: row.total_ratings,
        }
    }
}

/// Parse an incoming role string.
fn parse_role(raw: &str) -> Result<Role, ApiError> {
    Role::try_from_value(&raw.to_string())
        .map_err(|_| ApiError::InvalidArgument("Invalid role".to_string()))
}

/// Reject a user email already used by another account.
async fn ensure_user_email_free(
    db: &DatabaseConnection,
    email: &str,
    exclude_id: Option<i32>,
) -> Result<(), ApiError> {
    let mut lookup = user::Entity::find().filter(user::Column::Email.eq(email));
    if let Some(id) = exclude_id {
        lookup = lookup.filter(user::Column::Id.ne(id));
    }
    if lookup.one(db).await?.is_some() {
        warn!("User email already in use: {}", email);
        return Err(ApiError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }
    Ok(())
}

/// Dashboard row counts
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "admin",
    responses(
        (status = 200, description = "Statistics retrieved successfully", body = DashboardEnvelope),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<Json<DashboardEnvelope>, ApiError> {
    trace!("Entering get_dashboard function");
    caller.authorize(Action::ViewDashboard)?;

    let total_users = user::Entity::find().count(&state.db).await?;
    let total_stores = store::Entity::find().count(&state.db).await?;
    let total_ratings = rating::Entity::find().count(&state.db).await?;
    debug!(
        "Dashboard counts: {} users, {} stores, {} ratings",
        total_users, total_stores, total_ratings
    );

    Ok(Json(DashboardEnvelope {
        stats: DashboardStats {
            total_users,
            total_stores,
            total_ratings,
        },
    }))
}

/// List users with filtering and sorting
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    params(UserQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = UsersResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_users(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<UsersResponse>, ApiError> {
    trace!("Entering get_users function");
    caller.authorize(Action::ManageUsers)?;
    debug!(
        "Listing users (search: {:?}, role: {:?}, sort: {:?} {:?})",
        query.search, query.role, query.sort_by, query.sort_order
    );

    let mut select = user::Entity::find();

    if let Some(term) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", term.to_lowercase());
        select = select.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col((user::Entity, user::Column::Name))))
                        .like(pattern.clone()),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col((user::Entity, user::Column::Email))))
                        .like(pattern.clone()),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col((
                        user::Entity,
                        user::Column::Address,
                    ))))
                    .like(pattern),
                ),
        );
    }

    // Matched as a raw string so an unknown role simply matches no rows.
    if let Some(role) = query.role.as_deref().filter(|s| !s.is_empty()) {
        select = select.filter(user::Column::Role.eq(role));
    }

    let order = sort_order(query.sort_order.as_deref());
    // Unknown sort fields silently fall back to name.
    select = match query.sort_by.as_deref() {
        Some("email") => select.order_by(user::Column::Email, order),
        Some("address") => select.order_by(user::Column::Address, order),
        Some("role") => select.order_by(user::Column::Role, order),
        Some("created_at") => select.order_by(user::Column::CreatedAt, order),
        _ => select.order_by(user::Column::Name, order),
    };

    let users = select.all(&state.db).await?;
    info!("Retrieved {} users", users.len());

    Ok(Json(UsersResponse {
        users: users.into_iter().map(AdminUser::from).collect(),
    }))
}

/// Get user details, with the rating average across owned stores
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = AdminUserEnvelope),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<AdminUserEnvelope>, ApiError> {
    trace!("Entering get_user function for user_id: {}", id);
    caller.authorize(Action::ManageUsers)?;

    let row = user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Name)
        .column(user::Column::Email)
        .column(user::Column::Address)
        .column(user::Column::Role)
        .column(user::Column::CreatedAt)
        .column_as(average_rating_expr(), "average_rating")
        .join(JoinType::LeftJoin, user::Relation::Store.def())
        .join(JoinType::LeftJoin, store::Relation::Rating.def())
        .filter(user::Column::Id.eq(id))
        .group_by(user::Column::Id)
        .group_by(user::Column::Name)
        .group_by(user::Column::Email)
        .group_by(user::Column::Address)
        .group_by(user::Column::Role)
        .group_by(user::Column::CreatedAt)
        .into_model::<AdminUserDetailRow>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    // The average only means something for store owners.
    let average_rating = match row.role {
        Role::StoreOwner => Some(format!("{:.1}", row.average_rating)),
        _ => None,
    };
    debug!("Retrieved user {} ({})", row.id, row.email);

    Ok(Json(AdminUserEnvelope {
        user: AdminUserDetail {
            id: row.id,
            name: row.name,
            email: row.email,
            address: row.address,
            role: row.role.to_value(),
            created_at: row.created_at,
            average_rating,
        },
    }))
}

/// Create a user with an explicit role
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "admin",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserMutationResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn create_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    Valid(Json(request)): Valid<Json<CreateUserRequest>>,
) -> Result<(StatusCode, Json<UserMutationResponse>), ApiError> {
    trace!("Entering create_user function");
    caller.authorize(Action::ManageUsers)?;
    debug!("Creating user with email: {}", request.email);

    ensure_user_email_free(&state.db, &request.email, None).await?;
    let role = match request.role.as_deref() {
        Some(raw) => parse_role(raw)?,
        None => Role::User,
    };

    let now = Utc::now();
    let new_user = user::ActiveModel {
        name: Set(request.name),
        email: Set(request.email),
        password_hash: Set(hash_password(&request.password)?),
        address: Set(request.address),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user_model = new_user.insert(&state.db).await?;
    info!(
        "User created successfully with ID: {}, email: {}, role: {}",
        user_model.id,
        user_model.email,
        user_model.role.to_value()
    );

    let response = UserMutationResponse {
        message: "User created successfully".to_string(),
        user: UserResponse::from(user_model),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = UserMutationResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn update_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<i32>,
    Valid(Json(request)): Valid<Json<UpdateUserRequest>>,
) -> Result<Json<UserMutationResponse>, ApiError> {
    trace!("Entering update_user function for user_id: {}", id);
    caller.authorize(Action::ManageUsers)?;
    debug!("Updating user with ID: {}", id);

    let existing = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    ensure_user_email_free(&state.db, &request.email, Some(id)).await?;
    let role = parse_role(&request.role)?;

    let mut user_active: user::ActiveModel = existing.into();
    user_active.name = Set(request.name);
    user_active.email = Set(request.email);
    user_active.address = Set(request.address);
    user_active.role = Set(role);
    user_active.updated_at = Set(Utc::now());

    let updated = user_active.update(&state.db).await?;
    info!("User with ID {} updated successfully", id);

    Ok(Json(UserMutationResponse {
        message: "User updated successfully".to_string(),
        user: UserResponse::from(updated),
    }))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User deleted successfully", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    trace!("Entering delete_user function for user_id: {}", id);
    caller.authorize(Action::ManageUsers)?;
    debug!("Attempting to delete user with ID: {}", id);

    let result = user::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        warn!("User with ID {} not found for deletion", id);
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!("User with ID {} deleted successfully", id);
    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}

/// Base query for stores with owner name and rating aggregates.
fn admin_store_query() -> Select<store::Entity> {
    store::Entity::find()
        .select_only()
        .column(store::Column::Id)
        .column(store::Column::Name)
        .column(store::Column::Email)
        .column(store::Column::Address)
        .column(store::Column::OwnerId)
        .column_as(user::Column::Name, "owner_name")
        .column_as(average_rating_expr(), "average_rating")
        .column_as(rating::Column::Id.count(), "total_ratings")
        .join(JoinType::LeftJoin, store::Relation::Owner.def())
        .join(JoinType::LeftJoin, store::Relation::Rating.def())
        .group_by(store::Column::Id)
        .group_by(store::Column::Name)
        .group_by(store::Column::Email)
        .group_by(store::Column::Address)
        .group_by(store::Column::OwnerId)
        .group_by(Expr::col((user::Entity, user::Column::Name)))
}

/// List stores with owner names and rating aggregates
#[utoipa::path(
    get,
    path = "/api/admin/stores",
    tag = "admin",
    params(StoreQuery),
    responses(
        (status = 200, description = "Stores retrieved successfully", body = AdminStoresResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_admin_stores(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(query): Query<StoreQuery>,
) -> Result<Json<AdminStoresResponse>, ApiError> {
    trace!("Entering get_admin_stores function");
    caller.authorize(Action::ManageStores)?;
    debug!(
        "Listing stores for admin (search: {:?}, sort: {:?} {:?})",
        query.search, query.sort_by, query.sort_order
    );

    let mut select = admin_store_query();

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
                        store::Column::Email,
                    ))))
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

    let rows = select.into_model::<AdminStoreRow>().all(&state.db).await?;
    info!("Retrieved {} stores for admin", rows.len());

    Ok(Json(AdminStoresResponse {
        stores: rows.into_iter().map(AdminStore::from).collect(),
    }))
}

/// Get one store with owner name and rating aggregates
#[utoipa::path(
    get,
    path = "/api/admin/stores/{id}",
    tag = "admin",
    params(
        ("id" = i32, Path, description = "Store ID"),
    ),
    responses(
        (status = 200, description = "Store retrieved successfully", body = AdminStoreEnvelope),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Store not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_admin_store(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<AdminStoreEnvelope>, ApiError> {
    trace!("Entering get_admin_store function for store_id: {}", id);
    caller.authorize(Action::ManageStores)?;

    let row = admin_store_query()
        .filter(store::Column::Id.eq(id))
        .into_model::<AdminStoreRow>()
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Store not found".to_string()))?;

    debug!("Retrieved store {} for admin", id);
    Ok(Json(AdminStoreEnvelope {
        store: AdminStore::from(row),
    }))
}
