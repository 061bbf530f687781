use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::config::AuthConfig;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Token-signing configuration
    pub auth: AuthConfig,
}

/// Error response
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Plain confirmation payload for delete-style endpoints
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    /// Confirmation message
    pub message: String,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::stores::get_stores,
        crate::handlers::stores::get_store,
        crate::handlers::stores::create_store,
        crate::handlers::stores::update_store,
        crate::handlers::stores::delete_store,
        crate::handlers::ratings::submit_rating,
        crate::handlers::ratings::get_my_rating,
        crate::handlers::ratings::get_store_ratings,
        crate::handlers::ratings::get_store_rating_stats,
        crate::handlers::ratings::delete_rating,
        crate::handlers::users::get_my_stores,
        crate::handlers::users::get_my_ratings,
        crate::handlers::users::update_profile,
        crate::handlers::users::change_password,
        crate::handlers::admin::get_dashboard,
        crate::handlers::admin::get_users,
        crate::handlers::admin::get_user,
        crate::handlers::admin::create_user,
        crate::handlers::admin::update_user,
        crate::handlers::admin::delete_user,
        crate::handlers::admin::get_admin_stores,
        crate::handlers::admin::get_admin_store,
    ),
    components(
        schemas(
            ErrorResponse,
            MessageResponse,
            HealthResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthResponse,
            crate::handlers::auth::UserResponse,
            crate::handlers::auth::UserEnvelope,
            crate::handlers::stores::StoreQuery,
            crate::handlers::stores::StoreWithRatings,
            crate::handlers::stores::StoresResponse,
            crate::handlers::stores::StoreEnvelope,
            crate::handlers::stores::StoreRecord,
            crate::handlers::stores::CreateStoreRequest,
            crate::handlers::stores::UpdateStoreRequest,
            crate::handlers::stores::StoreMutationResponse,
            crate::handlers::ratings::SubmitRatingRequest,
            crate::handlers::ratings::DeleteRatingRequest,
            crate::handlers::ratings::RatingEnvelope,
            crate::handlers::ratings::SubmitRatingResponse,
            crate::handlers::ratings::StoreRatingEntry,
            crate::handlers::ratings::StoreRatingsResponse,
            crate::handlers::ratings::RatingDistribution,
            crate::handlers::ratings::RatingStats,
            crate::handlers::ratings::StatsEnvelope,
            crate::handlers::users::OwnedStore,
            crate::handlers::users::MyStoresResponse,
            crate::handlers::users::MyRatingEntry,
            crate::handlers::users::MyRatingsResponse,
            crate::handlers::users::UpdateProfileRequest,
            crate::handlers::users::ProfileResponse,
            crate::handlers::users::ChangePasswordRequest,
            crate::handlers::admin::DashboardStats,
            crate::handlers::admin::DashboardEnvelope,
            crate::handlers::admin::UserQuery,
            crate::handlers::admin::AdminUser,
            crate::handlers::admin::AdminUserDetail,
            crate::handlers::admin::AdminUserEnvelope,
            crate::handlers::admin::UsersResponse,
            crate::handlers::admin::CreateUserRequest,
            crate::handlers::admin::UpdateUserRequest,
            crate::handlers::admin::UserMutationResponse,
            crate::handlers::admin::AdminStore,
            crate::handlers::admin::AdminStoresResponse,
            crate::handlers::admin::AdminStoreEnvelope,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and session introspection"),
        (name = "stores", description = "Store catalogue with aggregated ratings"),
        (name = "ratings", description = "Rating submission and per-store rating views"),
        (name = "users", description = "Self-service profile, stores and rating history"),
        (name = "admin", description = "Administrative management of users and stores"),
    ),
    info(
        title = "RateRust API",
        description = "Store-rating platform API - browse stores, submit ratings, manage users and stores by role",
        version = "0.1.0",
    )
)]
pub struct ApiDoc;
