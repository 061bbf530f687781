use crate::handlers::{
    admin::{
        create_user, delete_user, get_admin_store, get_admin_stores, get_dashboard, get_user,
        get_users, update_user,
    },
    auth::{login, me, register},
    health::health_check,
    ratings::{
        delete_rating, get_my_rating, get_store_rating_stats, get_store_ratings, submit_rating,
    },
    stores::{create_store, delete_store, get_store, get_stores, update_store},
    users::{change_password, get_my_ratings, get_my_stores, update_profile},
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Auth routes
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        // Store routes
        .route("/api/stores", get(get_stores))
        .route("/api/stores", post(create_store))
        .route("/api/stores/:id", get(get_store))
        .route("/api/stores/:id", put(update_store))
        .route("/api/stores/:id", delete(delete_store))
        // Rating routes
        .route("/api/ratings/:store_id", post(submit_rating))
        .route("/api/ratings/:store_id", get(get_my_rating))
        .route("/api/ratings/:store_id", delete(delete_rating))
        .route("/api/ratings/store/:store_id", get(get_store_ratings))
        .route(
            "/api/ratings/store/:store_id/stats",
            get(get_store_rating_stats),
        )
        // Self-service user routes
        .route("/api/users/my-stores", get(get_my_stores))
        .route("/api/users/my-ratings", get(get_my_ratings))
        .route("/api/users/profile", put(update_profile))
        .route("/api/users/password", put(change_password))
        // Admin routes
        .route("/api/admin/dashboard", get(get_dashboard))
        .route("/api/admin/users", get(get_users))
        .route("/api/admin/users", post(create_user))
        .route("/api/admin/users/:id", get(get_user))
        .route("/api/admin/users/:id", put(update_user))
        .route("/api/admin/users/:id", delete(delete_user))
        .route("/api/admin/stores", get(get_admin_stores))
        .route("/api/admin/stores", post(create_store))
        .route("/api/admin/stores/:id", get(get_admin_store))
        .route("/api/admin/stores/:id", put(update_store))
        .route("/api/admin/stores/:id", delete(delete_store))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
