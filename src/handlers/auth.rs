use axum::{extract::State, http::StatusCode, response::Json};
use axum_valid::Valid;
use chrono::Utc;
use model::entities::user::{self, Role};
use sea_orm::{ActiveEnum, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_complexity, verify_password};
use crate::auth::token::mint_token;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{AppState, ErrorResponse};

/// Request body for self-registration
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
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
}

/// Request body for logging in
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// User representation returned by the API. Never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub role: String,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            address: model.address,
            role: model.role.to_value(),
        }
    }
}

/// Response body for register and login
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// Confirmation message
    pub message: String,
    /// Bearer token for subsequent requests
    pub token: String,
    /// The authenticated user
    pub user: UserResponse,
}

/// Response body for session introspection
#[derive(Debug, Serialize, ToSchema)]
pub struct UserEnvelope {
    /// The authenticated user
    pub user: UserResponse,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    trace!("Entering register function");
    debug!("Registering account for email: {}", request.email);

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        warn!("Registration rejected, email already in use: {}", request.email);
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let now = Utc::now();
    let new_user = user::ActiveModel {
        name: Set(request.name),
        email: Set(request.email),
        password_hash: Set(hash_password(&request.password)?),
        address: Set(request.address),
        // Self-registration always produces a normal user.
        role: Set(Role::User),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let user_model = new_user.insert(&state.db).await?;
    info!(
        "User registered successfully with ID: {}, email: {}",
        user_model.id, user_model.email
    );

    let token = mint_token(user_model.id, &state.auth.token_secret, state.auth.token_expiry_hours)?;
    let response = AuthResponse {
        message: "User registered successfully".to_string(),
        token,
        user: UserResponse::from(user_model),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<LoginRequest>>,
) -> Result<Json<AuthResponse>, ApiError> {
    trace!("Entering login function");
    debug!("Login attempt for email: {}", request.email);

    let user_model = user::Entity::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(&state.db)
        .await?;

    // Same rejection whether the account is missing or the password is wrong.
    let user_model = match user_model {
        Some(m) if verify_password(&request.password, &m.password_hash) => m,
        _ => {
            warn!("Failed login attempt for email: {}", request.email);
            return Err(ApiError::Unauthenticated(
                "Invalid email or password".to_string(),
            ));
        }
    };

    info!("User {} logged in", user_model.id);
    let token = mint_token(user_model.id, &state.auth.token_secret, state.auth.token_expiry_hours)?;
    let response = AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: UserResponse::from(user_model),
    };
    Ok(Json(response))
}

/// Return the authenticated caller
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserEnvelope),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument]
pub async fn me(caller: CurrentUser) -> Result<Json<UserEnvelope>, ApiError> {
    trace!("Entering me function");
    debug!("Returning profile for user {}", caller.0.id);

    Ok(Json(UserEnvelope {
        user: UserResponse::from(caller.0),
    }))
}
