use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use model::entities::user;
use sea_orm::EntityTrait;
use tracing::{debug, trace};

use crate::auth::rbac::{self, Action};
use crate::auth::token::verify_token;
use crate::error::ApiError;
use crate::schemas::AppState;

/// The authenticated caller, resolved from the bearer token all the way to
/// a live user row. A syntactically valid token whose user has since been
/// deleted is rejected like any other bad credential.
#[derive(Clone)]
pub struct CurrentUser(pub user::Model);

// Keep the stored hash out of request traces.
impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.0.id)
            .field("email", &self.0.email)
            .field("role", &self.0.role)
            .finish()
    }
}

impl CurrentUser {
    /// Role gate backed by the capability table.
    pub fn authorize(&self, action: Action) -> Result<(), ApiError> {
        if rbac::allows(self.0.role, action) {
            Ok(())
        } else {
            debug!(
                "Role {:?} denied for user {} ({:?})",
                self.0.role, self.0.id, action
            );
            Err(ApiError::Forbidden("Access denied".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        trace!("Resolving bearer credential");
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("Access token required".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthenticated("Access token required".to_string()))?;

        let claims = verify_token(token, &state.auth.token_secret)?;

        let user = user::Entity::find_by_id(claims.sub)
            .one(&state.db)
            .await?
            .ok_or_else(|| {
                debug!("Token subject {} no longer exists", claims.sub);
                ApiError::Unauthenticated("Invalid or expired token".to_string())
            })?;

        trace!("Authenticated user {} ({:?})", user.id, user.role);
        Ok(CurrentUser(user))
    }
}
