use anyhow::Result;
use sea_orm::Database;

use crate::schemas::AppState;

const DEV_TOKEN_SECRET: &str = "dev-secret-change-me";

/// Token-signing settings loaded from the environment.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify access tokens
    pub token_secret: String,
    /// Token lifetime in hours
    pub token_expiry_hours: i64,
}

impl AuthConfig {
    /// Load settings from the environment, falling back to development defaults.
    pub fn from_env() -> Self {
        let token_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using development default");
                DEV_TOKEN_SECRET.to_string()
            }
        };

        let token_expiry_hours = std::env::var("TOKEN_EXPIRY_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);

        Self {
            token_secret,
            token_expiry_hours,
        }
    }
}

// Keep the secret out of request traces.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"<redacted>")
            .field("token_expiry_hours", &self.token_expiry_hours)
            .finish()
    }
}

/// Initialize application configuration and state
pub async fn initialize_app_state() -> Result<AppState> {
    // Load configuration
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://raterust.db".to_string());

    initialize_app_state_with_url(&database_url).await
}

/// Initialize application state against a specific database URL
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    // Connect to database
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    Ok(AppState {
        db,
        auth: AuthConfig::from_env(),
    })
}

/// Get bind address from environment or use default
pub fn get_bind_address() -> String {
    std::env::var("BIND_ADDRESS")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}
