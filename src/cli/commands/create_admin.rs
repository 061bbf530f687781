use anyhow::Result;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use model::entities::user::{self, Role};
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, EntityTrait, QueryFilter, Set};
use tracing::{debug, error, info, trace};

use crate::auth::password::hash_password;

/// Create the initial admin account. Safe to run repeatedly; an existing
/// account with the same email is left untouched.
pub async fn create_admin(
    database_url: &str,
    email: &str,
    password: &str,
    name: &str,
    address: &str,
) -> Result<()> {
    trace!("Entering create_admin function");
    info!("Creating admin account");
    debug!("Database URL: {}", database_url);
    debug!("Admin email: {}", email);

    trace!("Attempting to connect to database");
    let db = match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            connection
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    info!("Running database migrations");
    Migrator::up(&db, None).await?;

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(&db)
        .await?;
    if let Some(found) = existing {
        info!(
            "Account with email {} already exists (ID: {}), nothing to do",
            email, found.id
        );
        return Ok(());
    }

    let now = Utc::now();
    let admin = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        address: Set(Some(address.to_string())),
        role: Set(Role::Admin),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = admin.insert(&db).await?;

    info!(
        "Admin account created successfully with ID: {}, email: {}",
        created.id, created.email
    );
    Ok(())
}
