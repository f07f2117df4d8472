use anyhow::{bail, Context, Result};
use model::entities::profile::Role;
use sea_orm::Database;
use tracing::{debug, info, trace};
use validator::ValidateEmail;

use crate::accounts::MIN_PASSWORD_LENGTH;
use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::repository::{AccountRepository, NewAccount, SeaOrmAccountRepository};

/// Create a superuser with an administrative profile.
///
/// The database must already be migrated.
pub async fn create_superuser(
    config: &AppConfig,
    username: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    trace!("Entering create_superuser function");
    let username = username.trim();
    let email = email.trim();

    if username.is_empty() {
        bail!("Username must not be empty");
    }
    if !email.validate_email() {
        bail!("Invalid email address: {}", email);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        bail!("Password must be at least {} characters", MIN_PASSWORD_LENGTH);
    }

    debug!("Database URL: {}", config.database_url);
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let accounts = SeaOrmAccountRepository::new(db);

    if accounts.username_exists(username).await? {
        bail!("Username {} is already taken", username);
    }
    if accounts.email_exists(email).await? {
        bail!("Email {} is already registered", email);
    }

    let record = accounts
        .create(NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password, config.password_hash_cost).await?,
            first_name: String::new(),
            last_name: String::new(),
            is_superuser: true,
            role: Some(Role::Administrative),
        })
        .await?;

    info!("Superuser {} created with id {}", record.account.username, record.account.id);
    Ok(())
}
