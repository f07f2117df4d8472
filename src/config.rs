use anyhow::{Context, Result};
use config::{Config, Environment, File};
use sea_orm::{Database, DatabaseConnection};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::TokenService;
use crate::csv_log::CsvLog;
use crate::repository::SeaOrmAccountRepository;
use crate::schemas::AppState;

/// Secret used when none is configured. Good enough for local development only.
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Name of the crop viability log inside the data directory.
pub const CROP_CSV_FILE: &str = "cultivos_viabilidad_FINAL.csv";
/// Name of the weather log inside the data directory.
pub const WEATHER_CSV_FILE: &str = "datos_clima.csv";

/// Application settings.
///
/// Resolved from built-in defaults, then an optional `estacion.toml` (or any
/// format the `config` crate understands) in the working directory, then
/// `ESTACION_*` environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub jwt_secret: String,
    /// Lifetime of access tokens, in hours
    pub access_token_hours: i64,
    /// Lifetime of refresh tokens, in days
    pub refresh_token_days: i64,
    /// bcrypt cost factor
    pub password_hash_cost: u32,
    /// Directory holding the CSV logs
    pub data_dir: PathBuf,
    /// Comma-separated list of origins allowed by CORS
    pub cors_allowed_origins: String,
    /// Mount the weather log endpoints
    pub weather_endpoints: bool,
}

impl AppConfig {
    /// Load configuration from defaults, `estacion.*` file and environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Config::builder()
            .set_default("database_url", "sqlite://estacion.db?mode=rwc")?
            .set_default("bind_address", "0.0.0.0:8000")?
            .set_default("jwt_secret", DEFAULT_JWT_SECRET)?
            .set_default("access_token_hours", 24)?
            .set_default("refresh_token_days", 7)?
            .set_default("password_hash_cost", i64::from(bcrypt::DEFAULT_COST))?
            .set_default("data_dir", ".")?
            .set_default(
                "cors_allowed_origins",
                "http://localhost:3000,http://localhost:5173,http://127.0.0.1:3000,http://127.0.0.1:5173",
            )?
            .set_default("weather_endpoints", false)?
            .add_source(File::with_name("estacion").required(false))
            .add_source(Environment::with_prefix("ESTACION"))
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Apply command line overrides on top of the loaded settings.
    pub fn override_with(&mut self, database_url: Option<String>, bind_address: Option<String>) {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
    }

    /// Origins accepted by the CORS layer.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn crop_csv_path(&self) -> PathBuf {
        self.data_dir.join(CROP_CSV_FILE)
    }

    pub fn weather_csv_path(&self) -> PathBuf {
        self.data_dir.join(WEATHER_CSV_FILE)
    }
}

/// Build the shared state around an open database connection.
pub fn build_app_state(db: DatabaseConnection, config: AppConfig) -> AppState {
    let accounts = SeaOrmAccountRepository::new(db.clone());
    let tokens = TokenService::new(
        config.jwt_secret.as_bytes(),
        chrono::Duration::hours(config.access_token_hours),
        chrono::Duration::days(config.refresh_token_days),
    );

    AppState {
        db,
        accounts: Arc::new(accounts),
        tokens: Arc::new(tokens),
        crop_log: Arc::new(CsvLog::new(config.crop_csv_path(), &common::CROP_COLUMNS)),
        weather_log: Arc::new(CsvLog::new(config.weather_csv_path(), &common::WEATHER_COLUMNS)),
        config: Arc::new(config),
    }
}

/// Initialize application state, connecting to the configured database
pub async fn initialize_app_state(config: AppConfig) -> Result<AppState> {
    if config.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("Using the built-in JWT secret, set ESTACION_JWT_SECRET in production");
    }

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("Failed to create data directory {}", config.data_dir.display())
    })?;

    tracing::info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    Ok(build_app_state(db, config))
}
