#[cfg(test)]
pub mod test_utils {
    use crate::auth::hash_password;
    use crate::config::{build_app_state, AppConfig};
    use crate::repository::NewAccount;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::Router;
    use migration::{Migrator, MigratorTrait};
    use model::entities::profile::Role;
    use sea_orm::{Database, DatabaseConnection};
    use std::path::Path;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    /// bcrypt cost used by tests, the lowest the crate accepts
    pub const TEST_HASH_COST: u32 = 4;

    /// Password given to every seeded account
    pub const TEST_PASSWORD: &str = "secreto123";

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        // Run migrations
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    /// Configuration pointing the CSV logs at `data_dir`
    pub fn test_config(data_dir: &Path) -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            jwt_secret: "test-secret".to_string(),
            access_token_hours: 24,
            refresh_token_days: 7,
            password_hash_cost: TEST_HASH_COST,
            data_dir: data_dir.to_path_buf(),
            cors_allowed_origins: "http://localhost:5173".to_string(),
            weather_endpoints: true,
        }
    }

    /// Create AppState for testing
    pub async fn setup_test_app_state(data_dir: &Path) -> AppState {
        build_app_state(setup_test_db().await, test_config(data_dir))
    }

    /// Accounts seeded by [`seed_accounts`]
    #[derive(Debug, Clone, Copy)]
    pub struct Seeded {
        pub root: i32,
        pub admin: i32,
        pub teacher: i32,
        pub student: i32,
        pub other_student: i32,
    }

    /// Insert a superuser, an administrative user, a teacher and two students.
    /// Usernames are the local part of each email.
    pub async fn seed_accounts(state: &AppState) -> Seeded {
        let fixtures: [(&str, &str, bool, Option<Role>); 5] = [
            ("root", "Root", true, None),
            ("admin", "Adriana", false, Some(Role::Administrative)),
            ("profe", "Pablo", false, Some(Role::Teacher)),
            ("alumna", "Lucia", false, Some(Role::Student)),
            ("alumno", "Mateo", false, Some(Role::Student)),
        ];

        let mut ids = Vec::with_capacity(fixtures.len());
        for (username, first_name, is_superuser, role) in fixtures {
            let record = state
                .accounts
                .create(NewAccount {
                    username: username.to_string(),
                    email: format!("{}@escuela.edu", username),
                    password_hash: hash_password(TEST_PASSWORD, TEST_HASH_COST)
                        .await
                        .expect("Failed to hash password"),
                    first_name: first_name.to_string(),
                    last_name: String::new(),
                    is_superuser,
                    role,
                })
                .await
                .expect("Failed to seed account");
            ids.push(record.account.id);
        }

        Seeded {
            root: ids[0],
            admin: ids[1],
            teacher: ids[2],
            student: ids[3],
            other_student: ids[4],
        }
    }

    /// Access token for a seeded account
    pub async fn access_token_for(state: &AppState, id: i32) -> String {
        let record = state
            .accounts
            .find_by_id(id)
            .await
            .expect("Failed to load account")
            .expect("Seeded account missing");
        state
            .tokens
            .issue_pair(&record.account)
            .expect("Failed to issue tokens")
            .access
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is taken from RUST_LOG, defaulting to WARN.
    pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing, returning the state it was built from
    pub async fn setup_test_app(data_dir: &Path) -> (Router, AppState) {
        let state = setup_test_app_state(data_dir).await;
        (create_router(state.clone()), state)
    }
}
