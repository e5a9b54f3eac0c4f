#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod db;
mod env;
mod error;
mod imports;
mod models;
mod telemetry;
mod uploads;
mod validation;
#[cfg(test)]
mod test;

use std::str::FromStr;
use std::time::Duration;

use api::{
    api_add_student, api_delete_student, api_get_admin_profile, api_get_own_profile,
    api_get_student, api_get_students, api_import_students, api_login, api_logout, api_me,
    api_me_unauthorized, api_register, api_update_student, api_upsert_admin_profile, health,
};
use auth::{Role, forbidden_api, unauthorized_api};
use db::{clean_expired_sessions, set_user_role};
use env::AppConfig;
use error::AppError;
use rocket::{Build, Rocket, tokio};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use telemetry::{TelemetryFairing, init_tracing};
use tracing::{error, info, warn};
use uploads::PhotoStore;

#[launch]
async fn rocket() -> _ {
    init_tracing();

    if let Err(e) = env::load_environment() {
        warn!("Could not load environment files: {}", e);
    }

    let config = AppConfig::from_env();

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .expect("Invalid DATABASE_URL")
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(connect_options)
        .await
        .expect("Failed to connect to SQLite database");

    let pool_clone = pool.clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    seed_bootstrap_admin(&pool, &config).await;

    let store = PhotoStore::new(&config.upload_dir);

    init_rocket(pool, store, config).await
}

/// Config-driven replacement for an open "become admin" route: when a
/// bootstrap email is configured, its role is forced to admin at launch.
/// Re-running against an existing admin is a no-op, and an email that has
/// not registered yet is retried on the next startup.
async fn seed_bootstrap_admin(pool: &SqlitePool, config: &AppConfig) {
    let Some(email) = &config.bootstrap_admin_email else {
        return;
    };

    match set_user_role(pool, email, Role::Admin).await {
        Ok(()) => info!(email = %email, "Bootstrap admin role ensured"),
        Err(AppError::NotFound(_)) => {
            warn!(
                email = %email,
                "Bootstrap admin email has not registered yet; will retry on next startup"
            );
        }
        Err(e) => error!(error = ?e, "Failed to seed bootstrap admin"),
    }
}

pub async fn init_rocket(pool: SqlitePool, store: PhotoStore, config: AppConfig) -> Rocket<Build> {
    info!("Starting student registry");

    rocket::build()
        .manage(pool)
        .manage(store)
        .manage(config)
        .mount(
            "/api",
            routes![
                api_login,
                api_logout,
                api_register,
                api_me,
                api_me_unauthorized,
                api_get_students,
                api_get_student,
                api_add_student,
                api_update_student,
                api_delete_student,
                api_import_students,
                api_get_own_profile,
                api_get_admin_profile,
                api_upsert_admin_profile,
            ],
        )
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
}
