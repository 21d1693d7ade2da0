// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use safety_exam::config::{Config, SESSION_MAX_AGE_HOURS, SESSION_SWEEP_INTERVAL_SECS};
use safety_exam::models::user::NewUser;
use safety_exam::notify::Dispatcher;
use safety_exam::routes;
use safety_exam::state::AppState;
use safety_exam::store::postgres::PgStore;
use safety_exam::store::{Backend, UserStore};
use safety_exam::utils::hash::hash_password;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env included)
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let backend: Arc<dyn Backend> = Arc::new(PgStore::new(pool));

    if let Err(e) = seed_admin_user(backend.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    if config.notify_webhook_url.is_none() {
        tracing::warn!("NOTIFY_WEBHOOK_URL not set, permit approvals will only be logged");
    }
    let dispatcher = Arc::new(Dispatcher::from_webhook(config.notify_webhook_url.clone()));

    let state = AppState::new(backend, dispatcher, config.clone());
    state.sessions.spawn_sweeper(
        Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS),
        chrono::TimeDelta::hours(SESSION_MAX_AGE_HOURS),
    );
    let app = routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listening address");

    axum::serve(listener, app).await.expect("Server error");
}

async fn seed_admin_user<S>(store: &S, config: &Config) -> Result<(), Box<dyn std::error::Error>>
where
    S: UserStore + ?Sized,
{
    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        if store.find_by_username(username).await?.is_none() {
            tracing::info!("Seeding admin user: {}", username);
            let hashed_password = hash_password(password)?;

            store
                .create_user(NewUser {
                    username: username.clone(),
                    password: hashed_password,
                    role: "admin".to_string(),
                    full_name: "Administrator".to_string(),
                    organization: None,
                })
                .await?;
            tracing::info!("Admin user created successfully.");
        }
    }
    Ok(())
}
