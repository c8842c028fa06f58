use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::app::build_router;
use api::auth::password::PasswordService;
use api::config::AppConfig;
use api::gql::build_schema;
use api::services::spawn_outbox_service;
use api::state::AppState;
use infra::repos::UserRepo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to Postgres");

    infra::db::migrate(&pool).await?;
    tracing::info!("Migrations applied");

    bootstrap_admin(&pool).await?;

    let port = config.port;
    let state = AppState::new(pool, config)?;
    let schema = build_schema(state.clone());

    spawn_outbox_service(state.clone());

    let app = build_router(state, schema);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Creates the first admin from `ADMIN_EMAIL` / `ADMIN_PASSWORD` when both are set.
async fn bootstrap_admin(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD"))
    else {
        return Ok(());
    };

    PasswordService::validate_password_strength(&password)?;
    let hash = PasswordService::hash_password(&password)?;
    let admin = UserRepo::new(pool.clone())
        .upsert_admin(&email, "Admin", &hash)
        .await?;
    tracing::info!(admin_id = %admin.id, email = %admin.email, "admin account ready");
    Ok(())
}
