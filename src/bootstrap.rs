//! Application lifecycle: connect, init modules, migrate, start, serve, stop.

use anyhow::Context;
use shelf_db::Database;
use shelf_kernel::{settings::Settings, InitCtx};

use crate::modules;

async fn connect(settings: &Settings) -> anyhow::Result<Database> {
    Database::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("failed to connect to database '{}'", settings.database.url))
}

/// Run the HTTP API until a shutdown signal arrives.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "shelf bootstrap starting"
    );

    let db = connect(&settings).await?;
    let registry = modules::registry()?;
    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };

    registry.init_modules(&ctx).await?;
    if settings.database.run_migrations {
        registry.run_migrations(&db).await?;
    } else {
        tracing::info!("skipping migrations (database.run_migrations = false)");
    }
    registry.start_modules(&ctx).await?;

    tracing::info!("shelf bootstrap complete");
    let served = shelf_http::start_server(&registry, &ctx).await;

    registry.stop_modules().await?;
    db.close().await;
    served
}

/// Apply pending migrations and return how many ran.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = connect(settings).await?;
    let registry = modules::registry()?;

    let applied = registry.run_migrations(&db).await?;
    db.close().await;
    Ok(applied)
}

/// The merged OpenAPI document for every registered module.
pub fn openapi() -> anyhow::Result<serde_json::Value> {
    let registry = modules::registry()?;
    Ok(shelf_http::router::build_openapi(&registry))
}
