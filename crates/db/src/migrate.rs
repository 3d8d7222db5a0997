//! Module-contributed schema migrations.
//!
//! Each migration is identified by the owning module's name and its own id.
//! Applied migrations are recorded in `schema_migrations` and skipped on the
//! next run, so [`apply_migrations`] is safe to call on every startup.

use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};

/// Migration definition for modules
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

const BOOKKEEPING_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    )
"#;

/// Apply every migration in `migrations` that has not been recorded yet.
///
/// Migrations run in the order given, each inside its own transaction.
/// Returns the number of migrations applied.
pub async fn apply_migrations(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> DbResult<usize> {
    sqlx::raw_sql(BOOKKEEPING_TABLE).execute(pool).await?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let mut tx = pool.begin().await?;

        let (seen,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM schema_migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_one(&mut *tx)
                .await?;
        if seen > 0 {
            tracing::debug!(
                target: "shelf-db",
                %module,
                id = migration.id,
                "migration already applied"
            );
            continue;
        }

        tracing::info!(target: "shelf-db", %module, id = migration.id, "applying migration");
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .map_err(|source| DbError::Migration {
                module: module.clone(),
                id: migration.id.to_string(),
                source,
            })?;

        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        applied += 1;
    }

    tracing::info!(target: "shelf-db", applied, "migrations complete");
    Ok(applied)
}

/// List `(module, id)` pairs recorded as applied, oldest first.
pub async fn applied_migrations(pool: &SqlitePool) -> DbResult<Vec<(String, String)>> {
    sqlx::raw_sql(BOOKKEEPING_TABLE).execute(pool).await?;

    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT module, id FROM schema_migrations ORDER BY applied_at, module, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn sample() -> Vec<(String, Migration)> {
        vec![(
            "test".to_string(),
            Migration {
                id: "001_init",
                up: "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
            },
        )]
    }

    #[tokio::test]
    async fn applies_each_migration_once() {
        let db = Database::in_memory().await.unwrap();

        assert_eq!(apply_migrations(db.pool(), &sample()).await.unwrap(), 1);
        assert_eq!(apply_migrations(db.pool(), &sample()).await.unwrap(), 0);

        let applied = applied_migrations(db.pool()).await.unwrap();
        assert_eq!(applied, vec![("test".to_string(), "001_init".to_string())]);
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let db = Database::in_memory().await.unwrap();
        let broken = vec![(
            "test".to_string(),
            Migration {
                id: "001_broken",
                up: "CREATE TABLE (;",
            },
        )];

        let err = apply_migrations(db.pool(), &broken).await.unwrap_err();
        assert!(matches!(err, DbError::Migration { .. }));
        assert!(applied_migrations(db.pool()).await.unwrap().is_empty());
    }
}
