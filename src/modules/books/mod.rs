pub mod models;
pub mod repository;
pub mod routes;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use shelf_kernel::{InitCtx, Migration, Module};
use utoipa::OpenApi;

use repository::{BookRepository, SqlBookRepository};
use routes::{BooksApiDoc, BooksState};

const CREATE_BOOKS_TABLE: &str = r#"
    CREATE TABLE books (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        title            TEXT NOT NULL UNIQUE,
        author           TEXT NOT NULL CHECK (length(author) BETWEEN 1 AND 100),
        publisher        TEXT,
        publication_year TEXT,
        cover            TEXT,
        description      TEXT,
        created_at       TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at       TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// The book catalogue: CRUD over the `books` table, mounted at `/api/books`.
pub struct BooksModule {
    repo: Arc<dyn BookRepository>,
}

impl BooksModule {
    pub fn new() -> Self {
        Self::with_repository(Arc::new(SqlBookRepository::new()))
    }

    pub fn with_repository(repo: Arc<dyn BookRepository>) -> Self {
        Self { repo }
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(BooksState::new(ctx.db.clone(), self.repo.clone()))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(BooksApiDoc::openapi())
            .map_err(|e| {
                tracing::warn!(module = self.name(), error = %e, "failed to render OpenAPI")
            })
            .ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: CREATE_BOOKS_TABLE,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}
