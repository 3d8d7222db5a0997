//! Persistence for books.
//!
//! Every call takes the connection to run on; each call is a single statement,
//! so a handler can use a plain pooled connection for all of them.

use async_trait::async_trait;
use shelf_db::DbResult;
use sqlx::SqliteConnection;

use super::models::{Book, BookInput};

const BOOK_COLUMNS: &str =
    "id, title, author, publisher, publication_year, cover, description, created_at, updated_at";

#[async_trait]
pub trait BookRepository: Send + Sync {
    /// All books ordered by id.
    async fn list(&self, conn: &mut SqliteConnection) -> DbResult<Vec<Book>>;

    async fn find(&self, conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Book>>;

    /// Whether another book already uses `title`; `except_id` excludes one record.
    async fn title_taken(
        &self,
        conn: &mut SqliteConnection,
        title: &str,
        except_id: Option<i64>,
    ) -> DbResult<bool>;

    /// Insert a new row; absent optional columns are stored as NULL.
    async fn insert(&self, conn: &mut SqliteConnection, input: &BookInput) -> DbResult<Book>;

    /// Overwrite the given row. Absent optional columns keep their value.
    /// Returns false when no row has `id`.
    async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        input: &BookInput,
    ) -> DbResult<bool>;

    /// Returns false when no row has `id`.
    async fn delete(&self, conn: &mut SqliteConnection, id: i64) -> DbResult<bool>;
}

/// [`BookRepository`] over the `books` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlBookRepository;

impl SqlBookRepository {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BookRepository for SqlBookRepository {
    async fn list(&self, conn: &mut SqliteConnection) -> DbResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY id"
        ))
        .fetch_all(conn)
        .await?;
        Ok(books)
    }

    async fn find(&self, conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(book)
    }

    async fn title_taken(
        &self,
        conn: &mut SqliteConnection,
        title: &str,
        except_id: Option<i64>,
    ) -> DbResult<bool> {
        // `id IS NOT NULL` holds for every row, so no exclusion without an id.
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE title = ? AND id IS NOT ?")
                .bind(title)
                .bind(except_id)
                .fetch_one(conn)
                .await?;
        Ok(count > 0)
    }

    async fn insert(&self, conn: &mut SqliteConnection, input: &BookInput) -> DbResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books (title, author, publisher, publication_year, cover, description) \
             VALUES (?, ?, ?, ?, ?, ?) \
             RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(&input.author)
        .bind(input.publisher.clone().flatten())
        .bind(input.publication_year.clone().flatten())
        .bind(input.cover.clone().flatten())
        .bind(input.description.clone().flatten())
        .fetch_one(conn)
        .await?;
        Ok(book)
    }

    async fn update(
        &self,
        conn: &mut SqliteConnection,
        id: i64,
        input: &BookInput,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE books SET \
                title = ?, \
                author = ?, \
                publisher = CASE WHEN ? THEN ? ELSE publisher END, \
                publication_year = CASE WHEN ? THEN ? ELSE publication_year END, \
                cover = CASE WHEN ? THEN ? ELSE cover END, \
                description = CASE WHEN ? THEN ? ELSE description END, \
                updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?",
        )
        .bind(&input.title)
        .bind(&input.author)
        .bind(input.publisher.is_some())
        .bind(input.publisher.clone().flatten())
        .bind(input.publication_year.is_some())
        .bind(input.publication_year.clone().flatten())
        .bind(input.cover.is_some())
        .bind(input.cover.clone().flatten())
        .bind(input.description.is_some())
        .bind(input.description.clone().flatten())
        .bind(id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, conn: &mut SqliteConnection, id: i64) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::BooksModule;
    use shelf_db::Database;
    use shelf_kernel::Module;

    async fn database() -> Database {
        let db = Database::in_memory().await.unwrap();
        let migrations: Vec<(String, shelf_db::Migration)> = BooksModule::new()
            .migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        shelf_db::apply_migrations(db.pool(), &migrations)
            .await
            .unwrap();
        db
    }

    fn input(title: &str, author: &str) -> BookInput {
        BookInput {
            title: title.to_string(),
            author: author.to_string(),
            publisher: None,
            publication_year: None,
            cover: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_stores_nulls() {
        let db = database().await;
        let repo = SqlBookRepository::new();
        let mut conn = db.acquire().await.unwrap();

        let first = repo.insert(&mut conn, &input("A", "B")).await.unwrap();
        let second = repo.insert(&mut conn, &input("C", "D")).await.unwrap();

        assert!(second.id > first.id);
        assert_eq!(first.publisher, None);
        assert!(!first.created_at.is_empty());
        assert_eq!(repo.list(&mut conn).await.unwrap(), vec![first, second]);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let db = database().await;
        let repo = SqlBookRepository::new();
        let mut conn = db.acquire().await.unwrap();

        let first = repo.insert(&mut conn, &input("A", "B")).await.unwrap();
        assert!(repo.delete(&mut conn, first.id).await.unwrap());
        let second = repo.insert(&mut conn, &input("A", "B")).await.unwrap();

        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn title_taken_can_exclude_one_record() {
        let db = database().await;
        let repo = SqlBookRepository::new();
        let mut conn = db.acquire().await.unwrap();

        let book = repo.insert(&mut conn, &input("Dune", "Herbert")).await.unwrap();

        assert!(repo.title_taken(&mut conn, "Dune", None).await.unwrap());
        assert!(!repo.title_taken(&mut conn, "Dune", Some(book.id)).await.unwrap());
        assert!(!repo.title_taken(&mut conn, "dune", None).await.unwrap());
    }

    #[tokio::test]
    async fn update_keeps_absent_columns_and_clears_nulls() {
        let db = database().await;
        let repo = SqlBookRepository::new();
        let mut conn = db.acquire().await.unwrap();

        let mut original = input("A", "B");
        original.publisher = Some(Some("Erlangga".into()));
        original.cover = Some(Some("cover.jpg".into()));
        let book = repo.insert(&mut conn, &original).await.unwrap();

        let mut changes = input("A2", "B2");
        changes.cover = Some(None);
        assert!(repo.update(&mut conn, book.id, &changes).await.unwrap());

        let updated = repo.find(&mut conn, book.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "A2");
        assert_eq!(updated.author, "B2");
        assert_eq!(updated.publisher.as_deref(), Some("Erlangga"));
        assert_eq!(updated.cover, None);
        assert_eq!(updated.created_at, book.created_at);
    }

    #[tokio::test]
    async fn missing_rows_report_false() {
        let db = database().await;
        let repo = SqlBookRepository::new();
        let mut conn = db.acquire().await.unwrap();

        assert_eq!(repo.find(&mut conn, 42).await.unwrap(), None);
        assert!(!repo.update(&mut conn, 42, &input("A", "B")).await.unwrap());
        assert!(!repo.delete(&mut conn, 42).await.unwrap());
    }

    #[tokio::test]
    async fn schema_rejects_duplicate_titles() {
        let db = database().await;
        let repo = SqlBookRepository::new();
        let mut conn = db.acquire().await.unwrap();

        repo.insert(&mut conn, &input("A", "B")).await.unwrap();
        let err = repo.insert(&mut conn, &input("A", "C")).await.unwrap_err();

        assert!(err.is_unique_violation());
    }
}
