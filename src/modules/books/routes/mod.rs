//! HTTP handlers for `/api/books`.
//!
//! - GET    /       list every book
//! - POST   /       create a book
//! - GET    /{id}   show one book
//! - PUT    /{id}   update a book
//! - DELETE /{id}   delete a book

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use shelf_db::{Database, DbError};
use shelf_http::error::{AppError, ErrorBody, ErrorResponse};
use sqlx::SqliteConnection;
use utoipa::OpenApi;

use super::models::{Book, BookPayload, MessageResponse};
use super::repository::BookRepository;
use super::validation::{self, FieldError};

pub const NOT_FOUND_MESSAGE: &str = "Item not found";

/// Shared state for book handlers.
#[derive(Clone)]
pub struct BooksState {
    db: Database,
    repo: Arc<dyn BookRepository>,
}

impl BooksState {
    pub fn new(db: Database, repo: Arc<dyn BookRepository>) -> Self {
        Self { db, repo }
    }
}

/// Router for the books module, relative to its mount point.
pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(store_book))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(show_book).put(update_book).delete(destroy_book),
        )
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_books,
        store_book,
        show_book,
        update_book,
        destroy_book,
        health_check
    ),
    components(schemas(Book, BookPayload, MessageResponse, ErrorResponse, ErrorBody)),
    tags((name = "book", description = "Book catalogue"))
)]
pub struct BooksApiDoc;

#[utoipa::path(
    get,
    path = "/health",
    tag = "book",
    summary = "Books health check",
    responses((status = 200, description = "OK", body = String, content_type = "text/plain"))
)]
async fn health_check() -> &'static str {
    "books module is healthy"
}

/// Display a listing of items
#[utoipa::path(
    get,
    path = "/",
    tag = "book",
    operation_id = "index",
    responses(
        (status = 200, description = "Successful", body = [Book]),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
pub async fn list_books(State(state): State<BooksState>) -> Result<Json<Vec<Book>>, AppError> {
    let mut conn = state.db.acquire().await?;
    let books = state.repo.list(&mut conn).await?;
    Ok(Json(books))
}

/// Store a newly created item
#[utoipa::path(
    post,
    path = "/",
    tag = "book",
    operation_id = "store",
    request_body = BookPayload,
    responses(
        (status = 201, description = "Successful", body = Book),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
pub async fn store_book(
    State(state): State<BooksState>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(payload) = payload?;
    let payload = payload.normalized();

    let mut conn = state.db.acquire().await?;

    let taken = title_taken(&state, &mut conn, &payload, None).await?;
    let input = validation::validate(payload, taken).map_err(validation_error)?;
    let book = state
        .repo
        .insert(&mut conn, &input)
        .await
        .map_err(title_conflict)?;

    tracing::info!(book_id = book.id, title = %book.title, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// Display the specified item
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "book",
    operation_id = "show",
    params(("id" = i64, Path, description = "ID of item that needs to be displayed")),
    responses(
        (status = 200, description = "Successful", body = Book),
        (status = 404, description = "Item not found", body = ErrorResponse)
    )
)]
pub async fn show_book(
    State(state): State<BooksState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(id)?;

    let mut conn = state.db.acquire().await?;
    let book = state
        .repo
        .find(&mut conn, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(book))
}

/// Update the specified item
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "book",
    operation_id = "update",
    params(("id" = i64, Path, description = "ID of item that needs to be updated")),
    request_body = BookPayload,
    responses(
        (status = 200, description = "Successful", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<BooksState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = book_id(id)?;

    let mut conn = state.db.acquire().await?;

    // Existence is reported before anything about the body.
    if state.repo.find(&mut conn, id).await?.is_none() {
        return Err(not_found());
    }

    let Json(payload) = payload?;
    let payload = payload.normalized();

    let taken = title_taken(&state, &mut conn, &payload, Some(id)).await?;
    let input = validation::validate(payload, taken).map_err(validation_error)?;
    let updated = state
        .repo
        .update(&mut conn, id, &input)
        .await
        .map_err(title_conflict)?;
    if !updated {
        return Err(not_found());
    }

    tracing::info!(book_id = id, "book updated");
    Ok(Json(MessageResponse::new("Updated successfully")))
}

/// Remove the specified item
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "book",
    operation_id = "destroy",
    params(("id" = i64, Path, description = "ID of item that needs to be removed")),
    responses(
        (status = 200, description = "Successful", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse)
    )
)]
pub async fn destroy_book(
    State(state): State<BooksState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = book_id(id)?;

    let mut conn = state.db.acquire().await?;
    if !state.repo.delete(&mut conn, id).await? {
        return Err(not_found());
    }

    tracing::info!(book_id = id, "book deleted");
    Ok(Json(MessageResponse::new("Deleted successfully")))
}

fn not_found() -> AppError {
    AppError::not_found(NOT_FOUND_MESSAGE)
}

/// A non-numeric id cannot name a stored book.
fn book_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    id.map(|Path(id)| id).map_err(|rejection| {
        tracing::debug!(error = %rejection, "unparseable book id");
        not_found()
    })
}

async fn title_taken(
    state: &BooksState,
    conn: &mut SqliteConnection,
    payload: &BookPayload,
    except_id: Option<i64>,
) -> Result<bool, AppError> {
    match payload.title.as_deref() {
        Some(title) => Ok(state.repo.title_taken(conn, title, except_id).await?),
        None => Ok(false),
    }
}

/// Another writer can claim the title between the check and the write;
/// `UNIQUE(title)` turns that into the same answer the check would give.
fn title_conflict(err: DbError) -> AppError {
    if err.is_unique_violation() {
        validation_error(vec![FieldError {
            field: "title",
            message: validation::TITLE_TAKEN.to_string(),
        }])
    } else {
        err.into()
    }
}

fn validation_error(errors: Vec<FieldError>) -> AppError {
    let message = errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| "The given data was invalid.".to_string());
    let details = errors
        .iter()
        .map(|e| json!({ "field": e.field, "message": e.message }))
        .collect();
    AppError::validation(details, message)
}
