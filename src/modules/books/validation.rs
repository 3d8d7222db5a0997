//! Field rules applied to a [`BookPayload`] before anything touches the store.
//!
//! Rules run in a fixed order and every failure is kept; callers report the
//! first message and may expose the rest.

use serde::Serialize;

use super::models::{BookInput, BookPayload};

pub const AUTHOR_MAX_CHARS: usize = 100;

pub const TITLE_REQUIRED: &str = "The title field is required.";
pub const TITLE_TAKEN: &str = "The title has already been taken.";
pub const AUTHOR_REQUIRED: &str = "The author field is required.";
pub const AUTHOR_TOO_LONG: &str = "The author field must not be greater than 100 characters.";

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

/// Ordered list of rule failures for an already normalized payload.
///
/// `title_taken` is the store's answer to the uniqueness rule; it is ignored
/// when the title is missing.
pub fn field_errors(payload: &BookPayload, title_taken: bool) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match payload.title {
        None => errors.push(FieldError::new("title", TITLE_REQUIRED)),
        Some(_) if title_taken => errors.push(FieldError::new("title", TITLE_TAKEN)),
        Some(_) => {}
    }

    match &payload.author {
        None => errors.push(FieldError::new("author", AUTHOR_REQUIRED)),
        Some(author) if author.chars().count() > AUTHOR_MAX_CHARS => {
            errors.push(FieldError::new("author", AUTHOR_TOO_LONG))
        }
        Some(_) => {}
    }

    errors
}

/// Check `payload` and copy its allow-listed fields into a [`BookInput`].
pub fn validate(payload: BookPayload, title_taken: bool) -> Result<BookInput, Vec<FieldError>> {
    let errors = field_errors(&payload, title_taken);
    if !errors.is_empty() {
        return Err(errors);
    }

    match (payload.title, payload.author) {
        (Some(title), Some(author)) => Ok(BookInput {
            title,
            author,
            publisher: payload.publisher,
            publication_year: payload.publication_year,
            cover: payload.cover,
            description: payload.description,
        }),
        // field_errors already rejects a missing title or author
        _ => Err(errors),
    }
}
