use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// A stored book, serialized with every column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "title": "Ketika Cinta Bertasbih",
    "author": "Habiburrahman El Shirazy",
    "publisher": "Republika",
    "publication_year": "2007",
    "cover": "https://example.com/covers/kcb.jpg",
    "description": "A novel about a student at Al-Azhar University in Cairo.",
    "created_at": "2024-01-01 00:00:00",
    "updated_at": "2024-01-01 00:00:00"
}))]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_year: Option<String>,
    pub cover: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body accepted by create and update.
///
/// Only these keys are read; anything else in the body (`id`, timestamps,
/// unknown columns) is dropped during decoding. For the optional columns the
/// outer `Option` records whether the key was sent at all, so an update can
/// tell "leave as is" from "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[schema(example = json!({
    "title": "Ketika Cinta Bertasbih",
    "author": "Habiburrahman El Shirazy",
    "publisher": "Republika",
    "publication_year": "2007",
    "cover": "https://example.com/covers/kcb.jpg",
    "description": "A novel about a student at Al-Azhar University in Cairo."
}))]
pub struct BookPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "sent")]
    #[schema(value_type = Option<String>)]
    pub publisher: Option<Option<String>>,
    #[serde(default, deserialize_with = "sent_year")]
    #[schema(value_type = Option<String>)]
    pub publication_year: Option<Option<String>>,
    #[serde(default, deserialize_with = "sent")]
    #[schema(value_type = Option<String>)]
    pub cover: Option<Option<String>>,
    #[serde(default, deserialize_with = "sent")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
}

impl BookPayload {
    /// Trim every string and turn blank strings into nulls.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.and_then(non_blank),
            author: self.author.and_then(non_blank),
            publisher: self.publisher.map(|v| v.and_then(non_blank)),
            publication_year: self.publication_year.map(|v| v.and_then(non_blank)),
            cover: self.cover.map(|v| v.and_then(non_blank)),
            description: self.description.map(|v| v.and_then(non_blank)),
        }
    }
}

/// Validated, allow-listed column values ready to be written.
///
/// Optional columns keep the payload's two-level shape: `None` means the key
/// was absent (insert writes NULL, update keeps the stored value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    pub publisher: Option<Option<String>>,
    pub publication_year: Option<Option<String>>,
    pub cover: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

/// Body of the update and delete confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

fn sent<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Year {
    Text(String),
    Number(i64),
}

fn sent_year<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let year = Option::<Year>::deserialize(deserializer)?;
    Ok(Some(year.map(|year| match year {
        Year::Text(text) => text,
        Year::Number(number) => number.to_string(),
    })))
}
