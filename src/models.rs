//! Core data models.
//!
//! Upload metadata persisted by the document store, the JSON request and
//! response bodies of the HTTP API, and the chat turns exchanged with the
//! QA provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one completed upload, as stored.
///
/// `id` is assigned by the [`DocumentStore`](crate::store::DocumentStore)
/// at insertion time; callers only ever construct a [`NewDocument`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub id: String,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
}

/// An upload record before the store has assigned it an id.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub upload_date: DateTime<Utc>,
}

impl NewDocument {
    /// A record stamped with the current time.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            upload_date: Utc::now(),
        }
    }
}

/// Body of `POST /ask/`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuestionRequest {
    pub filename: String,
    pub question: String,
}

/// Body returned by `POST /upload/`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub content: String,
    pub document_id: String,
}

/// Body returned by `POST /ask/`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
}

/// Speaker of a [`ChatTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One turn of a QA conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}
