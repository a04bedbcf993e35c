/// Data models for the blog service
///
/// This module defines structures for:
/// - Identity: the authenticated caller as provided by the identity token
/// - Post: a blog post with public/shared visibility
/// - Document: a file attachment owned by a post
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Authenticated caller attributes decoded from the identity token.
///
/// The identity provider is external; this record is all the service
/// knows about a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Post database entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Document database entity
///
/// `file_key` references the payload in the file store; `file_name` is the
/// original upload name, used for the download Content-Disposition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub post_id: Uuid,
    pub file_key: String,
    pub file_name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Post fields accepted on create and update
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PostInput {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    pub is_public: bool,
    /// Users granted view access while the post is private
    #[serde(default)]
    pub shared_with: Vec<Uuid>,
}

/// A document file received in a create/update request, payload included
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub description: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    /// An upload is valid when it carries a filename, a non-empty payload
    /// and a description that fits the column.
    pub fn validate(&self) -> Result<(), String> {
        if self.file_name.trim().is_empty() {
            return Err("document is missing a file name".to_string());
        }
        if self.bytes.is_empty() {
            return Err(format!("document '{}' is empty", self.file_name));
        }
        if self.description.chars().count() > 255 {
            return Err(format!(
                "document '{}' description is longer than 255 characters",
                self.file_name
            ));
        }
        Ok(())
    }
}

/// Document response DTO
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub file_name: String,
    pub description: String,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            file_name: document.file_name,
            description: document.description,
        }
    }
}

/// Post response DTO, including the attached documents and share set
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_public: bool,
    pub shared_with: Vec<Uuid>,
    pub documents: Vec<DocumentResponse>,
    pub created_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn from_entities(post: Post, shared_with: Vec<Uuid>, documents: Vec<Document>) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            is_public: post.is_public,
            shared_with,
            documents: documents.into_iter().map(Into::into).collect(),
            created_at: post.created_at,
        }
    }
}

/// Post listing entry DTO (no documents or share set, single fetch)
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            is_public: post.is_public,
            created_at: post.created_at,
        }
    }
}
