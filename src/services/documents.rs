/// Document transfer service
///
/// Documents inherit the parent post's visibility; there is no per-document
/// permission. Downloads always require authentication, even for documents
/// on public posts.
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Document, Identity, Post};
use crate::services::visibility;
use crate::storage::{suggested_filename, FileStore};

/// A resolved download: raw payload plus the suggested filename.
#[derive(Debug)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

pub struct DocumentService {
    pool: PgPool,
    files: FileStore,
}

impl DocumentService {
    pub fn new(pool: PgPool, files: FileStore) -> Self {
        Self { pool, files }
    }

    pub async fn download(&self, viewer: Option<&Identity>, document_id: Uuid) -> Result<Download> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, post_id, file_key, file_name, description, created_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("document not found".to_string()))?;

        let viewer = viewer.ok_or_else(|| {
            AppError::AuthRequired("log in to download documents".to_string())
        })?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, content, is_public, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(document.post_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))?;

        let shared_with = sqlx::query_as::<_, (Uuid,)>(
            "SELECT user_id FROM post_shares WHERE post_id = $1",
        )
        .bind(post.id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(id,)| id)
        .collect::<Vec<_>>();

        if !visibility::can_view(Some(viewer), &post, &shared_with) {
            return Err(AppError::Forbidden(
                "you do not have permission to download this document".to_string(),
            ));
        }

        // Payload missing from storage is NotFound, distinct from the
        // document row being absent.
        let bytes = self.files.load(&document.file_key)?;
        let file_name = suggested_filename(&document.file_key).to_string();

        Ok(Download { bytes, file_name })
    }
}
