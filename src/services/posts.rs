/// Post access service - wraps visibility checks around storage operations
///
/// All mutating operations evaluate authorization and validation before any
/// write begins, then apply the post row, share rows, and document rows as
/// one transaction. Document payloads are staged to the file store first and
/// unlinked again when the transaction does not commit.
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{AppError, Result};
use crate::models::{Document, DocumentUpload, Identity, Post, PostInput, PostResponse, PostSummary};
use crate::notify::{Notifier, NotifyKind};
use crate::services::visibility::{self, PostFilter};
use crate::storage::FileStore;

/// A document payload written to the file store ahead of the transaction.
struct StagedDocument {
    key: String,
    file_name: String,
    description: String,
}

pub struct PostService {
    pool: PgPool,
    files: FileStore,
    notifier: Arc<dyn Notifier>,
}

impl PostService {
    pub fn new(pool: PgPool, files: FileStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pool,
            files,
            notifier,
        }
    }

    /// List posts visible to the caller, newest first.
    ///
    /// The EXISTS clause on the share table keeps a post that is both
    /// public and shared with the caller from appearing twice.
    pub async fn list(&self, viewer: &Identity) -> Result<Vec<PostSummary>> {
        let posts = match visibility::list_filter(viewer) {
            PostFilter::All => {
                sqlx::query_as::<_, Post>(
                    r#"
                    SELECT id, author_id, title, content, is_public, created_at
                    FROM posts
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
            PostFilter::PublicOrSharedWith(user_id) => {
                sqlx::query_as::<_, Post>(
                    r#"
                    SELECT p.id, p.author_id, p.title, p.content, p.is_public, p.created_at
                    FROM posts p
                    WHERE p.is_public
                       OR EXISTS (
                              SELECT 1 FROM post_shares s
                              WHERE s.post_id = p.id AND s.user_id = $1
                          )
                    ORDER BY p.created_at DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(posts.into_iter().map(Into::into).collect())
    }

    /// Get a single post. Public posts are served to anonymous callers;
    /// a private post yields 401 for anonymous and 403 for unauthorized
    /// authenticated callers.
    pub async fn get(&self, viewer: Option<&Identity>, post_id: Uuid) -> Result<PostResponse> {
        let post = self.fetch_post(post_id).await?;
        let shared_with = self.fetch_shared_with(post_id).await?;

        if !visibility::can_view(viewer, &post, &shared_with) {
            return Err(match viewer {
                None => AppError::AuthRequired("log in to view this post".to_string()),
                Some(_) => {
                    AppError::Forbidden("you do not have permission to view this post".to_string())
                }
            });
        }

        let documents = self.fetch_documents(post_id).await?;
        Ok(PostResponse::from_entities(post, shared_with, documents))
    }

    /// Create a post with its documents. All-or-nothing: if any document
    /// fails validation or any write fails, nothing persists.
    pub async fn create(
        &self,
        viewer: &Identity,
        input: PostInput,
        documents: Vec<DocumentUpload>,
    ) -> Result<PostResponse> {
        if !visibility::can_create(viewer) {
            self.notifier.notify(
                NotifyKind::Error,
                "You do not have permission to create posts.",
            );
            return Err(AppError::Forbidden(
                "you do not have permission to create posts".to_string(),
            ));
        }

        input.validate()?;
        validate_documents(&documents)?;
        let shared_with = normalize_shares(viewer.id, &input.shared_with);

        let staged = self.stage_documents(&documents)?;

        let result = self
            .insert_post(viewer.id, &input, &shared_with, &staged)
            .await;

        match result {
            Ok((post, rows)) => {
                self.notifier
                    .notify(NotifyKind::Success, "Post created successfully!");
                Ok(PostResponse::from_entities(post, shared_with, rows))
            }
            Err(err) => {
                self.discard_staged(&staged);
                self.notifier
                    .notify(NotifyKind::Error, "Post could not be created.");
                Err(err)
            }
        }
    }

    /// Update a post: field changes, the replaced share set, document
    /// additions and deletions all commit as one transaction.
    ///
    /// Concurrent edits to the same post are last-write-wins; there is no
    /// version token.
    pub async fn update(
        &self,
        viewer: &Identity,
        post_id: Uuid,
        input: PostInput,
        new_documents: Vec<DocumentUpload>,
        delete_documents: &[Uuid],
    ) -> Result<PostResponse> {
        let post = self.fetch_post(post_id).await?;

        if !visibility::can_modify(viewer, &post) {
            self.notifier.notify(
                NotifyKind::Error,
                "You do not have permission to edit this post.",
            );
            return Err(AppError::Forbidden(
                "you do not have permission to edit this post".to_string(),
            ));
        }

        input.validate()?;
        validate_documents(&new_documents)?;
        let shared_with = normalize_shares(post.author_id, &input.shared_with);

        // Only documents that actually belong to this post are deletable.
        let existing = self.fetch_documents(post_id).await?;
        let requested: BTreeSet<Uuid> = delete_documents.iter().copied().collect();
        let doomed: Vec<&Document> = existing
            .iter()
            .filter(|d| requested.contains(&d.id))
            .collect();
        let doomed_ids: Vec<Uuid> = doomed.iter().map(|d| d.id).collect();
        let doomed_keys: Vec<String> = doomed.iter().map(|d| d.file_key.clone()).collect();

        let staged = self.stage_documents(&new_documents)?;

        let result = self
            .apply_update(post_id, &input, &shared_with, &staged, &doomed_ids)
            .await;

        match result {
            Ok(post) => {
                // Removed payloads go only after the transaction commits.
                for key in &doomed_keys {
                    if let Err(err) = self.files.remove(key) {
                        tracing::debug!(%key, "payload removal failed: {}", err);
                    }
                }
                let documents = self.fetch_documents(post_id).await?;
                self.notifier
                    .notify(NotifyKind::Success, "Post updated successfully!");
                Ok(PostResponse::from_entities(post, shared_with, documents))
            }
            Err(err) => {
                self.discard_staged(&staged);
                self.notifier
                    .notify(NotifyKind::Error, "Post could not be updated.");
                Err(err)
            }
        }
    }

    /// Delete a post. Share rows and document rows go with it (cascade);
    /// payloads are unlinked after the row delete succeeds.
    pub async fn delete(&self, viewer: &Identity, post_id: Uuid) -> Result<()> {
        let post = self.fetch_post(post_id).await?;

        if !visibility::can_modify(viewer, &post) {
            self.notifier.notify(
                NotifyKind::Error,
                "You do not have permission to delete this post.",
            );
            return Err(AppError::Forbidden(
                "you do not have permission to delete this post".to_string(),
            ));
        }

        let documents = self.fetch_documents(post_id).await?;

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        for document in &documents {
            if let Err(err) = self.files.remove(&document.file_key) {
                tracing::debug!(key = %document.file_key, "payload removal failed: {}", err);
            }
        }

        self.notifier
            .notify(NotifyKind::Success, "Post deleted successfully!");
        Ok(())
    }

    async fn fetch_post(&self, post_id: Uuid) -> Result<Post> {
        sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, content, is_public, created_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))
    }

    async fn fetch_shared_with(&self, post_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            "SELECT user_id FROM post_shares WHERE post_id = $1 ORDER BY user_id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn fetch_documents(&self, post_id: Uuid) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, post_id, file_key, file_name, description, created_at
            FROM documents
            WHERE post_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents)
    }

    fn stage_documents(&self, documents: &[DocumentUpload]) -> Result<Vec<StagedDocument>> {
        let mut staged = Vec::with_capacity(documents.len());
        for upload in documents {
            match self.files.save(&upload.file_name, &upload.bytes) {
                Ok(key) => staged.push(StagedDocument {
                    key,
                    file_name: upload.file_name.clone(),
                    description: upload.description.clone(),
                }),
                Err(err) => {
                    self.discard_staged(&staged);
                    return Err(AppError::Internal(format!(
                        "failed to store document '{}': {}",
                        upload.file_name, err
                    )));
                }
            }
        }
        Ok(staged)
    }

    fn discard_staged(&self, staged: &[StagedDocument]) {
        for doc in staged {
            if let Err(err) = self.files.remove(&doc.key) {
                tracing::debug!(key = %doc.key, "staged payload removal failed: {}", err);
            }
        }
    }

    async fn insert_post(
        &self,
        author_id: Uuid,
        input: &PostInput,
        shared_with: &[Uuid],
        staged: &[StagedDocument],
    ) -> Result<(Post, Vec<Document>)> {
        let mut tx = self.pool.begin().await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (author_id, title, content, is_public)
            VALUES ($1, $2, $3, $4)
            RETURNING id, author_id, title, content, is_public, created_at
            "#,
        )
        .bind(author_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.is_public)
        .fetch_one(&mut *tx)
        .await?;

        for user_id in shared_with {
            sqlx::query("INSERT INTO post_shares (post_id, user_id) VALUES ($1, $2)")
                .bind(post.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let mut rows = Vec::with_capacity(staged.len());
        for doc in staged {
            let row = sqlx::query_as::<_, Document>(
                r#"
                INSERT INTO documents (post_id, file_key, file_name, description)
                VALUES ($1, $2, $3, $4)
                RETURNING id, post_id, file_key, file_name, description, created_at
                "#,
            )
            .bind(post.id)
            .bind(&doc.key)
            .bind(&doc.file_name)
            .bind(&doc.description)
            .fetch_one(&mut *tx)
            .await?;
            rows.push(row);
        }

        tx.commit().await?;
        Ok((post, rows))
    }

    async fn apply_update(
        &self,
        post_id: Uuid,
        input: &PostInput,
        shared_with: &[Uuid],
        staged: &[StagedDocument],
        delete_ids: &[Uuid],
    ) -> Result<Post> {
        let mut tx = self.pool.begin().await?;

        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET title = $1, content = $2, is_public = $3
            WHERE id = $4
            RETURNING id, author_id, title, content, is_public, created_at
            "#,
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.is_public)
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM post_shares WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        for user_id in shared_with {
            sqlx::query("INSERT INTO post_shares (post_id, user_id) VALUES ($1, $2)")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        if !delete_ids.is_empty() {
            sqlx::query("DELETE FROM documents WHERE post_id = $1 AND id = ANY($2)")
                .bind(post_id)
                .bind(delete_ids)
                .execute(&mut *tx)
                .await?;
        }

        for doc in staged {
            sqlx::query(
                r#"
                INSERT INTO documents (post_id, file_key, file_name, description)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(post_id)
            .bind(&doc.key)
            .bind(&doc.file_name)
            .bind(&doc.description)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(post)
    }
}

/// The author never shares a post with themselves; duplicates collapse.
fn normalize_shares(author_id: Uuid, requested: &[Uuid]) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    requested
        .iter()
        .copied()
        .filter(|id| *id != author_id && seen.insert(*id))
        .collect()
}

/// Every document must pass before anything persists.
fn validate_documents(documents: &[DocumentUpload]) -> Result<()> {
    let mut errors = ValidationErrors::new();
    for upload in documents {
        if let Err(message) = upload.validate() {
            let mut error = ValidationError::new("document");
            error.message = Some(message.into());
            errors.add("documents", error);
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_author_and_duplicates() {
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();

        let shares = normalize_shares(author, &[author, other, other]);
        assert_eq!(shares, vec![other]);
    }

    #[test]
    fn one_bad_document_fails_the_set() {
        let good = DocumentUpload {
            file_name: "notes.txt".to_string(),
            description: String::new(),
            bytes: b"data".to_vec(),
        };
        let bad = DocumentUpload {
            file_name: "empty.txt".to_string(),
            description: String::new(),
            bytes: Vec::new(),
        };

        assert!(validate_documents(&[good.clone()]).is_ok());
        assert!(matches!(
            validate_documents(&[good, bad]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn overlong_description_is_rejected() {
        let upload = DocumentUpload {
            file_name: "notes.txt".to_string(),
            description: "d".repeat(300),
            bytes: b"data".to_vec(),
        };

        assert!(matches!(
            validate_documents(&[upload]),
            Err(AppError::Validation(_))
        ));
    }
}
