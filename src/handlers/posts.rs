/// Post handlers - HTTP endpoints for post operations
///
/// Create and update take a multipart body: post text fields plus
/// zero-or-more document file parts. Each `document` file part may be
/// preceded by a `document_description` text field for the following file;
/// update additionally accepts repeated `delete_document` fields carrying
/// ids of existing documents to remove.
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, MaybeUser};
use crate::models::{DocumentUpload, PostInput};
use crate::notify::Notifier;
use crate::services::PostService;
use crate::storage::FileStore;

/// Parsed multipart create/update body.
struct PostForm {
    input: PostInput,
    documents: Vec<DocumentUpload>,
    delete_documents: Vec<Uuid>,
}

async fn read_text(field: &mut actix_multipart::Field) -> Result<String> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("multipart error: {}", e)))?;
        data.extend_from_slice(&chunk);
    }
    String::from_utf8(data)
        .map_err(|_| AppError::BadRequest("text field is not valid UTF-8".to_string()))
}

async fn read_bytes(field: &mut actix_multipart::Field) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("multipart error: {}", e)))?;
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

async fn read_post_form(mut payload: Multipart) -> Result<PostForm> {
    let mut title = String::new();
    let mut content = String::new();
    // Posts default to public, matching the data model.
    let mut is_public = true;
    let mut shared_with = Vec::new();
    let mut documents = Vec::new();
    let mut delete_documents = Vec::new();
    let mut pending_description = String::new();

    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| AppError::BadRequest(format!("multipart error: {}", e)))?;

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => title = read_text(&mut field).await?,
            "content" => content = read_text(&mut field).await?,
            "is_public" => {
                let value = read_text(&mut field).await?;
                is_public = matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "true" | "on" | "1" | "yes"
                );
            }
            "shared_with" => {
                let value = read_text(&mut field).await?;
                let id = Uuid::parse_str(value.trim()).map_err(|_| {
                    AppError::BadRequest(format!("invalid shared_with user id '{}'", value.trim()))
                })?;
                shared_with.push(id);
            }
            "document_description" => {
                pending_description = read_text(&mut field).await?;
            }
            "document" => {
                let file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or("")
                    .to_string();
                let bytes = read_bytes(&mut field).await?;
                documents.push(DocumentUpload {
                    file_name,
                    description: std::mem::take(&mut pending_description),
                    bytes,
                });
            }
            "delete_document" => {
                let value = read_text(&mut field).await?;
                let id = Uuid::parse_str(value.trim()).map_err(|_| {
                    AppError::BadRequest(format!("invalid document id '{}'", value.trim()))
                })?;
                delete_documents.push(id);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(PostForm {
        input: PostInput {
            title,
            content,
            is_public,
            shared_with,
        },
        documents,
        delete_documents,
    })
}

fn post_service(
    pool: &web::Data<PgPool>,
    files: &web::Data<FileStore>,
    notifier: &web::Data<Arc<dyn Notifier>>,
) -> PostService {
    PostService::new(
        pool.get_ref().clone(),
        files.get_ref().clone(),
        notifier.get_ref().clone(),
    )
}

/// List posts visible to the caller
/// GET /api/v1/posts
pub async fn list_posts(
    pool: web::Data<PgPool>,
    files: web::Data<FileStore>,
    notifier: web::Data<Arc<dyn Notifier>>,
    user: CurrentUser,
) -> Result<HttpResponse> {
    let posts = post_service(&pool, &files, &notifier).list(&user.0).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// Get a post by ID; public posts are served without authentication
/// GET /api/v1/posts/{post_id}
pub async fn get_post(
    pool: web::Data<PgPool>,
    files: web::Data<FileStore>,
    notifier: web::Data<Arc<dyn Notifier>>,
    post_id: web::Path<Uuid>,
    user: MaybeUser,
) -> Result<HttpResponse> {
    let post = post_service(&pool, &files, &notifier)
        .get(user.0.as_ref(), *post_id)
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Create a post with attached documents (staff only)
/// POST /api/v1/posts
pub async fn create_post(
    pool: web::Data<PgPool>,
    files: web::Data<FileStore>,
    notifier: web::Data<Arc<dyn Notifier>>,
    user: CurrentUser,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = read_post_form(payload).await?;
    let post = post_service(&pool, &files, &notifier)
        .create(&user.0, form.input, form.documents)
        .await?;
    Ok(HttpResponse::Created().json(post))
}

/// Update a post and its document set (author or superuser)
/// POST /api/v1/posts/{post_id}
pub async fn update_post(
    pool: web::Data<PgPool>,
    files: web::Data<FileStore>,
    notifier: web::Data<Arc<dyn Notifier>>,
    post_id: web::Path<Uuid>,
    user: CurrentUser,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = read_post_form(payload).await?;
    let post = post_service(&pool, &files, &notifier)
        .update(
            &user.0,
            *post_id,
            form.input,
            form.documents,
            &form.delete_documents,
        )
        .await?;
    Ok(HttpResponse::Ok().json(post))
}

/// Delete a post and its documents (author or superuser)
/// DELETE /api/v1/posts/{post_id}
pub async fn delete_post(
    pool: web::Data<PgPool>,
    files: web::Data<FileStore>,
    notifier: web::Data<Arc<dyn Notifier>>,
    post_id: web::Path<Uuid>,
    user: CurrentUser,
) -> Result<HttpResponse> {
    post_service(&pool, &files, &notifier)
        .delete(&user.0, *post_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
