/// Document download handler
use actix_web::{http::header, web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::MaybeUser;
use crate::services::DocumentService;
use crate::storage::FileStore;

/// Stream a document payload
/// GET /api/v1/documents/{document_id}/download
///
/// Served `inline` with the suggested filename, as an octet stream. The
/// service rejects anonymous callers after confirming the document exists,
/// so a missing document is 404 rather than 401.
pub async fn download_document(
    pool: web::Data<PgPool>,
    files: web::Data<FileStore>,
    document_id: web::Path<Uuid>,
    user: MaybeUser,
) -> Result<HttpResponse> {
    let service = DocumentService::new(pool.get_ref().clone(), files.get_ref().clone());
    let download = service.download(user.0.as_ref(), *document_id).await?;

    Ok(HttpResponse::Ok()
        .content_type(mime::APPLICATION_OCTET_STREAM)
        .insert_header((
            header::CONTENT_DISPOSITION,
            content_disposition(&download.file_name),
        ))
        .body(download.bytes))
}

/// Quote the filename so spaces and separators survive the header grammar.
/// Quotes and backslashes inside the name would break the quoted-string, so
/// they are replaced rather than escaped.
fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("inline; filename=\"{safe}\"")
}
