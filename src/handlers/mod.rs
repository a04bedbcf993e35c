/// HTTP handlers for the blog service
///
/// - Posts: list, detail, multipart create/update, delete
/// - Documents: gated payload download
pub mod documents;
pub mod posts;

pub use documents::download_document;
pub use posts::{create_post, delete_post, get_post, list_posts, update_post};
