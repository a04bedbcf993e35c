/// Blog service library
///
/// A small blog-style web service: authenticated users create posts with
/// attached documents and control visibility (public vs shared with
/// specific users). The permission rules live in `services::visibility`;
/// everything else wraps them around PostgreSQL and local file storage.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers
/// - `models`: entities and request/response DTOs
/// - `services`: visibility resolution, post access, document transfer
/// - `storage`: document payload file store
/// - `middleware`: bearer-token identity extraction
/// - `notify`: user-facing notification seam
/// - `error`: error types and HTTP mapping
/// - `config`: configuration management
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
