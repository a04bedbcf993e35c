/// Business logic layer
///
/// - Visibility resolver: pure permission rules
/// - Post service: transactional post + document operations
/// - Document service: gated payload downloads
pub mod documents;
pub mod posts;
pub mod visibility;

pub use documents::{DocumentService, Download};
pub use posts::PostService;
pub use visibility::PostFilter;
