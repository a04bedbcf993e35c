/// Document payload storage
///
/// Payloads live on local disk under a configured root directory. Each
/// stored payload gets a uuid-prefixed key so colliding upload names never
/// overwrite each other; the original filename survives in the document row.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("file payload '{0}' is missing")]
    Missing(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Local-disk file store for document payloads.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Persist a payload and return its storage key.
    ///
    /// The key embeds the original filename's final path segment so the
    /// download handler can derive a suggested filename from it.
    pub fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let base = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        let key = format!("{}_{}", Uuid::new_v4(), base);
        fs::write(self.path_for(&key), bytes)?;
        Ok(key)
    }

    /// Load a payload by key. Absent payloads are a distinct error from
    /// other I/O failures.
    pub fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::Missing(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a payload; missing files are not an error.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Suggested download filename: the final path segment of the stored key,
/// with the uuid prefix stripped back off.
pub fn suggested_filename(key: &str) -> &str {
    let base = key.rsplit('/').next().unwrap_or(key);
    match base.split_once('_') {
        Some((prefix, rest)) if Uuid::parse_str(prefix).is_ok() && !rest.is_empty() => rest,
        _ => base,
    }
}
