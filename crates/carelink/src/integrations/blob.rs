use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{RequirementType, WorkerId};

/// Location of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("invalid blob key '{0}'")]
    InvalidKey(String),
    #[error("blob '{0}' not found")]
    NotFound(String),
    #[error("blob storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage seam for uploaded verification documents.
pub trait BlobStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<StoredBlob, BlobError>;
    /// Deleting a missing blob is not an error.
    fn delete(&self, key: &str) -> Result<(), BlobError>;
}

/// Filesystem-backed store; blobs are served from `public_base_url/<key>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Result<Self, BlobError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    pub fn read(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(key)?;
        fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => BlobError::NotFound(key.to_string()),
            _ => BlobError::Io(err),
        })
    }

    /// Maps a key onto the root, refusing anything that could escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for LocalBlobStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<StoredBlob, BlobError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;

        Ok(StoredBlob {
            key: key.to_string(),
            url: self.url_for(key),
            size: bytes.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    fn delete(&self, key: &str) -> Result<(), BlobError> {
        let path = self.resolve(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BlobError::Io(err)),
        }
    }
}

/// `workers/<worker>/<requirement type>/<unique>-<file name>`, with unsafe characters replaced.
pub fn document_key(worker_id: WorkerId, kind: &RequirementType, file_name: &str) -> String {
    format!(
        "workers/{worker_id}/{}/{}-{}",
        sanitize_segment(kind.as_str()),
        Uuid::new_v4().simple(),
        sanitize_segment(file_name)
    )
}

fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
