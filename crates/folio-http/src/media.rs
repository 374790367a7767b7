//! Storage for uploaded post images

use async_trait::async_trait;
use image::ImageFormat;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// URL prefix stored files are served under
pub const MEDIA_URL: &str = "/media/";

/// Directory post images are stored in, relative to the media root
pub const POST_IMAGE_DIR: &str = "posts";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Where uploaded files end up
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `data` as close to `path` as possible and return the path
    /// actually used. An existing file is never overwritten.
    async fn save(&self, path: &str, data: &[u8]) -> StorageResult<String>;

    async fn exists(&self, path: &str) -> StorageResult<bool>;

    async fn get(&self, path: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Public URL of a stored path
    fn url(&self, path: &str) -> String {
        format!("{}{}", MEDIA_URL, path.trim_start_matches('/'))
    }
}

/// Reduce an uploaded file name to a safe single path segment
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Storage path for a post image upload, e.g. `posts/cat.gif`
pub fn post_image_path(file_name: &str) -> String {
    format!("{}/{}", POST_IMAGE_DIR, sanitize_file_name(file_name))
}

/// Content type of `data` if it decodes as one of the accepted image formats
pub fn decode_image_type(data: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(data).ok()?;
    let content_type = match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::WebP => "image/webp",
        _ => return None,
    };
    match image::load_from_memory_with_format(data, format) {
        Ok(_) => Some(content_type),
        Err(e) => {
            debug!("rejecting corrupt {} upload: {}", content_type, e);
            None
        }
    }
}

/// `cat.gif` -> `cat_1a2b3c4d.gif`
fn with_suffix(path: &str) -> String {
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..8];
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (format!("{}/", dir), file),
        None => (String::new(), path),
    };
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}{}_{}.{}", dir, stem, suffix, ext),
        _ => format!("{}{}_{}", dir, file, suffix),
    }
}

fn check_relative(path: &str) -> StorageResult<()> {
    let relative = Path::new(path);
    if path.is_empty()
        || relative.is_absolute()
        || relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Files under a directory on the local disk
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> StorageResult<PathBuf> {
        check_relative(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl MediaStorage for LocalStorage {
    async fn save(&self, path: &str, data: &[u8]) -> StorageResult<String> {
        let mut target = path.to_string();
        while self.exists(&target).await? {
            target = with_suffix(path);
        }
        let full = self.full_path(&target)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, data).await?;
        info!("stored upload at {}", full.display());
        Ok(target)
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let full = self.full_path(path)?;
        Ok(tokio::fs::try_exists(full).await?)
    }

    async fn get(&self, path: &str) -> StorageResult<Option<Vec<u8>>> {
        let full = self.full_path(path)?;
        match tokio::fs::read(full).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl MediaStorage for MemoryStorage {
    async fn save(&self, path: &str, data: &[u8]) -> StorageResult<String> {
        check_relative(path)?;
        let mut files = self.files.write();
        let mut target = path.to_string();
        while files.contains_key(&target) {
            target = with_suffix(path);
        }
        files.insert(target.clone(), data.to_vec());
        Ok(target)
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.files.read().contains_key(path))
    }

    async fn get(&self, path: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.files.read().get(path).cloned())
    }
}
