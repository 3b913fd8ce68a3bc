//! On-disk storage for listing images.
//!
//! Uploads are validated as a batch before anything touches the disk. Stored
//! names are generated here and never derived from the client's filename.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Only JPEG or PNG images are accepted (got {0})")]
    UnsupportedType(String),

    #[error("File {name} exceeds the maximum size of {max} bytes")]
    TooLarge { name: String, max: usize },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Too many files: at most {0} per request")]
    TooManyFiles(usize),

    #[error("Image not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Result<Self, UploadError> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "image/jpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            _ => Err(UploadError::UnsupportedType(content_type.to_string())),
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// One file part received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Reduces a client-supplied name to a single safe path component.
///
/// Keeps the part after the last `/`, refuses backslashes outright, drops
/// anything outside `[A-Za-z0-9._-]` and collapses runs of dots.
pub fn sanitize_filename(raw: &str) -> Result<String, UploadError> {
    if raw.contains('\\') {
        return Err(UploadError::InvalidFilename(
            "backslashes are not allowed".to_string(),
        ));
    }

    let base = raw.rsplit('/').next().unwrap_or_default();

    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
            continue;
        }
        if c == '.' && cleaned.ends_with('.') {
            continue;
        }
        cleaned.push(c);
    }

    if cleaned.is_empty() || cleaned == "." {
        return Err(UploadError::InvalidFilename(
            "filename is empty after sanitization".to_string(),
        ));
    }

    Ok(cleaned)
}

pub struct ImageStorage {
    dir: PathBuf,
    max_file_size: usize,
    max_files: usize,
}

impl ImageStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_file_size: usize, max_files: usize) -> Self {
        Self {
            dir: dir.into(),
            max_file_size,
            max_files,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub async fn ensure_dir(&self) -> Result<(), UploadError> {
        if !fs::try_exists(&self.dir).await.unwrap_or(false) {
            fs::create_dir_all(&self.dir).await?;
            info!(path = %self.dir.display(), "Created images directory");
        }
        Ok(())
    }

    /// Checks type, size and client filename of one upload.
    pub fn validate(&self, file: &UploadedFile) -> Result<ImageKind, UploadError> {
        let kind = ImageKind::from_content_type(&file.content_type)?;

        let name = match &file.original_name {
            Some(raw) => sanitize_filename(raw)?,
            None => "upload".to_string(),
        };

        if file.bytes.len() > self.max_file_size {
            return Err(UploadError::TooLarge {
                name,
                max: self.max_file_size,
            });
        }

        Ok(kind)
    }

    /// Validates every file, then writes them all under fresh names.
    /// If a write fails, files already written by this call are removed.
    pub async fn save_all(&self, files: &[UploadedFile]) -> Result<Vec<String>, UploadError> {
        if files.len() > self.max_files {
            return Err(UploadError::TooManyFiles(self.max_files));
        }

        let kinds = files
            .iter()
            .map(|f| self.validate(f))
            .collect::<Result<Vec<_>, _>>()?;

        if files.is_empty() {
            return Ok(Vec::new());
        }

        self.ensure_dir().await?;

        let mut saved = Vec::with_capacity(files.len());
        for (file, kind) in files.iter().zip(kinds) {
            let name = format!("{}.{}", uuid::Uuid::new_v4().simple(), kind.extension());
            if let Err(e) = fs::write(self.dir.join(&name), &file.bytes).await {
                self.remove_all(&saved).await;
                return Err(e.into());
            }
            saved.push(name);
        }

        Ok(saved)
    }

    /// Best-effort removal; failures are logged and otherwise ignored.
    pub async fn remove_all(&self, names: &[String]) {
        for name in names {
            let Ok(safe) = sanitize_filename(name) else {
                continue;
            };
            if let Err(e) = fs::remove_file(self.dir.join(&safe)).await {
                warn!(file = %safe, error = %e, "Failed to remove image file");
            }
        }
    }

    /// Reads a stored image by its (sanitized) name.
    pub async fn read(&self, requested: &str) -> Result<(Vec<u8>, String), UploadError> {
        let name = sanitize_filename(requested)?;
        let path = self.dir.join(&name);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UploadError::NotFound);
            }
            Err(e) if e.kind() == std::io::ErrorKind::IsADirectory => {
                return Err(UploadError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };

        let mime = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();

        Ok((bytes, mime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("shoreline-images-{}", uuid::Uuid::new_v4()))
    }

    fn jpeg(name: &str, size: usize) -> UploadedFile {
        UploadedFile {
            original_name: Some(name.to_string()),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF; size],
        }
    }

    #[test]
    fn test_sanitize_keeps_safe_names() {
        assert_eq!(sanitize_filename("imagem.jpg").unwrap(), "imagem.jpg");
        assert_eq!(sanitize_filename("a_b-c.PNG").unwrap(), "a_b-c.PNG");
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_filename("../../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("path/to/file.jpg").unwrap(), "file.jpg");
        assert_eq!(sanitize_filename("imagem../test.jpg").unwrap(), "test.jpg");
    }

    #[test]
    fn test_sanitize_collapses_dots_and_specials() {
        assert_eq!(sanitize_filename("a..b.jpg").unwrap(), "a.b.jpg");
        let cleaned = sanitize_filename("imagem@#$%test.jpg").unwrap();
        assert_eq!(cleaned, "imagemtest.jpg");
        assert_eq!(sanitize_filename("x....png").unwrap(), "x.png");
    }

    #[test]
    fn test_sanitize_rejects() {
        assert!(matches!(
            sanitize_filename("path\\to\\file.jpg"),
            Err(UploadError::InvalidFilename(_))
        ));
        assert!(sanitize_filename("@@@###").is_err());
        assert!(sanitize_filename("dir/").is_err());
        assert!(sanitize_filename("..").is_err());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(
            ImageKind::from_content_type("image/jpeg").unwrap(),
            ImageKind::Jpeg
        );
        assert_eq!(
            ImageKind::from_content_type("IMAGE/PNG; charset=binary").unwrap(),
            ImageKind::Png
        );
        assert!(ImageKind::from_content_type("image/gif").is_err());
        assert!(ImageKind::from_content_type("text/plain").is_err());
    }

    #[tokio::test]
    async fn test_save_all_generates_unique_names() {
        let dir = temp_dir();
        let storage = ImageStorage::new(&dir, 1024, 10);

        let saved = storage
            .save_all(&[jpeg("../../evil.jpg", 10), jpeg("a.jpg", 10)])
            .await
            .unwrap();

        assert_eq!(saved.len(), 2);
        assert_ne!(saved[0], saved[1]);
        for name in &saved {
            assert!(name.ends_with(".jpg"));
            assert!(!name.contains('/'));
            assert!(dir.join(name).exists());
        }

        let (bytes, mime) = storage.read(&saved[0]).await.unwrap();
        assert_eq!(bytes.len(), 10);
        assert_eq!(mime, "image/jpeg");

        storage.remove_all(&saved).await;
        assert!(!dir.join(&saved[0]).exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_invalid_batch_writes_nothing() {
        let dir = temp_dir();
        let storage = ImageStorage::new(&dir, 1024, 10);

        let gif = UploadedFile {
            original_name: Some("x.gif".to_string()),
            content_type: "image/gif".to_string(),
            bytes: vec![1, 2, 3],
        };
        let result = storage.save_all(&[jpeg("ok.jpg", 10), gif]).await;
        assert!(matches!(result, Err(UploadError::UnsupportedType(_))));
        assert!(!dir.exists());

        let result = storage.save_all(&[jpeg("big.jpg", 2048)]).await;
        assert!(matches!(result, Err(UploadError::TooLarge { .. })));
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_too_many_files() {
        let storage = ImageStorage::new(temp_dir(), 1024, 1);
        let result = storage
            .save_all(&[jpeg("a.jpg", 1), jpeg("b.jpg", 1)])
            .await;
        assert!(matches!(result, Err(UploadError::TooManyFiles(1))));
    }

    #[tokio::test]
    async fn test_read_missing_and_traversal() {
        let storage = ImageStorage::new(temp_dir(), 1024, 10);
        assert!(matches!(
            storage.read("nope.jpg").await,
            Err(UploadError::NotFound)
        ));
        assert!(matches!(
            storage.read("../../../etc/passwd").await,
            Err(UploadError::NotFound)
        ));
    }
}
