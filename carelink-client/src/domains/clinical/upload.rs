use std::fmt;
use std::path::Path;

use crate::infrastructure::errors::ValidationError;

/// Largest accepted upload, inclusive.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Content types the analysis pipeline accepts.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "application/pdf",
];

/// A scanned report or prescription held in memory for upload.
#[derive(Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FileUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file and guess its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mime = self.content_type.trim().to_ascii_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&mime.as_str()) {
            return Err(ValidationError::UnsupportedFileType {
                mime: self.content_type.clone(),
            });
        }
        if self.is_empty() {
            return Err(ValidationError::EmptyFile);
        }
        if self.len() > MAX_UPLOAD_BYTES {
            return Err(ValidationError::FileTooLarge {
                size: self.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }
        Ok(())
    }
}
