//! # Incident Attachments
//!
//! A report may carry one photo. The queue persists through a string-valued
//! store, so photos are kept base64-encoded while queued and decoded back to
//! bytes right before delivery.
//!
//! Encoding and decoding run on the blocking pool: phone photos are several
//! megabytes and would otherwise stall the async workers.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fallback name used when the source does not carry one
pub const DEFAULT_FILE_NAME: &str = "incident-photo.jpg";
/// Fallback content type used when the source does not carry one
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Attachment encoding/decoding failures
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Source file could not be read
    #[error("failed to read attachment {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored text is not valid base64
    #[error("corrupt attachment data: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Conversion task panicked or was cancelled
    #[error("attachment conversion task failed: {0}")]
    Task(String),
}

/// Attachment in transport form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read an attachment from disk, guessing the content type from the extension
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|source| AttachmentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
        Ok(Self {
            content_type: content_type_for(path).to_string(),
            file_name,
            data,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Where the photo of a new report comes from
#[derive(Debug, Clone)]
pub enum AttachmentSource {
    /// Bytes already in memory (camera capture, upload widget)
    InMemory(Attachment),
    /// File on the device
    File(PathBuf),
}

impl AttachmentSource {
    /// Load the attachment in transport form
    pub async fn load(self) -> Result<Attachment, AttachmentError> {
        match self {
            AttachmentSource::InMemory(attachment) => Ok(attachment),
            AttachmentSource::File(path) => Attachment::from_path(path).await,
        }
    }
}

impl From<Attachment> for AttachmentSource {
    fn from(attachment: Attachment) -> Self {
        AttachmentSource::InMemory(attachment)
    }
}

impl From<PathBuf> for AttachmentSource {
    fn from(path: PathBuf) -> Self {
        AttachmentSource::File(path)
    }
}

/// Attachment in storable text form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAttachment {
    pub file_name: String,
    pub content_type: String,
    /// Standard base64 of the raw bytes
    pub data: String,
}

impl StoredAttachment {
    /// Load and encode an attachment for storage
    pub async fn encode(source: AttachmentSource) -> Result<Self, AttachmentError> {
        let attachment = source.load().await?;
        tokio::task::spawn_blocking(move || StoredAttachment {
            data: BASE64.encode(&attachment.data),
            file_name: attachment.file_name,
            content_type: attachment.content_type,
        })
        .await
        .map_err(|e| AttachmentError::Task(e.to_string()))
    }

    /// Reconstitute the transport form
    pub async fn decode(&self) -> Result<Attachment, AttachmentError> {
        let encoded = self.data.clone();
        let data = tokio::task::spawn_blocking(move || BASE64.decode(encoded.as_bytes()))
            .await
            .map_err(|e| AttachmentError::Task(e.to_string()))??;
        Ok(Attachment {
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            data,
        })
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}
