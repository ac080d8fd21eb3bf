//! Base64 media uploads written to local storage.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use domain::models::admin::{check_media_path, MediaKind, MediaPathError};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Payload is not valid base64")]
    InvalidBase64,

    #[error("Payload is empty")]
    Empty,

    #[error("Payload exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error(transparent)]
    Path(#[from] MediaPathError),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Path(MediaPathError::WrongPrefix(_)) => {
                ApiError::Forbidden(err.to_string())
            }
            MediaError::Io(e) => ApiError::Internal(format!("Media write failed: {}", e)),
            _ => ApiError::Validation(err.to_string()),
        }
    }
}

/// Accepts raw base64 or a `data:<type>;base64,` URL.
pub fn decode_payload(payload: &str, max_bytes: usize) -> Result<Vec<u8>, MediaError> {
    let encoded = match payload.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    // Reject before decoding when the encoded size alone is too big.
    if compact.len() / 4 * 3 > max_bytes + 3 {
        return Err(MediaError::TooLarge { max: max_bytes });
    }

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| MediaError::InvalidBase64)?;
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(MediaError::TooLarge { max: max_bytes });
    }
    Ok(bytes)
}

/// Local media store rooted at `media.storage_root`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    max_bytes: usize,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validates the path and payload, then writes the file.
    pub async fn upload(
        &self,
        user_id: Uuid,
        path: &str,
        content_type: &str,
        payload: &str,
    ) -> Result<MediaKind, MediaError> {
        let kind = check_media_path(path, content_type, user_id)?;
        let bytes = decode_payload(payload, self.max_bytes)?;

        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;

        tracing::info!(
            user_id = %user_id,
            path = %path,
            bytes = bytes.len(),
            "Media uploaded"
        );
        Ok(kind)
    }
}
