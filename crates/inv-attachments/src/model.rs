//! Photo attachment model

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Content type reported when an upload gives no usable hint
pub const DEFAULT_PHOTO_CONTENT_TYPE: &str = "image/jpeg";

/// A photo payload received from a client, not yet stored
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub data: Bytes,
    /// Filename as sent by the client
    pub filename: Option<String>,
    /// Content type as declared by the client
    pub content_type: Option<String>,
}

impl PhotoUpload {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            filename: None,
            content_type: None,
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Content type to record for this upload.
    ///
    /// Only `image/*` types are ever recorded: the declared type if it is
    /// one, then a guess from the filename, otherwise JPEG.
    pub fn resolved_content_type(&self) -> String {
        if let Some(declared) = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.trim().parse::<mime_guess::mime::Mime>().ok())
            .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        {
            return declared.essence_str().to_string();
        }

        self.filename
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first())
            .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
            .map(|mime| mime.to_string())
            .unwrap_or_else(|| DEFAULT_PHOTO_CONTENT_TYPE.to_string())
    }
}

/// Reference to a stored photo object.
///
/// `key` is the storage handle; it is never shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPhoto {
    pub key: String,
    pub content_type: String,
    pub size: u64,
    /// SHA256 digest, hex encoded
    pub digest: String,
}

impl StoredPhoto {
    /// Strong entity tag derived from the content digest
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.digest)
    }
}
