//! Gate for user-supplied background media: local files and pasted URLs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Largest accepted upload, in bytes (4 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024;

/// Extensions a pasted URL may end in to be loaded directly.
const DIRECT_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp", "mp4", "webm"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm"];

/// Errors produced while validating an upload. The display text is shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Unsupported file type (image/video only).")]
    UnsupportedType,
    #[error("File too large (max 4MB).")]
    TooLarge,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Broad media family of an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Some(MediaKind::Image)
        } else if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Check a picked or dropped file before reading it.
pub fn validate_upload(mime: &str, size: u64) -> Result<MediaKind, UploadError> {
    let kind = MediaKind::from_mime(mime).ok_or(UploadError::UnsupportedType)?;
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge);
    }
    Ok(kind)
}

/// How a pasted URL should be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSource {
    /// The URL names a media file and can be handed to an element directly.
    Direct { url: Url, kind: MediaKind },
    /// Storage-bucket download link; fetch the bytes and gate them like a file.
    FetchFirst { url: Url },
}

/// Classify a pasted URL.
pub fn classify_remote_url(input: &str) -> Result<RemoteSource, UploadError> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|e| UploadError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UploadError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let is_bucket = url.host_str() == Some("firebasestorage.googleapis.com")
        || url.query_pairs().any(|(k, v)| k == "alt" && v == "media");
    if is_bucket {
        return Ok(RemoteSource::FetchFirst { url });
    }

    let extension = url
        .path()
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !DIRECT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadError::InvalidUrl(
            "URL must point to an image or video file".to_string(),
        ));
    }
    let kind = if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Video
    } else {
        MediaKind::Image
    };
    Ok(RemoteSource::Direct { url, kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_size_gate() {
        assert_eq!(validate_upload("image/png", 5 * MB), Err(UploadError::TooLarge));
        assert_eq!(validate_upload("image/png", 3 * MB), Ok(MediaKind::Image));
        assert_eq!(validate_upload("image/png", 4 * MB), Ok(MediaKind::Image));
        assert_eq!(validate_upload("video/webm", 3 * MB), Ok(MediaKind::Video));
    }

    #[test]
    fn test_type_gate() {
        assert_eq!(
            validate_upload("application/pdf", MB),
            Err(UploadError::UnsupportedType)
        );
        assert_eq!(validate_upload("", MB), Err(UploadError::UnsupportedType));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            UploadError::UnsupportedType.to_string(),
            "Unsupported file type (image/video only)."
        );
        assert_eq!(UploadError::TooLarge.to_string(), "File too large (max 4MB).");
    }

    #[test]
    fn test_remote_direct() {
        match classify_remote_url("https://example.com/cat.JPG").unwrap() {
            RemoteSource::Direct { kind, .. } => assert_eq!(kind, MediaKind::Image),
            other => panic!("unexpected {other:?}"),
        }
        match classify_remote_url("https://example.com/clip.webm").unwrap() {
            RemoteSource::Direct { kind, .. } => assert_eq!(kind, MediaKind::Video),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_remote_bucket() {
        let url = "https://firebasestorage.googleapis.com/v0/b/app/o/img?alt=media&token=x";
        assert!(matches!(
            classify_remote_url(url),
            Ok(RemoteSource::FetchFirst { .. })
        ));
        assert!(matches!(
            classify_remote_url("https://cdn.example.com/object?alt=media"),
            Ok(RemoteSource::FetchFirst { .. })
        ));
    }

    #[test]
    fn test_remote_rejected() {
        assert!(classify_remote_url("not a url").is_err());
        assert!(classify_remote_url("https://example.com/page.html").is_err());
        assert!(classify_remote_url("ftp://example.com/cat.png").is_err());
    }
}
