//! Profile media store: avatar and banner images on the local filesystem.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::AppError;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Avatar,
    Banner,
}

impl MediaKind {
    pub fn max_bytes(&self) -> usize {
        match self {
            Self::Avatar => 5 * MIB,
            Self::Banner => 10 * MIB,
        }
    }

    fn dir(&self) -> &'static str {
        match self {
            Self::Avatar => "avatars",
            Self::Banner => "banners",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageFormat {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects the format from the file signature.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }
}

/// Checks size, declared type and file signature of an upload.
pub fn validate_image(
    kind: MediaKind,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<ImageFormat, AppError> {
    const ALLOWED: &str = "Only JPG, PNG, WEBP or GIF images are allowed";

    if bytes.is_empty() {
        return Err(AppError::Validation("No file uploaded".to_string()));
    }
    if bytes.len() > kind.max_bytes() {
        return Err(AppError::PayloadTooLarge(format!(
            "File is too large (max {} MB)",
            kind.max_bytes() / MIB
        )));
    }

    let declared = content_type
        .and_then(ImageFormat::from_content_type)
        .ok_or_else(|| AppError::UnsupportedMedia(ALLOWED.to_string()))?;
    let actual =
        ImageFormat::sniff(bytes).ok_or_else(|| AppError::UnsupportedMedia(ALLOWED.to_string()))?;

    if declared != actual {
        tracing::debug!(?declared, ?actual, "Upload content type does not match file signature");
    }

    Ok(actual)
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Validates and writes an image, returning its public URL.
    pub async fn store(
        &self,
        kind: MediaKind,
        user_id: i64,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let format = validate_image(kind, content_type, bytes)?;

        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}-{}.{}", user_id, Uuid::new_v4(), format.extension());
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        tracing::info!(user_id, ?kind, file = %file_name, size = bytes.len(), "Stored profile media");

        Ok(format!("{}/{}/{}", self.url_prefix, kind.dir(), file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn sniffs_known_signatures() {
        assert_eq!(ImageFormat::sniff(PNG), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::sniff(b"GIF89a...."), Some(ImageFormat::Gif));
        assert_eq!(
            ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageFormat::Webp));
        assert_eq!(ImageFormat::sniff(b"%PDF-1.7"), None);
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(
            ImageFormat::from_content_type("image/PNG; charset=binary"),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::from_content_type("application/pdf"), None);
    }

    #[test]
    fn non_image_is_rejected() {
        let err = validate_image(MediaKind::Avatar, Some("application/pdf"), b"%PDF-1.7").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMedia(_)));

        let err = validate_image(MediaKind::Avatar, Some("image/png"), b"not a png").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedMedia(_)));
    }

    #[test]
    fn avatar_limit_is_smaller_than_banner_limit() {
        let mut big = PNG.to_vec();
        big.resize(6 * MIB, 0);

        let err = validate_image(MediaKind::Avatar, Some("image/png"), &big).unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert!(validate_image(MediaKind::Banner, Some("image/png"), &big).is_ok());
    }

    #[test]
    fn empty_upload_is_a_validation_error() {
        assert!(matches!(
            validate_image(MediaKind::Banner, Some("image/png"), b""),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn store_writes_file_under_kind_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), "/media/");

        let url = store
            .store(MediaKind::Banner, 9, Some("image/png"), PNG)
            .await
            .unwrap();

        assert!(url.starts_with("/media/banners/9-"));
        assert!(url.ends_with(".png"));

        let file_name = url.rsplit('/').next().unwrap();
        let written = std::fs::read(dir.path().join("banners").join(file_name)).unwrap();
        assert_eq!(written, PNG);
    }

    #[tokio::test]
    async fn rejected_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path(), "/media");

        assert!(store
            .store(MediaKind::Avatar, 1, Some("text/plain"), b"hello")
            .await
            .is_err());
        assert!(!dir.path().join("avatars").exists());
    }
}
