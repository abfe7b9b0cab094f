use std::path::PathBuf;

use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use crate::error::AppError;

const AVATAR_FILE: &str = "avatar";

/// Image formats accepted for avatars, recognised by their magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageKind::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }
}

/// One avatar per user under `<root>/avatars/<user_id>/avatar`; uploads overwrite
#[derive(Debug, Clone)]
pub struct AvatarStorage {
    root: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl AvatarStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    fn user_dir(&self, user_id: Uuid) -> PathBuf {
        self.root.join("avatars").join(user_id.to_string())
    }

    /// Stores the image and returns its public URL with a cache-busting suffix
    pub async fn save(&self, user_id: Uuid, bytes: &[u8]) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::validation("avatar", "file is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(AppError::validation(
                "avatar",
                format!("file exceeds {} bytes", self.max_bytes),
            ));
        }
        let kind = ImageKind::sniff(bytes).ok_or_else(|| {
            AppError::validation("avatar", "must be a PNG, JPEG, GIF or WebP image")
        })?;

        let dir = self.user_dir(user_id);
        fs::create_dir_all(&dir).await?;

        // Write beside the target, then swap it in
        let temp_file = dir.join(format!("{}.tmp", AVATAR_FILE));
        fs::write(&temp_file, bytes).await?;
        fs::rename(&temp_file, dir.join(AVATAR_FILE)).await?;

        log::info!(
            "Stored {} avatar ({} bytes) for {}",
            kind.content_type(),
            bytes.len(),
            user_id
        );

        Ok(format!(
            "{}/api/v1/storage/avatars/{}/{}?t={}",
            self.public_base_url,
            user_id,
            AVATAR_FILE,
            Utc::now().timestamp_millis()
        ))
    }

    /// Stored bytes and their content type, or `None` when no avatar exists
    pub async fn load(&self, user_id: Uuid) -> Result<Option<(Vec<u8>, &'static str)>, AppError> {
        let path = self.user_dir(user_id).join(AVATAR_FILE);
        match fs::read(&path).await {
            Ok(bytes) => {
                let content_type = ImageKind::sniff(&bytes)
                    .map(|kind| kind.content_type())
                    .unwrap_or("application/octet-stream");
                Ok(Some((bytes, content_type)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn recognises_supported_formats() {
        assert_eq!(ImageKind::sniff(PNG_HEADER), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(b"GIF89a...."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"<svg xmlns=..."), None);
    }

    #[tokio::test]
    async fn save_overwrites_and_load_returns_latest() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AvatarStorage::new(dir.path(), "http://localhost:8080/", 1024);
        let user_id = Uuid::new_v4();

        let url = storage.save(user_id, PNG_HEADER).await.unwrap();
        assert!(url.starts_with(&format!(
            "http://localhost:8080/api/v1/storage/avatars/{}/avatar?t=",
            user_id
        )));

        let gif = b"GIF89a-second-upload";
        storage.save(user_id, gif).await.unwrap();
        let (bytes, content_type) = storage.load(user_id).await.unwrap().unwrap();
        assert_eq!(bytes, gif.to_vec());
        assert_eq!(content_type, "image/gif");
    }

    #[tokio::test]
    async fn rejects_oversized_and_unknown_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AvatarStorage::new(dir.path(), "http://localhost", 8);

        let err = storage.save(Uuid::new_v4(), PNG_HEADER).await.unwrap_err();
        assert_eq!(err.detail().field.as_deref(), Some("avatar"));

        let err = storage.save(Uuid::new_v4(), b"hello").await.unwrap_err();
        assert_eq!(err.detail().field.as_deref(), Some("avatar"));

        assert!(storage.load(Uuid::new_v4()).await.unwrap().is_none());
    }
}
