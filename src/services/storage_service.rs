use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Durable reference to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Writes `data` for `owner_id`. Either the whole object becomes visible or nothing does.
    async fn store(
        &self,
        owner_id: Uuid,
        data: Bytes,
        content_type: &str,
        original_name: &str,
    ) -> Result<StoredObject>;

    /// Removing a key that no longer exists succeeds.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// SHA-256 of the payload, lowercase hex.
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Stores blobs under a local directory that the HTTP server exposes at `/uploads`.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn full_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, key)
    }
}

/// Keys are relative paths of plain segments.
pub fn validate_key(key: &str) -> Result<()> {
    let invalid = || Error::Storage(format!("invalid storage key '{}'", key));
    if key.is_empty() || key.contains('\\') || key.starts_with('/') {
        return Err(invalid());
    }
    let all_normal = Path::new(key)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !all_normal || key.split('/').any(|segment| segment.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

fn extension_for(content_type: &str, original_name: &str) -> String {
    let from_name = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match from_name {
        Some(ext) => format!(".{}", ext),
        None => match content_type {
            "application/pdf" => ".pdf".to_string(),
            "application/msword" => ".doc".to_string(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                ".docx".to_string()
            }
            _ => ".bin".to_string(),
        },
    }
}

/// `resumes/{owner}-{millis}-{nonce}{ext}`. The nonce keeps uploads made in the
/// same millisecond apart.
pub fn resume_key(owner_id: Uuid, content_type: &str, original_name: &str) -> String {
    format!(
        "resumes/{}-{}-{}{}",
        owner_id,
        chrono::Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension_for(content_type, original_name)
    )
}

#[async_trait]
impl ObjectStorage for LocalDiskStorage {
    async fn store(
        &self,
        owner_id: Uuid,
        data: Bytes,
        content_type: &str,
        original_name: &str,
    ) -> Result<StoredObject> {
        let key = resume_key(owner_id, content_type, original_name);
        let full_path = self.full_path(&key)?;
        tracing::debug!(owner_id = %owner_id, key = %key, size = data.len(), "storage: write");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                tracing::warn!(parent = %parent.display(), error = %e, "storage: create_dir_all failed");
                Error::Storage(format!("could not prepare upload directory: {}", e))
            })?;
        }

        let temp_path = full_path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &full_path).await
        };

        if let Err(e) = write.await {
            tracing::warn!(owner_id = %owner_id, key = %key, error = %e, "storage: atomic write failed");
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::Storage(format!("could not store file: {}", e)));
        }

        Ok(StoredObject {
            url: self.public_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("could not delete '{}': {}", key, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("placement-storage-{}", Uuid::new_v4()))
    }

    #[test]
    fn rejects_keys_that_escape_the_root() {
        for bad in ["", "/etc/passwd", "../x.pdf", "resumes/../../x", "a\\b", "resumes//x"] {
            assert!(validate_key(bad).is_err(), "{bad:?} accepted");
        }
        assert!(validate_key("resumes/abc-1.pdf").is_ok());
    }

    #[test]
    fn content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn extension_prefers_the_file_name() {
        assert_eq!(extension_for("application/pdf", "CV.PDF"), ".pdf");
        assert_eq!(extension_for("application/pdf", "resume"), ".pdf");
        assert_eq!(extension_for("text/plain", "weird.name.???"), ".bin");
    }

    #[tokio::test]
    async fn store_then_delete_round_trips_on_disk() {
        let root = temp_root();
        let storage = LocalDiskStorage::new(&root, "http://localhost:5000/");
        let owner = Uuid::new_v4();

        let stored = storage
            .store(owner, Bytes::from_static(b"%PDF-1.4 test"), "application/pdf", "cv.pdf")
            .await
            .unwrap();

        assert!(stored.key.starts_with(&format!("resumes/{}-", owner)));
        assert_eq!(
            stored.url,
            format!("http://localhost:5000/uploads/{}", stored.key)
        );
        let on_disk = fs::read(root.join(&stored.key)).await.unwrap();
        assert_eq!(on_disk, b"%PDF-1.4 test");

        let mut entries = fs::read_dir(root.join("resumes")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names.len(), 1, "temp file left behind: {names:?}");

        storage.delete(&stored.key).await.unwrap();
        storage.delete(&stored.key).await.unwrap();
        assert!(!root.join(&stored.key).exists());

        let _ = fs::remove_dir_all(&root).await;
    }

    #[test]
    fn keys_for_one_owner_never_repeat() {
        let owner = Uuid::new_v4();
        let keys: std::collections::HashSet<String> = (0..1000)
            .map(|_| resume_key(owner, "application/pdf", "cv.pdf"))
            .collect();
        assert_eq!(keys.len(), 1000);
    }

    #[tokio::test]
    async fn concurrent_stores_for_one_owner_keep_their_own_bytes() {
        let root = temp_root();
        let storage = LocalDiskStorage::new(&root, "http://localhost:5000");
        let owner = Uuid::new_v4();

        let (a, b) = tokio::join!(
            storage.store(owner, Bytes::from_static(b"%PDF A"), "application/pdf", "a.pdf"),
            storage.store(owner, Bytes::from_static(b"%PDF B"), "application/pdf", "b.pdf"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.key, b.key);
        assert_eq!(fs::read(root.join(&a.key)).await.unwrap(), b"%PDF A");
        assert_eq!(fs::read(root.join(&b.key)).await.unwrap(), b"%PDF B");

        let _ = fs::remove_dir_all(&root).await;
    }
}
