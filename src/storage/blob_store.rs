use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::utils::errors::{AppError, AppResult};

/// Prefijo público bajo el que se sirven los blobs
pub const PUBLIC_PREFIX: &str = "/api/storage/";

/// Referencia devuelta tras guardar un blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub key: String,
    pub url: String,
    pub etag: String,
    pub size: usize,
}

/// Blob leído
#[derive(Debug, Clone)]
pub struct BlobObject {
    pub data: Bytes,
    pub content_type: String,
    pub etag: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<StoredBlob>;

    async fn get(&self, key: &str) -> AppResult<Option<BlobObject>>;

    /// Borrar un blob. Devuelve si existía.
    async fn delete(&self, key: &str) -> AppResult<bool>;
}

/// URL pública de una clave
pub fn public_url(key: &str) -> String {
    format!("{}{}", PUBLIC_PREFIX, key)
}

/// Clave a partir de una URL pública; `None` si no es de este store
pub fn key_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(PUBLIC_PREFIX).filter(|k| !k.is_empty())
}

fn etag(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Rechaza claves vacías, absolutas o con `..`
fn validate_key(key: &str) -> AppResult<()> {
    let path = Path::new(key);
    let safe = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(AppError::BadRequest(format!("Invalid storage key '{}'", key)));
    }
    Ok(())
}

fn content_type_for(key: &str) -> &'static str {
    match Path::new(key).extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Blobs en memoria
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, BlobObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<StoredBlob> {
        validate_key(key)?;
        let stored = StoredBlob {
            key: key.to_string(),
            url: public_url(key),
            etag: etag(&data),
            size: data.len(),
        };

        self.objects.write().await.insert(
            key.to_string(),
            BlobObject {
                data,
                content_type: content_type.to_string(),
                etag: stored.etag.clone(),
            },
        );
        Ok(stored)
    }

    async fn get(&self, key: &str) -> AppResult<Option<BlobObject>> {
        validate_key(key)?;
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        validate_key(key)?;
        Ok(self.objects.write().await.remove(key).is_some())
    }
}

/// Blobs en el filesystem local, bajo `STORAGE_ROOT`
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| AppError::Storage(format!("{}: {}", root.display(), e)))?;
        info!("📁 Blob storage en {}", root.display());
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> AppResult<StoredBlob> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("{}: {}", parent.display(), e)))?;
        }

        fs::write(&path, &data)
            .await
            .map_err(|e| AppError::Storage(format!("{}: {}", path.display(), e)))?;
        debug!("💾 Blob guardado: {} ({} bytes)", key, data.len());

        Ok(StoredBlob {
            key: key.to_string(),
            url: public_url(key),
            etag: etag(&data),
            size: data.len(),
        })
    }

    async fn get(&self, key: &str) -> AppResult<Option<BlobObject>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(BlobObject {
                etag: etag(&data),
                data: Bytes::from(data),
                content_type: content_type_for(key).to_string(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!("{}: {}", path.display(), e))),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("🗑️ Blob eliminado: {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("⚠️ Blob {} ya no existía", key);
                Ok(false)
            }
            Err(e) => Err(AppError::Storage(format!("{}: {}", path.display(), e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_and_urls() {
        assert!(validate_key("avatars/u/a.png").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/abs").is_err());
        assert!(validate_key("").is_err());

        let url = public_url("avatars/u/a.png");
        assert_eq!(url, "/api/storage/avatars/u/a.png");
        assert_eq!(key_from_url(&url), Some("avatars/u/a.png"));
        assert_eq!(key_from_url("https://cdn.example.com/a.png"), None);
    }

    #[tokio::test]
    async fn test_memory_store_put_get_delete() {
        let store = MemoryBlobStore::new();
        let stored = store
            .put("avatars/u/a.png", Bytes::from_static(b"png-bytes"), "image/png")
            .await
            .unwrap();
        assert_eq!(stored.size, 9);
        assert_eq!(stored.etag, format!("{:x}", md5::compute(b"png-bytes")));

        let object = store.get("avatars/u/a.png").await.unwrap().unwrap();
        assert_eq!(object.data, Bytes::from_static(b"png-bytes"));
        assert_eq!(object.content_type, "image/png");

        assert!(store.delete("avatars/u/a.png").await.unwrap());
        assert!(store.get("avatars/u/a.png").await.unwrap().is_none());
        assert!(!store.delete("avatars/u/a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_store_round_trip() {
        let root = std::env::temp_dir().join(format!("ald-blobs-{}", uuid::Uuid::new_v4()));
        let store = LocalBlobStore::new(&root).await.unwrap();

        store
            .put("avatars/u/b.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
        let object = store.get("avatars/u/b.jpg").await.unwrap().unwrap();
        assert_eq!(object.content_type, "image/jpeg");
        assert!(store.delete("avatars/u/b.jpg").await.unwrap());
        assert!(store.get("avatars/u/b.jpg").await.unwrap().is_none());

        let _ = std::fs::remove_dir_all(root);
    }
}
