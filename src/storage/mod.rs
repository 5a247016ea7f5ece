//! Blob storage
//!
//! Objetos nombrados por clave (`avatars/{user}/{uuid}.png`). `put` devuelve
//! una referencia durable que se sirve desde `GET /api/storage/{key}`.

pub mod blob_store;

pub use blob_store::{key_from_url, public_url, BlobObject, BlobStore, LocalBlobStore, MemoryBlobStore, StoredBlob};
