//! Casos de uso de Profile
//!
//! Cada usuario sólo lee y modifica su propio perfil. El avatar se reemplaza
//! en tres pasos: subir el blob nuevo, apuntar el perfil a él y borrar el
//! anterior. Si el perfil no se puede actualizar se borra el blob nuevo.

use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::profile_dto::UpdateProfileRequest;
use crate::models::auth::Actor;
use crate::models::profile::{Profile, ProfileChanges, Role};
use crate::repositories::ProfileRepository;
use crate::services::realtime_service::{ChangeFeed, ChangeKind, Entity};
use crate::state::AppState;
use crate::storage::{key_from_url, BlobStore};
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};

pub struct ProfileController {
    profiles: Arc<dyn ProfileRepository>,
    blobs: Arc<dyn BlobStore>,
    feed: ChangeFeed,
    avatar_max_bytes: usize,
}

/// Extensión de archivo para los tipos de imagen aceptados
fn avatar_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

impl ProfileController {
    pub fn new(state: &AppState) -> Self {
        Self {
            profiles: state.repos.profiles.clone(),
            blobs: state.blobs.clone(),
            feed: state.feed.clone(),
            avatar_max_bytes: state.config.avatar_max_bytes,
        }
    }

    pub async fn get(&self, actor: &Actor) -> AppResult<Profile> {
        self.profiles
            .find_by_id(actor.id)
            .await?
            .ok_or_else(|| not_found_error("Profile", &actor.id.to_string()))
    }

    /// Actualización parcial: sólo se escriben los campos presentes
    pub async fn update(&self, actor: &Actor, request: UpdateProfileRequest) -> AppResult<Profile> {
        request.validate()?;

        if request.company_name.is_some() && actor.role != Role::Company {
            return Err(validation_error(
                "company_name",
                "Only company profiles have a company name",
            ));
        }

        let changes = request.into_changes();
        if changes.is_empty() {
            return self.get(actor).await;
        }

        self.apply(actor.id, &changes).await
    }

    /// Reemplazar el avatar por `data`
    pub async fn replace_avatar(
        &self,
        actor: &Actor,
        content_type: Option<&str>,
        data: Bytes,
    ) -> AppResult<Profile> {
        if data.is_empty() {
            return Err(validation_error("avatar", "The uploaded file is empty"));
        }
        if data.len() > self.avatar_max_bytes {
            return Err(AppError::BadRequest(format!(
                "Avatar exceeds the maximum size of {} bytes",
                self.avatar_max_bytes
            )));
        }

        let content_type = content_type.unwrap_or("application/octet-stream");
        let extension = avatar_extension(content_type).ok_or_else(|| {
            AppError::BadRequest(format!("Unsupported avatar type '{}'", content_type))
        })?;

        let current = self.get(actor).await?;

        let key = format!("avatars/{}/{}.{}", actor.id, Uuid::new_v4(), extension);
        let stored = self.blobs.put(&key, data, content_type).await?;

        let updated = match self
            .apply(actor.id, &ProfileChanges::avatar(Some(stored.url.clone())))
            .await
        {
            Ok(profile) => profile,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&stored.key).await {
                    warn!("⚠️ No se pudo borrar el avatar huérfano {}: {}", stored.key, cleanup);
                }
                return Err(e);
            }
        };

        self.delete_previous(current.avatar_url.as_deref()).await;
        info!("🖼️ Avatar de {} reemplazado ({} bytes)", actor.id, stored.size);

        Ok(updated)
    }

    pub async fn remove_avatar(&self, actor: &Actor) -> AppResult<Profile> {
        let current = self.get(actor).await?;
        if current.avatar_url.is_none() {
            return Ok(current);
        }

        let updated = self.apply(actor.id, &ProfileChanges::avatar(None)).await?;
        self.delete_previous(current.avatar_url.as_deref()).await;
        Ok(updated)
    }

    async fn apply(&self, id: Uuid, changes: &ProfileChanges) -> AppResult<Profile> {
        let profile = self
            .profiles
            .update(id, changes, Utc::now())
            .await?
            .ok_or_else(|| not_found_error("Profile", &id.to_string()))?;

        self.feed.publish(Entity::Profiles, ChangeKind::Update, &profile);
        Ok(profile)
    }

    /// El perfil ya apunta al blob nuevo; un fallo aquí sólo deja basura
    async fn delete_previous(&self, previous_url: Option<&str>) {
        let Some(key) = previous_url.and_then(key_from_url) else {
            return;
        };
        if let Err(e) = self.blobs.delete(key).await {
            warn!("⚠️ No se pudo borrar el avatar anterior {}: {}", key, e);
        }
    }
}
