use std::sync::Arc;

use anyhow::anyhow;
use tracing::warn;

use checkin_domain::RegistrationId;

use crate::{AppError, AppState};

pub const DEFAULT_IMAGE_SIZE: u32 = 300;
/// Served image sizes; requests snap up to the next one.
pub const IMAGE_SIZES: [u32; 4] = [128, DEFAULT_IMAGE_SIZE, 512, 1024];

pub fn image_size(requested: Option<u32>) -> u32 {
    let requested = requested.unwrap_or(DEFAULT_IMAGE_SIZE);
    IMAGE_SIZES
        .iter()
        .copied()
        .find(|size| *size >= requested)
        .unwrap_or(IMAGE_SIZES[IMAGE_SIZES.len() - 1])
}

/// Rendered image for the stored payload, served from cache when possible.
pub async fn render_credential(
    state: &AppState,
    registration_id: RegistrationId,
    size: Option<u32>,
) -> Result<Arc<Vec<u8>>, AppError> {
    let size = image_size(size);
    if let Some(image) = state.render_cache.get(registration_id, size).await {
        return Ok(image);
    }

    let registration = state
        .registrations
        .find_registration(registration_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("registration {}", registration_id)))?;
    let payload = registration.credential_payload.ok_or_else(|| {
        AppError::BadRequest(format!(
            "credential not issued for registration {}",
            registration_id
        ))
    })?;

    let image = state.renderer.render(&payload, size).await.map_err(|err| {
        warn!(registration_id = %registration_id, "credential rendering failed: {}", err);
        AppError::Internal(anyhow!("credential rendering failed: {err}"))
    })?;
    Ok(state.render_cache.insert(registration_id, size, image).await)
}
