// Rendered credential images keyed by (registration, size).
// Pure derived data: safe to drop at any time.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use checkin_domain::RegistrationId;

#[derive(Debug, Default)]
pub struct RenderCache {
    entries: RwLock<HashMap<(RegistrationId, u32), Arc<Vec<u8>>>>,
}

impl RenderCache {
    pub async fn get(&self, registration_id: RegistrationId, size: u32) -> Option<Arc<Vec<u8>>> {
        self.entries
            .read()
            .await
            .get(&(registration_id, size))
            .cloned()
    }

    pub async fn insert(&self, registration_id: RegistrationId, size: u32, image: Vec<u8>) -> Arc<Vec<u8>> {
        let image = Arc::new(image);
        self.entries
            .write()
            .await
            .insert((registration_id, size), image.clone());
        image
    }

    pub async fn invalidate(&self, registration_id: RegistrationId) {
        self.entries
            .write()
            .await
            .retain(|(cached_id, _), _| *cached_id != registration_id);
    }
}
