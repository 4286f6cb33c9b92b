use std::sync::Arc;

use async_trait::async_trait;
use checkin_domain::ports::HealthCheckService;
use checkin_domain::EventRepository;

use super::http_renderer::HttpCredentialRenderer;

pub struct DefaultHealthService {
    event_repo: Arc<dyn EventRepository>,
    renderer: Arc<HttpCredentialRenderer>,
}

impl DefaultHealthService {
    pub fn new(event_repo: Arc<dyn EventRepository>, renderer: Arc<HttpCredentialRenderer>) -> Self {
        Self {
            event_repo,
            renderer,
        }
    }
}

#[async_trait]
impl HealthCheckService for DefaultHealthService {
    async fn check_store(&self) -> anyhow::Result<bool> {
        self.event_repo.ping().await?;
        Ok(true)
    }

    /// An unconfigured renderer is reported as not ready rather than as an error.
    async fn check_renderer(&self) -> anyhow::Result<bool> {
        if !self.renderer.is_configured() {
            return Ok(false);
        }
        self.renderer.ping().await.map(|_| true)
    }
}
