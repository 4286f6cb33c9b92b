use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use checkin_domain::ports::CredentialRenderer;

#[derive(Serialize)]
struct RenderRequest<'a> {
    payload: &'a str,
    size: u32,
}

/// Delegates image rendering to an external service that answers
/// `POST {url}` with the encoded image bytes.
pub struct HttpCredentialRenderer {
    url: Option<String>,
    client: Client,
}

impl HttpCredentialRenderer {
    pub fn new(url: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(3)))
            .build()?;
        Ok(Self { url, client })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub async fn ping(&self) -> Result<()> {
        let url = self.resolve_url()?;
        let response = self.client.get(url).send().await?;
        if response.status().is_server_error() {
            anyhow::bail!("render service responded {}", response.status());
        }
        Ok(())
    }

    fn resolve_url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .ok_or_else(|| anyhow!("render_service_url not configured"))
    }
}

#[async_trait]
impl CredentialRenderer for HttpCredentialRenderer {
    async fn render(&self, payload: &str, size: u32) -> Result<Vec<u8>> {
        let url = self.resolve_url()?;
        let bytes = self
            .client
            .post(url)
            .json(&RenderRequest { payload, size })
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        if bytes.is_empty() {
            anyhow::bail!("render service returned an empty image");
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_renderer_fails() {
        let renderer = HttpCredentialRenderer::new(None, 5).expect("client");
        assert!(!renderer.is_configured());
        let err = renderer.render("{}", 300).await.unwrap_err();
        assert!(err.to_string().contains("render_service_url"));
    }
}
