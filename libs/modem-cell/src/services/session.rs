// =====================================================================================
// DEVICE SESSION GATEWAY
// =====================================================================================

use std::time::Duration;

use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::error::ModemError;

/// Cookie-carrying HTTP session against one modem's web UI.
///
/// Some firmware only answers the API endpoints after the index page has
/// handed out a session cookie, so every session starts by visiting the root.
#[derive(Debug)]
pub struct DeviceSession {
    client: Client,
    root: Url,
}

impl DeviceSession {
    pub async fn open(root_url: &str, timeout: Duration) -> Result<Self, ModemError> {
        let root = Url::parse(root_url)
            .map_err(|e| ModemError::InvalidUrl(format!("{}: {}", root_url, e)))?;

        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        debug!("Opening session against {}", root);
        let response = client.get(root.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Index request to {} failed with status {}, continuing anyway. Body: {}",
                root, status, body
            );
        }

        Ok(Self { client, root })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// GETs `path` relative to the device root and returns the body text.
    pub async fn fetch(&self, path: &str) -> Result<String, ModemError> {
        let url = self
            .root
            .join(path)
            .map_err(|e| ModemError::InvalidUrl(format!("{}{}: {}", self.root, path, e)))?;

        debug!("Fetching {}", url);
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Request to {} failed with status {}. Body: {}", url, status, body);
            return Err(ModemError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
