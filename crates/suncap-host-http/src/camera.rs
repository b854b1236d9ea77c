//! HTTP still-frame camera

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use suncap_host_api::{CameraSource, HostError, HostResult};
use tracing::debug;

/// Camera that serves a JPEG on a plain GET, no auth
#[derive(Debug, Clone)]
pub struct HttpCamera {
    client: Client,
}

impl HttpCamera {
    pub fn new(timeout: Duration) -> HostResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| HostError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl CameraSource for HttpCamera {
    async fn fetch(&self, url: &str) -> HostResult<Vec<u8>> {
        debug!(url = %url, "Fetching frame");

        let response = self.client.get(url).send().await.map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(request_error)?;
        debug!(url = %url, bytes = bytes.len(), "Frame received");
        Ok(bytes.to_vec())
    }
}

/// Map a reqwest failure onto the host error taxonomy
pub(crate) fn request_error(e: reqwest::Error) -> HostError {
    if e.is_timeout() {
        HostError::Timeout
    } else if let Some(status) = e.status() {
        HostError::Status(status.as_u16())
    } else {
        HostError::Http(e.to_string())
    }
}
