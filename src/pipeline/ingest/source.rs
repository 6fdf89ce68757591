//! Remote CSV export over HTTP.

use futures_util::{Stream, StreamExt};

use super::SyncError;
use crate::config::SyncConfig;

/// HTTP client for the export endpoint.
pub struct CsvSource {
    client: reqwest::Client,
    config: SyncConfig,
}

impl CsvSource {
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| SyncError::Connection(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Request the export for `resource_id` and return its body as a
    /// chunk stream. A non-success status fails before any byte is read.
    pub async fn open(
        &self,
        resource_id: &str,
    ) -> Result<impl Stream<Item = Result<impl AsRef<[u8]>, SyncError>>, SyncError> {
        let url = self.config.export_url(resource_id);
        tracing::info!(resource_id, "Requesting CSV export");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_connect() {
                SyncError::Connection(format!("cannot reach export server: {e}"))
            } else if e.is_timeout() {
                SyncError::Connection(format!("export request timed out: {e}"))
            } else {
                SyncError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Export request rejected");
            return Err(SyncError::HttpStatus(status.as_u16()));
        }

        Ok(response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| SyncError::Connection(format!("failed reading response body: {e}")))
        }))
    }
}
