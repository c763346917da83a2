use crate::error::RemoteError;
use crate::models::{HoldingRecord, PortfolioResponse};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Source of truth for the user's holdings.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the full current holdings set. `Ok(None)` means the server answered
    /// without a usable holdings payload (empty or malformed body included).
    async fn fetch_holdings(&self) -> Result<Option<Vec<HoldingRecord>>, RemoteError>;
}

// Make the client static and reusable
lazy_static::lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::new();
}

/// Holdings endpoint reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteSource {
    url: Url,
    timeout: Duration,
}

impl HttpRemoteSource {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self { url, timeout }
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch_holdings(&self) -> Result<Option<Vec<HoldingRecord>>, RemoteError> {
        let response = CLIENT
            .get(self.url.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!("Empty holdings body from {}", self.url);
            return Ok(None);
        }
        let body: PortfolioResponse = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Malformed holdings body from {}: {}", self.url, e);
                return Ok(None);
            }
        };
        let holdings = body.into_holdings();
        tracing::debug!(
            "Fetched {} holdings from {}",
            holdings.as_ref().map_or(0, Vec::len),
            self.url
        );
        Ok(holdings)
    }
}
