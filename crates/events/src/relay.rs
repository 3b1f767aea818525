//! HTTP relay forwarding sync events to the git synchronization worker.
//!
//! [`GitSyncRelay`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and POSTs each event to
//! `{base_url}/{address}`. Failed deliveries are retried up to three
//! times with exponential backoff (1 s, 2 s, 4 s) and then dropped;
//! the worker is expected to tolerate gaps by re-reading its source.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::SyncEvent;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for relay delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The worker returned a non-2xx status code.
    #[error("Sync worker returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// GitSyncRelay
// ---------------------------------------------------------------------------

/// Forwards sync events to the external git synchronization worker.
pub struct GitSyncRelay {
    client: reqwest::Client,
    base_url: String,
}

impl GitSyncRelay {
    /// Create a relay targeting the worker's base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Run the relay loop until the bus closes or `cancel` fires.
    pub async fn run(self, mut receiver: broadcast::Receiver<SyncEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Git sync relay cancelled, shutting down");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => {
                        let address = event.message.address();
                        if let Err(e) = self.deliver(&event).await {
                            tracing::error!(
                                address,
                                error = %e,
                                "Sync event delivery failed after all retries"
                            );
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            skipped = n,
                            "Git sync relay lagged, some events were not forwarded"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, git sync relay shutting down");
                        break;
                    }
                },
            }
        }
    }

    /// Deliver one event to the worker with retry.
    ///
    /// Retries up to 3 times with exponential backoff before giving up.
    /// Returns `Ok(())` on the first successful attempt.
    async fn deliver(&self, event: &SyncEvent) -> Result<(), RelayError> {
        let url = endpoint_url(&self.base_url, event.message.address());

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(&url, event).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        error = %e,
                        "Sync event delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(&url, event).await
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, event: &SyncEvent) -> Result<(), RelayError> {
        let response = self.client.post(url).json(event).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Join the worker base URL with an event address.
fn endpoint_url(base_url: &str, address: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), address)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
