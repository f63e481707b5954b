//! JSON-over-HTTP client for the NER/NED services
//!
//! Features:
//! - Optional proxy bypass, passed in explicitly (no environment mutation)
//! - Gzip decompression
//! - Connection pooling with keep-alive
//! - HTTP status failures surface as `Error::RemoteService`

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Network settings for every outbound call of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Connect directly, ignoring any system proxy.
    pub noproxy: bool,
    /// Whole-request timeout; the services can be slow on long sentences.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            noproxy: false,
            timeout: Duration::from_secs(300),
        }
    }
}

/// HTTP client shared by the REST service adapters
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
}

impl ServiceClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(HttpConfig::default())
    }

    /// Create a client honoring `config`
    pub fn with_config(config: HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .use_rustls_tls()
            .gzip(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout);

        if config.noproxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// POST `body` as JSON and decode the JSON response
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        debug!("Posting to service");
        let response = self.client.post(url).json(body).send().await?;

        info!(
            status = %response.status(),
            version = ?response.version(),
            "Response received"
        );

        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn builds_with_and_without_proxy() {
        assert!(ServiceClient::new().is_ok());
        assert!(ServiceClient::with_config(HttpConfig {
            noproxy: true,
            ..HttpConfig::default()
        })
        .is_ok());
    }

    #[tokio::test]
    async fn unreachable_service_is_a_remote_error() {
        let client = ServiceClient::with_config(HttpConfig {
            noproxy: true,
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        // port 9 (discard) on localhost is closed in test environments
        let err = client
            .post_json::<_, serde_json::Value>("http://127.0.0.1:9/ner", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RemoteService { status: None, .. }));
    }
}
