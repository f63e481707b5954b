//! REST adapters for the NER and NED services.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{NedService, NerResult, NerService};
use crate::error::Result;
use crate::http_client::ServiceClient;

#[derive(Serialize)]
struct NerRequest<'a> {
    text: &'a str,
}

/// NER over `POST <endpoint>` with `{"text": ...}`.
#[derive(Debug, Clone)]
pub struct RestNer {
    client: ServiceClient,
    endpoint: String,
}

impl RestNer {
    pub fn new(client: ServiceClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl NerService for RestNer {
    async fn tag(&self, text: &str) -> Result<NerResult> {
        debug!(chars = text.len(), "Tagging sentence");
        self.client
            .post_json(&self.endpoint, &NerRequest { text })
            .await
    }
}

/// NED over `POST <endpoint>/parse` then `POST <endpoint>/ned`.
#[derive(Debug, Clone)]
pub struct RestNed {
    client: ServiceClient,
    endpoint: String,
}

impl RestNed {
    pub fn new(client: ServiceClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn parse_url(&self) -> String {
        format!("{}/parse", self.endpoint)
    }

    fn ned_url(&self, return_full: bool, priority: i64) -> String {
        format!(
            "{}/ned?return_full={}&priority={priority}",
            self.endpoint,
            u8::from(return_full)
        )
    }
}

#[async_trait]
impl NedService for RestNed {
    async fn parse(&self, ner: &NerResult) -> Result<Value> {
        self.client.post_json(&self.parse_url(), ner).await
    }

    async fn disambiguate(&self, entities: &Value, return_full: bool, priority: i64) -> Result<Value> {
        self.client
            .post_json(&self.ned_url(return_full, priority), entities)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ned_urls() {
        let ned = RestNed::new(ServiceClient::new().unwrap(), "http://localhost:5001/");
        assert_eq!(ned.parse_url(), "http://localhost:5001/parse");
        assert_eq!(
            ned.ned_url(true, 1),
            "http://localhost:5001/ned?return_full=1&priority=1"
        );
        assert_eq!(
            ned.ned_url(false, 0),
            "http://localhost:5001/ned?return_full=0&priority=0"
        );
    }

    #[test]
    fn ner_request_shape() {
        let body = serde_json::to_value(NerRequest { text: "Goethe lebte" }).unwrap();
        assert_eq!(body, serde_json::json!({"text": "Goethe lebte"}));
    }
}
