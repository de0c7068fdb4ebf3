use super::{OracleError, OracleRequest, RelevanceOracle};
use crate::crawler::backoff_delay;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Oracle reached over HTTP
///
/// Each request is POSTed as JSON to the endpoint and the response body is
/// returned as is. HTTP 429 is retried with exponential backoff up to
/// `max_retries` attempts; every other failure is returned immediately.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: Client,
    endpoint: Url,
    max_retries: u32,
    backoff_base: Duration,
}

impl HttpOracle {
    pub fn new(client: Client, endpoint: Url, max_retries: u32) -> Self {
        Self {
            client,
            endpoint,
            max_retries: max_retries.max(1),
            backoff_base: Duration::from_secs(1),
        }
    }

    /// Overrides the delay before the first retry
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }
}

#[async_trait]
impl RelevanceOracle for HttpOracle {
    async fn classify(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let base_ms = self.backoff_base.as_millis() as u64;

        for attempt in 1..=self.max_retries {
            let response = self
                .client
                .post(self.endpoint.clone())
                .json(request)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt < self.max_retries {
                    let delay = backoff_delay(base_ms, attempt);
                    warn!(
                        "Oracle rate limited (attempt {}/{}), retrying in {:?}",
                        attempt, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            if !status.is_success() {
                return Err(OracleError::Status(status.as_u16()));
            }

            let body = response.text().await?;
            debug!("Oracle answered for {} ({} bytes)", request.page_url, body.len());
            return Ok(body);
        }

        Err(OracleError::RateLimited(self.max_retries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FieldMap;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> OracleRequest {
        let mut known_fields = FieldMap::new();
        known_fields.insert("undergraduate_degrees".to_string(), json!(["B.Tech"]));

        OracleRequest {
            institute_name: "Example University".to_string(),
            base_domain: "example.edu".to_string(),
            page_url: "https://example.edu/fees".to_string(),
            text: "Source URL: https://example.edu/fees\n\nFees".to_string(),
            known_fields,
            empty_fields: vec!["diploma_degrees".to_string()],
        }
    }

    fn oracle(server: &MockServer, max_retries: u32) -> HttpOracle {
        let endpoint = Url::parse(&format!("{}/classify", server.uri())).unwrap();
        HttpOracle::new(Client::new(), endpoint, max_retries)
            .with_backoff_base(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_classify_posts_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/classify"))
            .and(body_partial_json(json!({
                "institute_name": "Example University",
                "page_url": "https://example.edu/fees",
                "empty_fields": ["diploma_degrees"],
                "known_fields": {"undergraduate_degrees": ["B.Tech"]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"new_urls": ["/hostel"]}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let body = oracle(&server, 3).classify(&request()).await.unwrap();
        assert_eq!(body, r#"{"new_urls": ["/hostel"]}"#);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let body = oracle(&server, 5).classify(&request()).await.unwrap();
        assert_eq!(body, "{}");
    }

    #[tokio::test]
    async fn test_rate_limit_retries_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let result = oracle(&server, 3).classify(&request()).await;
        assert!(matches!(result, Err(OracleError::RateLimited(3))));
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let result = oracle(&server, 3).classify(&request()).await;
        assert!(matches!(result, Err(OracleError::Status(500))));
    }
}
