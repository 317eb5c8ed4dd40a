//! Shared HTTP transport for outbound collaborators.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// HTTP transport for calling external services.
///
/// Cheap to clone; the connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    pub fn new(config: Arc<ClientConfig>) -> ClientResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&config.user_agent)
                .map_err(|_| ClientError::Protocol("Invalid user agent".to_string()))?,
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { client, config })
    }

    /// Underlying client, for requests that need the raw response.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute an idempotent request with retries.
    async fn execute_with_retry(&self, request_builder: RequestBuilder) -> ClientResult<Response> {
        let retry_config = &self.config.retry_config;
        let mut attempts = 0;

        loop {
            let request = request_builder
                .try_clone()
                .ok_or_else(|| ClientError::Protocol("Request cannot be cloned".to_string()))?;

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if response.status().is_success() {
                        return Ok(response);
                    }

                    if attempts < retry_config.max_retries
                        && retry_config.should_retry_status(status)
                    {
                        let backoff = retry_config.backoff_for_attempt(attempts);
                        warn!(
                            status = status,
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }

                    return Err(error_from_response(response).await);
                }
                Err(e) => {
                    if attempts < retry_config.max_retries && e.is_timeout() {
                        let backoff = retry_config.backoff_for_attempt(attempts);
                        warn!(
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            "Request timed out, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Execute a GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        url: Url,
        query: &Q,
    ) -> ClientResult<T> {
        debug!(url = %url, "GET request with query");

        let response = self
            .execute_with_retry(self.client.get(url).query(query))
            .await?;
        Ok(response.json().await?)
    }

    /// Execute a JSON POST request once. Used for calls that are not safe to
    /// repeat blindly.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> ClientResult<T> {
        debug!(url = %url, "POST request");

        let response = self.client.post(url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }
}

/// Turn a non-success response into an API error carrying its body.
pub async fn error_from_response(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    ClientError::Api { status, message }
}

/// Append path segments to a base URL, keeping any path it already has.
pub fn join_segments(base: &Url, segments: &[&str]) -> ClientResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::Protocol(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use serde::Deserialize;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        value: i32,
    }

    fn transport(retry_config: RetryConfig) -> HttpTransport {
        HttpTransport::new(Arc::new(ClientConfig {
            timeout: Duration::from_secs(5),
            user_agent: "solx402-test".to_string(),
            retry_config,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_user_agent_and_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("limit", "5"))
            .and(header("user-agent", "solx402-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": 5})))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/items", server.uri())).unwrap();
        let echo: Echo = transport(RetryConfig::no_retry())
            .get_with_query(url, &[("limit", 5)])
            .await
            .unwrap();
        assert_eq!(echo, Echo { value: 5 });
    }

    #[tokio::test]
    async fn test_retries_on_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": 1})))
            .mount(&server)
            .await;

        let retry = RetryConfig {
            initial_backoff: Duration::from_millis(1),
            ..RetryConfig::default()
        };
        let url = Url::parse(&format!("{}/flaky", server.uri())).unwrap();
        let echo: Echo = transport(retry)
            .get_with_query(url, &[("attempt", "1")])
            .await
            .unwrap();
        assert_eq!(echo.value, 1);
    }

    #[tokio::test]
    async fn test_error_carries_status_and_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rpc"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad input"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/rpc", server.uri())).unwrap();
        let result: ClientResult<Echo> = transport(RetryConfig::no_retry())
            .post_json(url, &serde_json::json!({}))
            .await;
        match result {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad input");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_join_segments() {
        let base = Url::parse("https://facilitator.example.com").unwrap();
        let url = join_segments(&base, &["discovery", "resources"]).unwrap();
        assert_eq!(url.as_str(), "https://facilitator.example.com/discovery/resources");

        let base = Url::parse("https://example.com/api/").unwrap();
        let url = join_segments(&base, &["discovery", "resources"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/discovery/resources");
    }
}
