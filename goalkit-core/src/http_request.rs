use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};

use crate::error::GoalKitError;

/// A simple wrapper on an HTTP client for making requests. Sets the user-agent and the
/// optional timeout. Requests are sent exactly once; failures are never retried.
pub struct Request {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl Request {
    /// Initializes a new `Request` instance.
    pub(crate) fn new(timeout: Option<Duration>) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Creates a request builder with defaults applied.
    pub(crate) fn req(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url).header(
            "User-Agent",
            format!("goalkit-core/{}", env!("CARGO_PKG_VERSION")),
        );
        match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        }
    }

    /// Creates a GET request builder with defaults applied.
    pub(crate) fn get(&self, url: &str) -> RequestBuilder {
        self.req(Method::GET, url)
    }

    /// Creates a POST request builder with defaults applied.
    pub(crate) fn post(&self, url: &str) -> RequestBuilder {
        self.req(Method::POST, url)
    }

    /// Sends a request built by `req`/`get`/`post`.
    ///
    /// Any response, successful or not, is returned to the caller; only transport failures
    /// become errors.
    pub(crate) async fn handle(
        &self,
        request_builder: RequestBuilder,
    ) -> Result<Response, GoalKitError> {
        let (client, request) = request_builder.build_split();
        let request = request.map_err(|err| GoalKitError::NetworkError {
            url: err
                .url()
                .map_or_else(|| "<unknown>".to_string(), ToString::to_string),
            status: None,
            error: format!("request build failed: {err}"),
        })?;
        let url = request.url().to_string();

        client
            .execute(request)
            .await
            .map_err(|err| GoalKitError::NetworkError {
                url,
                status: None,
                error: if err.is_timeout() {
                    format!("request timed out: {err}")
                } else {
                    format!("request failed: {err}")
                },
            })
    }
}

/// Reads an unsuccessful response into a [`GoalKitError::NetworkError`].
pub(crate) async fn error_from_response(response: Response, context: &str) -> GoalKitError {
    let url = response.url().to_string();
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    GoalKitError::NetworkError {
        url,
        status: Some(status),
        error: format!("{context}: {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_sets_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header(
                "user-agent",
                format!("goalkit-core/{}", env!("CARGO_PKG_VERSION")).as_str(),
            )
            .with_status(200)
            .create_async()
            .await;

        let request = Request::new(None);
        let response = request
            .handle(request.get(&format!("{}/ping", server.url())))
            .await
            .unwrap();

        assert!(response.status().is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_status_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/flaky")
            .with_status(503)
            .with_body("unavailable")
            .expect(1)
            .create_async()
            .await;

        let request = Request::new(None);
        let response = request
            .handle(request.post(&format!("{}/flaky", server.url())))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 503);

        let err = error_from_response(response, "flaky failed").await;
        match err {
            GoalKitError::NetworkError { status, error, .. } => {
                assert_eq!(status, Some(503));
                assert_eq!(error, "flaky failed: unavailable");
            }
            _ => panic!("Expected NetworkError"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure() {
        // Nothing listens on port 9 (discard) on loopback in test environments.
        let request = Request::new(Some(Duration::from_secs(2)));
        let err = request
            .handle(request.get("http://127.0.0.1:9/unreachable"))
            .await
            .unwrap_err();
        assert!(matches!(err, GoalKitError::NetworkError { status: None, .. }));
    }
}
