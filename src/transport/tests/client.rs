// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! These tests drive the HTTP client against a local server returning a
//! scripted sequence of responses.

#[cfg(test)]
mod tests {
    use gax::exponential_backoff::ExponentialBackoffBuilder;
    use gax::polling_error_policy::is_transient;
    use google_cloud_auth::credentials::anonymous::Builder as Anonymous;
    use http::{Method, StatusCode};
    use httptest::matchers::{contains, eq, json_decoded, key, not, request};
    use httptest::{Expectation, Server, all_of, responders::*};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tpg_transport::config::{Config, ConfigBuilder};
    use tpg_transport::retry::is_fingerprint_error;
    use tpg_transport::{HttpClient, SendRequest};

    type Result<T> = anyhow::Result<T>;

    fn test_config() -> ConfigBuilder {
        ConfigBuilder::new()
            .with_credentials(Anonymous::new().build())
            .with_user_agent("test-agent/1.0")
    }

    async fn test_client(config: &Config) -> Result<HttpClient> {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_delay(Duration::from_millis(1))
            .with_maximum_delay(Duration::from_millis(1))
            .clamp();
        Ok(HttpClient::new(config).await?.with_backoff_policy(backoff))
    }

    fn success() -> (StatusCode, String) {
        (StatusCode::OK, json!({"status": "done"}).to_string())
    }

    fn unavailable() -> (StatusCode, String) {
        let status = json!({"error": {
            "code": 503,
            "status": "UNAVAILABLE",
            "message": "try-again",
        }});
        (StatusCode::SERVICE_UNAVAILABLE, status.to_string())
    }

    fn invalid() -> (StatusCode, String) {
        let status = json!({"error": {
            "code": 400,
            "status": "INVALID_ARGUMENT",
            "message": "uh-oh",
        }});
        (StatusCode::BAD_REQUEST, status.to_string())
    }

    fn fingerprint() -> (StatusCode, String) {
        let status = json!({"error": {
            "code": 412,
            "status": "FAILED_PRECONDITION",
            "message": "Labels fingerprint either invalid or resource labels have changed",
            "errors": [{"reason": "conditionNotMet"}],
        }});
        (StatusCode::PRECONDITION_FAILED, status.to_string())
    }

    fn to_responder(status: StatusCode, body: String) -> Box<dyn Responder> {
        Box::new(
            status_code(status.as_u16())
                .insert_header("Content-Type", "application/json")
                .body(body),
        )
    }

    fn start(responses: Vec<(StatusCode, String)>) -> Server {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/retry"))
                .times(responses.len())
                .respond_with(cycle(
                    responses
                        .into_iter()
                        .map(|(status, body)| to_responder(status, body))
                        .collect(),
                )),
        );
        server
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn immediate_success() -> Result<()> {
        let server = start(vec![success()]);
        let client = test_client(&test_config().build()).await?;
        let response: Value = client
            .send(SendRequest::new(Method::GET, server.url_str("/retry")))
            .await?;
        assert_eq!(response, json!({"status": "done"}));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn permanent_error_is_not_retried() -> Result<()> {
        let server = start(vec![invalid()]);
        let client = test_client(&test_config().build()).await?;
        let err = client
            .send::<Value>(SendRequest::new(Method::GET, server.url_str("/retry")))
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), Some(400), "{err:?}");
        assert_eq!(err.status().map(|s| s.message.as_str()), Some("uh-oh"));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn transient_errors_are_retried() -> Result<()> {
        let server = start(vec![unavailable(), unavailable(), success()]);
        let client = test_client(&test_config().build()).await?;
        let response: Value = client
            .send(SendRequest::new(Method::GET, server.url_str("/retry")))
            .await?;
        assert_eq!(response, json!({"status": "done"}));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn opt_in_predicates() -> Result<()> {
        let mut server = start(vec![fingerprint()]);
        let client = test_client(&test_config().build()).await?;
        let err = client
            .send::<Value>(SendRequest::new(Method::GET, server.url_str("/retry")))
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), Some(412), "{err:?}");
        server.verify_and_clear();

        let server = start(vec![fingerprint(), success()]);
        let request = SendRequest::new(Method::GET, server.url_str("/retry"))
            .with_retry_predicates([is_fingerprint_error as tpg_transport::retry::RetryPredicate]);
        let response: Value = client.send(request).await?;
        assert_eq!(response, json!({"status": "done"}));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn retries_stop_at_timeout() -> Result<()> {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/retry"))
                .times(1..)
                .respond_with(cycle(vec![to_responder(
                    unavailable().0,
                    unavailable().1,
                )])),
        );
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_delay(Duration::from_millis(20))
            .with_maximum_delay(Duration::from_millis(20))
            .clamp();
        let client = HttpClient::new(&test_config().build())
            .await?
            .with_backoff_policy(backoff);
        let request = SendRequest::new(Method::GET, server.url_str("/retry"))
            .with_timeout(Duration::from_millis(200));
        let start = tokio::time::Instant::now();
        let err = client.send::<Value>(request).await.unwrap_err();
        // The last attempt may run out of time before the server responds.
        assert!(is_transient(&err) || err.is_timeout(), "{err:?}");
        assert!(start.elapsed() < Duration::from_secs(5), "{:?}", start.elapsed());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn provider_headers() -> Result<()> {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/v1/things"),
                request::headers(contains(("user-agent", "test-agent/1.0"))),
                request::headers(contains(("x-goog-user-project", "billing-project"))),
                request::headers(contains(("x-goog-request-reason", "change-1234"))),
                request::headers(contains(("x-custom", "custom-value"))),
                request::body(json_decoded(eq(json!({"name": "thing"})))),
            ])
            .respond_with(status_code(204)),
        );
        let config = test_config()
            .with_user_project_override(true)
            .with_billing_project("billing-project")
            .with_request_reason("change-1234")
            .build();
        let client = test_client(&config).await?;
        let request = SendRequest::new(Method::POST, server.url_str("/v1/things"))
            .with_body(json!({"name": "thing"}))
            .with_header(
                http::HeaderName::from_static("x-custom"),
                http::HeaderValue::from_static("custom-value"),
            );
        let response: Value = client.send(request).await?;
        assert_eq!(response, Value::Null);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn request_overrides() -> Result<()> {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/v1/things/a"),
                request::headers(contains(("user-agent", "override/2.0"))),
                request::headers(contains(("x-goog-user-project", "resource-project"))),
            ])
            .respond_with(json_encoded(json!({"name": "a"}))),
        );
        let config = test_config()
            .with_user_project_override(true)
            .with_billing_project("billing-project")
            .build();
        let client = test_client(&config).await?;
        let request = SendRequest::new(Method::GET, server.url_str("/v1/things/a"))
            .with_user_agent("override/2.0")
            .with_billing_project("resource-project");
        let response: Value = client.send(request).await?;
        assert_eq!(response, json!({"name": "a"}));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn no_user_project_without_override() -> Result<()> {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/v1/things/a"),
                request::headers(not(contains(key("x-goog-user-project")))),
                request::headers(not(contains(key("x-goog-request-reason")))),
            ])
            .respond_with(json_encoded(json!({"name": "a"}))),
        );
        let config = test_config().with_billing_project("billing-project").build();
        let client = test_client(&config).await?;
        let request = SendRequest::new(Method::GET, server.url_str("/v1/things/a"));
        let response: Value = client.send(request).await?;
        assert_eq!(response, json!({"name": "a"}));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn connection_refused_is_retried() -> Result<()> {
        let url = {
            let server = Server::run();
            server.url_str("/gone")
        };
        let client = test_client(&test_config().build()).await?;
        let request =
            SendRequest::new(Method::GET, url).with_timeout(Duration::from_millis(100));
        let err = client.send::<Value>(request).await.unwrap_err();
        assert!(is_transient(&err) || err.is_timeout(), "{err:?}");
        Ok(())
    }
}
