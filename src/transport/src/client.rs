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

//! The authenticated JSON transport.
//!
//! Every request the provider makes goes through [HttpClient::send]. The
//! client adds the provider headers and credentials, retries errors known to
//! be transient, and decodes the JSON response into the caller's type.

use crate::config::Config;
use crate::retry::{PredicateRetryPolicy, RetryPredicate};
use gax::Result;
use gax::backoff_policy::BackoffPolicy;
use gax::error::Error;
use gax::error::rpc::Status;
use gax::exponential_backoff::ExponentialBackoff;
use gax::retry_policy::RetryPolicyExt;
use google_cloud_auth::credentials::{CacheableResource, Credentials};
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method};
use std::sync::Arc;
use std::time::Duration;

const USER_PROJECT_HEADER: HeaderName = HeaderName::from_static("x-goog-user-project");
const REQUEST_REASON_HEADER: HeaderName = HeaderName::from_static("x-goog-request-reason");

/// One request to a Google Cloud REST API.
///
/// # Example
/// ```
/// # use tpg_transport::client::SendRequest;
/// use http::Method;
/// let request = SendRequest::new(Method::POST, "https://compute.googleapis.com/compute/v1/projects/p/regions/r/addresses")
///     .with_body(serde_json::json!({"name": "my-address"}))
///     .with_billing_project("billing-project");
/// assert_eq!(request.method, Method::POST);
/// ```
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct SendRequest {
    pub method: Method,
    pub url: String,
    /// The JSON payload, if any.
    pub body: Option<serde_json::Value>,
    /// Overrides the provider user agent.
    pub user_agent: Option<String>,
    /// The project billed for the request when the provider config sets
    /// `user_project_override`.
    pub billing_project: Option<String>,
    /// Overrides the provider request timeout.
    pub timeout: Option<Duration>,
    /// Additional headers.
    pub headers: HeaderMap,
    /// Extra predicates, on top of the defaults, marking errors as retryable.
    pub error_retry_predicates: Vec<RetryPredicate>,
    /// Predicates that stop the retry loop.
    pub error_abort_predicates: Vec<RetryPredicate>,
}

impl SendRequest {
    pub fn new<U: Into<String>>(method: Method, url: U) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            user_agent: None,
            billing_project: None,
            timeout: None,
            headers: HeaderMap::new(),
            error_retry_predicates: Vec::new(),
            error_abort_predicates: Vec::new(),
        }
    }

    pub fn with_body(mut self, v: serde_json::Value) -> Self {
        self.body = Some(v);
        self
    }

    pub fn with_user_agent<V: Into<String>>(mut self, v: V) -> Self {
        self.user_agent = Some(v.into());
        self
    }

    pub fn with_billing_project<V: Into<String>>(mut self, v: V) -> Self {
        self.billing_project = Some(v.into());
        self
    }

    pub fn with_timeout(mut self, v: Duration) -> Self {
        self.timeout = Some(v);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_retry_predicates<I>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = RetryPredicate>,
    {
        self.error_retry_predicates.extend(v);
        self
    }

    pub fn with_abort_predicates<I>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = RetryPredicate>,
    {
        self.error_abort_predicates.extend(v);
        self
    }
}

/// Sends authenticated JSON requests to Google Cloud.
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
    cred: Credentials,
    config: Config,
    backoff_policy: Arc<dyn BackoffPolicy>,
}

impl HttpClient {
    /// Creates a client for `config`.
    ///
    /// Uses the credentials in the configuration, or the [Application Default
    /// Credentials] if the configuration has none.
    ///
    /// [Application Default Credentials]: https://cloud.google.com/docs/authentication/application-default-credentials
    pub async fn new(config: &Config) -> Result<Self> {
        let cred = Self::make_credentials(config)?;
        Ok(Self {
            inner: reqwest::Client::new(),
            cred,
            config: config.clone(),
            backoff_policy: Arc::new(ExponentialBackoff::default()),
        })
    }

    /// Replaces the backoff policy between retries of one request.
    ///
    /// The default is jittered exponential backoff, starting at one second
    /// and capped at one minute.
    pub fn with_backoff_policy<V: BackoffPolicy + 'static>(mut self, v: V) -> Self {
        self.backoff_policy = Arc::new(v);
        self
    }

    /// The configuration used to create this client.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn make_credentials(config: &Config) -> Result<Credentials> {
        if let Some(c) = config.credentials() {
            return Ok(c.clone());
        }
        google_cloud_auth::credentials::Builder::default()
            .build()
            .map_err(Error::authentication)
    }

    /// Sends `request`, retrying transient errors, and decodes the response.
    ///
    /// Responses with status `204 No Content`, or without a body, decode as
    /// `O::default()`.
    pub async fn send<O>(&self, request: SendRequest) -> Result<O>
    where
        O: serde::de::DeserializeOwned + Default,
    {
        let timeout = request.timeout.unwrap_or(self.config.request_timeout());
        let retry_policy = PredicateRetryPolicy::new(
            &request.error_retry_predicates,
            &request.error_abort_predicates,
        )
        .with_time_limit(timeout);
        let method = request.method.clone();
        let url = request.url.clone();
        let this = self.clone();
        let inner = async move |remaining| {
            this.request_attempt::<O>(&request, timeout, remaining).await
        };
        let sleep = async |d| tokio::time::sleep(d).await;
        let on_retry = move |attempt_count: u32, error: &Error, delay: Duration| {
            tracing::warn!(
                %method,
                %url,
                attempt_count,
                ?delay,
                "request failed, retrying: {error}"
            );
        };
        gax::retry_loop_internal::retry_loop_with_callback(
            inner,
            sleep,
            Arc::new(retry_policy),
            self.backoff_policy.clone(),
            on_retry,
        )
        .await
    }

    async fn request_attempt<O>(
        &self,
        request: &SendRequest,
        timeout: Duration,
        remaining_time: Option<Duration>,
    ) -> Result<O>
    where
        O: serde::de::DeserializeOwned + Default,
    {
        let user_agent = request
            .user_agent
            .as_deref()
            .unwrap_or(self.config.user_agent());
        let mut builder = self
            .inner
            .request(request.method.clone(), &request.url)
            .timeout(remaining_time.map_or(timeout, |r| r.min(timeout)))
            .header(
                reqwest::header::USER_AGENT,
                HeaderValue::from_str(user_agent).map_err(Error::ser)?,
            );
        if self.config.user_project_override() {
            let billing_project = request
                .billing_project
                .as_deref()
                .or(self.config.billing_project());
            if let Some(p) = billing_project {
                builder = builder.header(
                    USER_PROJECT_HEADER,
                    HeaderValue::from_str(p).map_err(Error::ser)?,
                );
            }
        }
        if let Some(reason) = self.config.request_reason() {
            builder = builder.header(
                REQUEST_REASON_HEADER,
                HeaderValue::from_str(reason).map_err(Error::ser)?,
            );
        }
        for (key, value) in request.headers.iter() {
            builder = builder.header(key, value);
        }

        let auth_headers = match self
            .cred
            .headers(Extensions::new())
            .await
            .map_err(Error::authentication)?
        {
            CacheableResource::New { data, .. } => data,
            CacheableResource::NotModified => {
                return Err(Error::authentication(
                    "credentials returned cached headers for an uncached request",
                ));
            }
        };
        for (key, value) in auth_headers.iter() {
            builder = builder.header(key, value);
        }

        if let Some(body) = &request.body {
            if self.config.tracing_enabled() {
                tracing::debug!(method = %request.method, url = %request.url, %body, "request body");
            }
            builder = builder.json(body);
        }

        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let response = builder.send().await.map_err(map_send_error)?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status().as_u16(),
            "received response"
        );
        if !response.status().is_success() {
            return to_http_error(response).await;
        }
        to_http_response(response, self.config.tracing_enabled()).await
    }
}

/// Requests that time out or fail to connect are I/O errors, and thus
/// transient. [Error::is_timeout] is reserved for deadlines set by callers.
fn map_send_error(err: reqwest::Error) -> Error {
    Error::io(err)
}

/// Converts a non-2xx response into an error.
///
/// Responses carrying the Google Cloud error envelope become service errors.
/// Anything else keeps the raw status code, headers and payload.
pub async fn to_http_error<O>(response: reqwest::Response) -> Result<O> {
    let status_code = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(Error::io)?;

    let error = match Status::try_from(&body) {
        Ok(status) => Error::service_with_http_metadata(status, Some(status_code), Some(headers)),
        Err(_) => Error::http(status_code, headers, body),
    };
    Err(error)
}

async fn to_http_response<O>(response: reqwest::Response, log_body: bool) -> Result<O>
where
    O: serde::de::DeserializeOwned + Default,
{
    // 204 No Content has no body, and serde_json fails on empty input.
    let no_content_status = response.status() == reqwest::StatusCode::NO_CONTENT;
    let body = response.bytes().await.map_err(Error::io)?;
    if log_body {
        tracing::debug!(body = %String::from_utf8_lossy(&body), "response body");
    }
    if no_content_status || body.is_empty() {
        return Ok(O::default());
    }
    serde_json::from_slice::<O>(&body).map_err(Error::deser)
}
