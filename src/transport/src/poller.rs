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

use crate::client::{HttpClient, SendRequest};
use gax::Result;
use gax::error::Error;
use lro::{Operation, OperationPoller, OperationResource};
use std::marker::PhantomData;

/// Polls long-running operations with `GET` requests.
///
/// `O` is the wire representation of the operation, for example
/// [ComputeOperation][lro::model::ComputeOperation]. Operation names that are
/// full URLs, such as Compute self links, are fetched as-is. Relative names
/// are resolved against the service base path.
///
/// A poll that finds no operation (HTTP 404) fails with a
/// [deserialization][Error::is_deserialization] error, which stops the wait.
///
/// # Example
/// ```no_run
/// # use tpg_transport::{config::Config, client::HttpClient, poller::HttpOperationPoller};
/// # async fn sample() -> gax::Result<()> {
/// use lro::model::LongRunningOperation;
/// let config = Config::default();
/// let client = HttpClient::new(&config).await?;
/// let poller = HttpOperationPoller::<LongRunningOperation>::new(
///     client,
///     "https://gkehub.googleapis.com/v1beta/",
/// );
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct HttpOperationPoller<O> {
    client: HttpClient,
    base_path: String,
    user_agent: Option<String>,
    billing_project: Option<String>,
    _phantom: PhantomData<fn() -> O>,
}

impl<O> HttpOperationPoller<O> {
    pub fn new<B: Into<String>>(client: HttpClient, base_path: B) -> Self {
        Self {
            client,
            base_path: base_path.into(),
            user_agent: None,
            billing_project: None,
            _phantom: PhantomData,
        }
    }

    /// Sends polls with this user agent instead of the provider default.
    pub fn with_user_agent<V: Into<String>>(mut self, v: V) -> Self {
        self.user_agent = Some(v.into());
        self
    }

    /// Bills polls to this project, when the provider config allows it.
    pub fn with_billing_project<V: Into<String>>(mut self, v: V) -> Self {
        self.billing_project = Some(v.into());
        self
    }

    fn url(&self, name: &str) -> String {
        if name.starts_with("https://") || name.starts_with("http://") {
            return name.to_string();
        }
        format!("{}{}", self.base_path, name.trim_start_matches('/'))
    }
}

impl<O> OperationPoller for HttpOperationPoller<O>
where
    O: OperationResource + Default,
{
    async fn poll(&self, name: &str) -> Result<Operation> {
        if name.is_empty() {
            return Err(Error::invalid_state(
                "cannot poll an operation without a name",
            ));
        }
        let mut request = SendRequest::new(http::Method::GET, self.url(name));
        if let Some(ua) = &self.user_agent {
            request = request.with_user_agent(ua);
        }
        if let Some(p) = &self.billing_project {
            request = request.with_billing_project(p);
        }
        let operation = match self.client.send::<O>(request).await {
            Ok(op) => op,
            // Operation names never change, a missing operation will stay missing.
            Err(e) if e.http_status_code() == Some(404) => {
                return Err(Error::deser(format!("operation {name} not found: {e}")));
            }
            Err(e) => return Err(e),
        };
        operation.into_operation()
    }
}
