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

use crate::data::ResourceData;
use gax::Result;
use lro::{OperationPoller, WaitSpec, Waiter};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use transport::client::HttpClient;
use transport::config::Config;
use transport::mutex::{Locker, MutexStore};

/// The shared state of one provider instance.
///
/// The host creates one context when it configures the provider, and passes
/// it to every resource operation.
#[derive(Clone, Debug)]
pub struct ProviderContext {
    pub client: HttpClient,
    pub config: Config,
    /// Serializes mutations of shared parent resources.
    pub locker: Arc<dyn Locker>,
    /// Cancelled when the host asks the provider to stop.
    pub cancel: CancellationToken,
}

impl ProviderContext {
    /// Creates a context with a new client and lock registry.
    pub async fn new(config: Config) -> Result<Self> {
        let client = HttpClient::new(&config).await?;
        Ok(Self::from_parts(client, config))
    }

    /// Creates a context reusing an existing client.
    pub fn from_parts(client: HttpClient, config: Config) -> Self {
        Self {
            client,
            config,
            locker: Arc::new(MutexStore::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_locker<L: Locker + 'static>(mut self, v: L) -> Self {
        self.locker = Arc::new(v);
        self
    }

    pub fn with_cancellation(mut self, v: CancellationToken) -> Self {
        self.cancel = v;
        self
    }

    /// Returns a waiter using `poller` that stops when the provider stops.
    pub fn waiter<P: OperationPoller>(&self, poller: P) -> Waiter<P> {
        Waiter::new(poller).with_cancellation(self.cancel.clone())
    }

    /// Returns the settings to wait for an operation that must complete
    /// within `timeout`.
    pub fn wait_spec<A: Into<String>>(&self, activity: A, timeout: Duration) -> WaitSpec {
        WaitSpec::new(activity, timeout).with_poll_interval(self.config.poll_interval())
    }

    /// The user agent for requests on behalf of `data`.
    pub fn user_agent(&self, data: &ResourceData) -> String {
        generate_user_agent(self.config.user_agent(), data.module_name())
    }

    /// The project billed for requests on behalf of `data`.
    ///
    /// The provider billing project takes precedence over the resource
    /// project. Only used when `user_project_override` is set.
    pub fn billing_project(&self, data: &ResourceData) -> Option<String> {
        self.config
            .billing_project()
            .or(data.get_str("project"))
            .map(str::to_string)
    }
}

/// Appends the module name from `provider_meta`, if any, to `user_agent`.
///
/// # Example
/// ```
/// # use tpg_resource::context::generate_user_agent;
/// assert_eq!(generate_user_agent("tpg/1.0", None), "tpg/1.0");
/// assert_eq!(generate_user_agent("tpg/1.0", Some("my-module")), "tpg/1.0 my-module");
/// assert_eq!(generate_user_agent("tpg/1.0", Some("")), "tpg/1.0");
/// ```
pub fn generate_user_agent(user_agent: &str, module_name: Option<&str>) -> String {
    match module_name {
        Some(m) if !m.is_empty() => format!("{user_agent} {m}"),
        _ => user_agent.to_string(),
    }
}
