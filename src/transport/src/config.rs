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

//! Provider-wide configuration.
//!
//! The provider block in a Terraform configuration sets the default project,
//! region and zone, the credentials, and a few knobs for the transport. Any
//! value not set explicitly falls back to well-known environment variables.

use google_cloud_auth::credentials::Credentials;
use std::collections::BTreeMap;
use std::time::Duration;

pub(crate) const LOGGING_VAR: &str = "TPG_RUST_LOGGING";

const PROJECT_VARS: [&str; 4] = [
    "GOOGLE_PROJECT",
    "GOOGLE_CLOUD_PROJECT",
    "GCLOUD_PROJECT",
    "CLOUDSDK_CORE_PROJECT",
];
const REGION_VARS: [&str; 3] = ["GOOGLE_REGION", "GCLOUD_REGION", "CLOUDSDK_COMPUTE_REGION"];
const ZONE_VARS: [&str; 3] = ["GOOGLE_ZONE", "GCLOUD_ZONE", "CLOUDSDK_COMPUTE_ZONE"];
const BILLING_PROJECT_VARS: [&str; 1] = ["GOOGLE_BILLING_PROJECT"];
const USER_PROJECT_OVERRIDE_VARS: [&str; 1] = ["USER_PROJECT_OVERRIDE"];

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// The default base paths, keyed by service name.
///
/// Templates refer to them as `{{ComputeBasePath}}`, `{{GKEHubBasePath}}`, and
/// so on.
pub const DEFAULT_BASE_PATHS: [(&str, &str); 4] = [
    ("Compute", "https://compute.googleapis.com/compute/v1/"),
    ("GKEHub", "https://gkehub.googleapis.com/v1beta/"),
    ("ResourceManager", "https://cloudresourcemanager.googleapis.com/v1/"),
    ("ServiceUsage", "https://serviceusage.googleapis.com/v1/"),
];

/// Returns the value of the first environment variable in `keys` that is set
/// and not empty.
pub fn multi_env_search(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| std::env::var(k).ok())
        .find(|v| !v.is_empty())
}

/// The provider configuration.
///
/// Create instances with [ConfigBuilder].
#[derive(Clone, Debug)]
pub struct Config {
    project: Option<String>,
    region: Option<String>,
    zone: Option<String>,
    billing_project: Option<String>,
    user_project_override: bool,
    request_reason: Option<String>,
    request_timeout: Duration,
    poll_interval: Duration,
    user_agent: String,
    base_paths: BTreeMap<String, String>,
    credentials: Option<Credentials>,
    tracing: bool,
}

impl Config {
    /// Returns a builder initialized from the environment.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// The default project.
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// The default region.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// The default zone.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// The project billed for requests, when
    /// [user_project_override][Config::user_project_override] is set.
    pub fn billing_project(&self) -> Option<&str> {
        self.billing_project.as_deref()
    }

    /// If true, requests are billed to the resource project or the billing
    /// project, instead of the project owning the credentials.
    pub fn user_project_override(&self) -> bool {
        self.user_project_override
    }

    /// Sent as `X-Goog-Request-Reason` for audit logs.
    pub fn request_reason(&self) -> Option<&str> {
        self.request_reason.as_deref()
    }

    /// The total time to send one request, including retries.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// The initial delay between polls of long-running operations.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The provider user agent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The base path for `service`, for example `"Compute"`.
    pub fn base_path(&self, service: &str) -> Option<&str> {
        self.base_paths.get(service).map(String::as_str)
    }

    pub(crate) fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns true if the configuration or the environment enables logging
    /// of request and response bodies.
    pub fn tracing_enabled(&self) -> bool {
        if self.tracing {
            return true;
        }
        std::env::var(LOGGING_VAR)
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::new().build()
    }
}

/// Builds a [Config].
///
/// # Example
/// ```
/// # use tpg_transport::config::ConfigBuilder;
/// use std::time::Duration;
/// let config = ConfigBuilder::new()
///     .with_project("my-project")
///     .with_region("us-central1")
///     .with_poll_interval(Duration::from_secs(5))
///     .with_base_path("Compute", "http://localhost:8080/compute/v1/")
///     .build();
/// assert_eq!(config.project(), Some("my-project"));
/// assert_eq!(config.base_path("Compute"), Some("http://localhost:8080/compute/v1/"));
/// ```
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a builder with defaults from the environment.
    pub fn new() -> Self {
        let user_project_override = multi_env_search(&USER_PROJECT_OVERRIDE_VARS)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);
        let base_paths = DEFAULT_BASE_PATHS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            config: Config {
                project: multi_env_search(&PROJECT_VARS),
                region: multi_env_search(&REGION_VARS),
                zone: multi_env_search(&ZONE_VARS),
                billing_project: multi_env_search(&BILLING_PROJECT_VARS),
                user_project_override,
                request_reason: None,
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
                poll_interval: DEFAULT_POLL_INTERVAL,
                user_agent: default_user_agent(),
                base_paths,
                credentials: None,
                tracing: false,
            },
        }
    }

    pub fn with_project<V: Into<String>>(mut self, v: V) -> Self {
        self.config.project = Some(v.into());
        self
    }

    pub fn with_region<V: Into<String>>(mut self, v: V) -> Self {
        self.config.region = Some(v.into());
        self
    }

    pub fn with_zone<V: Into<String>>(mut self, v: V) -> Self {
        self.config.zone = Some(v.into());
        self
    }

    pub fn with_billing_project<V: Into<String>>(mut self, v: V) -> Self {
        self.config.billing_project = Some(v.into());
        self
    }

    pub fn with_user_project_override(mut self, v: bool) -> Self {
        self.config.user_project_override = v;
        self
    }

    pub fn with_request_reason<V: Into<String>>(mut self, v: V) -> Self {
        self.config.request_reason = Some(v.into());
        self
    }

    pub fn with_request_timeout(mut self, v: Duration) -> Self {
        self.config.request_timeout = v;
        self
    }

    pub fn with_poll_interval(mut self, v: Duration) -> Self {
        self.config.poll_interval = v;
        self
    }

    pub fn with_user_agent<V: Into<String>>(mut self, v: V) -> Self {
        self.config.user_agent = v.into();
        self
    }

    /// Overrides the base path of `service`.
    ///
    /// A trailing `/` is added if missing, templates assume it is present.
    pub fn with_base_path<S, V>(mut self, service: S, v: V) -> Self
    where
        S: Into<String>,
        V: Into<String>,
    {
        let mut path = v.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        self.config.base_paths.insert(service.into(), path);
        self
    }

    /// Use `v` instead of the default credentials.
    pub fn with_credentials(mut self, v: Credentials) -> Self {
        self.config.credentials = Some(v);
        self
    }

    /// Enables logging of request and response bodies.
    pub fn with_tracing(mut self, v: bool) -> Self {
        self.config.tracing = v;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_user_agent() -> String {
    format!(
        "Terraform/unknown (+https://www.terraform.io) terraform-provider-google/{}",
        env!("CARGO_PKG_VERSION")
    )
}
