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

//! `google_compute_address`: a static regional IP address.

use crate::context::ProviderContext;
use crate::data::ResourceData;
use crate::resource::{Resource, handle_not_found};
use crate::template::{replace_vars, replace_vars_for_id};
use gax::Result;
use gax::error::Error;
use http::Method;
use lro::OperationResource;
use lro::model::ComputeOperation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use transport::client::SendRequest;
use transport::poller::HttpOperationPoller;
use transport::retry::{RetryPredicate, is_fingerprint_error};

const COLLECTION_URL: &str = "{{ComputeBasePath}}projects/{{project}}/regions/{{region}}/addresses";
const RESOURCE_URL: &str =
    "{{ComputeBasePath}}projects/{{project}}/regions/{{region}}/addresses/{{name}}";
const OPERATIONS_URL: &str =
    "{{ComputeBasePath}}projects/{{project}}/regions/{{region}}/operations/";

/// The attributes of `google_compute_address`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct AddressData {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<String>,
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    pub users: Vec<String>,
}

/// The Compute Engine `Address` resource.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ComputeAddress {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
}

impl From<&AddressData> for ComputeAddress {
    fn from(v: &AddressData) -> Self {
        Self {
            name: v.name.clone(),
            address: v.address.clone(),
            address_type: v.address_type.clone(),
            description: v.description.clone(),
            network_tier: v.network_tier.clone(),
            purpose: v.purpose.clone(),
            subnetwork: v.subnetwork.clone(),
            network: v.network.clone(),
            prefix_length: v.prefix_length,
            ip_version: v.ip_version.clone(),
            labels: v.labels.clone(),
            ..Default::default()
        }
    }
}

impl ComputeAddress {
    fn into_data(self, project: String) -> AddressData {
        AddressData {
            name: self.name,
            project: Some(project),
            // The service returns the region as a URL.
            region: self.region.as_deref().map(last_segment),
            address: self.address,
            address_type: self.address_type,
            description: self.description,
            network_tier: self.network_tier,
            purpose: self.purpose,
            subnetwork: self.subnetwork,
            network: self.network,
            prefix_length: self.prefix_length,
            ip_version: self.ip_version,
            labels: self.labels,
            label_fingerprint: self.label_fingerprint,
            self_link: self.self_link,
            creation_timestamp: self.creation_timestamp,
            users: self.users,
        }
    }
}

fn last_segment(v: &str) -> String {
    v.rsplit('/').next().unwrap_or(v).to_string()
}

/// Handles `google_compute_address`.
///
/// Only labels can change in place, every other attribute forces a new
/// address.
#[derive(Clone, Copy, Debug, Default)]
pub struct Address;

impl Address {
    fn request(ctx: &ProviderContext, data: &ResourceData, method: Method, url: String) -> SendRequest {
        let mut request = SendRequest::new(method, url).with_user_agent(ctx.user_agent(data));
        if let Some(p) = ctx.billing_project(data) {
            request = request.with_billing_project(p);
        }
        request
    }

    async fn wait(
        ctx: &ProviderContext,
        data: &ResourceData,
        op: ComputeOperation,
        activity: &str,
        timeout: Duration,
    ) -> Result<()> {
        let base_path = replace_vars(data, &ctx.config, OPERATIONS_URL)?;
        let mut poller = HttpOperationPoller::<ComputeOperation>::new(ctx.client.clone(), base_path)
            .with_user_agent(ctx.user_agent(data));
        if let Some(p) = ctx.billing_project(data) {
            poller = poller.with_billing_project(p);
        }
        ctx.waiter(poller)
            .wait(op.into_operation()?, &ctx.wait_spec(activity, timeout))
            .await?;
        Ok(())
    }

    async fn fetch(ctx: &ProviderContext, data: &ResourceData) -> Result<ComputeAddress> {
        let url = replace_vars(data, &ctx.config, RESOURCE_URL)?;
        let request =
            Self::request(ctx, data, Method::GET, url).with_timeout(data.timeouts().read);
        ctx.client.send(request).await
    }

    /// Records the project and region used for the resource, which may come
    /// from the provider configuration.
    fn resolve_location(ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let project = replace_vars(data, &ctx.config, "{{project}}")?;
        let region = replace_vars(data, &ctx.config, "{{region}}")?;
        data.set("project", project);
        data.set("region", region);
        Ok(())
    }
}

#[async_trait::async_trait]
impl Resource for Address {
    const TYPE_NAME: &'static str = "google_compute_address";
    const ID_TEMPLATE: &'static str = "projects/{{project}}/regions/{{region}}/addresses/{{name}}";
    const IMPORT_FORMATS: &'static [&'static str] = &[
        "^projects/(?P<project>[^/]+)/regions/(?P<region>[^/]+)/addresses/(?P<name>[^/]+)$",
        "^(?P<project>[^/]+)/(?P<region>[^/]+)/(?P<name>[^/]+)$",
        "^(?P<region>[^/]+)/(?P<name>[^/]+)$",
        "^(?P<name>[^/]+)$",
    ];

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        Self::resolve_location(ctx, data)?;
        let model = data.decode::<AddressData>()?;
        let body = serde_json::to_value(ComputeAddress::from(&model)).map_err(Error::ser)?;
        tracing::debug!(type_name = Self::TYPE_NAME, %body, "creating new Address");

        let url = replace_vars(data, &ctx.config, COLLECTION_URL)?;
        let request = Self::request(ctx, data, Method::POST, url)
            .with_body(body)
            .with_timeout(data.timeouts().create);
        let op = ctx.client.send::<ComputeOperation>(request).await?;

        data.set_id(replace_vars_for_id(data, &ctx.config, Self::ID_TEMPLATE)?);
        let timeout = data.timeouts().create;
        if let Err(e) = Self::wait(ctx, data, op, "Creating Address", timeout).await {
            // The address was not created.
            data.clear_id();
            return Err(e);
        }
        tracing::debug!(id = data.id(), "finished creating Address");
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let address = match Self::fetch(ctx, data).await {
            Ok(a) => a,
            Err(e) => {
                let what = format!("ComputeAddress {:?}", data.id());
                return handle_not_found(e, data, &what);
            }
        };
        let project = replace_vars(data, &ctx.config, "{{project}}")?;
        data.merge(&address.into_data(project))
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let model = data.decode::<AddressData>()?;
        let current = Self::fetch(ctx, data).await?;
        if current.labels != model.labels {
            tracing::debug!(id = data.id(), "updating Address labels");
            let url = format!("{}/setLabels", replace_vars(data, &ctx.config, RESOURCE_URL)?);
            let body = serde_json::json!({
                "labels": model.labels,
                "labelFingerprint": current.label_fingerprint,
            });
            let request = Self::request(ctx, data, Method::POST, url)
                .with_body(body)
                .with_timeout(data.timeouts().update)
                .with_retry_predicates([is_fingerprint_error as RetryPredicate]);
            let op = ctx.client.send::<ComputeOperation>(request).await?;
            let timeout = data.timeouts().update;
            Self::wait(ctx, data, op, "Updating Address", timeout).await?;
        }
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let url = replace_vars(data, &ctx.config, RESOURCE_URL)?;
        tracing::debug!(id = data.id(), "deleting Address");
        let request =
            Self::request(ctx, data, Method::DELETE, url).with_timeout(data.timeouts().delete);
        let op = match ctx.client.send::<ComputeOperation>(request).await {
            Ok(op) => op,
            Err(e) => {
                let what = format!("ComputeAddress {:?}", data.id());
                return handle_not_found(e, data, &what);
            }
        };
        let timeout = data.timeouts().delete;
        Self::wait(ctx, data, op, "Deleting Address", timeout).await?;
        tracing::debug!(id = data.id(), "finished deleting Address");
        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn expand() -> anyhow::Result<()> {
        let data = ResourceData::new()
            .with_attribute("name", "my-address")
            .with_attribute("project", "p")
            .with_attribute("region", "us-central1")
            .with_attribute("address_type", "INTERNAL")
            .with_attribute("labels", json!({"env": "test"}))
            .with_attribute("self_link", "ignored");
        let model = data.decode::<AddressData>()?;
        let got = serde_json::to_value(ComputeAddress::from(&model))?;
        assert_eq!(
            got,
            json!({"name": "my-address", "addressType": "INTERNAL", "labels": {"env": "test"}})
        );
        Ok(())
    }

    #[test]
    fn flatten() -> anyhow::Result<()> {
        let address = serde_json::from_value::<ComputeAddress>(json!({
            "name": "my-address",
            "address": "10.0.0.2",
            "region": "https://compute.googleapis.com/compute/v1/projects/p/regions/us-central1",
            "labelFingerprint": "abc=",
            "users": ["u1"],
            "status": "RESERVED",
            "kind": "compute#address",
        }))?;
        let got = address.into_data("p".to_string());
        assert_eq!(got.region.as_deref(), Some("us-central1"));
        assert_eq!(got.project.as_deref(), Some("p"));
        assert_eq!(got.address.as_deref(), Some("10.0.0.2"));
        assert_eq!(got.label_fingerprint.as_deref(), Some("abc="));
        assert_eq!(got.users, vec!["u1".to_string()]);
        Ok(())
    }

    #[test]
    fn last_segment_of_url() {
        assert_eq!(last_segment("https://x/projects/p/regions/r"), "r");
        assert_eq!(last_segment("r"), "r");
    }
}
