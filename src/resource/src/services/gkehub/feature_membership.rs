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

//! `google_gke_hub_feature_membership`: the configuration of one fleet
//! membership inside a fleet-wide Feature.
//!
//! The membership specs are entries of the parent Feature's
//! `membershipSpecs` map. There is no API for a single entry, every change
//! patches the Feature, so all changes to one Feature are serialized with a
//! named lock.

use crate::context::ProviderContext;
use crate::data::ResourceData;
use crate::resource::{Resource, handle_not_found};
use crate::template::{replace_vars, replace_vars_for_id};
use gax::Result;
use gax::error::Error;
use http::Method;
use lro::OperationResource;
use lro::model::LongRunningOperation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use transport::client::SendRequest;
use transport::poller::HttpOperationPoller;

const FEATURE_URL: &str =
    "{{GKEHubBasePath}}projects/{{project}}/locations/{{location}}/features/{{feature}}";
const LOCK_KEY: &str = "{{project}}/{{location}}/{{feature}}";
const DEFAULT_MEMBERSHIP_LOCATION: &str = "global";

/// The attributes of `google_gke_hub_feature_membership`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct FeatureMembershipData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub location: String,
    pub feature: String,
    pub membership: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_location: Option<String>,
    pub configmanagement: Option<ConfigManagement>,
    pub mesh: Option<Mesh>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ConfigManagement {
    pub version: Option<String>,
    pub config_sync: Option<ConfigSync>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ConfigSync {
    pub source_format: Option<String>,
    pub git: Option<GitConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct GitConfig {
    pub sync_repo: Option<String>,
    pub sync_branch: Option<String>,
    pub sync_rev: Option<String>,
    pub policy_dir: Option<String>,
    pub secret_type: Option<String>,
    pub sync_wait_secs: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct Mesh {
    pub management: Option<String>,
}

/// The GKE Hub `Feature` resource, restricted to the fields used here.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Feature {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub membership_specs: BTreeMap<String, MembershipFeatureSpec>,
}

/// One entry of `Feature.membershipSpecs`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct MembershipFeatureSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configmanagement: Option<ConfigManagementSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ConfigManagementSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_sync: Option<ConfigSyncSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ConfigSyncSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitConfigSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct GitConfigSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_rev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_wait_secs: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct MeshSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management: Option<String>,
}

impl From<&FeatureMembershipData> for MembershipFeatureSpec {
    fn from(v: &FeatureMembershipData) -> Self {
        let configmanagement = v.configmanagement.as_ref().map(|c| ConfigManagementSpec {
            version: c.version.clone(),
            config_sync: c.config_sync.as_ref().map(|s| ConfigSyncSpec {
                source_format: s.source_format.clone(),
                git: s.git.as_ref().map(|g| GitConfigSpec {
                    sync_repo: g.sync_repo.clone(),
                    sync_branch: g.sync_branch.clone(),
                    sync_rev: g.sync_rev.clone(),
                    policy_dir: g.policy_dir.clone(),
                    secret_type: g.secret_type.clone(),
                    sync_wait_secs: g.sync_wait_secs.clone(),
                }),
            }),
        });
        let mesh = v.mesh.as_ref().map(|m| MeshSpec {
            management: m.management.clone(),
        });
        Self {
            configmanagement,
            mesh,
        }
    }
}

impl MembershipFeatureSpec {
    fn apply_to(self, data: &mut FeatureMembershipData) {
        data.configmanagement = self.configmanagement.map(|c| ConfigManagement {
            version: c.version,
            config_sync: c.config_sync.map(|s| ConfigSync {
                source_format: s.source_format,
                git: s.git.map(|g| GitConfig {
                    sync_repo: g.sync_repo,
                    sync_branch: g.sync_branch,
                    sync_rev: g.sync_rev,
                    policy_dir: g.policy_dir,
                    secret_type: g.secret_type,
                    sync_wait_secs: g.sync_wait_secs,
                }),
            }),
        });
        data.mesh = self.mesh.map(|m| Mesh {
            management: m.management,
        });
    }
}

impl FeatureMembershipData {
    /// The key of this membership in `Feature.membershipSpecs`.
    fn spec_key(&self, project: &str) -> String {
        format!(
            "projects/{project}/locations/{}/memberships/{}",
            self.membership_location
                .as_deref()
                .unwrap_or(DEFAULT_MEMBERSHIP_LOCATION),
            self.membership
        )
    }

    /// Finds this membership's entry.
    ///
    /// The service may key the map by project number instead of project id,
    /// so only the location and membership id are compared.
    fn find_spec(&self, feature: Feature) -> Option<MembershipFeatureSpec> {
        let suffix = format!(
            "/locations/{}/memberships/{}",
            self.membership_location
                .as_deref()
                .unwrap_or(DEFAULT_MEMBERSHIP_LOCATION),
            self.membership
        );
        feature
            .membership_specs
            .into_iter()
            .find_map(|(k, v)| k.ends_with(&suffix).then_some(v))
    }
}

/// Handles `google_gke_hub_feature_membership`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FeatureMembership;

impl FeatureMembership {
    /// Replaces this membership's entry in the parent Feature and waits for
    /// the change to complete.
    async fn patch(
        ctx: &ProviderContext,
        data: &ResourceData,
        spec: MembershipFeatureSpec,
        activity: &str,
        timeout: Duration,
    ) -> Result<()> {
        let model = data.decode::<FeatureMembershipData>()?;
        let project = replace_vars(data, &ctx.config, "{{project}}")?;
        let feature = Feature {
            membership_specs: BTreeMap::from([(model.spec_key(&project), spec)]),
            ..Default::default()
        };
        let body = serde_json::to_value(&feature).map_err(Error::ser)?;
        let url = format!(
            "{}?updateMask=membershipSpecs",
            replace_vars(data, &ctx.config, FEATURE_URL)?
        );
        tracing::debug!(type_name = Self::TYPE_NAME, %body, "{activity}");
        let mut request = SendRequest::new(Method::PATCH, url)
            .with_body(body)
            .with_user_agent(ctx.user_agent(data))
            .with_timeout(timeout);
        if let Some(p) = ctx.billing_project(data) {
            request = request.with_billing_project(p);
        }
        let op = ctx.client.send::<LongRunningOperation>(request).await?;

        let base_path = replace_vars(data, &ctx.config, "{{GKEHubBasePath}}")?;
        let mut poller = HttpOperationPoller::<LongRunningOperation>::new(ctx.client.clone(), base_path)
            .with_user_agent(ctx.user_agent(data));
        if let Some(p) = ctx.billing_project(data) {
            poller = poller.with_billing_project(p);
        }
        ctx.waiter(poller)
            .wait(op.into_operation()?, &ctx.wait_spec(activity, timeout))
            .await?;
        Ok(())
    }

    async fn lock(ctx: &ProviderContext, data: &ResourceData) -> Result<transport::LockGuard> {
        let key = replace_vars(data, &ctx.config, LOCK_KEY)?;
        Ok(ctx.locker.lock(&key).await)
    }
}

#[async_trait::async_trait]
impl Resource for FeatureMembership {
    const TYPE_NAME: &'static str = "google_gke_hub_feature_membership";
    const ID_TEMPLATE: &'static str =
        "projects/{{project}}/locations/{{location}}/features/{{feature}}/membershipId/{{membership}}";
    const IMPORT_FORMATS: &'static [&'static str] = &[
        "^projects/(?P<project>[^/]+)/locations/(?P<location>[^/]+)/features/(?P<feature>[^/]+)/membershipId/(?P<membership>[^/]+)$",
        "^(?P<project>[^/]+)/(?P<location>[^/]+)/(?P<feature>[^/]+)/(?P<membership>[^/]+)$",
        "^(?P<location>[^/]+)/(?P<feature>[^/]+)/(?P<membership>[^/]+)$",
    ];

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let project = replace_vars(data, &ctx.config, "{{project}}")?;
        data.set("project", project);
        let _guard = Self::lock(ctx, data).await?;
        let spec = MembershipFeatureSpec::from(&data.decode::<FeatureMembershipData>()?);
        let timeout = data.timeouts().create;
        Self::patch(ctx, data, spec, "Creating FeatureMembership", timeout).await?;
        data.set_id(replace_vars_for_id(data, &ctx.config, Self::ID_TEMPLATE)?);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let url = replace_vars(data, &ctx.config, FEATURE_URL)?;
        let mut request = SendRequest::new(Method::GET, url)
            .with_user_agent(ctx.user_agent(data))
            .with_timeout(data.timeouts().read);
        if let Some(p) = ctx.billing_project(data) {
            request = request.with_billing_project(p);
        }
        let feature = match ctx.client.send::<Feature>(request).await {
            Ok(f) => f,
            Err(e) => {
                let what = format!("GKEHubFeatureMembership {:?}", data.id());
                return handle_not_found(e, data, &what);
            }
        };
        let mut model = data.decode::<FeatureMembershipData>()?;
        let Some(spec) = model.find_spec(feature) else {
            tracing::warn!(
                id = data.id(),
                "removing FeatureMembership from state because it no longer exists"
            );
            data.clear_id();
            return Ok(());
        };
        spec.apply_to(&mut model);
        data.merge(&model)
    }

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let _guard = Self::lock(ctx, data).await?;
        let spec = MembershipFeatureSpec::from(&data.decode::<FeatureMembershipData>()?);
        let timeout = data.timeouts().update;
        Self::patch(ctx, data, spec, "Updating FeatureMembership", timeout).await?;
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        let _guard = Self::lock(ctx, data).await?;
        let timeout = data.timeouts().delete;
        // An empty entry removes the membership from the map.
        let result = Self::patch(
            ctx,
            data,
            MembershipFeatureSpec::default(),
            "Deleting FeatureMembership",
            timeout,
        )
        .await;
        if let Err(e) = result {
            let what = format!("GKEHubFeatureMembership {:?}", data.id());
            return handle_not_found(e, data, &what);
        }
        data.clear_id();
        Ok(())
    }
}
