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

use crate::context::ProviderContext;
use crate::data::ResourceData;
use crate::import::parse_import_id;
use crate::template::replace_vars_for_id;
use gax::Result;
use gax::error::Error;

/// The lifecycle of one resource type.
///
/// Handlers receive the provider context and the resource data. `create`
/// sets the id once the resource exists, `read` refreshes the attributes or
/// clears the id if the resource is gone, and `delete` clears the id.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// The Terraform type name, such as `google_compute_address`.
    const TYPE_NAME: &'static str;

    /// The template for the resource id.
    const ID_TEMPLATE: &'static str;

    /// The accepted import id formats, most specific first.
    const IMPORT_FORMATS: &'static [&'static str];

    async fn create(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    async fn read(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    async fn update(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    async fn delete(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()>;

    /// Prepares a resource for `terraform import`.
    ///
    /// Parses the id given by the user, fills in defaults, and replaces the
    /// id with its canonical form. The host reads the resource afterwards.
    async fn import(&self, ctx: &ProviderContext, data: &mut ResourceData) -> Result<()> {
        parse_import_id(Self::IMPORT_FORMATS, data, &ctx.config)?;
        let id = replace_vars_for_id(data, &ctx.config, Self::ID_TEMPLATE)?;
        data.set_id(id);
        Ok(())
    }
}

/// Treats HTTP 404 as a resource deleted outside of Terraform.
///
/// Clears the id and succeeds on 404. Any other error is returned unchanged.
///
/// # Example
/// ```
/// # use tpg_resource::{data::ResourceData, resource::handle_not_found};
/// use gax::error::Error;
/// let mut data = ResourceData::new().with_id("projects/p/things/t");
/// let error = Error::http(404, Default::default(), "not found".into());
/// handle_not_found(error, &mut data, "Thing")?;
/// assert_eq!(data.id(), "");
/// # gax::Result::<()>::Ok(())
/// ```
pub fn handle_not_found(error: Error, data: &mut ResourceData, resource: &str) -> Result<()> {
    if error.http_status_code() != Some(404) {
        return Err(error);
    }
    tracing::warn!(
        resource,
        id = data.id(),
        "removing from state because it no longer exists"
    );
    data.clear_id();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::config::ConfigBuilder;

    struct Thing;

    #[async_trait::async_trait]
    impl Resource for Thing {
        const TYPE_NAME: &'static str = "google_thing";
        const ID_TEMPLATE: &'static str = "projects/{{project}}/things/{{name}}";
        const IMPORT_FORMATS: &'static [&'static str] = &[
            "^projects/(?P<project>[^/]+)/things/(?P<name>[^/]+)$",
            "^(?P<name>[^/]+)$",
        ];

        async fn create(&self, _: &ProviderContext, _: &mut ResourceData) -> Result<()> {
            Ok(())
        }
        async fn read(&self, _: &ProviderContext, _: &mut ResourceData) -> Result<()> {
            Ok(())
        }
        async fn update(&self, _: &ProviderContext, _: &mut ResourceData) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _: &ProviderContext, _: &mut ResourceData) -> Result<()> {
            Ok(())
        }
    }

    async fn context() -> anyhow::Result<ProviderContext> {
        let config = ConfigBuilder::new()
            .with_credentials(google_cloud_auth::credentials::anonymous::Builder::new().build())
            .with_project("config-project")
            .build();
        Ok(ProviderContext::new(config).await?)
    }

    #[tokio::test]
    async fn import() -> anyhow::Result<()> {
        let ctx = context().await?;
        let mut data = ResourceData::new().with_id("t1");
        Thing.import(&ctx, &mut data).await?;
        assert_eq!(data.id(), "projects/config-project/things/t1");
        assert_eq!(data.get_str("name"), Some("t1"));

        let mut data = ResourceData::new()
            .with_id("https://thing.googleapis.com/v1/projects/p/things/t2");
        Thing.import(&ctx, &mut data).await?;
        assert_eq!(data.id(), "projects/p/things/t2");
        assert_eq!(Thing::TYPE_NAME, "google_thing");
        Ok(())
    }

    #[test]
    fn not_found() -> anyhow::Result<()> {
        let mut data = ResourceData::new().with_id("projects/p/things/t");
        let error = Error::http(403, Default::default(), "denied".into());
        let err = handle_not_found(error, &mut data, "Thing").unwrap_err();
        assert_eq!(err.http_status_code(), Some(403));
        assert_eq!(data.id(), "projects/p/things/t");

        let status = gax::error::rpc::Status::default()
            .set_code(404)
            .set_status("NOT_FOUND");
        let error = Error::service_with_http_metadata(status, Some(404), None);
        handle_not_found(error, &mut data, "Thing")?;
        assert_eq!(data.id(), "");
        Ok(())
    }
}
