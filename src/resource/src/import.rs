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

//! Parses the identifiers given to `terraform import`.
//!
//! Each resource lists its accepted formats, most specific first, as
//! regular expressions with named captures. The first format matching the
//! id wins, and its captures become resource attributes.

use crate::data::ResourceData;
use gax::Result;
use gax::error::Error;
use regex::Regex;
use std::sync::LazyLock;
use transport::config::Config;

// `https://compute.googleapis.com/compute/v1/projects/...` and
// `https://gkehub.googleapis.com/v1beta/projects/...` both reduce to
// `projects/...`.
static FULL_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/]+/(?:[^/]+/)*?v\d[^/]*/(.+)$").expect("hard-coded regex is valid")
});

/// Errors parsing an import id.
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum ImportError {
    /// The id does not match any accepted format.
    #[error("import id {id:?} doesn't match any of the accepted formats: {formats:?}")]
    NoMatch { id: String, formats: Vec<String> },
    /// A format is not a valid regular expression.
    #[error("import format {0:?} is not a valid regular expression")]
    BadFormat(String),
    /// A field required by the formats is missing from the id and the
    /// provider configuration.
    #[error("cannot determine {0} for import id {1:?}")]
    MissingDefault(String, String),
}

/// Sets the resource attributes captured from the import id.
///
/// The `project`, `region` and `zone` fields named by the first (most
/// specific) format, but missing in the id, are filled from the provider
/// configuration.
///
/// # Example
/// ```
/// # use tpg_resource::{data::ResourceData, import::parse_import_id};
/// # use transport::config::ConfigBuilder;
/// let formats = [
///     "^projects/(?P<project>[^/]+)/regions/(?P<region>[^/]+)/addresses/(?P<name>[^/]+)$",
///     "^(?P<region>[^/]+)/(?P<name>[^/]+)$",
/// ];
/// let config = ConfigBuilder::new().with_project("default-project").build();
/// let mut data = ResourceData::new().with_id("us-central1/my-address");
/// parse_import_id(&formats, &mut data, &config)?;
/// assert_eq!(data.get_str("project"), Some("default-project"));
/// assert_eq!(data.get_str("region"), Some("us-central1"));
/// assert_eq!(data.get_str("name"), Some("my-address"));
/// # gax::Result::<()>::Ok(())
/// ```
pub fn parse_import_id(formats: &[&str], data: &mut ResourceData, config: &Config) -> Result<()> {
    let id = data.id().to_string();
    let relative = FULL_URL
        .captures(&id)
        .and_then(|c| c.get(1))
        .map_or(id.as_str(), |m| m.as_str());

    for format in formats {
        let re = Regex::new(format)
            .map_err(|_| Error::binding(ImportError::BadFormat(format.to_string())))?;
        let Some(caps) = re.captures(relative) else {
            continue;
        };
        for name in re.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                data.set(name, m.as_str());
            }
        }
        tracing::debug!(id, format, "matched import id");
        return add_defaults(formats.first().copied().unwrap_or(*format), data, config, &id);
    }
    Err(Error::binding(ImportError::NoMatch {
        id,
        formats: formats.iter().map(|f| f.to_string()).collect(),
    }))
}

fn add_defaults(
    format: &str,
    data: &mut ResourceData,
    config: &Config,
    id: &str,
) -> Result<()> {
    let defaults = [
        ("project", config.project()),
        ("region", config.region()),
        ("zone", config.zone()),
    ];
    for (name, default) in defaults {
        if !format.contains(&format!("(?P<{name}>")) || data.get_str(name).is_some() {
            continue;
        }
        let value = default.ok_or_else(|| {
            Error::binding(ImportError::MissingDefault(name.to_string(), id.to_string()))
        })?;
        data.set(name, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use transport::config::ConfigBuilder;

    const FORMATS: [&str; 4] = [
        "^projects/(?P<project>[^/]+)/regions/(?P<region>[^/]+)/addresses/(?P<name>[^/]+)$",
        "^(?P<project>[^/]+)/(?P<region>[^/]+)/(?P<name>[^/]+)$",
        "^(?P<region>[^/]+)/(?P<name>[^/]+)$",
        "^(?P<name>[^/]+)$",
    ];

    fn config() -> Config {
        ConfigBuilder::new()
            .with_project("config-project")
            .with_region("config-region")
            .build()
    }

    #[test_case("projects/p/regions/r/addresses/a", "p", "r", "a")]
    #[test_case("https://compute.googleapis.com/compute/v1/projects/p/regions/r/addresses/a", "p", "r", "a")]
    #[test_case("p/r/a", "p", "r", "a")]
    #[test_case("r/a", "config-project", "r", "a")]
    #[test_case("a", "config-project", "config-region", "a")]
    fn formats(id: &str, project: &str, region: &str, name: &str) -> anyhow::Result<()> {
        let mut data = ResourceData::new().with_id(id);
        parse_import_id(&FORMATS, &mut data, &config())?;
        assert_eq!(data.get_str("project"), Some(project));
        assert_eq!(data.get_str("region"), Some(region));
        assert_eq!(data.get_str("name"), Some(name));
        Ok(())
    }

    #[test]
    fn order_matters() -> anyhow::Result<()> {
        // Both formats match, the first one wins.
        let formats = ["^(?P<name>[^/]+)/(?P<other>[^/]+)$", "^(?P<region>[^/]+)/(?P<name>[^/]+)$"];
        let mut data = ResourceData::new().with_id("x/y");
        parse_import_id(&formats, &mut data, &config())?;
        assert_eq!(data.get_str("name"), Some("x"));
        assert_eq!(data.get_str("other"), Some("y"));
        assert_eq!(data.get_str("region"), None);
        Ok(())
    }

    #[test]
    fn gkehub_url() -> anyhow::Result<()> {
        let formats = ["^projects/(?P<project>[^/]+)/locations/(?P<location>[^/]+)/features/(?P<feature>[^/]+)$"];
        let mut data = ResourceData::new()
            .with_id("https://gkehub.googleapis.com/v1beta/projects/p/locations/global/features/configmanagement");
        parse_import_id(&formats, &mut data, &config())?;
        assert_eq!(data.get_str("project"), Some("p"));
        assert_eq!(data.get_str("location"), Some("global"));
        assert_eq!(data.get_str("feature"), Some("configmanagement"));
        Ok(())
    }

    #[test]
    fn existing_attributes_are_kept() -> anyhow::Result<()> {
        let mut data = ResourceData::new()
            .with_id("r/a")
            .with_attribute("project", "from-state");
        parse_import_id(&FORMATS, &mut data, &config())?;
        assert_eq!(data.get_str("project"), Some("from-state"));
        Ok(())
    }

    #[test]
    fn no_match() {
        let mut data = ResourceData::new().with_id("a/b/c/d");
        let err = parse_import_id(&FORMATS, &mut data, &config()).unwrap_err();
        assert!(err.is_binding(), "{err:?}");
        match err.as_inner::<ImportError>() {
            Some(ImportError::NoMatch { id, formats }) => {
                assert_eq!(id, "a/b/c/d");
                assert_eq!(formats.len(), FORMATS.len());
            }
            e => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn bad_format() {
        let mut data = ResourceData::new().with_id("a");
        let err = parse_import_id(&["^(?P<name>[^/]+$"], &mut data, &config()).unwrap_err();
        assert!(
            matches!(err.as_inner::<ImportError>(), Some(ImportError::BadFormat(_))),
            "{err:?}"
        );
    }

    #[test]
    #[serial_test::serial]
    fn missing_default() {
        let _env = [
            "GOOGLE_PROJECT",
            "GOOGLE_CLOUD_PROJECT",
            "GCLOUD_PROJECT",
            "CLOUDSDK_CORE_PROJECT",
        ]
        .map(scoped_env::ScopedEnv::remove);
        let config = ConfigBuilder::new().with_region("r").build();
        let mut data = ResourceData::new().with_id("a");
        let err = parse_import_id(&FORMATS, &mut data, &config).unwrap_err();
        assert_eq!(
            err.as_inner::<ImportError>(),
            Some(&ImportError::MissingDefault("project".into(), "a".into()))
        );
    }
}
