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

//! Expands `{{var}}` placeholders in URL and id templates.
//!
//! Resource handlers describe their URLs as templates such as
//! `{{ComputeBasePath}}projects/{{project}}/regions/{{region}}/addresses/{{name}}`.
//! The placeholders resolve as follows:
//!
//! * `{{project}}`, `{{region}}` and `{{zone}}` use the resource attribute,
//!   falling back to the provider configuration.
//! * `{{XxxBasePath}}` uses the configured base path of service `Xxx`.
//! * Any other name uses the resource attribute, or the empty string.
//! * A `%` prefix, as in `{{%name}}`, percent-encodes the value as a path
//!   segment.
//!
//! Values may contain placeholders themselves, substitution repeats until
//! none remain.

use crate::data::ResourceData;
use gax::Result;
use gax::error::Error;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;
use transport::config::Config;

const MAX_ROUNDS: usize = 10;

// Everything but the RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(%?)([A-Za-z0-9_]+)\}\}").expect("hard-coded regex is valid")
});

static SELF_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/]+/.*?(projects/.*)$").expect("hard-coded regex is valid")
});

/// Errors expanding a template.
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum TemplateError {
    /// A placeholder that must resolve has no value.
    #[error("cannot determine {{{{{0}}}}} for template {1:?}")]
    MissingValue(String, String),
    /// The substituted values keep introducing new placeholders.
    #[error("recursive substitution in template {0:?}, placeholders remain after 10 rounds")]
    Recursive(String),
}

/// Expands `template` using the resource attributes and provider config.
///
/// # Example
/// ```
/// # use tpg_resource::{data::ResourceData, template::replace_vars};
/// # use transport::config::ConfigBuilder;
/// let config = ConfigBuilder::new().with_project("p").with_region("us-central1").build();
/// let data = ResourceData::new().with_attribute("name", "my address");
/// let url = replace_vars(
///     &data,
///     &config,
///     "{{ComputeBasePath}}projects/{{project}}/regions/{{region}}/addresses/{{%name}}",
/// )?;
/// assert_eq!(
///     url,
///     "https://compute.googleapis.com/compute/v1/projects/p/regions/us-central1/addresses/my%20address"
/// );
/// # gax::Result::<()>::Ok(())
/// ```
pub fn replace_vars(data: &ResourceData, config: &Config, template: &str) -> Result<String> {
    replace_vars_recursive(data, config, template, false)
}

/// Like [replace_vars], but shortens self links to their relative
/// `projects/...` form.
///
/// Use this variant to build resource ids, which must not depend on the
/// endpoint used to create the resource.
pub fn replace_vars_for_id(data: &ResourceData, config: &Config, template: &str) -> Result<String> {
    replace_vars_recursive(data, config, template, true)
}

fn replace_vars_recursive(
    data: &ResourceData,
    config: &Config,
    template: &str,
    shorten: bool,
) -> Result<String> {
    let mut current = template.to_string();
    for _ in 0..MAX_ROUNDS {
        if !PLACEHOLDER.is_match(&current) {
            return Ok(current);
        }
        current = expand_once(data, config, template, &current, shorten)?;
    }
    if PLACEHOLDER.is_match(&current) {
        return Err(Error::binding(TemplateError::Recursive(template.to_string())));
    }
    Ok(current)
}

fn expand_once(
    data: &ResourceData,
    config: &Config,
    template: &str,
    current: &str,
    shorten: bool,
) -> Result<String> {
    let mut result = String::with_capacity(current.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(current) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        result.push_str(&current[last..m.start()]);
        result.push_str(&resolve(data, config, template, &caps, shorten)?);
        last = m.end();
    }
    result.push_str(&current[last..]);
    Ok(result)
}

fn resolve(
    data: &ResourceData,
    config: &Config,
    template: &str,
    caps: &Captures,
    shorten: bool,
) -> Result<String> {
    let encode = caps.get(1).is_some_and(|m| !m.is_empty());
    let name = caps.get(2).map_or("", |m| m.as_str());
    let missing =
        || Error::binding(TemplateError::MissingValue(name.to_string(), template.to_string()));
    let value = match name {
        "project" => data
            .get_str(name)
            .or(config.project())
            .ok_or_else(missing)?
            .to_string(),
        "region" => data
            .get_str(name)
            .or(config.region())
            .ok_or_else(missing)?
            .to_string(),
        "zone" => data
            .get_str(name)
            .or(config.zone())
            .ok_or_else(missing)?
            .to_string(),
        n if n.ends_with("BasePath") => config
            .base_path(n.trim_end_matches("BasePath"))
            .ok_or_else(missing)?
            .to_string(),
        n => attribute(data, n, shorten),
    };
    if encode {
        return Ok(utf8_percent_encode(&value, PATH_SEGMENT).to_string());
    }
    Ok(value)
}

fn attribute(data: &ResourceData, name: &str, shorten: bool) -> String {
    let value = match data.get(name) {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    };
    if !shorten {
        return value;
    }
    match SELF_LINK.captures(&value).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().to_string(),
        None => value,
    }
}
