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

//! The state of one resource instance, as exchanged with the plugin host.

use gax::Result;
use gax::error::Error;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// The `timeouts` block of a resource.
///
/// Each operation defaults to 20 minutes.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub fn with_create(mut self, v: Duration) -> Self {
        self.create = v;
        self
    }

    pub fn with_read(mut self, v: Duration) -> Self {
        self.read = v;
        self
    }

    pub fn with_update(mut self, v: Duration) -> Self {
        self.update = v;
        self
    }

    pub fn with_delete(mut self, v: Duration) -> Self {
        self.delete = v;
        self
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: DEFAULT_TIMEOUT,
            read: DEFAULT_TIMEOUT,
            update: DEFAULT_TIMEOUT,
            delete: DEFAULT_TIMEOUT,
        }
    }
}

/// The id, attributes and settings of a resource instance.
///
/// Attributes use the Terraform schema names, in `snake_case`. Handlers
/// convert them to typed models with [decode][ResourceData::decode], and
/// write results back with [merge][ResourceData::merge].
///
/// # Example
/// ```
/// # use tpg_resource::data::ResourceData;
/// use serde_json::json;
/// #[derive(serde::Deserialize, serde::Serialize)]
/// struct Thing { name: String, size: Option<i64> }
///
/// let mut data = ResourceData::new().with_attribute("name", "thing-1");
/// let mut thing = data.decode::<Thing>()?;
/// assert_eq!(thing.size, None);
/// thing.size = Some(42);
/// data.merge(&thing)?;
/// assert_eq!(data.get("size"), Some(&json!(42)));
/// # gax::Result::<()>::Ok(())
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceData {
    id: String,
    attributes: Map<String, Value>,
    timeouts: Timeouts,
    module_name: Option<String>,
}

impl ResourceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an instance from an attribute map.
    pub fn from_attributes(attributes: Map<String, Value>) -> Self {
        Self {
            attributes,
            ..Default::default()
        }
    }

    /// The resource id. Empty if the resource does not exist.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id<V: Into<String>>(&mut self, v: V) {
        self.id = v.into();
    }

    /// Marks the resource as gone.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    pub fn with_id<V: Into<String>>(mut self, v: V) -> Self {
        self.set_id(v);
        self
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Returns the attribute as a string, if it is a non-empty string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn with_attribute<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn with_timeouts(mut self, v: Timeouts) -> Self {
        self.timeouts = v;
        self
    }

    /// The module name set in the `provider_meta` block, if any.
    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    pub fn with_module_name<V: Into<String>>(mut self, v: V) -> Self {
        self.module_name = Some(v.into());
        self
    }

    /// Converts the attributes into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.attributes.clone())).map_err(Error::deser)
    }

    /// Writes the fields of `v` into the attributes.
    ///
    /// `v` must serialize as an object. Fields serialized as `null` remove the
    /// attribute, fields skipped during serialization leave it unchanged.
    pub fn merge<T: Serialize>(&mut self, v: &T) -> Result<()> {
        let value = serde_json::to_value(v).map_err(Error::ser)?;
        let Value::Object(fields) = value else {
            return Err(Error::ser(format!(
                "expected an object to merge into the resource attributes, got {value}"
            )));
        };
        for (k, v) in fields {
            if v.is_null() {
                self.attributes.remove(&k);
            } else {
                self.attributes.insert(k, v);
            }
        }
        Ok(())
    }
}
