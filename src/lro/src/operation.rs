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

use gax::Result;
use gax::error::rpc::Status;

/// The coarse state of a long-running operation.
///
/// Each service reports progress in its own format. The wire types in
/// [model][crate::model] map those formats into this tri-state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationStatus {
    /// The service accepted the operation, but has not started it.
    #[default]
    Pending,
    /// The operation is in progress.
    Running,
    /// The operation completed, successfully or not.
    Done,
}

impl OperationStatus {
    /// The name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A snapshot of one long-running operation.
///
/// Each poll returns a new snapshot. Once `status` is
/// [Done][OperationStatus::Done] exactly one of `error` or `response` should
/// be set. The waiter rejects snapshots that break this rule.
///
/// # Example
/// ```
/// # use tpg_lro::{Operation, OperationStatus};
/// let op = Operation::new("operations/op-123").set_status(OperationStatus::Running);
/// assert_eq!(op.name, "operations/op-123");
/// assert!(!op.is_done());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct Operation {
    /// The identifier used to fetch new snapshots.
    ///
    /// Depending on the service this is a relative resource name, or a full
    /// URL.
    pub name: String,

    /// The coarse status of the operation.
    pub status: OperationStatus,

    /// The error, only set in failed operations.
    pub error: Option<Status>,

    /// The response, only set in successful operations.
    pub response: Option<serde_json::Value>,

    /// Progress information, if the service reports any.
    pub metadata: Option<serde_json::Value>,
}

impl Operation {
    /// Creates a pending operation with the given name.
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the value for [name][Operation::name].
    pub fn set_name<T: Into<String>>(mut self, v: T) -> Self {
        self.name = v.into();
        self
    }

    /// Sets the value for [status][Operation::status].
    pub fn set_status(mut self, v: OperationStatus) -> Self {
        self.status = v;
        self
    }

    /// Sets the value for [error][Operation::error].
    pub fn set_error(mut self, v: Status) -> Self {
        self.error = Some(v);
        self
    }

    /// Sets the value for [response][Operation::response].
    pub fn set_response<T: Into<serde_json::Value>>(mut self, v: T) -> Self {
        self.response = Some(v.into());
        self
    }

    /// Sets the value for [metadata][Operation::metadata].
    pub fn set_metadata<T: Into<serde_json::Value>>(mut self, v: T) -> Self {
        self.metadata = Some(v.into());
        self
    }

    /// Returns true if the operation reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.status == OperationStatus::Done
    }
}

/// Implemented by the wire representations of long-running operations.
///
/// The transport decodes each response into a type implementing this trait,
/// and then converts it into the generic [Operation] consumed by the waiter.
pub trait OperationResource: serde::de::DeserializeOwned + Send {
    /// Converts the wire representation into an [Operation].
    ///
    /// Fails with a [deserialization][gax::error::Error::is_deserialization]
    /// error if the payload cannot be mapped, for example, if the service
    /// reports an unknown status.
    fn into_operation(self) -> Result<Operation>;
}

impl OperationResource for Operation {
    fn into_operation(self) -> Result<Operation> {
        Ok(self)
    }
}

// Allows `Operation` to be used directly with the generic transport, mostly
// in tests.
impl<'de> serde::Deserialize<'de> for Operation {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let op = crate::model::LongRunningOperation::deserialize(deserializer)?;
        op.into_operation().map_err(serde::de::Error::custom)
    }
}
