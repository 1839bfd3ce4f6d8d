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

//! Wire representations of long-running operations.
//!
//! Google Cloud services use two shapes for long-running operations. Most
//! services follow [AIP-151], Compute Engine uses its own format. Both
//! implement [OperationResource] so the waiter can consume them uniformly.
//!
//! [AIP-151]: https://google.aip.dev/151

use crate::{Operation, OperationResource, OperationStatus};
use gax::Result;
use gax::error::Error;
use gax::error::rpc::Status;
use serde::{Deserialize, Serialize};

/// A long-running operation as defined by [AIP-151].
///
/// # Example
/// ```
/// # use tpg_lro::model::LongRunningOperation;
/// # use tpg_lro::{OperationResource, OperationStatus};
/// let op = serde_json::from_value::<LongRunningOperation>(serde_json::json!({
///     "name": "projects/p/locations/global/operations/op-1",
///     "done": false
/// }))?;
/// let op = op.into_operation()?;
/// assert_eq!(op.status, OperationStatus::Running);
/// # anyhow::Ok(())
/// ```
///
/// [AIP-151]: https://google.aip.dev/151
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct LongRunningOperation {
    /// The server-assigned name, relative to the service endpoint.
    pub name: String,

    /// Service-specific progress information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// If false, the operation is still in progress.
    pub done: bool,

    /// The error result of the operation, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Status>,

    /// The normal response of the operation, if it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

impl OperationResource for LongRunningOperation {
    fn into_operation(self) -> Result<Operation> {
        if !self.done {
            return Ok(Operation {
                name: self.name,
                status: OperationStatus::Running,
                error: None,
                response: None,
                metadata: self.metadata,
            });
        }
        Ok(Operation {
            name: self.name,
            status: OperationStatus::Done,
            error: self.error,
            response: self.response,
            metadata: self.metadata,
        })
    }
}

/// A Compute Engine operation.
///
/// Compute operations are polled through their `selfLink`, which becomes the
/// [name][Operation::name] of the converted operation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ComputeOperation {
    /// The operation name, unique within its scope.
    pub name: String,

    /// The full URL of the operation.
    pub self_link: String,

    /// One of `PENDING`, `RUNNING` or `DONE`.
    pub status: String,

    /// The type of operation, such as `insert` or `setLabels`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operation_type: String,

    /// The URL of the resource the operation modifies.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_link: String,

    /// The unique id of the resource the operation modifies.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_id: String,

    /// An optional progress indicator, from 0 to 100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,

    /// The errors encountered while processing the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ComputeOperationErrors>,

    /// The HTTP status code of a failed operation, such as `404`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_error_status_code: Option<i32>,

    /// The HTTP error message of a failed operation, such as `NOT FOUND`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_error_message: Option<String>,
}

/// The `error` field of a [ComputeOperation].
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ComputeOperationErrors {
    pub errors: Vec<ComputeOperationError>,
}

/// One error reported by a [ComputeOperation].
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ComputeOperationError {
    /// The error type identifier, such as `QUOTA_EXCEEDED`.
    pub code: String,
    /// The field of the request that caused the error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// A human readable message.
    pub message: String,
}

// Compute does not report a numeric code for every failure.
const UNKNOWN_CODE: i32 = 2;

impl ComputeOperation {
    fn status(&self) -> Result<OperationStatus> {
        match self.status.as_str() {
            "PENDING" => Ok(OperationStatus::Pending),
            "RUNNING" => Ok(OperationStatus::Running),
            "DONE" => Ok(OperationStatus::Done),
            s => Err(Error::deser(format!(
                "unknown status {s:?} in compute operation {}",
                self.name
            ))),
        }
    }

    fn failure(&self) -> Option<Status> {
        let errors = self.error.as_ref().filter(|e| !e.errors.is_empty())?;
        let message = errors
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let details = errors
            .errors
            .iter()
            .filter_map(|e| serde_json::to_value(e).ok())
            .collect::<Vec<_>>();
        let status = Status::default()
            .set_code(self.http_error_status_code.unwrap_or(UNKNOWN_CODE))
            .set_message(message)
            .set_status(errors.errors[0].code.clone())
            .set_details(details);
        Some(status)
    }
}

impl OperationResource for ComputeOperation {
    fn into_operation(self) -> Result<Operation> {
        let status = self.status()?;
        let name = if self.self_link.is_empty() {
            self.name.clone()
        } else {
            self.self_link.clone()
        };
        let metadata = self.progress.map(|p| serde_json::json!({ "progress": p }));
        if status != OperationStatus::Done {
            return Ok(Operation {
                name,
                status,
                error: None,
                response: None,
                metadata,
            });
        }
        let (error, response) = match self.failure() {
            Some(e) => (Some(e), None),
            None => (
                None,
                Some(serde_json::json!({
                    "targetLink": self.target_link,
                    "targetId": self.target_id,
                })),
            ),
        };
        Ok(Operation {
            name,
            status,
            error,
            response,
            metadata,
        })
    }
}
