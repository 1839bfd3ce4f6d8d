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

//! Terminal state classification for the waiter.

use crate::Operation;
use gax::Result;
use gax::error::Error;

/// Converts a finished operation into its outcome.
///
/// A finished operation must carry exactly one of an error or a response.
/// Anything else does not satisfy the invariants of the type, and it is
/// reported as a deserialization error.
pub(crate) fn as_result(op: Operation) -> Result<serde_json::Value> {
    match (op.response, op.error) {
        (Some(response), None) => Ok(response),
        (None, Some(status)) => Err(Error::operation_failed(status)),
        (None, None) => Err(Error::deser(format!(
            "operation {} is done, but has neither a response nor an error",
            op.name
        ))),
        (Some(_), Some(_)) => Err(Error::deser(format!(
            "operation {} is done, but has both a response and an error",
            op.name
        ))),
    }
}

/// Decodes the response of a successful operation into `T`.
pub(crate) fn as_typed<T>(response: serde_json::Value) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value::<T>(response).map_err(Error::deser)
}
