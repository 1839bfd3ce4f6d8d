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

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// The error model returned by Google Cloud REST APIs and embedded in failed
/// long-running operations.
///
/// Each [Status] contains a numeric code, an optional symbolic status, a
/// developer-facing message, and free-form details.
///
/// The numeric code is passed through verbatim. For REST error envelopes it is
/// the HTTP status code, for AIP-151 operations it is the canonical RPC code,
/// and for Compute Engine operations it is the HTTP status code of the failed
/// operation, when known.
///
/// You can find out more about this error model in the
/// [API Design Guide](https://cloud.google.com/apis/design/errors).
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Status {
    /// The status code.
    pub code: i32,

    /// A developer-facing error message.
    pub message: String,

    /// The symbolic status, such as `FAILED_PRECONDITION`, when the service
    /// includes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// A list of objects carrying the error details.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
}

impl Status {
    /// Sets the value for [code][Status::code].
    pub fn set_code<T: Into<i32>>(mut self, v: T) -> Self {
        self.code = v.into();
        self
    }

    /// Sets the value for [message][Status::message].
    pub fn set_message<T: Into<String>>(mut self, v: T) -> Self {
        self.message = v.into();
        self
    }

    /// Sets the value for [status][Status::status].
    pub fn set_status<T: Into<String>>(mut self, v: T) -> Self {
        self.status = Some(v.into());
        self
    }

    /// Sets the value for [details][Status::details].
    pub fn set_details<T, I>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = I>,
        I: Into<serde_json::Value>,
    {
        self.details = v.into_iter().map(|v| v.into()).collect();
        self
    }
}

/// A helper to deserialize the `{"error": {...}}` envelope.
#[derive(Clone, Debug, Deserialize)]
struct ErrorWrapper {
    error: Status,
}

impl TryFrom<&bytes::Bytes> for Status {
    type Error = Error;

    fn try_from(value: &bytes::Bytes) -> Result<Self, Self::Error> {
        serde_json::from_slice::<ErrorWrapper>(value)
            .map(|w| w.error)
            .map_err(Error::deser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    const SAMPLE_PAYLOAD: &[u8] = b"{\n  \"error\": {\n    \"code\": 400,\n    \"message\": \"Invalid value for field 'resource.name': 'BAD_NAME'.\",\n    \"status\": \"INVALID_ARGUMENT\"\n  }\n}\n";

    #[test]
    fn setters() {
        let status = Status::default()
            .set_code(409)
            .set_message("conflict")
            .set_status("ABORTED")
            .set_details([json!({"reason": "operationInProgress"})]);
        assert_eq!(status.code, 409);
        assert_eq!(status.message, "conflict");
        assert_eq!(status.status.as_deref(), Some("ABORTED"));
        assert_eq!(status.details, vec![json!({"reason": "operationInProgress"})]);
    }

    #[test]
    fn serialize_skips_empty() -> Result<()> {
        let status = Status::default().set_code(409).set_message("conflict");
        let got = serde_json::to_value(&status)?;
        assert_eq!(got, json!({"code": 409, "message": "conflict"}));
        Ok(())
    }

    #[test]
    fn try_from_bytes() -> Result<()> {
        let got = Status::try_from(&bytes::Bytes::from_static(SAMPLE_PAYLOAD))?;
        let want = Status::default()
            .set_code(400)
            .set_status("INVALID_ARGUMENT")
            .set_message("Invalid value for field 'resource.name': 'BAD_NAME'.");
        assert_eq!(got, want);

        let got = Status::try_from(&bytes::Bytes::from_static(b"\"error\": 1234"));
        let err = got.unwrap_err();
        assert!(err.is_deserialization(), "{err:?}");

        let got = Status::try_from(&bytes::Bytes::from_static(b"{\"missing-error\": 1234}"));
        let err = got.unwrap_err();
        assert!(err.is_deserialization(), "{err:?}");
        Ok(())
    }
}
