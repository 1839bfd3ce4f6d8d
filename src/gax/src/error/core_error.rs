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

use super::rpc::Status;
use http::HeaderMap;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The core error returned by all the provider runtime crates.
///
/// The errors are categorized by kind, and the kind can be queried with the
/// `is_*()` functions. Most errors wrap a source error with additional
/// details, available via [source()][std::error::Error::source].
///
/// # Example
/// ```
/// use tpg_gax::error::Error;
/// use tpg_gax::error::rpc::Status;
/// let status = Status::default().set_code(9).set_message("quota exceeded");
/// let error = Error::operation_failed(status.clone());
/// assert!(error.is_operation_failed());
/// assert_eq!(error.status(), Some(&status));
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

impl Error {
    /// Creates an error representing a caller bug detected before any request
    /// is made.
    ///
    /// # Example
    /// ```
    /// use tpg_gax::error::Error;
    /// let error = Error::invalid_state("operation has no name");
    /// assert!(error.is_invalid_state());
    /// ```
    pub fn invalid_state<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::InvalidState,
            source: Some(source.into()),
        }
    }

    /// The caller misused the API, for example, waiting on an operation
    /// without a name, or with a non-positive timeout.
    ///
    /// These errors are never retried.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidState)
    }

    /// Creates an error with the information returned by Google Cloud services.
    pub fn service(status: Status) -> Self {
        Self::service_with_http_metadata(status, None, None)
    }

    /// Creates a service error including transport metadata.
    pub fn service_with_http_metadata(
        status: Status,
        status_code: Option<u16>,
        headers: Option<HeaderMap>,
    ) -> Self {
        let details = ServiceDetails {
            status,
            status_code,
            headers,
        };
        Self {
            kind: ErrorKind::Service(Box::new(details)),
            source: None,
        }
    }

    /// Creates an error for a long-running operation that completed with an
    /// error.
    ///
    /// # Example
    /// ```
    /// use tpg_gax::error::{Error, rpc::Status};
    /// let error = Error::operation_failed(Status::default().set_code(409).set_message("conflict"));
    /// assert!(error.is_operation_failed());
    /// assert!(error.to_string().contains("conflict"), "{error}");
    /// ```
    pub fn operation_failed(status: Status) -> Self {
        Self {
            kind: ErrorKind::OperationFailed(Box::new(status)),
            source: None,
        }
    }

    /// The long-running operation completed, and the service reports it
    /// failed.
    ///
    /// The service status is available via [status()][Error::status]. This is
    /// a terminal error, retrying the wait cannot change the outcome.
    pub fn is_operation_failed(&self) -> bool {
        matches!(self.kind, ErrorKind::OperationFailed(_))
    }

    /// Creates an error representing a timeout.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use tpg_gax::error::Error;
    /// let error = Error::timeout("simulated timeout");
    /// assert!(error.is_timeout());
    /// assert!(error.source().is_some());
    /// ```
    pub fn timeout<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            source: Some(source.into()),
        }
    }

    /// The request, or the wait for a long-running operation, could not
    /// complete before its deadline.
    ///
    /// This is always a client-side generated error. The operation may still
    /// complete in the service.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Creates an error representing a cancelled wait.
    pub fn cancelled<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            source: Some(source.into()),
        }
    }

    /// The caller cancelled the wait.
    ///
    /// Cancelling only stops watching the operation, the operation continues
    /// in the service.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Creates an error representing an exhausted policy.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use tpg_gax::error::Error;
    /// let error = Error::exhausted("too many retry attempts");
    /// assert!(error.is_exhausted());
    /// assert!(error.source().is_some());
    /// ```
    pub fn exhausted<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Exhausted,
            source: Some(source.into()),
        }
    }

    /// The request could not complete before the retry policy expired.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::Exhausted)
    }

    /// Creates an error representing a deserialization problem.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use tpg_gax::error::Error;
    /// let error = Error::deser("simulated problem");
    /// assert!(error.is_deserialization());
    /// assert!(error.source().is_some());
    /// ```
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The response could not be deserialized, or it violates the invariants
    /// of the receiving type.
    ///
    /// Retrying cannot fix these problems, they indicate a contract violation
    /// between the service and the provider.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// Creates an error representing a serialization problem.
    pub fn ser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Serialization,
            source: Some(source.into()),
        }
    }

    /// The request could not be serialized.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Serialization)
    }

    /// Creates an error for missing or malformed request parameters.
    pub fn binding<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Binding,
            source: Some(source.into()),
        }
    }

    /// The request URL could not be built from the resource data, or an
    /// import id does not match any of the accepted formats.
    pub fn is_binding(&self) -> bool {
        matches!(self.kind, ErrorKind::Binding)
    }

    /// Creates an error for problems creating the authentication headers.
    pub fn authentication<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Authentication,
            source: Some(source.into()),
        }
    }

    /// Could not create the authentication headers before sending the request.
    pub fn is_authentication(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication)
    }

    /// A problem reported by the transport layer, with the full HTTP response.
    pub fn http(status_code: u16, headers: HeaderMap, payload: bytes::Bytes) -> Self {
        let details = TransportDetails {
            status_code: Some(status_code),
            headers: Some(headers),
            payload: Some(payload),
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: None,
        }
    }

    /// A problem in the transport layer without a full HTTP response.
    ///
    /// Examples include: a broken connection after the request is sent, or
    /// a connection refused by the service.
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        let details = TransportDetails {
            status_code: None,
            headers: None,
            payload: None,
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: Some(source.into()),
        }
    }

    /// The transport could not complete the request, and no HTTP response is
    /// available.
    pub fn is_io(&self) -> bool {
        matches!(
            &self.kind,
            ErrorKind::Transport(d) if d.status_code.is_none()
        )
    }

    /// The request failed fetching data over the network.
    ///
    /// This includes I/O errors, non-2xx HTTP responses, and errors reported
    /// by the service in the error envelope of a non-2xx response. Whether
    /// the error is worth retrying depends on the status code, see the
    /// polling error and retry policies.
    pub fn is_transport(&self) -> bool {
        match &self.kind {
            ErrorKind::Transport(_) => true,
            ErrorKind::Service(d) => d.status_code.is_some(),
            _ => false,
        }
    }

    /// The [Status] payload associated with this error.
    ///
    /// Service errors and failed operations include a status.
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            ErrorKind::Service(d) => Some(&d.status),
            ErrorKind::OperationFailed(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// The HTTP status code, if any, associated with this error.
    pub fn http_status_code(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Transport(d) => d.status_code,
            ErrorKind::Service(d) => d.status_code,
            _ => None,
        }
    }

    /// The headers, if any, associated with this error.
    pub fn http_headers(&self) -> Option<&HeaderMap> {
        match &self.kind {
            ErrorKind::Transport(d) => d.headers.as_ref(),
            ErrorKind::Service(d) => d.headers.as_ref(),
            _ => None,
        }
    }

    /// The payload, if any, associated with this error.
    pub fn http_payload(&self) -> Option<&bytes::Bytes> {
        match &self.kind {
            ErrorKind::Transport(d) => d.payload.as_ref(),
            _ => None,
        }
    }

    /// A best-effort description of the error body, used by the retry
    /// predicates.
    ///
    /// Returns the HTTP payload if it is valid UTF-8, or the service status
    /// message and details.
    pub fn body_text(&self) -> Option<String> {
        if let Some(p) = self.http_payload() {
            return std::str::from_utf8(p.as_ref()).ok().map(str::to_string);
        }
        self.status().map(|s| {
            let details = serde_json::to_string(&s.details).unwrap_or_default();
            format!(
                "{} {} {details}",
                s.status.as_deref().unwrap_or_default(),
                s.message
            )
        })
    }

    /// Returns the source error downcast to `T`, if it is of that type.
    pub fn as_inner<T: StdError + Send + Sync + 'static>(&self) -> Option<&T> {
        self.source.as_ref().and_then(|e| e.downcast_ref::<T>())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::InvalidState, Some(e)) => write!(f, "invalid state: {e}"),
            (ErrorKind::Binding, Some(e)) => {
                write!(f, "cannot build the request from the resource data: {e}")
            }
            (ErrorKind::Serialization, Some(e)) => write!(f, "cannot serialize the request {e}"),
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "cannot deserialize the response {e}")
            }
            (ErrorKind::Authentication, Some(e)) => {
                write!(f, "cannot create the authentication headers {e}")
            }
            (ErrorKind::Timeout, Some(e)) => write!(f, "timeout: {e}"),
            (ErrorKind::Cancelled, Some(e)) => write!(f, "cancelled: {e}"),
            (ErrorKind::Exhausted, Some(e)) => write!(f, "{e}"),
            (ErrorKind::Transport(details), _) => details.display(self.source(), f),
            (ErrorKind::Service(d), _) => {
                write!(
                    f,
                    "the service reports an error with code {} described as: {}",
                    d.status.code, d.status.message
                )
            }
            (ErrorKind::OperationFailed(s), _) => {
                write!(
                    f,
                    "the operation failed with code {} described as: {}",
                    s.code, s.message
                )
            }
            (_, None) => unreachable!("no constructor allows this"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

#[derive(Debug)]
enum ErrorKind {
    InvalidState,
    Binding,
    Serialization,
    Deserialization,
    Authentication,
    Timeout,
    Cancelled,
    Exhausted,
    Transport(Box<TransportDetails>),
    Service(Box<ServiceDetails>),
    OperationFailed(Box<Status>),
}

#[derive(Debug)]
struct TransportDetails {
    status_code: Option<u16>,
    headers: Option<HeaderMap>,
    payload: Option<bytes::Bytes>,
}

impl TransportDetails {
    fn display(
        &self,
        source: Option<&(dyn StdError + 'static)>,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match (source, &self) {
            (
                _,
                TransportDetails {
                    status_code: Some(code),
                    payload: Some(p),
                    ..
                },
            ) => {
                if let Ok(message) = std::str::from_utf8(p.as_ref()) {
                    write!(f, "the HTTP transport reports a [{code}] error: {message}")
                } else {
                    write!(f, "the HTTP transport reports a [{code}] error: {p:?}")
                }
            }
            (Some(source), _) => write!(f, "the transport reports an error: {source}"),
            (None, _) => unreachable!("no Error constructor allows this"),
        }
    }
}

#[derive(Debug)]
struct ServiceDetails {
    status_code: Option<u16>,
    headers: Option<HeaderMap>,
    status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn invalid_state() {
        let error = Error::invalid_state("no name");
        assert!(error.is_invalid_state(), "{error:?}");
        assert!(!error.is_transport(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("no name"), "{error}");
    }

    #[test]
    fn operation_failed() {
        let status = Status::default().set_code(409).set_message("conflict");
        let error = Error::operation_failed(status.clone());
        assert!(error.is_operation_failed(), "{error:?}");
        assert!(!error.is_transport(), "{error:?}");
        assert_eq!(error.status(), Some(&status));
        assert!(error.to_string().contains("conflict"), "{error}");
        assert!(error.source().is_none(), "{error:?}");
    }

    #[test]
    fn timeout_and_cancelled() {
        let error = Error::timeout("deadline");
        assert!(error.is_timeout(), "{error:?}");
        assert!(!error.is_cancelled(), "{error:?}");
        let error = Error::cancelled("user abort");
        assert!(error.is_cancelled(), "{error:?}");
        assert!(!error.is_timeout(), "{error:?}");
    }

    #[test]
    fn http() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        let error = Error::http(503, headers.clone(), bytes::Bytes::from_static(b"try again"));
        assert!(error.is_transport(), "{error:?}");
        assert!(!error.is_io(), "{error:?}");
        assert_eq!(error.http_status_code(), Some(503));
        assert_eq!(error.http_headers(), Some(&headers));
        assert_eq!(error.body_text().as_deref(), Some("try again"));
        assert!(error.to_string().contains("[503]"), "{error}");
    }

    #[test]
    fn io() {
        let error = Error::io("connection reset by peer");
        assert!(error.is_transport(), "{error:?}");
        assert!(error.is_io(), "{error:?}");
        assert_eq!(error.http_status_code(), None);
        assert!(error.to_string().contains("connection reset"), "{error}");
    }

    #[test]
    fn service() {
        let status = Status::default()
            .set_code(409)
            .set_status("ABORTED")
            .set_message("operationInProgress");
        let error = Error::service_with_http_metadata(status.clone(), Some(409), None);
        assert!(error.is_transport(), "{error:?}");
        assert_eq!(error.status(), Some(&status));
        assert_eq!(error.http_status_code(), Some(409));
        let body = error.body_text().unwrap();
        assert!(body.contains("operationInProgress"), "{body}");

        let error = Error::service(status.clone());
        assert!(!error.is_transport(), "{error:?}");
    }

    #[test]
    fn as_inner() {
        #[derive(Debug, thiserror::Error)]
        #[error("inner")]
        struct Inner;
        let error = Error::deser(Inner);
        assert!(error.is_deserialization(), "{error:?}");
        assert!(error.as_inner::<Inner>().is_some(), "{error:?}");
        assert!(error.as_inner::<std::fmt::Error>().is_none(), "{error:?}");
    }
}
