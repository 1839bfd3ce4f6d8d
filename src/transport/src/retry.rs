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

//! Classifies request errors for the transport retry loop.
//!
//! A predicate inspects an error and returns the reason to retry it, or
//! `None`. The global predicates apply to every request. Resources opt into
//! the extra predicates on a per-request basis, and may also add abort
//! predicates that stop the loop even when a retry predicate matches.

use gax::error::Error;
use gax::loop_state::LoopState;
use gax::retry_policy::RetryPolicy;
use regex::Regex;
use std::sync::LazyLock;
use tokio::time::Instant;

/// Returns the reason to retry `error`, or `None` if the predicate does not
/// apply.
pub type RetryPredicate = fn(&Error) -> Option<&'static str>;

/// The predicates applied to every request.
pub const DEFAULT_RETRY_PREDICATES: [RetryPredicate; 7] = [
    is_io_error,
    is_rate_limit_error,
    is_common_retryable_error,
    is_operation_in_progress_error,
    is_subnetwork_unready_error,
    is_per_minute_quota_error,
    is_transient_auth_error,
];

static SUBNETWORK_UNREADY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"The resource '[-/\w]*/subnetworks/[-\w]*' is not ready")
        .expect("hard-coded regex is valid")
});

static PER_MINUTE_QUOTA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Quota exceeded for quota metric '[^']*'.*per minute")
        .expect("hard-coded regex is valid")
});

static IAM_MEMBER_PROPAGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Service account|Identity Pool|principal) .* does not exist")
        .expect("hard-coded regex is valid")
});

/// Connection resets, refused connections, and other I/O errors.
pub fn is_io_error(error: &Error) -> Option<&'static str> {
    error.is_io().then_some("I/O error")
}

/// HTTP 429 responses.
pub fn is_rate_limit_error(error: &Error) -> Option<&'static str> {
    (error.is_transport() && error.http_status_code() == Some(429))
        .then_some("rate limited (429)")
}

/// HTTP 500, 502 and 503 responses.
pub fn is_common_retryable_error(error: &Error) -> Option<&'static str> {
    if !error.is_transport() {
        return None;
    }
    match error.http_status_code()? {
        500 | 502 | 503 => Some("server error"),
        _ => None,
    }
}

/// HTTP 409 responses while another operation runs on the same resource.
pub fn is_operation_in_progress_error(error: &Error) -> Option<&'static str> {
    if error.http_status_code()? != 409 {
        return None;
    }
    error
        .body_text()
        .is_some_and(|b| b.contains("operationInProgress"))
        .then_some("operation in progress (409)")
}

/// HTTP 400 responses for subnetworks still being created.
pub fn is_subnetwork_unready_error(error: &Error) -> Option<&'static str> {
    if error.http_status_code()? != 400 {
        return None;
    }
    let body = error.body_text()?;
    (body.contains("resourceNotReady") && SUBNETWORK_UNREADY.is_match(&body))
        .then_some("subnetwork not ready (400)")
}

/// HTTP 403 responses for per-minute quotas, which replenish quickly.
pub fn is_per_minute_quota_error(error: &Error) -> Option<&'static str> {
    if error.http_status_code()? != 403 {
        return None;
    }
    let body = error.body_text()?;
    PER_MINUTE_QUOTA
        .is_match(&body)
        .then_some("per-minute quota exceeded (403)")
}

/// Credential errors the auth library reports as transient.
pub fn is_transient_auth_error(error: &Error) -> Option<&'static str> {
    if !error.is_authentication() {
        return None;
    }
    error
        .as_inner::<google_cloud_auth::errors::CredentialsError>()
        .is_some_and(|e| e.is_transient())
        .then_some("transient credentials error")
}

/// HTTP 412 responses when the resource fingerprint changed under us.
///
/// Resources that read the fingerprint before an update opt into this
/// predicate.
pub fn is_fingerprint_error(error: &Error) -> Option<&'static str> {
    if error.http_status_code()? != 412 {
        return None;
    }
    error
        .body_text()
        .is_some_and(|b| b.contains("conditionNotMet") || b.contains("fingerprint"))
        .then_some("fingerprint mismatch (412)")
}

/// HTTP 400 responses for IAM members that have not propagated yet.
pub fn is_iam_member_propagation_error(error: &Error) -> Option<&'static str> {
    if error.http_status_code()? != 400 {
        return None;
    }
    let body = error.body_text()?;
    IAM_MEMBER_PROPAGATION
        .is_match(&body)
        .then_some("IAM member not propagated (400)")
}

/// A [RetryPolicy] driven by retry and abort predicates.
///
/// An error matching any abort predicate is permanent. Otherwise, an error
/// matching any retry predicate continues the loop. Everything else is
/// permanent. Bound the policy with
/// [with_time_limit][gax::retry_policy::RetryPolicyExt::with_time_limit].
///
/// # Example
/// ```
/// # use tpg_transport::retry::*;
/// use gax::error::Error;
/// use gax::retry_policy::RetryPolicy;
/// use tokio::time::Instant;
/// let policy = PredicateRetryPolicy::new(&[is_fingerprint_error], &[]);
/// let error = Error::http(412, Default::default(), "conditionNotMet".into());
/// assert!(policy.on_error(Instant::now(), 1, error).is_continue());
/// let error = Error::http(404, Default::default(), "not found".into());
/// assert!(policy.on_error(Instant::now(), 1, error).is_permanent());
/// ```
#[derive(Clone, Debug)]
pub struct PredicateRetryPolicy {
    retry: Vec<RetryPredicate>,
    abort: Vec<RetryPredicate>,
}

impl PredicateRetryPolicy {
    /// Creates a policy with the default predicates plus `extra`.
    pub fn new(extra: &[RetryPredicate], abort: &[RetryPredicate]) -> Self {
        let retry = DEFAULT_RETRY_PREDICATES
            .iter()
            .chain(extra.iter())
            .copied()
            .collect();
        Self {
            retry,
            abort: abort.to_vec(),
        }
    }

    /// Returns the reason to retry `error`, if any.
    pub fn retry_reason(&self, error: &Error) -> Option<&'static str> {
        if self.abort.iter().any(|p| p(error).is_some()) {
            return None;
        }
        self.retry.iter().find_map(|p| p(error))
    }
}

impl Default for PredicateRetryPolicy {
    fn default() -> Self {
        Self::new(&[], &[])
    }
}

impl RetryPolicy for PredicateRetryPolicy {
    fn on_error(&self, _loop_start: Instant, attempt_count: u32, error: Error) -> LoopState {
        match self.retry_reason(&error) {
            Some(reason) => {
                tracing::debug!(attempt_count, reason, "retrying request: {error}");
                LoopState::Continue(error)
            }
            None => LoopState::Permanent(error),
        }
    }
}
