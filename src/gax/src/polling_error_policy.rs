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

//! Defines the types for polling error policies.
//!
//! The operation waiter polls long-running operations and needs to
//! distinguish errors that may resolve on a later poll from errors that will
//! not. It may also need to limit how many failed polls it tolerates.
//!
//! Applications may implement [PollingErrorPolicy] to customize the waiter.
//! The default is [TransientOnly].
//!
//! # Example
//! ```
//! # use tpg_gax::polling_error_policy::*;
//! use tokio::time::Instant;
//! use tpg_gax::error::Error;
//! // Tolerate transient errors, but give up after 5 polls.
//! let policy = TransientOnly.with_attempt_limit(5);
//! assert!(policy.on_error(Instant::now(), 1, Error::io("reset")).is_continue());
//! assert!(policy.on_error(Instant::now(), 5, Error::io("reset")).is_exhausted());
//! assert!(policy.on_error(Instant::now(), 1, Error::deser("bad")).is_permanent());
//! ```

use crate::error::Error;
use crate::loop_state::LoopState;
use tokio::time::Instant;

/// HTTP status codes worth polling again.
const TRANSIENT_HTTP_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Determines how errors are handled in the polling loop.
pub trait PollingErrorPolicy: Send + Sync + std::fmt::Debug {
    /// Query the polling policy after a failed poll.
    ///
    /// # Parameters
    /// * `loop_start` - when the polling loop started.
    /// * `attempt_count` - the number of polls, including the one that just
    ///   failed. This is always non-zero.
    /// * `error` - the error returned by the poll.
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState;
}

/// Extension trait for [PollingErrorPolicy].
pub trait PollingErrorPolicyExt: PollingErrorPolicy + Sized {
    /// Decorate a [PollingErrorPolicy] to limit the number of failed polls.
    ///
    /// The decorator passes through the results of the inner policy as long
    /// as `attempt_count < maximum_attempts`. After that, it turns
    /// [Continue][LoopState::Continue] into [Exhausted][LoopState::Exhausted].
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::custom(self, maximum_attempts)
    }
}

impl<T: PollingErrorPolicy> PollingErrorPolicyExt for T {}

/// Returns true if `error` may resolve on a later poll.
///
/// I/O errors, HTTP 429, 500, 502, 503 and 504, and HTTP 409 responses
/// reporting `operationInProgress` are transient, as are transport retries
/// that ran out of time on one of those. Everything else, including every
/// deserialization and invalid state error, is not.
///
/// # Example
/// ```
/// # use tpg_gax::polling_error_policy::is_transient;
/// use tpg_gax::error::Error;
/// let error = Error::http(503, Default::default(), "unavailable".into());
/// assert!(is_transient(&error));
/// let error = Error::http(403, Default::default(), "denied".into());
/// assert!(!is_transient(&error));
/// ```
pub fn is_transient(error: &Error) -> bool {
    if error.is_exhausted() {
        return error.as_inner::<Error>().is_some_and(is_transient);
    }
    if error.is_io() {
        return true;
    }
    if !error.is_transport() {
        return false;
    }
    match error.http_status_code() {
        Some(code) if TRANSIENT_HTTP_CODES.contains(&code) => true,
        Some(409) => error
            .body_text()
            .is_some_and(|body| body.contains("operationInProgress")),
        _ => false,
    }
}

/// Continues polling only on transient errors.
///
/// This is the default policy of the operation waiter. It does not limit the
/// number of polls, the waiter's deadline does that.
///
/// # Example
/// ```
/// # use tpg_gax::polling_error_policy::*;
/// use tokio::time::Instant;
/// use tpg_gax::error::Error;
/// let policy = TransientOnly;
/// let error = Error::http(429, Default::default(), "slow down".into());
/// assert!(policy.on_error(Instant::now(), 1, error).is_continue());
/// let error = Error::http(404, Default::default(), "not found".into());
/// assert!(policy.on_error(Instant::now(), 1, error).is_permanent());
/// ```
#[derive(Clone, Debug, Default)]
pub struct TransientOnly;

impl PollingErrorPolicy for TransientOnly {
    fn on_error(&self, _loop_start: Instant, _attempt_count: u32, error: Error) -> LoopState {
        if is_transient(&error) {
            LoopState::Continue(error)
        } else {
            LoopState::Permanent(error)
        }
    }
}

/// Continues polling on any transport error.
///
/// Deserialization and invalid state errors still stop the loop, no number
/// of polls can fix them.
#[derive(Clone, Debug, Default)]
pub struct AlwaysContinue;

impl PollingErrorPolicy for AlwaysContinue {
    fn on_error(&self, _loop_start: Instant, _attempt_count: u32, error: Error) -> LoopState {
        if error.is_deserialization() || error.is_invalid_state() {
            return LoopState::Permanent(error);
        }
        LoopState::Continue(error)
    }
}

/// A polling error policy decorator that limits the number of polls.
///
/// # Parameters
/// * `P` - the inner polling policy, defaults to [TransientOnly].
#[derive(Debug)]
pub struct LimitedAttemptCount<P = TransientOnly>
where
    P: PollingErrorPolicy,
{
    inner: P,
    maximum_attempts: u32,
}

impl LimitedAttemptCount {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_attempts: u32) -> Self {
        Self::custom(TransientOnly, maximum_attempts)
    }
}

impl<P> LimitedAttemptCount<P>
where
    P: PollingErrorPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }
}

impl<P> PollingErrorPolicy for LimitedAttemptCount<P>
where
    P: PollingErrorPolicy,
{
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState {
        match self.inner.on_error(loop_start, attempt_count, error) {
            LoopState::Continue(e) if attempt_count >= self.maximum_attempts => {
                LoopState::Exhausted(e)
            }
            s => s,
        }
    }
}
