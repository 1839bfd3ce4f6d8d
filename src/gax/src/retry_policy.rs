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

//! Defines the trait for retry policies and the common decorators.
//!
//! The HTTP transport retries requests that fail with errors the provider
//! knows to be transient. The set of retryable errors depends on the request,
//! some resources opt into extra predicates, so the classification lives in
//! the transport. This module provides the trait and the decorators that
//! bound the retry loop.

use crate::error::Error;
use crate::loop_state::LoopState;
use std::time::Duration;
use tokio::time::Instant;

/// Controls the retry loop behavior.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Query the retry policy after an error.
    ///
    /// # Parameters
    /// * `loop_start` - when the retry loop started.
    /// * `attempt_count` - the number of attempts, including the one that just
    ///   failed.
    /// * `error` - the last error.
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState;

    /// The remaining time in the retry policy.
    ///
    /// For policies based on time, this returns the remaining time in the
    /// policy. The retry loop uses this value to bound each attempt. Policies
    /// not based on time return `None`.
    fn remaining_time(&self, _loop_start: Instant, _attempt_count: u32) -> Option<Duration> {
        None
    }
}

/// Extension trait for [RetryPolicy].
pub trait RetryPolicyExt: RetryPolicy + Sized {
    /// Decorate a [RetryPolicy] to limit the total elapsed time in the retry
    /// loop.
    ///
    /// While the time spent in the loop (including backoff) is less than the
    /// prescribed duration, `on_error()` returns the result of the inner
    /// policy. After that, [Continue][LoopState::Continue] turns into
    /// [Exhausted][LoopState::Exhausted].
    fn with_time_limit(self, maximum_duration: Duration) -> LimitedElapsedTime<Self> {
        LimitedElapsedTime::custom(self, maximum_duration)
    }

    /// Decorate a [RetryPolicy] to limit the number of attempts.
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::custom(self, maximum_attempts)
    }
}

impl<T: RetryPolicy> RetryPolicyExt for T {}

/// A retry policy decorator that limits the total time in the retry loop.
///
/// # Example
/// ```
/// # use tpg_gax::retry_policy::*;
/// # use tpg_gax::loop_state::LoopState;
/// # use tpg_gax::error::Error;
/// use std::time::Duration;
/// use tokio::time::Instant;
/// #[derive(Debug)]
/// struct Always;
/// impl RetryPolicy for Always {
///     fn on_error(&self, _: Instant, _: u32, e: Error) -> LoopState { LoopState::Continue(e) }
/// }
/// let policy = Always.with_time_limit(Duration::from_secs(10));
/// let start = Instant::now() - Duration::from_secs(20);
/// assert!(policy.on_error(start, 1, Error::io("reset")).is_exhausted());
/// assert_eq!(policy.remaining_time(start, 1), Some(Duration::ZERO));
/// ```
#[derive(Debug)]
pub struct LimitedElapsedTime<P>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_duration: Duration,
}

impl<P> LimitedElapsedTime<P>
where
    P: RetryPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_duration: Duration) -> Self {
        Self {
            inner,
            maximum_duration,
        }
    }

    fn on_error_now(
        &self,
        now: Instant,
        loop_start: Instant,
        attempt_count: u32,
        error: Error,
    ) -> LoopState {
        match self.inner.on_error(loop_start, attempt_count, error) {
            LoopState::Continue(e) if now >= loop_start + self.maximum_duration => {
                LoopState::Exhausted(e)
            }
            s => s,
        }
    }

    fn remaining_time_now(
        &self,
        now: Instant,
        loop_start: Instant,
        attempt_count: u32,
    ) -> Option<Duration> {
        let deadline = loop_start + self.maximum_duration;
        let remaining = deadline.saturating_duration_since(now);
        match self.inner.remaining_time(loop_start, attempt_count) {
            Some(inner) => Some(std::cmp::min(remaining, inner)),
            None => Some(remaining),
        }
    }
}

impl<P> RetryPolicy for LimitedElapsedTime<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState {
        self.on_error_now(Instant::now(), loop_start, attempt_count, error)
    }

    fn remaining_time(&self, loop_start: Instant, attempt_count: u32) -> Option<Duration> {
        self.remaining_time_now(Instant::now(), loop_start, attempt_count)
    }
}

/// A retry policy decorator that limits the number of attempts.
///
/// The decorator passes through the results of the inner policy as long as
/// `attempt_count < maximum_attempts`. After that, it turns
/// [Continue][LoopState::Continue] into [Exhausted][LoopState::Exhausted].
#[derive(Debug)]
pub struct LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_attempts: u32,
}

impl<P> LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }
}

impl<P> RetryPolicy for LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState {
        match self.inner.on_error(loop_start, attempt_count, error) {
            LoopState::Continue(e) if attempt_count >= self.maximum_attempts => {
                LoopState::Exhausted(e)
            }
            s => s,
        }
    }

    fn remaining_time(&self, loop_start: Instant, attempt_count: u32) -> Option<Duration> {
        self.inner.remaining_time(loop_start, attempt_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mockall::mock! {
        #[derive(Debug)]
        Policy {}
        impl RetryPolicy for Policy {
            fn on_error(&self, loop_start: Instant, attempt_count: u32, error: Error) -> LoopState;
            fn remaining_time(&self, loop_start: Instant, attempt_count: u32) -> Option<Duration>;
        }
    }

    fn continue_on_error() -> MockPolicy {
        let mut mock = MockPolicy::new();
        mock.expect_on_error()
            .returning(|_, _, e| LoopState::Continue(e));
        mock
    }

    #[test]
    fn limited_time_forwards() {
        let policy = continue_on_error().with_time_limit(Duration::from_secs(60));
        let start = Instant::now();
        let flow = policy.on_error_now(start, start, 1, Error::io("reset"));
        assert!(flow.is_continue(), "{flow:?}");
        let flow = policy.on_error_now(start + Duration::from_secs(59), start, 2, Error::io("reset"));
        assert!(flow.is_continue(), "{flow:?}");
    }

    #[test]
    fn limited_time_exhausted() {
        let policy = continue_on_error().with_time_limit(Duration::from_secs(60));
        let start = Instant::now();
        let flow = policy.on_error_now(start + Duration::from_secs(60), start, 2, Error::io("reset"));
        assert!(flow.is_exhausted(), "{flow:?}");
    }

    #[test]
    fn limited_time_inner_permanent() {
        let mut mock = MockPolicy::new();
        mock.expect_on_error()
            .returning(|_, _, e| LoopState::Permanent(e));
        let policy = mock.with_time_limit(Duration::from_secs(60));
        let start = Instant::now();
        let flow = policy.on_error_now(start + Duration::from_secs(90), start, 2, Error::io("x"));
        assert!(flow.is_permanent(), "{flow:?}");
    }

    #[test]
    fn limited_time_remaining() {
        let mut mock = MockPolicy::new();
        mock.expect_remaining_time()
            .times(3)
            .returning(|_, n| (n == 1).then_some(Duration::from_secs(5)));
        let policy = mock.with_time_limit(Duration::from_secs(60));
        let start = Instant::now();
        let now = start + Duration::from_secs(20);
        assert_eq!(
            policy.remaining_time_now(now, start, 1),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            policy.remaining_time_now(now, start, 2),
            Some(Duration::from_secs(40))
        );
        let now = start + Duration::from_secs(120);
        assert_eq!(policy.remaining_time_now(now, start, 3), Some(Duration::ZERO));
    }

    #[test]
    fn limited_attempts() {
        let policy = continue_on_error().with_attempt_limit(3);
        let start = Instant::now();
        assert!(policy.on_error(start, 1, Error::io("x")).is_continue());
        assert!(policy.on_error(start, 2, Error::io("x")).is_continue());
        assert!(policy.on_error(start, 3, Error::io("x")).is_exhausted());
    }
}
