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

use super::Result;
use super::backoff_policy::BackoffPolicy;
use super::error::Error;
use super::loop_state::LoopState;
use super::retry_policy::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

enum RetryLoopAttempt {
    // The first attempt
    Initial,
    // (Attempt count, backoff delay, previous error)
    Retry(u32, Duration, Error),
}

impl RetryLoopAttempt {
    fn count(&self) -> u32 {
        match self {
            RetryLoopAttempt::Initial => 0,
            RetryLoopAttempt::Retry(count, _, _) => *count,
        }
    }
}

/// Runs the retry loop for a given function.
///
/// Calls `inner` until it succeeds, or the retry policy stops the loop. In
/// between calls the function waits the amount of time prescribed by the
/// backoff policy, using `sleep`.
///
/// `inner` receives the time remaining in the retry policy, if any, and
/// should use it to bound the attempt.
pub async fn retry_loop<F, S, Response>(
    inner: F,
    sleep: S,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff_policy: Arc<dyn BackoffPolicy>,
) -> Result<Response>
where
    F: AsyncFnMut(Option<Duration>) -> Result<Response> + Send,
    S: AsyncFn(Duration) -> () + Send,
{
    retry_loop_with_callback(inner, sleep, retry_policy, backoff_policy, |_, _, _| {}).await
}

/// Runs the retry loop for a given function with a callback for retries.
///
/// The `on_retry` callback is called before sleeping, with the attempt count,
/// the error, and the delay.
///
/// If the policy has a time limit, and the next delay would exceed it, the
/// loop stops with an [Exhausted][Error::is_exhausted] error wrapping the
/// last error. Errors the policy declares permanent or exhausted are returned
/// unchanged.
pub async fn retry_loop_with_callback<F, S, OnRetry, Response>(
    mut inner: F,
    sleep: S,
    retry_policy: Arc<dyn RetryPolicy>,
    backoff_policy: Arc<dyn BackoffPolicy>,
    mut on_retry: OnRetry,
) -> Result<Response>
where
    F: AsyncFnMut(Option<Duration>) -> Result<Response> + Send,
    S: AsyncFn(Duration) -> () + Send,
    OnRetry: FnMut(u32, &Error, Duration) + Send,
{
    let loop_start = tokio::time::Instant::now();
    let mut attempt_state = RetryLoopAttempt::Initial;
    loop {
        let attempt_count = attempt_state.count();
        let remaining_time = retry_policy.remaining_time(loop_start, attempt_count);

        if let RetryLoopAttempt::Retry(attempt_count, delay, prev_error) = attempt_state {
            if remaining_time.is_some_and(|remaining| remaining < delay) {
                return Err(Error::exhausted(prev_error));
            }
            on_retry(attempt_count, &prev_error, delay);
            sleep(delay).await;
        }
        let attempt_count = attempt_count + 1;
        let remaining_time = retry_policy.remaining_time(loop_start, attempt_count);
        match inner(remaining_time).await {
            Ok(r) => return Ok(r),
            Err(e) => match retry_policy.on_error(loop_start, attempt_count, e) {
                LoopState::Permanent(e) | LoopState::Exhausted(e) => return Err(e),
                LoopState::Continue(e) => {
                    let delay = backoff_policy.on_failure(loop_start, attempt_count);
                    attempt_state = RetryLoopAttempt::Retry(attempt_count, delay, e);
                }
            },
        }
    }
}
