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

use crate::details;
use crate::{Operation, OperationPoller, OperationStatus};
use gax::Result;
use gax::error::Error;
use gax::exponential_backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use gax::loop_state::LoopState;
use gax::polling_backoff_policy::PollingBackoffPolicy;
use gax::polling_error_policy::{PollingErrorPolicy, TransientOnly};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_MAXIMUM_DELAY: Duration = Duration::from_secs(60);

/// The parameters for one wait.
///
/// # Example
/// ```
/// # use tpg_lro::WaitSpec;
/// use std::time::Duration;
/// let spec = WaitSpec::new("creating Address", Duration::from_secs(20 * 60))
///     .with_poll_interval(Duration::from_secs(2));
/// assert_eq!(spec.poll_interval(), Duration::from_secs(2));
/// assert_eq!(spec.maximum_delay(), Duration::from_secs(60));
/// ```
#[derive(Clone, Debug)]
pub struct WaitSpec {
    activity: String,
    timeout: Duration,
    poll_interval: Duration,
    maximum_delay: Duration,
}

impl WaitSpec {
    /// Creates a new spec.
    ///
    /// The `activity` is a human readable label, such as `"creating
    /// Address"`, used in logs and errors. The `timeout` bounds the total
    /// time in the polling loop.
    pub fn new<T: Into<String>>(activity: T, timeout: Duration) -> Self {
        Self {
            activity: activity.into(),
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            maximum_delay: DEFAULT_MAXIMUM_DELAY,
        }
    }

    /// Changes the delay before the second poll. Later delays double, up to
    /// the [maximum delay][WaitSpec::maximum_delay].
    pub fn with_poll_interval(mut self, v: Duration) -> Self {
        self.poll_interval = v;
        self
    }

    /// Changes the cap on the delay between polls.
    ///
    /// A cap below the poll interval is ignored.
    pub fn with_maximum_delay(mut self, v: Duration) -> Self {
        self.maximum_delay = v;
        self
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The effective cap on the delay between polls.
    pub fn maximum_delay(&self) -> Duration {
        self.maximum_delay.max(self.poll_interval)
    }

    /// Returns an error if these settings cannot drive a polling loop.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::invalid_state(format!(
                "the timeout for {} must be positive",
                self.activity
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::invalid_state(format!(
                "the poll interval for {} must be positive",
                self.activity
            )));
        }
        Ok(())
    }

    /// The default backoff policy for this spec.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_delay(self.poll_interval)
            .with_maximum_delay(self.maximum_delay())
            .with_scaling(2.0)
            .clamp()
    }
}

/// The source of [timeout][Error::is_timeout] errors returned by [Waiter].
#[derive(Debug, thiserror::Error)]
#[error(
    "timeout while {activity} after {elapsed:?} (limit {timeout:?}), operation {operation} was last seen in state {last_status}"
)]
#[non_exhaustive]
pub struct WaitTimeout {
    /// The label from the [WaitSpec].
    pub activity: String,
    /// The name of the operation.
    pub operation: String,
    /// The configured timeout.
    pub timeout: Duration,
    /// The time spent in the loop.
    pub elapsed: Duration,
    /// The last status observed before the deadline.
    pub last_status: OperationStatus,
    /// The error returned by the last poll, if it failed.
    #[source]
    pub last_error: Option<Error>,
}

/// The source of [cancelled][Error::is_cancelled] errors returned by [Waiter].
#[derive(Debug, thiserror::Error)]
#[error(
    "stopped waiting while {activity} after {attempt_count} polls, operation {operation} may still complete"
)]
#[non_exhaustive]
pub struct WaitCancelled {
    /// The label from the [WaitSpec].
    pub activity: String,
    /// The name of the operation.
    pub operation: String,
    /// The number of polls before the wait was cancelled.
    pub attempt_count: u32,
}

/// Polls a long-running operation until it reaches a terminal state.
///
/// The waiter polls with exponential backoff, starting at the
/// [poll interval][WaitSpec::poll_interval] and doubling up to the
/// [maximum delay][WaitSpec::maximum_delay]. Sleeps are clamped to the time
/// left, so the last poll happens at the deadline.
///
/// Poll errors are classified by a [PollingErrorPolicy], by default
/// [TransientOnly]: transient errors are tolerated until the deadline, any
/// other error stops the wait.
///
/// Cancelling the token passed to [with_cancellation][Waiter::with_cancellation]
/// stops the wait, interrupting any sleep. The operation itself is not
/// cancelled.
pub struct Waiter<P> {
    poller: P,
    backoff_policy: Option<Arc<dyn PollingBackoffPolicy>>,
    error_policy: Arc<dyn PollingErrorPolicy>,
    cancel: CancellationToken,
}

impl<P> Waiter<P>
where
    P: OperationPoller,
{
    /// Creates a waiter using `poller` to fetch operation snapshots.
    pub fn new(poller: P) -> Self {
        Self {
            poller,
            backoff_policy: None,
            error_policy: Arc::new(TransientOnly),
            cancel: CancellationToken::new(),
        }
    }

    /// Overrides the backoff policy derived from each [WaitSpec].
    pub fn with_backoff_policy<V>(mut self, v: V) -> Self
    where
        V: PollingBackoffPolicy + 'static,
    {
        self.backoff_policy = Some(Arc::new(v));
        self
    }

    /// Changes the policy to classify poll errors.
    pub fn with_error_policy<V>(mut self, v: V) -> Self
    where
        V: PollingErrorPolicy + 'static,
    {
        self.error_policy = Arc::new(v);
        self
    }

    /// Stops waiting when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Waits for `operation` and returns its response.
    ///
    /// Fails with:
    /// - an [invalid state][Error::is_invalid_state] error, before any poll,
    ///   if the operation has no name or the [WaitSpec] is not valid.
    /// - an [operation failed][Error::is_operation_failed] error if the
    ///   operation completes with an error.
    /// - a [deserialization][Error::is_deserialization] error if a finished
    ///   operation has both or neither of a response and an error.
    /// - a [timeout][Error::is_timeout] error if the operation does not
    ///   finish in time. The source is a [WaitTimeout].
    /// - a [cancelled][Error::is_cancelled] error if the wait is cancelled.
    ///   The source is a [WaitCancelled].
    /// - the poll error, if the error policy does not tolerate it.
    pub async fn wait(&self, operation: Operation, spec: &WaitSpec) -> Result<serde_json::Value> {
        if operation.name.is_empty() {
            return Err(Error::invalid_state(format!(
                "cannot wait for an operation without a name while {}",
                spec.activity
            )));
        }
        spec.validate()?;
        if operation.is_done() {
            tracing::debug!(
                activity = %spec.activity,
                operation = %operation.name,
                "operation completed without polling"
            );
            let name = operation.name.clone();
            return Self::finish(spec, &name, 0, operation);
        }

        let name = operation.name;
        let loop_start = Instant::now();
        let deadline = loop_start.checked_add(spec.timeout).ok_or_else(|| {
            Error::invalid_state(format!("the timeout for {} is too large", spec.activity))
        })?;
        // A poll may not outlive the deadline by more than one poll interval.
        let poll_deadline = deadline.checked_add(spec.poll_interval).unwrap_or(deadline);
        let backoff = self
            .backoff_policy
            .clone()
            .unwrap_or_else(|| Arc::new(spec.backoff()));
        let mut last_status = operation.status;
        let mut last_error = None;
        let mut attempt_count = 0_u32;
        tracing::info!(
            activity = %spec.activity,
            operation = %name,
            timeout = ?spec.timeout,
            "waiting for operation"
        );
        loop {
            if self.cancel.is_cancelled() {
                return Err(Self::cancelled(spec, &name, attempt_count));
            }
            attempt_count += 1;
            let poll = tokio::time::timeout_at(poll_deadline, self.poller.poll(&name));
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(Self::cancelled(spec, &name, attempt_count));
                }
                r = poll => r,
            };
            match result {
                Err(_) => {
                    tracing::warn!(
                        activity = %spec.activity,
                        operation = %name,
                        attempt_count,
                        "poll did not complete before the deadline"
                    );
                    let timeout = Self::timed_out(spec, &name, loop_start, last_status, last_error);
                    return Err(timeout);
                }
                Ok(Ok(op)) if op.is_done() => {
                    return Self::finish(spec, &name, attempt_count, op);
                }
                Ok(Ok(op)) => {
                    tracing::debug!(
                        activity = %spec.activity,
                        operation = %name,
                        attempt_count,
                        status = %op.status,
                        "operation in progress"
                    );
                    last_status = op.status;
                    last_error = None;
                }
                Ok(Err(e)) => match self.error_policy.on_error(loop_start, attempt_count, e) {
                    LoopState::Continue(e) => {
                        tracing::warn!(
                            activity = %spec.activity,
                            operation = %name,
                            attempt_count,
                            "transient error polling operation: {e}"
                        );
                        last_error = Some(e);
                    }
                    LoopState::Permanent(e) | LoopState::Exhausted(e) => {
                        tracing::warn!(
                            activity = %spec.activity,
                            operation = %name,
                            attempt_count,
                            "error polling operation: {e}"
                        );
                        return Err(e);
                    }
                },
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Self::timed_out(spec, &name, loop_start, last_status, last_error));
            }
            let delay = backoff
                .wait_period(loop_start, attempt_count)
                .min(deadline - now);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(Self::cancelled(spec, &name, attempt_count));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Waits for `operation` and decodes its response into `T`.
    ///
    /// A response that cannot be decoded is a
    /// [deserialization][Error::is_deserialization] error.
    pub async fn wait_for<T>(&self, operation: Operation, spec: &WaitSpec) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        details::as_typed(self.wait(operation, spec).await?)
    }

    fn finish(
        spec: &WaitSpec,
        name: &str,
        attempt_count: u32,
        op: Operation,
    ) -> Result<serde_json::Value> {
        let result = details::as_result(op);
        match &result {
            Ok(_) => tracing::info!(
                activity = %spec.activity,
                operation = %name,
                attempt_count,
                "operation succeeded"
            ),
            Err(e) => tracing::warn!(
                activity = %spec.activity,
                operation = %name,
                attempt_count,
                "operation failed: {e}"
            ),
        }
        result
    }

    fn timed_out(
        spec: &WaitSpec,
        name: &str,
        loop_start: Instant,
        last_status: OperationStatus,
        last_error: Option<Error>,
    ) -> Error {
        let details = WaitTimeout {
            activity: spec.activity.clone(),
            operation: name.to_string(),
            timeout: spec.timeout,
            elapsed: loop_start.elapsed(),
            last_status,
            last_error,
        };
        tracing::warn!("{details}");
        Error::timeout(details)
    }

    fn cancelled(spec: &WaitSpec, name: &str, attempt_count: u32) -> Error {
        let details = WaitCancelled {
            activity: spec.activity.clone(),
            operation: name.to_string(),
            attempt_count,
        };
        tracing::info!("{details}");
        Error::cancelled(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller_fn;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use test_case::test_case;

    fn running(name: String) -> Operation {
        Operation::new(name).set_status(OperationStatus::Running)
    }

    #[test]
    fn spec_defaults() {
        let spec = WaitSpec::new("creating Address", Duration::from_secs(60));
        assert_eq!(spec.activity(), "creating Address");
        assert_eq!(spec.timeout(), Duration::from_secs(60));
        assert_eq!(spec.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(spec.maximum_delay(), DEFAULT_MAXIMUM_DELAY);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn spec_maximum_delay_never_below_interval() {
        let spec = WaitSpec::new("x", Duration::from_secs(600))
            .with_poll_interval(Duration::from_secs(90))
            .with_maximum_delay(Duration::from_secs(30));
        assert_eq!(spec.maximum_delay(), Duration::from_secs(90));
        let backoff = spec.backoff();
        let now = Instant::now();
        assert_eq!(backoff.wait_period(now, 1), Duration::from_secs(90));
        assert_eq!(backoff.wait_period(now, 5), Duration::from_secs(90));
    }

    #[test]
    fn spec_backoff() {
        let spec = WaitSpec::new("x", Duration::from_secs(600))
            .with_poll_interval(Duration::from_secs(10));
        let backoff = spec.backoff();
        let now = Instant::now();
        let got = (1..=5)
            .map(|n| backoff.wait_period(now, n))
            .collect::<Vec<_>>();
        assert_eq!(got, [10, 20, 40, 60, 60].map(Duration::from_secs));
    }

    #[test_case(Duration::ZERO, Duration::from_secs(1); "zero timeout")]
    #[test_case(Duration::from_secs(1), Duration::ZERO; "zero interval")]
    #[tokio::test(start_paused = true)]
    async fn invalid_spec(timeout: Duration, poll_interval: Duration) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poller = poller_fn(move |name| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(running(name)) }
        });
        let spec = WaitSpec::new("x", timeout).with_poll_interval(poll_interval);
        let err = Waiter::new(poller)
            .wait(Operation::new("op-1"), &spec)
            .await
            .unwrap_err();
        assert!(err.is_invalid_state(), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_name() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poller = poller_fn(move |name| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(running(name)) }
        });
        let spec = WaitSpec::new("x", Duration::from_secs(5));
        let err = Waiter::new(poller)
            .wait(Operation::default(), &spec)
            .await
            .unwrap_err();
        assert!(err.is_invalid_state(), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn already_done() -> anyhow::Result<()> {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poller = poller_fn(move |name| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(running(name)) }
        });
        let spec = WaitSpec::new("x", Duration::from_secs(5));
        let op = Operation::new("op-1")
            .set_status(OperationStatus::Done)
            .set_response(json!({"ok": true}));
        let got = Waiter::new(poller).wait(op, &spec).await?;
        assert_eq!(got, json!({"ok": true}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_poll() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poller = poller_fn(move |name| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(running(name)) }
        });
        let token = CancellationToken::new();
        token.cancel();
        let spec = WaitSpec::new("x", Duration::from_secs(5));
        let err = Waiter::new(poller)
            .with_cancellation(token)
            .wait(Operation::new("op-1"), &spec)
            .await
            .unwrap_err();
        assert!(err.is_cancelled(), "{err:?}");
        assert!(!err.is_timeout(), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_during_sleep() {
        let poller = poller_fn(|name| async move { Ok(running(name)) });
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            child.cancel();
        });
        let spec = WaitSpec::new("x", Duration::from_secs(3600))
            .with_poll_interval(Duration::from_secs(60));
        let start = Instant::now();
        let err = Waiter::new(poller)
            .with_cancellation(token)
            .wait(Operation::new("op-1"), &spec)
            .await
            .unwrap_err();
        assert!(err.is_cancelled(), "{err:?}");
        assert!(start.elapsed() < Duration::from_secs(60), "{:?}", start.elapsed());
        let details = err.as_inner::<WaitCancelled>().expect("cancelled errors carry details");
        assert_eq!(details.operation, "op-1");
        assert_eq!(details.attempt_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_poll_is_bounded() {
        let poller = poller_fn(|name| async move {
            tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
            Ok(running(name))
        });
        let spec = WaitSpec::new("x", Duration::from_secs(5))
            .with_poll_interval(Duration::from_secs(1));
        let start = Instant::now();
        let err = Waiter::new(poller)
            .wait(Operation::new("op-1"), &spec)
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "{err:?}");
        assert!(start.elapsed() <= Duration::from_secs(6), "{:?}", start.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_poll_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poller = poller_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(Error::http(
                    403,
                    http_headers(),
                    bytes_from("permission denied"),
                ))
            }
        });
        let spec = WaitSpec::new("x", Duration::from_secs(60));
        let err = Waiter::new(poller)
            .wait(Operation::new("op-1"), &spec)
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), Some(403), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deser_poll_error_is_fatal() {
        use gax::polling_error_policy::AlwaysContinue;
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poller = poller_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Err(Error::deser("unexpected payload")) }
        });
        let spec = WaitSpec::new("x", Duration::from_secs(60));
        let err = Waiter::new(poller)
            .with_error_policy(AlwaysContinue)
            .wait(Operation::new("op-1"), &spec)
            .await
            .unwrap_err();
        assert!(err.is_deserialization(), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_backoff() -> anyhow::Result<()> {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_delay(Duration::from_secs(7))
            .with_maximum_delay(Duration::from_secs(7))
            .build()?;
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poller = poller_fn(move |name| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    return Ok(running(name));
                }
                Ok(Operation::new(name)
                    .set_status(OperationStatus::Done)
                    .set_response(json!({})))
            }
        });
        let spec = WaitSpec::new("x", Duration::from_secs(60));
        let start = Instant::now();
        Waiter::new(poller)
            .with_backoff_policy(backoff)
            .wait(Operation::new("op-1"), &spec)
            .await?;
        assert_eq!(start.elapsed(), Duration::from_secs(14));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_typed() -> anyhow::Result<()> {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Feature {
            state: String,
        }
        let poller = poller_fn(|name| async move {
            Ok(Operation::new(name)
                .set_status(OperationStatus::Done)
                .set_response(json!({"state": "ACTIVE"})))
        });
        let spec = WaitSpec::new("x", Duration::from_secs(60));
        let got = Waiter::new(poller)
            .wait_for::<Feature>(Operation::new("op-1"), &spec)
            .await?;
        assert_eq!(got, Feature { state: "ACTIVE".into() });
        Ok(())
    }

    fn http_headers() -> http::HeaderMap {
        http::HeaderMap::new()
    }

    fn bytes_from(s: &'static str) -> bytes::Bytes {
        bytes::Bytes::from_static(s.as_bytes())
    }
}
