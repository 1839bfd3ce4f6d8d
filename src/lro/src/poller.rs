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

use crate::Operation;
use gax::Result;
use gax::error::Error;
use std::future::Future;

/// Fetches the latest snapshot of a long-running operation.
///
/// Implementations perform exactly one request per call. They should return
/// transport errors unchanged, the waiter decides which ones to tolerate.
pub trait OperationPoller: Send + Sync {
    /// Fetches a new snapshot of the operation identified by `name`.
    fn poll(&self, name: &str) -> impl Future<Output = Result<Operation>> + Send;
}

/// An [OperationPoller] created from a closure.
///
/// See [poller_fn].
#[derive(Clone, Debug)]
pub struct PollerFn<F> {
    inner: F,
}

/// Creates an [OperationPoller] from a closure.
///
/// The closure receives the operation name. Empty names are rejected with an
/// [invalid state][Error::is_invalid_state] error before calling the closure.
///
/// # Example
/// ```
/// # use tpg_lro::*;
/// let poller = poller_fn(|name: String| async move {
///     Ok(Operation::new(name).set_status(OperationStatus::Running))
/// });
/// ```
pub fn poller_fn<F, Fut>(f: F) -> PollerFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Operation>> + Send,
{
    PollerFn { inner: f }
}

impl<F, Fut> OperationPoller for PollerFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Operation>> + Send,
{
    async fn poll(&self, name: &str) -> Result<Operation> {
        if name.is_empty() {
            return Err(Error::invalid_state("cannot poll an operation without a name"));
        }
        (self.inner)(name.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OperationStatus;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn forwards_name() -> anyhow::Result<()> {
        let poller = poller_fn(|name: String| async move {
            Ok(Operation::new(name).set_status(OperationStatus::Running))
        });
        let got = poller.poll("operations/op-1").await?;
        assert_eq!(got.name, "operations/op-1");
        assert_eq!(got.status, OperationStatus::Running);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_empty_name() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let poller = poller_fn(move |name: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(Operation::new(name)) }
        });
        let err = poller.poll("").await.unwrap_err();
        assert!(err.is_invalid_state(), "{err:?}");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
