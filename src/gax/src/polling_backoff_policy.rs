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

//! Defines the trait for polling backoff policies.
//!
//! The operation waiter backs off between polls to avoid overloading the
//! service. These policies are not retry backoff policies: polling backoff
//! must be predictable, so implementations should not use jitter.
//!
//! The most common implementation is truncated [exponential backoff]
//! **without** jitter. The delay grows exponentially until it reaches a cap.
//! This works well when the time to complete an operation is not known in
//! advance.
//!
//! # Example
//! ```
//! # use tpg_gax::exponential_backoff::Error;
//! # use tpg_gax::exponential_backoff::ExponentialBackoffBuilder;
//! use tpg_gax::polling_backoff_policy::PollingBackoffPolicy;
//! use std::time::Duration;
//! use tokio::time::Instant;
//!
//! let policy = ExponentialBackoffBuilder::new()
//!     .with_initial_delay(Duration::from_secs(10))
//!     .with_maximum_delay(Duration::from_secs(60))
//!     .build()?;
//! assert_eq!(policy.wait_period(Instant::now(), 1), Duration::from_secs(10));
//! assert_eq!(policy.wait_period(Instant::now(), 2), Duration::from_secs(20));
//! assert_eq!(policy.wait_period(Instant::now(), 4), Duration::from_secs(60));
//! # Ok::<(), Error>(())
//! ```
//!
//! [Exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff

use std::time::Duration;
use tokio::time::Instant;

/// Defines the trait implemented by all polling backoff strategies.
pub trait PollingBackoffPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the delay before the next poll.
    ///
    /// # Parameters
    /// * `loop_start` - when the polling loop started.
    /// * `attempt_count` - the number of polls so far. This method is always
    ///   called after the first poll.
    fn wait_period(&self, loop_start: Instant, attempt_count: u32) -> Duration;
}
