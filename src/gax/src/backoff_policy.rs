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

//! Defines the trait for retry backoff policies.
//!
//! The HTTP transport automatically retries requests that fail with errors
//! matched by its retry predicates. It should avoid immediately retrying such
//! requests, as the service may need time to recover. [Exponential backoff]
//! with jitter is a well known algorithm to find an acceptable delay between
//! retries.
//!
//! [Exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff

use std::time::Duration;
use tokio::time::Instant;

/// Defines the trait implemented by all retry backoff strategies.
pub trait BackoffPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the backoff delay on a failure.
    ///
    /// # Parameters
    /// * `loop_start` - when the retry loop started.
    /// * `attempt_count` - the number of attempts. This method is always called
    ///   after the first attempt.
    fn on_failure(&self, loop_start: Instant, attempt_count: u32) -> Duration;
}
