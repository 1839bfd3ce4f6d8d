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

//! Waits for long-running operations started by the provider.
//!
//! Most Google Cloud APIs mutate resources asynchronously: the request returns
//! an operation, and the final outcome is only known once the operation is
//! done. This crate models those operations, and implements the loop that
//! polls them until they complete, fail, time out, or the caller gives up.
//!
//! # Example
//! ```
//! # use tpg_lro::*;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tpg_lro::Result<()> {
//! use std::time::Duration;
//! let poller = poller_fn(|name: String| async move {
//!     Ok(Operation::new(name)
//!         .set_status(OperationStatus::Done)
//!         .set_response(serde_json::json!({"status": "ACTIVE"})))
//! });
//! let spec = WaitSpec::new("creating Address", Duration::from_secs(300))
//!     .with_poll_interval(Duration::from_millis(10));
//! let response = Waiter::new(poller)
//!     .wait(Operation::new("operations/op-123"), &spec)
//!     .await?;
//! assert_eq!(response, serde_json::json!({"status": "ACTIVE"}));
//! # Ok(()) }
//! ```

pub use gax::Result;
pub use gax::error::Error;

mod details;
pub mod model;
mod operation;
mod poller;
mod waiter;

pub use operation::{Operation, OperationResource, OperationStatus};
pub use poller::{OperationPoller, PollerFn, poller_fn};
pub use waiter::{WaitCancelled, WaitSpec, WaitTimeout, Waiter};
