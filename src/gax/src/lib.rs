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

//! Shared building blocks for the Google Cloud Terraform provider runtime.
//!
//! This crate contains the error type returned by every layer of the provider
//! runtime, and the policies that control loops: the backoff between polls of
//! a long-running operation, the classification of polling errors, and the
//! retry policy used when sending individual requests.

/// An alias of [std::result::Result] where the error is always [Error][crate::error::Error].
pub type Result<T> = std::result::Result<T, crate::error::Error>;

pub mod backoff_policy;
pub mod error;
pub mod exponential_backoff;
pub mod loop_state;
pub mod polling_backoff_policy;
pub mod polling_error_policy;
pub mod retry_loop_internal;
pub mod retry_policy;
