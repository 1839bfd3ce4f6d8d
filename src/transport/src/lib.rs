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

//! The transport layer of the Google Cloud Terraform provider.
//!
//! This crate contains the provider configuration, the authenticated JSON
//! client used for every REST call, the predicates deciding which request
//! errors are retried, an [OperationPoller][lro::OperationPoller] backed by
//! that client, and the named locks serializing mutations of shared parent
//! resources.

pub use gax::Result;
pub use gax::error::Error;

pub mod client;
pub mod config;
pub mod mutex;
pub mod poller;
pub mod retry;

pub use client::{HttpClient, SendRequest};
pub use config::{Config, ConfigBuilder};
pub use mutex::{LockGuard, Locker, MutexStore};
pub use poller::HttpOperationPoller;
