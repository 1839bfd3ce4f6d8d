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

//! Resource handlers for the Google Cloud Terraform provider.
//!
//! Each handler implements [Resource][resource::Resource]: it builds request
//! URLs from templates, sends typed requests through the provider
//! [HttpClient][transport::HttpClient], waits for the resulting long-running
//! operations, and reads the resource back into the Terraform state.
//!
//! # Example
//! ```no_run
//! # use tpg_resource::*;
//! # async fn sample() -> gax::Result<()> {
//! use services::compute::Address;
//! use resource::Resource;
//! let config = transport::Config::builder().with_project("my-project").build();
//! let ctx = context::ProviderContext::new(config).await?;
//! let mut data = data::ResourceData::new()
//!     .with_attribute("name", "my-address")
//!     .with_attribute("region", "us-central1");
//! Address.create(&ctx, &mut data).await?;
//! println!("created {}", data.id());
//! # Ok(()) }
//! ```

pub use gax::Result;
pub use gax::error::Error;

pub mod context;
pub mod data;
pub mod import;
pub mod resource;
pub mod services;
pub mod template;
