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

//! Named locks shared by the resources of one provider instance.
//!
//! Some resources are fragments of a larger parent: a membership spec inside a
//! fleet Feature, an IAM binding inside a policy. Concurrent read-modify-write
//! cycles on the parent lose updates, so every mutation of a fragment takes
//! the lock named after its parent first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Serializes work on named keys.
///
/// The provider context holds an `Arc<dyn Locker>`. Production code uses
/// [MutexStore], tests may substitute their own implementation.
#[async_trait::async_trait]
pub trait Locker: Send + Sync + std::fmt::Debug {
    /// Waits until no other holder of `key` remains, then returns a guard
    /// that holds the lock until dropped.
    async fn lock(&self, key: &str) -> LockGuard;
}

/// Holds a named lock, releasing it when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard {
    key: String,
    _guard: Box<dyn Send + Sync>,
}

impl LockGuard {
    /// Wraps `guard`, an implementation-specific value released on drop.
    pub fn new<K, G>(key: K, guard: G) -> Self
    where
        K: Into<String>,
        G: Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            _guard: Box::new(guard),
        }
    }

    /// The name of the lock.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").field("key", &self.key).finish()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        tracing::debug!(key = %self.key, "unlocked");
    }
}

/// The default [Locker]: one async mutex per key, created on first use.
///
/// Keys are never removed, the set of parents touched by one provider run is
/// small.
///
/// # Example
/// ```
/// # use tpg_transport::mutex::*;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MutexStore::new();
/// let guard = store.lock("projects/p/locations/global/features/configmanagement").await;
/// assert_eq!(guard.key(), "projects/p/locations/global/features/configmanagement");
/// drop(guard);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MutexStore {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl MutexStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        // The map is only touched without awaiting, so a poisoned lock still
        // holds a consistent map.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.to_string()).or_default().clone()
    }
}

#[async_trait::async_trait]
impl Locker for MutexStore {
    async fn lock(&self, key: &str) -> LockGuard {
        tracing::debug!(key, "locking");
        let guard = self.get(key).lock_owned().await;
        tracing::debug!(key, "locked");
        LockGuard::new(key, guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type TestResult = anyhow::Result<()>;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_key_is_serialized() -> TestResult {
        let store = Arc::new(MutexStore::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let tasks = (0..8)
            .map(|_| {
                let store = store.clone();
                let active = active.clone();
                let max_active = max_active.clone();
                tokio::spawn(async move {
                    let _guard = store.lock("parent").await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    max_active.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect::<Vec<_>>();
        for t in tasks {
            t.await?;
        }
        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn different_keys_proceed() {
        let store = MutexStore::new();
        let a = store.lock("a").await;
        let b = tokio::time::timeout(Duration::from_secs(5), store.lock("b")).await;
        assert!(b.is_ok(), "lock on a different key should not block");
        drop(a);
    }

    #[tokio::test(start_paused = true)]
    async fn released_on_drop() {
        let store = MutexStore::new();
        let guard = store.lock("k").await;
        let blocked = tokio::time::timeout(Duration::from_secs(1), store.lock("k")).await;
        assert!(blocked.is_err(), "second holder should wait");
        drop(guard);
        let guard = tokio::time::timeout(Duration::from_secs(1), store.lock("k")).await;
        assert!(guard.is_ok(), "lock should be available after drop");
    }

    #[tokio::test]
    async fn released_on_early_return() {
        async fn fails(store: &MutexStore) -> gax::Result<()> {
            let _guard = store.lock("k").await;
            Err(gax::error::Error::invalid_state("early return"))
        }
        let store = MutexStore::new();
        assert!(fails(&store).await.is_err());
        let guard = tokio::time::timeout(Duration::from_secs(1), store.lock("k")).await;
        assert!(guard.is_ok(), "lock should be available after an error");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn released_on_panic() -> TestResult {
        let store = Arc::new(MutexStore::new());
        let s = store.clone();
        let result = tokio::spawn(async move {
            let _guard = s.lock("k").await;
            panic!("handler bug");
        })
        .await;
        assert!(result.is_err());
        let guard = tokio::time::timeout(Duration::from_secs(1), store.lock("k")).await;
        assert!(guard.is_ok(), "lock should be available after a panic");
        Ok(())
    }

    #[test]
    fn guard_debug() {
        let guard = LockGuard::new("parent", ());
        assert_eq!(format!("{guard:?}"), r#"LockGuard { key: "parent" }"#);
        assert_eq!(guard.key(), "parent");
    }
}
