//! TTL key-value cache for repository listings and tree snapshots.
//!
//! The cache is an injected capability, not a global: sync runs receive a
//! [`CacheStore`] and talk to it through the typed [`TreeCache`] wrapper.
//! Two distinct key namespaces are maintained and must stay separate, since
//! their TTLs and invalidation triggers differ:
//!
//! - `repotrees:listing:{organization}` — the repository-listing snapshot
//!   for one organization.
//! - `repotrees:files:{full_name}` — the flattened blob-path list for one
//!   repository.
//!
//! Writes are unconditional overwrites with last-writer-wins semantics;
//! concurrent runs for the same organization may race, and staleness is
//! bounded by the TTL, not by any cross-key coordination.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;

use crate::sync::Repo;

/// How long a repository-listing snapshot stays valid.
pub const LISTING_SNAPSHOT_TTL: Duration = Duration::from_secs(3600);

/// How long a per-repository file list stays valid. Must be at least the
/// listing TTL so a cached listing never outlives the trees behind it.
pub const REPO_FILES_TTL: Duration = Duration::from_secs(24 * 3600);

/// A key-value store with per-key TTL.
///
/// Reads return absent (not an error) on miss or expiry; writes overwrite
/// unconditionally. No transactions or multi-key atomicity are required of
/// implementations.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn put(&self, key: &str, value: Value, ttl: Duration);
}

/// In-process [`CacheStore`] backed by a mutex-guarded map.
///
/// Expired entries are dropped lazily on read; there is no background
/// eviction.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, MemoryEntry>>>,
}

struct MemoryEntry {
    value: Value,
    expires_at: Instant,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-expired) entries. Test and diagnostics helper.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) {
        let entry = MemoryEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), entry);
    }
}

/// Typed access to the two tree-sync cache namespaces.
#[derive(Clone)]
pub struct TreeCache {
    store: Arc<dyn CacheStore>,
}

impl TreeCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Cache key for an organization's repository-listing snapshot.
    #[must_use]
    pub fn listing_key(organization: &str) -> String {
        format!("repotrees:listing:{organization}")
    }

    /// Cache key for one repository's flattened file list.
    #[must_use]
    pub fn files_key(full_name: &str) -> String {
        format!("repotrees:files:{full_name}")
    }

    /// Read the listing snapshot for `organization`, if present and valid.
    ///
    /// A stored value that no longer deserializes is treated as a miss.
    pub async fn listing_snapshot(&self, organization: &str) -> Option<Vec<Repo>> {
        let value = self.store.get(&Self::listing_key(organization)).await?;
        match serde_json::from_value(value) {
            Ok(repos) => Some(repos),
            Err(e) => {
                tracing::debug!(organization, error = %e, "discarding unreadable listing snapshot");
                None
            }
        }
    }

    /// Store the listing snapshot for `organization`.
    pub async fn store_listing_snapshot(&self, organization: &str, repos: &[Repo]) {
        let value = serde_json::to_value(repos).unwrap_or(Value::Null);
        self.store
            .put(&Self::listing_key(organization), value, LISTING_SNAPSHOT_TTL)
            .await;
    }

    /// Read the cached file list for `full_name`, if present and valid.
    ///
    /// An explicitly cached empty list is a hit, distinct from absence.
    pub async fn repo_files(&self, full_name: &str) -> Option<Vec<String>> {
        let value = self.store.get(&Self::files_key(full_name)).await?;
        match serde_json::from_value(value) {
            Ok(files) => Some(files),
            Err(e) => {
                tracing::debug!(full_name, error = %e, "discarding unreadable file list");
                None
            }
        }
    }

    /// Store the file list for `full_name`.
    pub async fn store_repo_files(&self, full_name: &str, files: &[String]) {
        let value = serde_json::to_value(files).unwrap_or(Value::Null);
        self.store
            .put(&Self::files_key(full_name), value, REPO_FILES_TTL)
            .await;
    }
}
