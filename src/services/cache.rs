use std::time::Duration;

use crate::error::AppError;
use crate::models::{Status, StatusRef};
use crate::services::store::Store;

/// In-memory cache of status lookups
///
/// Statuses change rarely, so name and id lookups made while resolving
/// transitions are kept for `ttl_secs` instead of hitting the store each time.
#[derive(Clone)]
pub struct StatusCache {
    entries: moka::future::Cache<String, Status>,
}

impl StatusCache {
    /// Create a new cache holding at most `capacity` entries
    pub fn new(capacity: u64, ttl_secs: u64) -> Self {
        let entries = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { entries }
    }

    /// Resolve a status reference to a canonical status
    ///
    /// Fails with [`AppError::UnknownStatus`] when the store has no such status.
    pub async fn resolve<S: Store>(&self, store: &S, status: &StatusRef) -> Result<Status, AppError> {
        let key = CacheKey::status(status);

        if let Some(hit) = self.entries.get(&key).await {
            tracing::trace!("Status cache hit: {}", key);
            return Ok(hit);
        }

        let found = match status {
            StatusRef::Id(id) => store.status_by_id(*id).await?,
            StatusRef::Name(name) => store.status_by_name(name.trim()).await?,
        };

        match found {
            Some(resolved) => {
                tracing::trace!("Status cache miss: {}", key);
                self.entries.insert(key, resolved.clone()).await;
                self.entries
                    .insert(CacheKey::status_id(resolved.status_id), resolved.clone())
                    .await;
                Ok(resolved)
            }
            None => Err(AppError::UnknownStatus(status.to_string())),
        }
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for any status reference
    pub fn status(status: &StatusRef) -> String {
        match status {
            StatusRef::Id(id) => Self::status_id(*id),
            StatusRef::Name(name) => Self::status_name(name),
        }
    }

    /// Build a cache key for a status id
    pub fn status_id(status_id: i32) -> String {
        format!("status:id:{}", status_id)
    }

    /// Build a cache key for a status description
    pub fn status_name(name: &str) -> String {
        format!("status:name:{}", name.trim().to_ascii_uppercase())
    }
}
