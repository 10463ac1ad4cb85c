use super::cache::{CacheEntry, CacheKey};
use crate::error::{Result, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Keyed client-side query cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;
    async fn set(&self, key: &CacheKey, value: CacheEntry) -> Result<()>;
    /// Drops the entry entirely; used to restore an absent snapshot.
    async fn remove(&self, key: &CacheKey) -> Result<()>;
    /// Resolves once no read for `key` can still land in the cache.
    async fn cancel_in_flight(&self, key: &CacheKey) -> Result<()>;
    /// Marks `key` for refetch; the server value replaces whatever is cached.
    async fn invalidate(&self, key: &CacheKey) -> Result<()>;
    /// Whether `key` was invalidated and not written since.
    async fn needs_refetch(&self, key: &CacheKey) -> Result<bool>;
}

/// Remote API. Responses are raw JSON, enveloped or bare.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str) -> std::result::Result<Value, TransportError>;
    async fn post(&self, path: &str, body: Value) -> std::result::Result<Value, TransportError>;
    async fn patch(&self, path: &str, body: Value) -> std::result::Result<Value, TransportError>;
    async fn delete(&self, path: &str) -> std::result::Result<Value, TransportError>;
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<CurrentUser>;
}

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

pub type CacheStoreRef = Arc<dyn CacheStore>;
pub type TransportRef = Arc<dyn Transport>;
pub type IdentityRef = Arc<dyn Identity>;
pub type NotifierRef = Arc<dyn Notifier>;
