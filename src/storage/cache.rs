//! Token state cache
//!
//! Last-known merged record per contract address, stored as JSON with a
//! fixed expiry that every write refreshes. Expiry is enforced by the store.
//! Get and put are independent calls; a read-modify-write by the caller is
//! not atomic.

use crate::error::{BotError, Result};
use crate::types::TokenRecord;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Default record lifetime: 24 hours
pub const TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

/// Key/value store for serialized token records
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Serialized record for `ca`, if present and not expired
    async fn get(&self, ca: &str) -> Result<Option<String>>;

    /// Store a serialized record and reset its expiry
    async fn put(&self, ca: &str, value: &str) -> Result<()>;
}

/// Load and decode the cached record for `ca`
pub async fn load_record(cache: &dyn TokenCache, ca: &str) -> Result<Option<TokenRecord>> {
    let Some(raw) = cache.get(ca).await? else {
        return Ok(None);
    };
    let record = serde_json::from_str(&raw)
        .map_err(|e| BotError::Parse(format!("cached record for {} is unreadable: {}", ca, e)))?;
    Ok(Some(record))
}

/// Encode and store a record under its contract address
pub async fn store_record(cache: &dyn TokenCache, record: &TokenRecord) -> Result<()> {
    let raw = serde_json::to_string(record)?;
    cache.put(&record.ca, &raw).await
}

/// Redis-backed cache (`SET key value EX ttl` / `GET key`)
#[derive(Clone)]
pub struct RedisTokenCache {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisTokenCache {
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| BotError::Config(format!("Invalid Redis URL: {}", e)))?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::with_connection(conn, ttl_secs))
    }

    pub fn with_connection(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn get(&self, ca: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(ca).await?;
        Ok(value)
    }

    async fn put(&self, ca: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(ca, value, self.ttl_secs).await?;
        debug!("Cached token {} with TTL {}s", ca, self.ttl_secs);
        Ok(())
    }
}

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(value: String, ttl_secs: u64) -> Self {
        Self {
            value,
            expires_at: Utc::now() + Duration::seconds(ttl_secs as i64),
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// In-process cache with the same expiry semantics, for tests and dry runs
#[derive(Debug, Clone)]
pub struct MemoryTokenCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl_secs: u64,
}

impl Default for MemoryTokenCache {
    fn default() -> Self {
        Self::new(TOKEN_TTL_SECS)
    }
}

impl MemoryTokenCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl_secs,
        }
    }

    /// Drop expired entries
    pub fn cleanup(&self) {
        self.entries.write().retain(|_, entry| !entry.is_expired());
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let total = entries.len();
        let expired = entries.values().filter(|e| e.is_expired()).count();
        CacheStats {
            total_entries: total,
            expired_entries: expired,
            valid_entries: total - expired,
        }
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn get(&self, ca: &str) -> Result<Option<String>> {
        let entries = self.entries.read();
        Ok(entries
            .get(ca)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn put(&self, ca: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(ca.to_string(), CacheEntry::new(value.to_string(), self.ttl_secs));
        Ok(())
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub valid_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldMap;

    fn record(ca: &str, holder: &str) -> TokenRecord {
        let mut fields = FieldMap::new();
        fields.insert("ca", ca);
        fields.insert("holder", holder);
        TokenRecord::from_fields(&fields).unwrap()
    }

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryTokenCache::default();
        let mut rec = record("ca1", "50");
        rec.bump_alert();

        store_record(&cache, &rec).await.unwrap();
        let loaded = load_record(&cache, "ca1").await.unwrap().unwrap();

        assert_eq!(loaded, rec);
        assert_eq!(loaded.alert, 1);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache = MemoryTokenCache::default();
        assert!(load_record(&cache, "nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_whole_record() {
        let cache = MemoryTokenCache::default();
        store_record(&cache, &record("ca1", "50")).await.unwrap();
        store_record(&cache, &record("ca1", "75")).await.unwrap();

        let loaded = load_record(&cache, "ca1").await.unwrap().unwrap();
        assert_eq!(loaded.get("holder"), Some("75"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let cache = MemoryTokenCache::new(0);
        cache.put("ca1", "{}").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert!(cache.get("ca1").await.unwrap().is_none());
        assert_eq!(cache.stats().expired_entries, 1);

        cache.cleanup();
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_unreadable_record_is_parse_error() {
        let cache = MemoryTokenCache::default();
        cache.put("ca1", "not json").await.unwrap();

        let err = load_record(&cache, "ca1").await.unwrap_err();
        assert!(matches!(err, BotError::Parse(_)));
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = MemoryTokenCache::new(3600);
        for ca in ["a", "b", "c"] {
            cache.put(ca, "{}").await.unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.valid_entries, 3);
        assert_eq!(stats.expired_entries, 0);
    }
}
