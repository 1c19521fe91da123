//! Key operations against a named environment.
//!
//! Every call resolves the environment through the [`ConnectionCache`] and then
//! issues the matching Redis command. Errors are passed through untouched; the
//! HTTP handlers are the only place they get translated.

use super::ConnectionCache;
use butler_core::{
    BatchDeleteReport, BatchExpireReport, KeyInfo, KeyKind, KeyPreview, KeyValueStore, Result,
    TimeToLive, PREVIEW_LAST_INDEX,
};
use std::sync::Arc;
use tracing::{debug, info};

pub struct KeyService {
    connections: Arc<ConnectionCache>,
}

impl KeyService {
    pub fn new(connections: Arc<ConnectionCache>) -> Self {
        Self { connections }
    }

    pub async fn read(&self, environment: &str, key: &str) -> Result<Option<String>> {
        let store = self.connections.acquire(environment).await?;
        store.get(key).await
    }

    pub async fn write(&self, environment: &str, key: &str, value: &str) -> Result<String> {
        let store = self.connections.acquire(environment).await?;
        debug!("SET {} on {}", key, environment);
        store.set(key, value).await
    }

    pub async fn write_with_expire(
        &self,
        environment: &str,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<String> {
        let store = self.connections.acquire(environment).await?;
        debug!("SETEX {} {}s on {}", key, ttl_seconds, environment);
        store.set_ex(key, value, ttl_seconds).await
    }

    pub async fn delete(&self, environment: &str, keys: &[String]) -> Result<i64> {
        let store = self.connections.acquire(environment).await?;
        store.del(keys).await
    }

    pub async fn exists(&self, environment: &str, key: &str) -> Result<bool> {
        let store = self.connections.acquire(environment).await?;
        Ok(store.exists(key).await? > 0)
    }

    /// `false` when the key does not exist
    pub async fn expire(&self, environment: &str, key: &str, ttl_seconds: i64) -> Result<bool> {
        let store = self.connections.acquire(environment).await?;
        store.expire(key, ttl_seconds).await
    }

    pub async fn time_to_live(&self, environment: &str, key: &str) -> Result<TimeToLive> {
        let store = self.connections.acquire(environment).await?;
        Ok(TimeToLive::from_reply(store.ttl(key).await?))
    }

    pub async fn key_type(&self, environment: &str, key: &str) -> Result<KeyKind> {
        let store = self.connections.acquire(environment).await?;
        Ok(KeyKind::from(store.key_type(key).await?.as_str()))
    }

    /// Keys matching a glob pattern.
    ///
    /// Runs `KEYS`, which walks the whole keyspace and blocks the server while
    /// doing so. Results are not paginated.
    pub async fn list_keys(&self, environment: &str, pattern: &str) -> Result<Vec<String>> {
        let store = self.connections.acquire(environment).await?;
        let keys = store.keys(pattern).await?;
        debug!("{} key(s) match {} on {}", keys.len(), pattern, environment);
        Ok(keys)
    }

    /// Existence, type and TTL of a key plus a preview of its contents
    pub async fn describe_key(&self, environment: &str, key: &str) -> Result<KeyInfo> {
        let store = self.connections.acquire(environment).await?;

        let exists = store.exists(key).await? > 0;
        let kind = KeyKind::from(store.key_type(key).await?.as_str());
        let ttl = TimeToLive::from_reply(store.ttl(key).await?);

        let preview = if exists {
            preview(store.as_ref(), key, &kind).await?
        } else {
            None
        };

        Ok(KeyInfo {
            key: key.to_string(),
            exists,
            kind,
            ttl,
            preview,
        })
    }

    /// Delete every key matching `pattern`. Not atomic: keys can change
    /// between the scan and the delete, and the counts reflect that.
    pub async fn batch_delete(&self, environment: &str, pattern: &str) -> Result<BatchDeleteReport> {
        let keys = self.list_keys(environment, pattern).await?;
        if keys.is_empty() {
            return Ok(BatchDeleteReport::default());
        }

        let deleted = self.delete(environment, &keys).await?;
        info!(
            "Batch delete {} on {}: matched={}, deleted={}",
            pattern,
            environment,
            keys.len(),
            deleted
        );

        Ok(BatchDeleteReport {
            matched_count: keys.len(),
            deleted_count: deleted,
            matched_keys: keys,
        })
    }

    /// Apply a TTL to every key matching `pattern`, one `EXPIRE` per key.
    /// Keys that vanish in between are counted as not affected.
    pub async fn batch_expire(
        &self,
        environment: &str,
        pattern: &str,
        ttl_seconds: i64,
    ) -> Result<BatchExpireReport> {
        let keys = self.list_keys(environment, pattern).await?;
        if keys.is_empty() {
            return Ok(BatchExpireReport::default());
        }

        let mut affected = 0;
        for key in &keys {
            if self.expire(environment, key, ttl_seconds).await? {
                affected += 1;
            }
        }
        info!(
            "Batch expire {} ({}s) on {}: matched={}, affected={}",
            pattern,
            ttl_seconds,
            environment,
            keys.len(),
            affected
        );

        Ok(BatchExpireReport {
            matched_count: keys.len(),
            affected_count: affected,
            matched_keys: keys,
        })
    }

    pub async fn database_size(&self, environment: &str) -> Result<i64> {
        let store = self.connections.acquire(environment).await?;
        store.dbsize().await
    }

    /// Remove every key in the environment's selected database. Irreversible.
    pub async fn flush_database(&self, environment: &str) -> Result<String> {
        let store = self.connections.acquire(environment).await?;
        info!("Flushing database of {}", environment);
        store.flushdb().await
    }
}

async fn preview(store: &dyn KeyValueStore, key: &str, kind: &KeyKind) -> Result<Option<KeyPreview>> {
    Ok(match kind {
        KeyKind::String => Some(scalar_preview(store, key).await?),
        KeyKind::List => Some(list_preview(store, key).await?),
        KeyKind::Set => Some(set_preview(store, key).await?),
        KeyKind::Hash => Some(hash_preview(store, key).await?),
        KeyKind::ZSet => Some(sorted_set_preview(store, key).await?),
        KeyKind::None | KeyKind::Other(_) => None,
    })
}

async fn scalar_preview(store: &dyn KeyValueStore, key: &str) -> Result<KeyPreview> {
    Ok(KeyPreview::Scalar {
        value: store.get(key).await?,
    })
}

async fn list_preview(store: &dyn KeyValueStore, key: &str) -> Result<KeyPreview> {
    Ok(KeyPreview::List {
        length: store.llen(key).await?,
        values: store.lrange(key, 0, PREVIEW_LAST_INDEX).await?,
    })
}

async fn set_preview(store: &dyn KeyValueStore, key: &str) -> Result<KeyPreview> {
    Ok(KeyPreview::Set {
        size: store.scard(key).await?,
        members: store.smembers(key).await?,
    })
}

async fn hash_preview(store: &dyn KeyValueStore, key: &str) -> Result<KeyPreview> {
    Ok(KeyPreview::Hash {
        size: store.hlen(key).await?,
        fields: store.hgetall(key).await?,
    })
}

async fn sorted_set_preview(store: &dyn KeyValueStore, key: &str) -> Result<KeyPreview> {
    Ok(KeyPreview::SortedSet {
        size: store.zcard(key).await?,
        members: store.zrange(key, 0, PREVIEW_LAST_INDEX).await?,
    })
}
