//! In-memory store using DashMap, standing in for Redis in tests

use async_trait::async_trait;
use butler_core::{ButlerError, EnvironmentDescriptor, KeyValueStore, Result, StoreConnector};
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wildmatch::WildMatch;

#[derive(Debug, Clone)]
pub enum MemoryValue {
    String(String),
    List(Vec<String>),
    Set(BTreeSet<String>),
    Hash(BTreeMap<String, String>),
    /// Members kept in score order
    ZSet(Vec<(f64, String)>),
}

impl MemoryValue {
    fn type_name(&self) -> &'static str {
        match self {
            MemoryValue::String(_) => "string",
            MemoryValue::List(_) => "list",
            MemoryValue::Set(_) => "set",
            MemoryValue::Hash(_) => "hash",
            MemoryValue::ZSet(_) => "zset",
        }
    }
}

struct CacheEntry {
    value: MemoryValue,
    expires_at: Option<Instant>,
}

/// Shared keyspace for one environment. Connections opened by
/// [`MemoryConnector`] all see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<DashMap<String, CacheEntry>>,
    commands: Arc<Mutex<Vec<String>>>,
    broken: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value directly, bypassing the command log
    pub fn insert(&self, key: &str, value: MemoryValue) {
        self.data.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: None,
            },
        );
    }

    /// Names of the commands issued so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn command_count(&self, name: &str) -> usize {
        self.commands().iter().filter(|c| c.as_str() == name).count()
    }

    /// Make every following command fail as if the socket had dropped
    pub fn break_transport(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    fn record(&self, name: &str) -> Result<()> {
        self.commands.lock().unwrap().push(name.to_string());
        if self.broken.load(Ordering::SeqCst) {
            return Err(ButlerError::CommandFailed(format!("{}: broken pipe", name)));
        }
        Ok(())
    }

    fn live(&self, key: &str) -> Option<dashmap::mapref::one::Ref<'_, String, CacheEntry>> {
        let expired = match self.data.get(key) {
            Some(entry) => entry
                .expires_at
                .map(|expires| Instant::now() >= expires)
                .unwrap_or(false),
            None => return None,
        };
        if expired {
            self.data.remove(key);
            return None;
        }
        self.data.get(key)
    }

    fn with_value<T>(&self, key: &str, f: impl FnOnce(&MemoryValue) -> Result<T>) -> Result<Option<T>> {
        match self.live(key) {
            Some(entry) => f(&entry.value).map(Some),
            None => Ok(None),
        }
    }
}

fn wrong_type() -> ButlerError {
    ButlerError::CommandFailed(
        "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
    )
}

/// Redis-style inclusive range with negative indices
fn slice_range(len: usize, start: isize, stop: isize) -> std::ops::Range<usize> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return 0..0;
    }
    start as usize..(stop + 1) as usize
}

struct MemoryHandle {
    store: MemoryStore,
    closed: Arc<AtomicUsize>,
    failing_close: bool,
    close_delay: Option<Duration>,
}

#[async_trait]
impl KeyValueStore for MemoryHandle {
    async fn ping(&self) -> Result<String> {
        self.store.record("PING")?;
        Ok("PONG".to_string())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.store.record("GET")?;
        self.store
            .with_value(key, |v| match v {
                MemoryValue::String(s) => Ok(s.clone()),
                _ => Err(wrong_type()),
            })
    }

    async fn set(&self, key: &str, value: &str) -> Result<String> {
        self.store.record("SET")?;
        self.store.insert(key, MemoryValue::String(value.to_string()));
        Ok("OK".to_string())
    }

    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<String> {
        self.store.record("SETEX")?;
        if seconds == 0 {
            return Err(ButlerError::CommandFailed(
                "ERR invalid expire time in 'setex' command".to_string(),
            ));
        }
        self.store.data.insert(
            key.to_string(),
            CacheEntry {
                value: MemoryValue::String(value.to_string()),
                expires_at: Some(Instant::now() + Duration::from_secs(seconds)),
            },
        );
        Ok("OK".to_string())
    }

    async fn del(&self, keys: &[String]) -> Result<i64> {
        self.store.record("DEL")?;
        let mut removed = 0;
        for key in keys {
            let live = self.store.live(key).is_some();
            if live && self.store.data.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<i64> {
        self.store.record("EXISTS")?;
        Ok(self.store.live(key).map(|_| 1).unwrap_or(0))
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<bool> {
        self.store.record("EXPIRE")?;
        if self.store.live(key).is_none() {
            return Ok(false);
        }
        if seconds <= 0 {
            self.store.data.remove(key);
            return Ok(true);
        }
        match self.store.data.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds as u64));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        self.store.record("TTL")?;
        Ok(match self.store.live(key) {
            None => -2,
            Some(entry) => match entry.expires_at {
                None => -1,
                Some(expires) => {
                    let remaining = expires.saturating_duration_since(Instant::now());
                    // Redis rounds to the nearest second
                    ((remaining.as_millis() + 500) / 1000) as i64
                }
            },
        })
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.store.record("KEYS")?;
        let matcher = WildMatch::new(pattern);
        let candidates: Vec<String> = self
            .store
            .data
            .iter()
            .filter(|entry| matcher.matches(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        let mut keys: Vec<String> = candidates
            .into_iter()
            .filter(|key| self.store.live(key).is_some())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn key_type(&self, key: &str) -> Result<String> {
        self.store.record("TYPE")?;
        Ok(self
            .store
            .live(key)
            .map(|entry| entry.value.type_name())
            .unwrap_or("none")
            .to_string())
    }

    async fn llen(&self, key: &str) -> Result<i64> {
        self.store.record("LLEN")?;
        let len = self.store.with_value(key, |v| match v {
            MemoryValue::List(items) => Ok(items.len() as i64),
            _ => Err(wrong_type()),
        })?;
        Ok(len.unwrap_or(0))
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        self.store.record("LRANGE")?;
        let items = self.store.with_value(key, |v| match v {
            MemoryValue::List(items) => Ok(items[slice_range(items.len(), start, stop)].to_vec()),
            _ => Err(wrong_type()),
        })?;
        Ok(items.unwrap_or_default())
    }

    async fn scard(&self, key: &str) -> Result<i64> {
        self.store.record("SCARD")?;
        let len = self.store.with_value(key, |v| match v {
            MemoryValue::Set(members) => Ok(members.len() as i64),
            _ => Err(wrong_type()),
        })?;
        Ok(len.unwrap_or(0))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        self.store.record("SMEMBERS")?;
        let members = self.store.with_value(key, |v| match v {
            MemoryValue::Set(members) => Ok(members.iter().cloned().collect()),
            _ => Err(wrong_type()),
        })?;
        Ok(members.unwrap_or_default())
    }

    async fn hlen(&self, key: &str) -> Result<i64> {
        self.store.record("HLEN")?;
        let len = self.store.with_value(key, |v| match v {
            MemoryValue::Hash(fields) => Ok(fields.len() as i64),
            _ => Err(wrong_type()),
        })?;
        Ok(len.unwrap_or(0))
    }

    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        self.store.record("HGETALL")?;
        let fields = self.store.with_value(key, |v| match v {
            MemoryValue::Hash(fields) => Ok(fields.clone()),
            _ => Err(wrong_type()),
        })?;
        Ok(fields.unwrap_or_default())
    }

    async fn zcard(&self, key: &str) -> Result<i64> {
        self.store.record("ZCARD")?;
        let len = self.store.with_value(key, |v| match v {
            MemoryValue::ZSet(members) => Ok(members.len() as i64),
            _ => Err(wrong_type()),
        })?;
        Ok(len.unwrap_or(0))
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        self.store.record("ZRANGE")?;
        let members = self.store.with_value(key, |v| match v {
            MemoryValue::ZSet(members) => Ok(members[slice_range(members.len(), start, stop)]
                .iter()
                .map(|(_, m)| m.clone())
                .collect()),
            _ => Err(wrong_type()),
        })?;
        Ok(members.unwrap_or_default())
    }

    async fn dbsize(&self) -> Result<i64> {
        self.store.record("DBSIZE")?;
        Ok(self.store.data.len() as i64)
    }

    async fn flushdb(&self) -> Result<String> {
        self.store.record("FLUSHDB")?;
        self.store.data.clear();
        Ok("OK".to_string())
    }

    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.close_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_close {
            return Err(ButlerError::CommandFailed("QUIT: connection reset".to_string()));
        }
        Ok(())
    }
}

/// Connector handing out handles onto per-environment [`MemoryStore`]s.
///
/// Environments whose host is not registered with [`MemoryConnector::with_host`]
/// behave as unreachable; a password mismatch is rejected like a failed AUTH.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    hosts: Arc<HashMap<String, (MemoryStore, Option<String>)>>,
    connects: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    delay: Option<Duration>,
    failing_close: bool,
    close_delay: Option<Duration>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, store: MemoryStore, password: Option<&str>) -> Self {
        Arc::make_mut(&mut self.hosts)
            .insert(host.to_string(), (store, password.map(|p| p.to_string())));
        self
    }

    /// Slow down every connect, widening race windows in concurrency tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Handles report an error from `close`, like QUIT on a dead socket
    pub fn with_failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }

    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = Some(delay);
        self
    }

    /// Connect attempts made so far, successful or not
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self, env: &EnvironmentDescriptor) -> Result<Arc<dyn KeyValueStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let (store, password) = self.hosts.get(&env.host).ok_or_else(|| {
            ButlerError::connection_failed(&env.name, format!("{}: connection refused", env.address()))
        })?;

        if password.as_deref() != env.password.as_deref() {
            return Err(ButlerError::connection_failed(
                &env.name,
                "WRONGPASS invalid username-password pair",
            ));
        }

        Ok(Arc::new(MemoryHandle {
            store: store.clone(),
            closed: self.closes.clone(),
            failing_close: self.failing_close,
            close_delay: self.close_delay,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_range() {
        assert_eq!(slice_range(20, 0, 10), 0..11);
        assert_eq!(slice_range(3, 0, 10), 0..3);
        assert_eq!(slice_range(5, -2, -1), 3..5);
        assert_eq!(slice_range(0, 0, 10), 0..0);
        assert_eq!(slice_range(5, 4, 2), 0..0);
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryStore::new();
        let connector = MemoryConnector::new().with_host("mem", store.clone(), None);
        let handle = connector
            .connect(&EnvironmentDescriptor::new("test", "mem", 6379))
            .await
            .unwrap();

        handle.set("key1", "v1").await.unwrap();
        assert_eq!(handle.get("key1").await.unwrap(), Some("v1".to_string()));
        assert_eq!(handle.get("nonexistent").await.unwrap(), None);
        assert_eq!(handle.del(&["key1".to_string()]).await.unwrap(), 1);
        assert_eq!(handle.get("key1").await.unwrap(), None);
        assert_eq!(store.command_count("GET"), 3);
    }

    #[tokio::test]
    async fn test_ttl() {
        let store = MemoryStore::new();
        let connector = MemoryConnector::new().with_host("mem", store, None);
        let handle = connector
            .connect(&EnvironmentDescriptor::new("test", "mem", 6379))
            .await
            .unwrap();

        handle.set_ex("key1", "v1", 60).await.unwrap();
        assert_eq!(handle.ttl("key1").await.unwrap(), 60);
        handle.set("key2", "v2").await.unwrap();
        assert_eq!(handle.ttl("key2").await.unwrap(), -1);
        assert_eq!(handle.ttl("missing").await.unwrap(), -2);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let connector = MemoryConnector::new().with_host("mem", MemoryStore::new(), Some("pw"));
        let env = EnvironmentDescriptor::new("test", "mem", 6379);

        assert!(connector.connect(&env).await.is_err());
        let env = env.with_password(Some("pw".to_string()));
        assert!(connector.connect(&env).await.is_ok());
        assert_eq!(connector.connects(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        let connector = MemoryConnector::new()
            .with_host("mem", store.clone(), None)
            .with_failing_close();
        let handle = connector
            .connect(&EnvironmentDescriptor::new("test", "mem", 6379))
            .await
            .unwrap();

        handle.set("key1", "v1").await.unwrap();
        store.break_transport();
        assert!(matches!(
            handle.get("key1").await,
            Err(ButlerError::CommandFailed(_))
        ));
        assert!(handle.close().await.is_err());
        assert_eq!(connector.closes(), 1);
    }
}
