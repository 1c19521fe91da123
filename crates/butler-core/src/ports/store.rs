//! Key-value store traits

use crate::{EnvironmentDescriptor, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Opens live connections to an environment
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Connect using the descriptor's host, port, database, password and
    /// timeout. Failures are reported as `ButlerError::ConnectionFailed`.
    async fn connect(&self, env: &EnvironmentDescriptor) -> Result<Arc<dyn KeyValueStore>>;
}

/// Command-issuing handle over one live connection.
///
/// Each method maps to exactly one Redis command. Failures after a successful
/// connect are reported as `ButlerError::CommandFailed`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn ping(&self) -> Result<String>;

    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<String>;
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<String>;
    async fn del(&self, keys: &[String]) -> Result<i64>;
    async fn exists(&self, key: &str) -> Result<i64>;
    async fn expire(&self, key: &str, seconds: i64) -> Result<bool>;
    async fn ttl(&self, key: &str) -> Result<i64>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
    async fn key_type(&self, key: &str) -> Result<String>;

    async fn llen(&self, key: &str) -> Result<i64>;
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;
    async fn scard(&self, key: &str) -> Result<i64>;
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;
    async fn hlen(&self, key: &str) -> Result<i64>;
    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>>;
    async fn zcard(&self, key: &str) -> Result<i64>;
    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    async fn dbsize(&self) -> Result<i64>;
    async fn flushdb(&self) -> Result<String>;

    /// Close the underlying transport. Callers treat failures as best-effort.
    async fn close(&self) -> Result<()>;
}
