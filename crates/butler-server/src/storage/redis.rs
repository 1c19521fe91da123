//! Redis-backed store using one multiplexed async connection per environment

use async_trait::async_trait;
use butler_core::{ButlerError, EnvironmentDescriptor, KeyValueStore, Result, StoreConnector};
use redis::aio::MultiplexedConnection;
use redis::{Cmd, ConnectionAddr, ConnectionInfo, FromRedisValue, RedisConnectionInfo};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Opens real Redis connections
#[derive(Debug, Default, Clone)]
pub struct RedisConnector;

impl RedisConnector {
    pub fn new() -> Self {
        Self
    }
}

fn connection_info(env: &EnvironmentDescriptor) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(env.host.clone(), env.port),
        redis: RedisConnectionInfo {
            db: env.database,
            password: env.password.clone(),
            ..Default::default()
        },
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    async fn connect(&self, env: &EnvironmentDescriptor) -> Result<Arc<dyn KeyValueStore>> {
        info!(
            "Connecting to environment {} at {} (auth={})",
            env.name,
            env.address(),
            env.requires_auth()
        );

        let client = redis::Client::open(connection_info(env))
            .map_err(|e| ButlerError::connection_failed(&env.name, e))?;

        // AUTH and SELECT run during connection setup, so bad credentials fail here
        let conn = match tokio::time::timeout(env.timeout, client.get_multiplexed_async_connection())
            .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(ButlerError::connection_failed(&env.name, e)),
            Err(_) => {
                return Err(ButlerError::connection_failed(
                    &env.name,
                    format!("timed out after {}ms", env.timeout.as_millis()),
                ))
            }
        };

        info!("Connected to environment {}", env.name);

        Ok(Arc::new(RedisStore {
            environment: env.name.clone(),
            conn,
            timeout: env.timeout,
        }))
    }
}

/// Command handle over a multiplexed connection.
///
/// The connection is cheap to clone; every command runs on its own clone so
/// concurrent requests share the socket.
pub struct RedisStore {
    environment: String,
    conn: MultiplexedConnection,
    timeout: Duration,
}

impl RedisStore {
    async fn query<T: FromRedisValue>(&self, cmd: Cmd) -> Result<T> {
        let mut conn = self.conn.clone();
        match tokio::time::timeout(self.timeout, cmd.query_async::<_, T>(&mut conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ButlerError::CommandFailed(e.to_string())),
            Err(_) => Err(ButlerError::CommandFailed(format!(
                "{}: timed out after {}ms",
                self.environment,
                self.timeout.as_millis()
            ))),
        }
    }
}

fn key_cmd(name: &str, key: &str) -> Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(key);
    cmd
}

fn range_cmd(name: &str, key: &str, start: isize, stop: isize) -> Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(key).arg(start).arg(stop);
    cmd
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn ping(&self) -> Result<String> {
        self.query(redis::cmd("PING")).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.query(key_cmd("GET", key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<String> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        self.query(cmd).await
    }

    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<String> {
        let mut cmd = redis::cmd("SETEX");
        cmd.arg(key).arg(seconds).arg(value);
        self.query(cmd).await
    }

    async fn del(&self, keys: &[String]) -> Result<i64> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(keys);
        self.query(cmd).await
    }

    async fn exists(&self, key: &str) -> Result<i64> {
        self.query(key_cmd("EXISTS", key)).await
    }

    async fn expire(&self, key: &str, seconds: i64) -> Result<bool> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(seconds);
        self.query(cmd).await
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        self.query(key_cmd("TTL", key)).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        debug!("KEYS {} on {}", pattern, self.environment);
        self.query(key_cmd("KEYS", pattern)).await
    }

    async fn key_type(&self, key: &str) -> Result<String> {
        self.query(key_cmd("TYPE", key)).await
    }

    async fn llen(&self, key: &str) -> Result<i64> {
        self.query(key_cmd("LLEN", key)).await
    }

    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        self.query(range_cmd("LRANGE", key, start, stop)).await
    }

    async fn scard(&self, key: &str) -> Result<i64> {
        self.query(key_cmd("SCARD", key)).await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        self.query(key_cmd("SMEMBERS", key)).await
    }

    async fn hlen(&self, key: &str) -> Result<i64> {
        self.query(key_cmd("HLEN", key)).await
    }

    async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        self.query(key_cmd("HGETALL", key)).await
    }

    async fn zcard(&self, key: &str) -> Result<i64> {
        self.query(key_cmd("ZCARD", key)).await
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        self.query(range_cmd("ZRANGE", key, start, stop)).await
    }

    async fn dbsize(&self) -> Result<i64> {
        self.query(redis::cmd("DBSIZE")).await
    }

    async fn flushdb(&self) -> Result<String> {
        info!("FLUSHDB on {}", self.environment);
        self.query(redis::cmd("FLUSHDB")).await
    }

    async fn close(&self) -> Result<()> {
        // The socket is dropped with the last clone; QUIT lets the server
        // release its side right away.
        let reply: Result<String> = self.query(redis::cmd("QUIT")).await;
        reply.map(|_| ())
    }
}
