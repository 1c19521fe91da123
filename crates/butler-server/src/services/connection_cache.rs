//! Connection cache service
//!
//! Holds at most one live connection per environment. Connections are opened
//! lazily on first use and reused until released; there is no health check, a
//! dead connection surfaces as a failed command.

use butler_core::{EnvironmentRegistry, KeyValueStore, Result, StoreConnector};
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const PING_REPLY: &str = "PONG";

type Slot = Arc<OnceCell<Arc<dyn KeyValueStore>>>;

pub struct ConnectionCache {
    registry: Arc<EnvironmentRegistry>,
    connector: Arc<dyn StoreConnector>,
    /// One slot per environment. The slot is inserted atomically and filled
    /// at most once, so concurrent first requests share a single connect.
    entries: DashMap<String, Slot>,
}

impl ConnectionCache {
    pub fn new(registry: Arc<EnvironmentRegistry>, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            registry,
            connector,
            entries: DashMap::new(),
        }
    }

    /// Return the command handle for an environment, connecting on first use
    pub async fn acquire(&self, environment: &str) -> Result<Arc<dyn KeyValueStore>> {
        // Unknown environments fail before any slot or socket is created
        let descriptor = self.registry.describe(environment)?;

        let slot: Slot = self
            .entries
            .entry(environment.to_string())
            .or_default()
            .value()
            .clone();

        let result = slot
            .get_or_try_init(|| async {
                debug!("No cached connection for {}, connecting", environment);
                self.connector.connect(descriptor).await
            })
            .await
            .map(Arc::clone);

        if let Err(ref e) = result {
            warn!("Connection to {} failed: {}", environment, e);
            // Leave nothing behind so the next call retries from scratch
            self.entries
                .remove_if(environment, |_, s| Arc::ptr_eq(s, &slot) && s.get().is_none());
        }

        result
    }

    /// Check that an environment answers PING. Every failure becomes `false`.
    pub async fn test_connection(&self, environment: &str) -> bool {
        let store = match self.acquire(environment).await {
            Ok(store) => store,
            Err(e) => {
                warn!("Connection test for {} failed: {}", environment, e);
                return false;
            }
        };

        match store.ping().await {
            Ok(reply) if reply == PING_REPLY => true,
            Ok(reply) => {
                warn!("Unexpected PING reply from {}: {}", environment, reply);
                false
            }
            Err(e) => {
                warn!("Connection test for {} failed: {}", environment, e);
                false
            }
        }
    }

    /// Close and forget the connection for an environment.
    ///
    /// Returns whether a connection was cached. Close errors are logged only.
    pub async fn release(&self, environment: &str) -> bool {
        let Some((_, slot)) = self.entries.remove(environment) else {
            return false;
        };

        match slot.get() {
            Some(store) => {
                if let Err(e) = store.close().await {
                    debug!("Ignoring close error for {}: {}", environment, e);
                }
                info!("Released connection to {}", environment);
                true
            }
            None => false,
        }
    }

    /// Release every cached connection concurrently. Returns how many were closed.
    pub async fn release_all(&self) -> usize {
        let names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();

        let released = join_all(names.iter().map(|name| self.release(name)))
            .await
            .into_iter()
            .filter(|closed| *closed)
            .count();
        info!("Released {} cached connection(s)", released);
        released
    }

    /// Environments with a live cached connection, sorted
    pub fn connected_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.value().initialized())
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }
}
