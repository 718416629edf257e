//! Storage for temporal condition state, namespaced by (strategy, symbol, node).

use crate::error::PersistenceError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[async_trait]
pub trait StatePersistence: Send + Sync {
    async fn get(
        &self,
        strategy: &str,
        symbol: &str,
        node_id: &str,
    ) -> Result<Option<Vec<u8>>, PersistenceError>;

    async fn set(
        &self,
        strategy: &str,
        symbol: &str,
        node_id: &str,
        blob: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), PersistenceError>;
}

pub fn state_key(strategy: &str, symbol: &str, node_id: &str) -> String {
    format!("strategy_state:{}:{}:{}", strategy, symbol, node_id)
}

/// Process-local store. Expired entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: DashMap<String, (Vec<u8>, Instant)>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl StatePersistence for InMemoryStateStore {
    async fn get(
        &self,
        strategy: &str,
        symbol: &str,
        node_id: &str,
    ) -> Result<Option<Vec<u8>>, PersistenceError> {
        let key = state_key(strategy, symbol, node_id);
        let expired = match self.entries.get(&key) {
            Some(entry) if entry.1 > Instant::now() => return Ok(Some(entry.0.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&key);
        }
        Ok(None)
    }

    async fn set(
        &self,
        strategy: &str,
        symbol: &str,
        node_id: &str,
        blob: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), PersistenceError> {
        self.entries.insert(
            state_key(strategy, symbol, node_id),
            (blob, Instant::now() + ttl),
        );
        Ok(())
    }
}

#[cfg(feature = "redis-store")]
pub use redis_store::RedisStateStore;

#[cfg(feature = "redis-store")]
mod redis_store {
    use super::{StatePersistence, state_key};
    use crate::error::PersistenceError;
    use async_trait::async_trait;
    use redis::AsyncCommands;
    use std::time::Duration;

    /// Redis-backed store shared by every engine process.
    pub struct RedisStateStore {
        client: redis::Client,
    }

    impl RedisStateStore {
        pub fn open(redis_url: &str) -> Result<Self, PersistenceError> {
            let client = redis::Client::open(redis_url)
                .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
            Ok(Self { client })
        }

        async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, PersistenceError> {
            self.client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| PersistenceError::Unavailable(e.to_string()))
        }
    }

    #[async_trait]
    impl StatePersistence for RedisStateStore {
        async fn get(
            &self,
            strategy: &str,
            symbol: &str,
            node_id: &str,
        ) -> Result<Option<Vec<u8>>, PersistenceError> {
            let mut conn = self.connection().await?;
            conn.get(state_key(strategy, symbol, node_id))
                .await
                .map_err(|e| PersistenceError::Unavailable(e.to_string()))
        }

        async fn set(
            &self,
            strategy: &str,
            symbol: &str,
            node_id: &str,
            blob: Vec<u8>,
            ttl: Duration,
        ) -> Result<(), PersistenceError> {
            let mut conn = self.connection().await?;
            conn.set_ex::<_, _, ()>(state_key(strategy, symbol, node_id), blob, ttl.as_secs().max(1))
                .await
                .map_err(|e| PersistenceError::Unavailable(e.to_string()))
        }
    }
}
