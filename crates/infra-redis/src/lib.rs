// Waitline Infra-Redis - Redis-backed CacheStore
//
// One process-wide `ConnectionManager` handle shared by all clones. The
// manager re-establishes dropped connections in the background with
// capped exponential backoff; this adapter additionally tracks a
// readiness flag (cleared on the first failing call, set again on the
// first succeeding one) so the core can cheaply skip to fail-open
// without attempting a doomed round trip.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use tracing::{info, warn};

use waitline_core::port::{CacheCommand, CacheError, CacheResult, CacheStore};

#[derive(Clone)]
pub struct RedisCacheStore {
    conn_manager: ConnectionManager,
    ready: Arc<AtomicBool>,
}

impl RedisCacheStore {
    /// Connect to Redis (e.g. "redis://127.0.0.1:6379")
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CacheError::Backend(format!("failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::Backend(format!("failed to create Redis connection manager: {e}"))
        })?;

        info!(url = %redis_url, "connected to Redis");
        Ok(Self {
            conn_manager,
            ready: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Record the outcome of a round trip in the readiness flag
    fn track<T>(&self, result: RedisResult<T>) -> CacheResult<T> {
        match result {
            Ok(value) => {
                if !self.ready.swap(true, Ordering::SeqCst) {
                    info!("Redis recovered, resuming cache-backed enforcement");
                }
                Ok(value)
            }
            Err(err) => {
                if self.ready.swap(false, Ordering::SeqCst) {
                    warn!(error = %err, "Redis call failed, degrading to fail-open");
                }
                Err(CacheError::Backend(err.to_string()))
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn_manager.clone();
        self.track(conn.get(key).await)
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut conn = self.conn_manager.clone();
        self.track(conn.set::<_, _, ()>(key, value).await)
    }

    async fn ttl_secs(&self, key: &str) -> CacheResult<Option<i64>> {
        let mut conn = self.conn_manager.clone();
        let ttl: i64 = self.track(conn.ttl(key).await)?;
        // -2 = missing key, -1 = no expiry
        Ok(if ttl >= 0 { Some(ttl) } else { None })
    }

    async fn apply(&self, commands: &[CacheCommand]) -> CacheResult<()> {
        let mut conn = self.conn_manager.clone();
        let mut pipe = redis::pipe();

        for command in commands {
            match command {
                CacheCommand::SetEx {
                    key,
                    value,
                    ttl_secs,
                } => {
                    pipe.set_ex(key, value, *ttl_secs as u64).ignore();
                }
                CacheCommand::IncrExpireNx { key, ttl_secs } => {
                    pipe.incr(key, 1).ignore();
                    // EXPIRE ... NX: only a fresh window gets an expiry
                    pipe.cmd("EXPIRE").arg(key).arg(ttl_secs).arg("NX").ignore();
                }
            }
        }

        self.track(pipe.query_async::<()>(&mut conn).await)
    }

    async fn zadd(&self, set: &str, member: &str, score: i64) -> CacheResult<()> {
        let mut conn = self.conn_manager.clone();
        self.track(conn.zadd::<_, _, _, ()>(set, member, score).await)
    }

    async fn zrem(&self, set: &str, member: &str) -> CacheResult<()> {
        let mut conn = self.conn_manager.clone();
        self.track(conn.zrem::<_, _, ()>(set, member).await)
    }

    async fn zrank(&self, set: &str, member: &str) -> CacheResult<Option<u64>> {
        let mut conn = self.conn_manager.clone();
        let rank: Option<i64> = self.track(conn.zrank(set, member).await)?;
        Ok(rank.and_then(|r| u64::try_from(r).ok()))
    }

    async fn zclear(&self, set: &str) -> CacheResult<()> {
        let mut conn = self.conn_manager.clone();
        self.track(conn.del::<_, ()>(set).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a running Redis; run with:
    //   WAITLINE_REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn smoke_round_trip() {
        let url = std::env::var("WAITLINE_REDIS_URL").expect("WAITLINE_REDIS_URL not set");
        let store = RedisCacheStore::connect(&url).await.unwrap();

        // Short TTL so the key cleans itself up
        store
            .apply(&[CacheCommand::SetEx {
                key: "waitline:test:key".to_string(),
                value: "v".to_string(),
                ttl_secs: 30,
            }])
            .await
            .unwrap();
        assert_eq!(
            store.get("waitline:test:key").await.unwrap(),
            Some("v".to_string())
        );
        assert!(store.ttl_secs("waitline:test:key").await.unwrap().is_some());

        store.zadd("waitline:test:line", "a", 1).await.unwrap();
        store.zadd("waitline:test:line", "b", 2).await.unwrap();
        assert_eq!(
            store.zrank("waitline:test:line", "b").await.unwrap(),
            Some(1)
        );
        store.zclear("waitline:test:line").await.unwrap();
    }
}
