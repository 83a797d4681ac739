// Cache Store Port (Interface)
//
// Backs the rate limiter and the live queue index. Everything behind this
// port is advisory: losing cache state never corrupts the durable model,
// so callers recover from `CacheError` locally (fail-open) instead of
// surfacing it.

use async_trait::async_trait;
use thiserror::Error;

/// Cache-layer error. Absorbed by callers via the fail-open policy and
/// never returned to API consumers.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable")]
    Unavailable,

    #[error("cache call exceeded its time budget")]
    Timeout,

    #[error("cache backend error: {0}")]
    Backend(String),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// A single command within a batched round trip
#[derive(Debug, Clone)]
pub enum CacheCommand {
    /// Set `key` to `value` with a fixed expiry
    SetEx {
        key: String,
        value: String,
        ttl_secs: i64,
    },
    /// Increment `key`, setting the expiry only when the key has no live
    /// window yet. An existing window's remaining time is preserved across
    /// subsequent increments.
    IncrExpireNx { key: String, ttl_secs: i64 },
}

/// Key/value + ordered-set cache interface
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Cheap readiness check, consulted before every cache operation so
    /// callers can skip straight to fail-open without a doomed call.
    fn is_ready(&self) -> bool;

    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set without expiry (now-serving pointer)
    async fn set(&self, key: &str, value: &str) -> CacheResult<()>;

    /// Remaining time-to-live in whole seconds; `None` when the key is
    /// missing or has no expiry.
    async fn ttl_secs(&self, key: &str) -> CacheResult<Option<i64>>;

    /// Execute a batch of commands as a single round trip
    async fn apply(&self, commands: &[CacheCommand]) -> CacheResult<()>;

    /// Add `member` to the ordered set with the given score (upsert)
    async fn zadd(&self, set: &str, member: &str, score: i64) -> CacheResult<()>;

    /// Remove `member` from the ordered set
    async fn zrem(&self, set: &str, member: &str) -> CacheResult<()>;

    /// 0-based rank of `member` by ascending score, `None` if absent
    async fn zrank(&self, set: &str, member: &str) -> CacheResult<Option<u64>>;

    /// Drop the entire ordered set (used by index rebuild)
    async fn zclear(&self, set: &str) -> CacheResult<()>;
}
