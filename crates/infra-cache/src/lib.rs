// Waitline Infra-Cache - In-process CacheStore
//
// Implements the cache port against process memory: dashmap for key/value
// entries with lazy TTL expiry and a BTreeSet per ordered set. Suitable
// for single-node deployments and as the backend for tests; distributed
// deployments use the Redis adapter instead.
//
// Availability can be toggled at runtime so tests can simulate a cache
// outage and exercise the fail-open path.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use waitline_core::port::{CacheCommand, CacheError, CacheResult, CacheStore, TimeProvider};

struct Entry {
    value: String,
    expires_at_ms: Option<i64>,
}

pub struct MemoryCacheStore {
    entries: DashMap<String, Entry>,
    // Ordered by (score, member); scores are sequence numbers
    sets: DashMap<String, BTreeSet<(i64, String)>>,
    time_provider: Arc<dyn TimeProvider>,
    available: AtomicBool,
}

impl MemoryCacheStore {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            entries: DashMap::new(),
            sets: DashMap::new(),
            time_provider,
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage (or recovery) of the backing cache
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn guard(&self) -> CacheResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }

    fn now_ms(&self) -> i64 {
        self.time_provider.now_millis()
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        matches!(entry.expires_at_ms, Some(at) if at <= self.now_ms())
    }

    /// Read a live entry, dropping it lazily if its TTL has elapsed
    fn live_value(&self, key: &str) -> Option<String> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if self.is_expired(&entry) {
                    true
                } else {
                    return Some(entry.value.clone());
                }
            }
            None => return None,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    fn set_entry(&self, key: &str, value: String, ttl_secs: Option<i64>) {
        let expires_at_ms = ttl_secs.map(|ttl| self.now_ms() + ttl * 1000);
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at_ms,
            },
        );
    }

    fn incr_expire_nx(&self, key: &str, ttl_secs: i64) {
        let now = self.now_ms();
        let mut slot = self.entries.entry(key.to_string()).or_insert(Entry {
            value: "0".to_string(),
            expires_at_ms: None,
        });

        if matches!(slot.expires_at_ms, Some(at) if at <= now) {
            // Window elapsed: start fresh
            slot.value = "0".to_string();
            slot.expires_at_ms = None;
        }

        let count: i64 = slot.value.parse().unwrap_or(0);
        slot.value = (count + 1).to_string();
        // Only a fresh window gets an expiry; an existing window keeps
        // its remaining time across subsequent increments.
        if slot.expires_at_ms.is_none() {
            slot.expires_at_ms = Some(now + ttl_secs * 1000);
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn is_ready(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.guard()?;
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str) -> CacheResult<()> {
        self.guard()?;
        self.set_entry(key, value.to_string(), None);
        Ok(())
    }

    async fn ttl_secs(&self, key: &str) -> CacheResult<Option<i64>> {
        self.guard()?;
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        if self.is_expired(&entry) {
            return Ok(None);
        }
        // Round up so a window with any time left reports at least 1s
        Ok(entry
            .expires_at_ms
            .map(|at| (at - self.now_ms() + 999) / 1000))
    }

    async fn apply(&self, commands: &[CacheCommand]) -> CacheResult<()> {
        self.guard()?;
        for command in commands {
            match command {
                CacheCommand::SetEx {
                    key,
                    value,
                    ttl_secs,
                } => {
                    self.set_entry(key, value.clone(), Some(*ttl_secs));
                }
                CacheCommand::IncrExpireNx { key, ttl_secs } => {
                    self.incr_expire_nx(key, *ttl_secs);
                }
            }
        }
        Ok(())
    }

    async fn zadd(&self, set: &str, member: &str, score: i64) -> CacheResult<()> {
        self.guard()?;
        let mut line = self.sets.entry(set.to_string()).or_default();
        // Upsert: drop any previous score for this member first
        line.retain(|(_, m)| m != member);
        line.insert((score, member.to_string()));
        Ok(())
    }

    async fn zrem(&self, set: &str, member: &str) -> CacheResult<()> {
        self.guard()?;
        if let Some(mut line) = self.sets.get_mut(set) {
            line.retain(|(_, m)| m != member);
        }
        Ok(())
    }

    async fn zrank(&self, set: &str, member: &str) -> CacheResult<Option<u64>> {
        self.guard()?;
        let Some(line) = self.sets.get(set) else {
            return Ok(None);
        };
        Ok(line
            .iter()
            .position(|(_, m)| m == member)
            .map(|rank| rank as u64))
    }

    async fn zclear(&self, set: &str) -> CacheResult<()> {
        self.guard()?;
        self.sets.remove(set);
        Ok(())
    }
}
