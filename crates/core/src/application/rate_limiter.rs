// Rate Limiter - Cache-backed admission gate for queue joins
//
// Cache key structure (mirrored by every CacheStore backend):
// - user:{user_id}:queue:{queue_id}:last_join -> epoch ms (TTL: cooldown)
// - user:{user_id}:join_count:minute          -> count (TTL: 60s)
// - user:{user_id}:join_count:hour            -> count (TTL: 3600s)
//
// Failure policy is fail-open: rate limiting is an abuse-prevention layer,
// not a correctness requirement. Denying service to all users because the
// cache is down is worse than temporarily admitting abusive joins.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::bounded;
use crate::domain::{QueueId, UserId};
use crate::port::{CacheCommand, CacheResult, CacheStore, TimeProvider};

const MINUTE_WINDOW_SECS: i64 = 60;
const HOUR_WINDOW_SECS: i64 = 3600;

/// Admission limits for queue joins
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Per-(user, queue) rejoin cooldown
    pub cooldown_seconds: i64,
    /// Per-user join cap in a rolling 60s window
    pub max_joins_per_minute: i64,
    /// Per-user join cap in a rolling 3600s window
    pub max_joins_per_hour: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 30,
            max_joins_per_minute: 5,
            max_joins_per_hour: 20,
        }
    }
}

impl RateLimitConfig {
    /// Load limits from environment variables, falling back to defaults
    ///
    /// - `WAITLINE_JOIN_COOLDOWN_SECONDS`
    /// - `WAITLINE_JOIN_RATE_LIMIT_PER_MIN`
    /// - `WAITLINE_JOIN_RATE_LIMIT_PER_HOUR`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cooldown_seconds: env_i64("WAITLINE_JOIN_COOLDOWN_SECONDS")
                .unwrap_or(defaults.cooldown_seconds),
            max_joins_per_minute: env_i64("WAITLINE_JOIN_RATE_LIMIT_PER_MIN")
                .unwrap_or(defaults.max_joins_per_minute),
            max_joins_per_hour: env_i64("WAITLINE_JOIN_RATE_LIMIT_PER_HOUR")
                .unwrap_or(defaults.max_joins_per_hour),
        }
    }
}

fn env_i64(name: &str) -> Option<i64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Outcome of a rate-limit check.
///
/// The degradation mode is explicit in the type: `Unavailable` means the
/// backing cache could not answer and callers must treat the join as
/// allowed (fail-open).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Denied {
        message: String,
        retry_after_seconds: i64,
    },
    Unavailable,
}

/// Cache-backed gate evaluated before any sequence number is assigned
#[derive(Clone)]
pub struct RateLimiter {
    cache: Arc<dyn CacheStore>,
    time_provider: Arc<dyn TimeProvider>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        time_provider: Arc<dyn TimeProvider>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            cache,
            time_provider,
            config,
        }
    }

    /// Check all admission limits for a user attempting to join a queue.
    ///
    /// Checks run in fixed order (cooldown, per-minute cap, per-hour cap);
    /// the first failing check short-circuits. Never errors: any cache
    /// failure resolves to `Unavailable`.
    pub async fn check_join(&self, user_id: &UserId, queue_id: &QueueId) -> RateLimitDecision {
        if !self.cache.is_ready() {
            warn!("cache unavailable, allowing join (fail-open)");
            return RateLimitDecision::Unavailable;
        }

        match self.evaluate(user_id, queue_id).await {
            Ok(decision) => decision,
            Err(err) => {
                warn!(error = %err, "rate limit check failed, allowing join (fail-open)");
                RateLimitDecision::Unavailable
            }
        }
    }

    async fn evaluate(
        &self,
        user_id: &UserId,
        queue_id: &QueueId,
    ) -> CacheResult<RateLimitDecision> {
        // 1. Per-queue rejoin cooldown
        let cooldown_key = last_join_key(user_id, queue_id);
        if let Some(raw) = bounded(|| self.cache.get(&cooldown_key)).await? {
            if let Ok(last_join_ms) = raw.parse::<i64>() {
                let elapsed_secs = (self.time_provider.now_millis() - last_join_ms) / 1000;
                let remaining = self.config.cooldown_seconds - elapsed_secs;
                if remaining > 0 {
                    info!(
                        user_id = %user_id,
                        queue_id = %queue_id,
                        remaining_secs = remaining,
                        "join blocked: rejoin cooldown"
                    );
                    return Ok(RateLimitDecision::Denied {
                        message: format!(
                            "Please wait {remaining} seconds before rejoining this queue."
                        ),
                        retry_after_seconds: remaining,
                    });
                }
            }
        }

        // 2. Per-minute cap
        let minute_key = minute_count_key(user_id);
        let minute_count = self.read_count(&minute_key).await?;
        if minute_count >= self.config.max_joins_per_minute {
            let retry_after = bounded(|| self.cache.ttl_secs(&minute_key))
                .await?
                .filter(|ttl| *ttl > 0)
                .unwrap_or(MINUTE_WINDOW_SECS);
            info!(
                user_id = %user_id,
                count = minute_count,
                max = self.config.max_joins_per_minute,
                "join blocked: per-minute limit reached"
            );
            return Ok(RateLimitDecision::Denied {
                message: format!(
                    "You've joined too many queues. Please wait {retry_after} seconds."
                ),
                retry_after_seconds: retry_after,
            });
        }

        // 3. Per-hour cap
        let hour_key = hour_count_key(user_id);
        let hour_count = self.read_count(&hour_key).await?;
        if hour_count >= self.config.max_joins_per_hour {
            let retry_after = bounded(|| self.cache.ttl_secs(&hour_key))
                .await?
                .filter(|ttl| *ttl > 0)
                .unwrap_or(HOUR_WINDOW_SECS);
            let retry_minutes = (retry_after + 59) / 60;
            info!(
                user_id = %user_id,
                count = hour_count,
                max = self.config.max_joins_per_hour,
                "join blocked: per-hour limit reached"
            );
            return Ok(RateLimitDecision::Denied {
                message: format!(
                    "Hourly queue join limit reached. Please try again in {retry_minutes} minutes."
                ),
                retry_after_seconds: retry_after,
            });
        }

        Ok(RateLimitDecision::Allowed)
    }

    async fn read_count(&self, key: &str) -> CacheResult<i64> {
        let raw = bounded(|| self.cache.get(key)).await?;
        Ok(raw.and_then(|s| s.parse().ok()).unwrap_or(0))
    }

    /// Record a successful queue join.
    ///
    /// Called only after a join actually succeeded. Sets the cooldown
    /// marker and increments both window counters in a single batched
    /// round trip; window expiries are set only on the first increment of
    /// a fresh window. Silent no-op on cache failure.
    pub async fn record_join(&self, user_id: &UserId, queue_id: &QueueId) {
        if !self.cache.is_ready() {
            return;
        }

        let now_ms = self.time_provider.now_millis();
        let commands = [
            CacheCommand::SetEx {
                key: last_join_key(user_id, queue_id),
                value: now_ms.to_string(),
                ttl_secs: self.config.cooldown_seconds,
            },
            CacheCommand::IncrExpireNx {
                key: minute_count_key(user_id),
                ttl_secs: MINUTE_WINDOW_SECS,
            },
            CacheCommand::IncrExpireNx {
                key: hour_count_key(user_id),
                ttl_secs: HOUR_WINDOW_SECS,
            },
        ];

        match bounded(|| self.cache.apply(&commands)).await {
            Ok(()) => {
                debug!(user_id = %user_id, queue_id = %queue_id, "recorded queue join");
            }
            Err(err) => {
                warn!(error = %err, "failed to record join (fail-open)");
            }
        }
    }
}

fn last_join_key(user_id: &str, queue_id: &str) -> String {
    format!("user:{user_id}:queue:{queue_id}:last_join")
}

fn minute_count_key(user_id: &str) -> String {
    format!("user:{user_id}:join_count:minute")
}

fn hour_count_key(user_id: &str) -> String {
    format!("user:{user_id}:join_count:hour")
}
