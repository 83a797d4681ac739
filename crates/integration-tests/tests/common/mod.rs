// Shared fixtures for integration tests
#![allow(dead_code)] // not every test binary uses every helper

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use waitline_core::application::{LiveQueueIndex, RateLimitConfig, RateLimiter, TicketService};
use waitline_core::port::id_provider::UuidProvider;
use waitline_core::port::TimeProvider;
use waitline_infra_cache::MemoryCacheStore;
use waitline_infra_sqlite::{
    create_pool, run_migrations, SqliteQueueRepository, SqliteTicketRepository,
};

/// Manually advanced clock shared by the durable store, the cache and the
/// rate limiter, so cooldowns and window expiries can be tested without
/// real sleeps.
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self(AtomicI64::new(start_millis))
    }

    pub fn advance_secs(&self, secs: i64) {
        self.0.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl TimeProvider for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub service: Arc<TicketService>,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<MemoryCacheStore>,
    pub queue_repo: Arc<SqliteQueueRepository>,
    pub ticket_repo: Arc<SqliteTicketRepository>,
}

/// Wire the full stack against the given database with explicit limits
pub async fn harness_with_config(database_url: &str, config: RateLimitConfig) -> Harness {
    let pool = create_pool(database_url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let cache = Arc::new(MemoryCacheStore::new(clock.clone()));

    let queue_repo = Arc::new(SqliteQueueRepository::new(pool.clone(), clock.clone()));
    let ticket_repo = Arc::new(SqliteTicketRepository::new(pool));

    let rate_limiter = RateLimiter::new(cache.clone(), clock.clone(), config);
    let live_index = LiveQueueIndex::new(cache.clone());

    let service = Arc::new(TicketService::new(
        queue_repo.clone(),
        ticket_repo.clone(),
        rate_limiter,
        live_index,
        Arc::new(UuidProvider),
        clock.clone(),
    ));

    Harness {
        service,
        clock,
        cache,
        queue_repo,
        ticket_repo,
    }
}

/// In-memory harness with default limits
pub async fn harness() -> Harness {
    harness_with_config("sqlite::memory:", RateLimitConfig::default()).await
}
