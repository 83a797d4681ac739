// Application Layer - Ticket issuance, admission control, live ordering

pub mod live_index;
pub mod rate_limiter;
pub mod ticket_service;

// Re-exports
pub use live_index::LiveQueueIndex;
pub use rate_limiter::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use ticket_service::TicketService;

use crate::port::{CacheError, CacheResult};
use std::future::Future;
use std::time::Duration;

/// Time budget for one cache call. A degraded cache must never stall
/// ticket issuance: every cache call gets this timeout plus one retry
/// before the fail-open policy takes over.
pub(crate) const CACHE_CALL_BUDGET: Duration = Duration::from_millis(250);

/// Run a cache operation under the call budget with a single retry.
pub(crate) async fn bounded<T, F, Fut>(op: F) -> CacheResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = CacheResult<T>>,
{
    match tokio::time::timeout(CACHE_CALL_BUDGET, op()).await {
        Ok(result) => result,
        Err(_) => match tokio::time::timeout(CACHE_CALL_BUDGET, op()).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_passes_through_results() {
        let ok: CacheResult<i32> = bounded(|| async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: CacheResult<i32> =
            bounded(|| async { Err(CacheError::Backend("down".into())) }).await;
        assert!(matches!(err, Err(CacheError::Backend(_))));
    }

    #[tokio::test]
    async fn bounded_times_out_after_one_retry() {
        let result: CacheResult<i32> = bounded(|| std::future::pending()).await;
        assert!(matches!(result, Err(CacheError::Timeout)));
    }
}
