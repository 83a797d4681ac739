// Queue Repository Port (Interface)

use crate::domain::{Queue, QueueId};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for Queue persistence
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert a new queue (name + location unique together)
    async fn insert(&self, queue: &Queue) -> Result<()>;

    /// Find queue by ID
    async fn find_by_id(&self, id: &QueueId) -> Result<Option<Queue>>;

    /// Activate or deactivate a queue. Returns false if the queue is unknown.
    async fn set_active(&self, id: &QueueId, active: bool) -> Result<bool>;

    /// Atomically increment `next_sequence` for an existing, active queue
    /// and return the pre-increment value.
    ///
    /// Returns `None` when the queue is missing or inactive, in which case
    /// nothing is mutated. The increment is a single conditional storage
    /// operation, so concurrent claims on one queue receive strictly
    /// increasing, non-colliding sequence numbers.
    async fn claim_next_sequence(&self, id: &QueueId) -> Result<Option<i64>>;
}
