// Live Queue Index - Ephemeral ordered view of WAITING tickets
//
// Cache key structure:
// - queue:{queue_id}:line        -> ordered set of ticket ids scored by seq
// - queue:{queue_id}:now_serving -> ticket id of the last SERVED ticket
//
// Purely a performance cache over the durable ticket records filtered by
// status=WAITING and ordered by seq. Rebuildable at any time; never a
// source of truth.

use std::sync::Arc;

use super::bounded;
use crate::domain::{QueueId, TicketId};
use crate::port::{CacheError, CacheResult, CacheStore};

#[derive(Clone)]
pub struct LiveQueueIndex {
    cache: Arc<dyn CacheStore>,
}

impl LiveQueueIndex {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    fn ready(&self) -> CacheResult<()> {
        if self.cache.is_ready() {
            Ok(())
        } else {
            Err(CacheError::Unavailable)
        }
    }

    /// Insert a WAITING ticket at its seq position (upsert)
    pub async fn enqueue(
        &self,
        queue_id: &QueueId,
        ticket_id: &TicketId,
        seq: i64,
    ) -> CacheResult<()> {
        self.ready()?;
        let key = line_key(queue_id);
        bounded(|| self.cache.zadd(&key, ticket_id, seq)).await
    }

    /// Remove a ticket from the line (no-op if absent)
    pub async fn remove(&self, queue_id: &QueueId, ticket_id: &TicketId) -> CacheResult<()> {
        self.ready()?;
        let key = line_key(queue_id);
        bounded(|| self.cache.zrem(&key, ticket_id)).await
    }

    /// Point the queue's now-serving marker at this ticket
    pub async fn set_now_serving(
        &self,
        queue_id: &QueueId,
        ticket_id: &TicketId,
    ) -> CacheResult<()> {
        self.ready()?;
        let key = now_serving_key(queue_id);
        bounded(|| self.cache.set(&key, ticket_id)).await
    }

    /// Ticket currently being served, if known
    pub async fn now_serving(&self, queue_id: &QueueId) -> CacheResult<Option<TicketId>> {
        self.ready()?;
        let key = now_serving_key(queue_id);
        bounded(|| self.cache.get(&key)).await
    }

    /// 1-based position among currently waiting tickets, `None` if the
    /// ticket is not in the line (cold index or already removed)
    pub async fn position_of(
        &self,
        queue_id: &QueueId,
        ticket_id: &TicketId,
    ) -> CacheResult<Option<u64>> {
        self.ready()?;
        let key = line_key(queue_id);
        let rank = bounded(|| self.cache.zrank(&key, ticket_id)).await?;
        Ok(rank.map(|r| r + 1))
    }

    /// Replace the line with entries replayed from the durable store,
    /// ordered by seq
    pub async fn rebuild(
        &self,
        queue_id: &QueueId,
        entries: &[(TicketId, i64)],
    ) -> CacheResult<()> {
        self.ready()?;
        let key = line_key(queue_id);
        bounded(|| self.cache.zclear(&key)).await?;
        for (ticket_id, seq) in entries {
            bounded(|| self.cache.zadd(&key, ticket_id, *seq)).await?;
        }
        Ok(())
    }
}

fn line_key(queue_id: &str) -> String {
    format!("queue:{queue_id}:line")
}

fn now_serving_key(queue_id: &str) -> String {
    format!("queue:{queue_id}:now_serving")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_is_stable() {
        assert_eq!(line_key("q1"), "queue:q1:line");
        assert_eq!(now_serving_key("q1"), "queue:q1:now_serving");
    }
}
