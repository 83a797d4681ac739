// Queue Domain Model

use serde::{Deserialize, Serialize};

/// Queue ID (UUID v4)
pub type QueueId = String;

/// A physical-service queue (cafeteria, library desk, clinic, ...).
///
/// `next_sequence` starts at 1, is strictly increasing and never reused or
/// decremented. It is mutated only through the atomic claim performed by the
/// durable store when a ticket is issued. Queues are deactivated rather than
/// deleted to stop new joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    pub id: QueueId,
    pub name: String,
    pub location: String,
    /// Operator/admin who created the queue (optional for legacy rows).
    pub operator: Option<String>,
    pub is_active: bool,
    pub next_sequence: i64,
    pub created_at: i64, // epoch ms
    pub updated_at: i64,
}

impl Queue {
    /// Create a new active queue
    ///
    /// # Arguments
    ///
    /// * `id` - Unique queue ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        name: impl Into<String>,
        location: impl Into<String>,
        operator: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            operator,
            is_active: true,
            next_sequence: 1,
            created_at,
            updated_at: created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_queue_starts_active_at_sequence_one() {
        let queue = Queue::new("q-1", 1000, "Cafeteria", "Building A", None);
        assert!(queue.is_active);
        assert_eq!(queue.next_sequence, 1);
        assert_eq!(queue.updated_at, queue.created_at);
    }
}
