// Ticket Domain Model

use serde::{Deserialize, Serialize};

use super::error::{DomainError, Result};
use super::queue::QueueId;

/// Ticket ID (UUID v4)
pub type TicketId = String;

/// User identifier (owned by the excluded auth layer)
pub type UserId = String;

/// Ticket Status
///
/// `Waiting` and `Served` are active: a user may hold at most one ticket in
/// an active status across all queues. `Completed` and `Cancelled` are
/// terminal and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Waiting,
    Served,
    Completed,
    Cancelled,
}

impl TicketStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TicketStatus::Waiting | TicketStatus::Served)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Transition guard.
    ///
    /// Waiting -> Waiting is allowed so that idempotent retries can
    /// re-insert a ticket into the live index. Everything else is
    /// one-directional: Waiting -> Served -> terminal, or Waiting ->
    /// terminal directly on cancel. Terminal tickets are immutable.
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        match (self, next) {
            (TicketStatus::Waiting, _) => true,
            (TicketStatus::Served, TicketStatus::Served) => true,
            (TicketStatus::Served, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Waiting => write!(f, "WAITING"),
            TicketStatus::Served => write!(f, "SERVED"),
            TicketStatus::Completed => write!(f, "COMPLETED"),
            TicketStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "WAITING" => Ok(TicketStatus::Waiting),
            "SERVED" => Ok(TicketStatus::Served),
            "COMPLETED" => Ok(TicketStatus::Completed),
            "CANCELLED" => Ok(TicketStatus::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// One person's claim to a position in a queue.
///
/// `seq` is the pre-increment value of the queue's `next_sequence` at
/// issuance time, unique within a queue, and defines serving order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub queue_id: QueueId,
    pub user_id: UserId,
    pub seq: i64,
    pub status: TicketStatus,
    pub created_at: i64, // epoch ms
    pub updated_at: i64,
}

impl Ticket {
    /// Create a new WAITING ticket
    ///
    /// # Arguments
    ///
    /// * `id` - Unique ticket ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `seq` - Sequence number claimed from the queue
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        queue_id: impl Into<String>,
        user_id: impl Into<String>,
        seq: i64,
    ) -> Self {
        Self {
            id: id.into(),
            queue_id: queue_id.into(),
            user_id: user_id.into(),
            seq,
            status: TicketStatus::Waiting,
            created_at,
            updated_at: created_at,
        }
    }

    /// Apply a guarded status transition with explicit timestamp
    pub fn transition_to(&mut self, next: TicketStatus, now_millis: i64) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = now_millis;
        Ok(())
    }
}
