// Ticket Repository Port (Interface)

use crate::domain::{QueueId, Ticket, TicketId, TicketStatus, UserId};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for Ticket persistence
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Insert a new ticket.
    ///
    /// The store enforces a uniqueness constraint on (user, active status)
    /// and on (queue, seq). A violation of the active-user constraint maps
    /// to `AppError::Conflict` so the service can treat it exactly like the
    /// fast-path existence check.
    async fn insert(&self, ticket: &Ticket) -> Result<()>;

    /// Find ticket by ID
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>>;

    /// Find the user's active (WAITING or SERVED) ticket, if any
    async fn find_active_by_user(&self, user_id: &UserId) -> Result<Option<Ticket>>;

    /// Persist a status change conditional on the status it transitions
    /// from, and return the updated ticket.
    ///
    /// The conditional write makes the transition a compare-and-set:
    /// a caller whose read went stale cannot overwrite a transition
    /// that already committed. Returns `None` when no row matched,
    /// either because the ticket is unknown or because its status
    /// changed since it was read. This is the commit point for a
    /// transition; live-index reconciliation happens afterwards.
    async fn update_status(
        &self,
        id: &TicketId,
        from: TicketStatus,
        to: TicketStatus,
        now_millis: i64,
    ) -> Result<Option<Ticket>>;

    /// All WAITING tickets for a queue, ordered by seq ascending
    /// (used to rebuild the live index and as position fallback)
    async fn find_waiting_by_queue(&self, queue_id: &QueueId) -> Result<Vec<Ticket>>;
}
