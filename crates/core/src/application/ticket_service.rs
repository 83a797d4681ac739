// Ticket Service - Issuance orchestration and token lifecycle
//
// Owns the state machine and the single durable invariant: at most one
// active ticket per user, system-wide. Durable writes are the commit
// point; every cache interaction (rate limiter, live index) is a
// best-effort projection that never gates the caller's success.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::live_index::LiveQueueIndex;
use super::rate_limiter::{RateLimitDecision, RateLimiter};
use crate::domain::{DomainError, Queue, QueueId, Ticket, TicketId, TicketStatus, UserId};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, QueueRepository, TicketRepository, TimeProvider};

const ALREADY_IN_QUEUE: &str = "You are already in a queue";

pub struct TicketService {
    queue_repo: Arc<dyn QueueRepository>,
    ticket_repo: Arc<dyn TicketRepository>,
    rate_limiter: RateLimiter,
    live_index: LiveQueueIndex,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl TicketService {
    pub fn new(
        queue_repo: Arc<dyn QueueRepository>,
        ticket_repo: Arc<dyn TicketRepository>,
        rate_limiter: RateLimiter,
        live_index: LiveQueueIndex,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            queue_repo,
            ticket_repo,
            rate_limiter,
            live_index,
            id_provider,
            time_provider,
        }
    }

    /// Create a new active queue
    pub async fn create_queue(
        &self,
        name: &str,
        location: &str,
        operator: Option<String>,
    ) -> Result<Queue> {
        if name.trim().is_empty() || location.trim().is_empty() {
            return Err(AppError::Validation(
                "Queue name and location are required".to_string(),
            ));
        }

        let queue = Queue::new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            name,
            location,
            operator,
        );
        self.queue_repo.insert(&queue).await?;

        info!(queue_id = %queue.id, name = %name, location = %location, "queue created");
        Ok(queue)
    }

    /// Activate or deactivate a queue (queues are deactivated, not deleted)
    pub async fn set_queue_active(&self, queue_id: &QueueId, active: bool) -> Result<()> {
        let updated = self.queue_repo.set_active(queue_id, active).await?;
        if !updated {
            return Err(AppError::NotFound(format!("Queue not found: {queue_id}")));
        }
        info!(queue_id = %queue_id, active, "queue active flag updated");
        Ok(())
    }

    /// Issue a ticket for (user, queue).
    ///
    /// Rate-limit rejections are propagated verbatim with their retry
    /// hint and without side effects. Sequence assignment is atomic at the
    /// storage layer, so concurrent joins against the same queue receive
    /// strictly increasing, non-colliding sequence numbers.
    pub async fn issue_ticket(&self, queue_id: &QueueId, user_id: &UserId) -> Result<Ticket> {
        if user_id.trim().is_empty() {
            return Err(AppError::Validation(
                "A user is required to issue a ticket".to_string(),
            ));
        }

        match self.rate_limiter.check_join(user_id, queue_id).await {
            // Unavailable means fail-open; the limiter already logged it
            RateLimitDecision::Allowed | RateLimitDecision::Unavailable => {}
            RateLimitDecision::Denied {
                message,
                retry_after_seconds,
            } => {
                return Err(AppError::RateLimited {
                    message,
                    retry_after_seconds,
                });
            }
        }

        // Fast-path check; the storage-level unique index on active
        // tickets is the authoritative enforcer.
        if self
            .ticket_repo
            .find_active_by_user(user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(ALREADY_IN_QUEUE.to_string()));
        }

        let seq = self
            .queue_repo
            .claim_next_sequence(queue_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Queue not found or inactive".to_string()))?;

        let ticket = Ticket::new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            queue_id.clone(),
            user_id.clone(),
            seq,
        );

        // A conflict here is the constraint backstop firing on a racing
        // join for the same user. The gap it leaves in the sequence is an
        // accepted cost of atomicity and is not repaired.
        match self.ticket_repo.insert(&ticket).await {
            Ok(()) => {}
            Err(AppError::Conflict(_)) => {
                return Err(AppError::Conflict(ALREADY_IN_QUEUE.to_string()));
            }
            Err(err) => return Err(err),
        }

        if let Err(err) = self.live_index.enqueue(queue_id, &ticket.id, seq).await {
            warn!(
                error = %err,
                ticket_id = %ticket.id,
                "live index enqueue failed, durable record stands"
            );
        }

        self.rate_limiter.record_join(user_id, queue_id).await;

        info!(ticket_id = %ticket.id, queue_id = %queue_id, seq, "ticket issued");
        Ok(ticket)
    }

    /// Change a ticket's status.
    ///
    /// The durable status update is the commit point; live-index
    /// reconciliation afterwards is best-effort and self-heals via
    /// rebuild. Transitions out of a terminal status are rejected.
    pub async fn update_status(
        &self,
        ticket_id: &TicketId,
        status: TicketStatus,
    ) -> Result<Ticket> {
        let ticket = self
            .ticket_repo
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket not found: {ticket_id}")))?;

        if !ticket.status.can_transition_to(status) {
            return Err(DomainError::InvalidStatusTransition {
                from: ticket.status.to_string(),
                to: status.to_string(),
            }
            .into());
        }

        // Compare-and-set against the status the guard validated: a
        // concurrent transition that committed first makes this write
        // match zero rows instead of resurrecting the ticket.
        let updated = match self
            .ticket_repo
            .update_status(ticket_id, ticket.status, status, self.time_provider.now_millis())
            .await?
        {
            Some(updated) => updated,
            None => {
                let current = self
                    .ticket_repo
                    .find_by_id(ticket_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Ticket not found: {ticket_id}")))?;
                return Err(DomainError::InvalidStatusTransition {
                    from: current.status.to_string(),
                    to: status.to_string(),
                }
                .into());
            }
        };

        let reconcile = match status {
            TicketStatus::Waiting => {
                self.live_index
                    .enqueue(&updated.queue_id, &updated.id, updated.seq)
                    .await
            }
            TicketStatus::Served => match self.live_index.remove(&updated.queue_id, &updated.id).await
            {
                Ok(()) => {
                    self.live_index
                        .set_now_serving(&updated.queue_id, &updated.id)
                        .await
                }
                Err(err) => Err(err),
            },
            _ => self.live_index.remove(&updated.queue_id, &updated.id).await,
        };

        if let Err(err) = reconcile {
            warn!(
                error = %err,
                ticket_id = %updated.id,
                status = %status,
                "live index reconciliation failed, durable status stands"
            );
        }

        info!(ticket_id = %updated.id, status = %status, "ticket status updated");
        Ok(updated)
    }

    /// 1-based position of a WAITING ticket in its queue.
    ///
    /// Consults the live index first and falls back to durable WAITING
    /// order when the index is cold or unreachable. Returns `None` for
    /// tickets no longer waiting.
    pub async fn position_of(&self, ticket_id: &TicketId) -> Result<Option<u64>> {
        let ticket = self
            .ticket_repo
            .find_by_id(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket not found: {ticket_id}")))?;

        if ticket.status != TicketStatus::Waiting {
            return Ok(None);
        }

        match self.live_index.position_of(&ticket.queue_id, &ticket.id).await {
            Ok(Some(position)) => return Ok(Some(position)),
            Ok(None) => {} // cold index, fall through to durable order
            Err(err) => {
                debug!(error = %err, "live index position lookup failed, using durable order");
            }
        }

        let waiting = self
            .ticket_repo
            .find_waiting_by_queue(&ticket.queue_id)
            .await?;
        Ok(waiting
            .iter()
            .position(|t| t.id == ticket.id)
            .map(|i| i as u64 + 1))
    }

    /// Ticket currently being served in a queue, if known.
    /// Advisory only: an unreachable cache reads as "unknown".
    pub async fn now_serving(&self, queue_id: &QueueId) -> Result<Option<TicketId>> {
        match self.live_index.now_serving(queue_id).await {
            Ok(ticket_id) => Ok(ticket_id),
            Err(err) => {
                debug!(error = %err, queue_id = %queue_id, "now-serving lookup degraded");
                Ok(None)
            }
        }
    }

    /// Replay durable WAITING tickets into the live index.
    ///
    /// Returns the number of entries replayed. A cache failure is logged
    /// and absorbed; the index stays advisory either way.
    pub async fn rebuild_index(&self, queue_id: &QueueId) -> Result<usize> {
        let waiting = self.ticket_repo.find_waiting_by_queue(queue_id).await?;
        let entries: Vec<(TicketId, i64)> =
            waiting.iter().map(|t| (t.id.clone(), t.seq)).collect();

        match self.live_index.rebuild(queue_id, &entries).await {
            Ok(()) => {
                info!(queue_id = %queue_id, entries = entries.len(), "live index rebuilt");
            }
            Err(err) => {
                warn!(error = %err, queue_id = %queue_id, "live index rebuild failed");
            }
        }
        Ok(entries.len())
    }
}
