// SQLite TicketRepository Implementation

use async_trait::async_trait;
use sqlx::SqlitePool;

use waitline_core::domain::{QueueId, Ticket, TicketId, TicketStatus, UserId};
use waitline_core::error::{AppError, Result};
use waitline_core::port::TicketRepository;

use crate::error_map::map_sqlx_error;

// Timestamps are injected by callers through the port, so this adapter
// needs no TimeProvider of its own.
pub struct SqliteTicketRepository {
    pool: SqlitePool,
}

impl SqliteTicketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: String,
    queue_id: String,
    user_id: String,
    seq: i64,
    status: String,
    created_at: i64,
    updated_at: i64,
}

impl TicketRow {
    fn into_ticket(self) -> Result<Ticket> {
        let status: TicketStatus = self
            .status
            .parse()
            .map_err(AppError::Domain)?;

        Ok(Ticket {
            id: self.id,
            queue_id: self.queue_id,
            user_id: self.user_id,
            seq: self.seq,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl TicketRepository for SqliteTicketRepository {
    async fn insert(&self, ticket: &Ticket) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, queue_id, user_id, seq, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&ticket.id)
        .bind(&ticket.queue_id)
        .bind(&ticket.user_id)
        .bind(ticket.seq)
        .bind(ticket.status.to_string())
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>("SELECT * FROM tickets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(TicketRow::into_ticket).transpose()
    }

    async fn find_active_by_user(&self, user_id: &UserId) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            "SELECT * FROM tickets WHERE user_id = ? AND status IN ('WAITING', 'SERVED')",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TicketRow::into_ticket).transpose()
    }

    async fn update_status(
        &self,
        id: &TicketId,
        from: TicketStatus,
        to: TicketStatus,
        now_millis: i64,
    ) -> Result<Option<Ticket>> {
        // Compare-and-set on the from-status: a stale caller matches
        // zero rows instead of clobbering a transition that already
        // committed.
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            UPDATE tickets
            SET status = ?, updated_at = ?
            WHERE id = ? AND status = ?
            RETURNING *
            "#,
        )
        .bind(to.to_string())
        .bind(now_millis)
        .bind(id)
        .bind(from.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TicketRow::into_ticket).transpose()
    }

    async fn find_waiting_by_queue(&self, queue_id: &QueueId) -> Result<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT * FROM tickets WHERE queue_id = ? AND status = 'WAITING' ORDER BY seq ASC",
        )
        .bind(queue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TicketRow::into_ticket).collect()
    }
}
