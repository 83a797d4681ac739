// SQLite QueueRepository Implementation

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use waitline_core::domain::{Queue, QueueId};
use waitline_core::error::Result;
use waitline_core::port::{QueueRepository, TimeProvider};

use crate::error_map::map_sqlx_error;

pub struct SqliteQueueRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteQueueRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: String,
    name: String,
    location: String,
    operator: Option<String>,
    is_active: i64,
    next_sequence: i64,
    created_at: i64,
    updated_at: i64,
}

impl From<QueueRow> for Queue {
    fn from(row: QueueRow) -> Self {
        Queue {
            id: row.id,
            name: row.name,
            location: row.location,
            operator: row.operator,
            is_active: row.is_active != 0,
            next_sequence: row.next_sequence,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl QueueRepository for SqliteQueueRepository {
    async fn insert(&self, queue: &Queue) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO queues (
                id, name, location, operator, is_active,
                next_sequence, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&queue.id)
        .bind(&queue.name)
        .bind(&queue.location)
        .bind(&queue.operator)
        .bind(if queue.is_active { 1 } else { 0 })
        .bind(queue.next_sequence)
        .bind(queue.created_at)
        .bind(queue.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &QueueId) -> Result<Option<Queue>> {
        let row = sqlx::query_as::<_, QueueRow>("SELECT * FROM queues WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Queue::from))
    }

    async fn set_active(&self, id: &QueueId, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE queues SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(if active { 1 } else { 0 })
            .bind(self.time_provider.now_millis())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn claim_next_sequence(&self, id: &QueueId) -> Result<Option<i64>> {
        // Single conditional increment-and-fetch: the WHERE clause makes
        // missing and inactive queues indistinguishable no-ops, and the
        // RETURNING clause hands back the pre-increment value.
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE queues
            SET next_sequence = next_sequence + 1, updated_at = ?
            WHERE id = ? AND is_active = 1
            RETURNING next_sequence - 1
            "#,
        )
        .bind(self.time_provider.now_millis())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|(seq,)| seq))
    }
}
