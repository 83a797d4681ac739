// sqlx -> AppError conversion with structured information

use waitline_core::error::AppError;

/// Map a sqlx error to the application error taxonomy.
///
/// Unique-constraint violations are inspected by index name so the
/// one-active-ticket backstop surfaces as `Conflict` rather than a
/// generic database failure.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();

            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => {
                        // UNIQUE constraint failed
                        if message.contains("idx_tickets_active_user")
                            || message.contains("tickets.user_id")
                        {
                            AppError::Conflict("User already holds an active ticket".to_string())
                        } else if message.contains("idx_queues_name_location")
                            || message.contains("queues.name")
                        {
                            AppError::Conflict(
                                "A queue with this name and location already exists".to_string(),
                            )
                        } else {
                            AppError::Database(format!(
                                "Unique constraint violation: {} ({})",
                                message, code_str
                            ))
                        }
                    }
                    "787" | "3850" => {
                        // FOREIGN KEY constraint failed
                        AppError::Database(format!(
                            "Foreign key constraint violation: {} ({})",
                            message, code_str
                        ))
                    }
                    "5" => {
                        // SQLITE_BUSY - database is locked
                        AppError::Database(format!("Database locked (SQLITE_BUSY): {}", message))
                    }
                    "13" => {
                        // SQLITE_FULL - database or disk is full
                        AppError::Database(format!("Database full: {}", message))
                    }
                    _ => AppError::Database(format!("Database error [{}]: {}", code_str, message)),
                }
            } else {
                AppError::Database(format!("Database error: {}", message))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        _ => AppError::Database(err.to_string()),
    }
}
