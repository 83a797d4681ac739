// Domain Layer - Pure business logic and entities

pub mod error;
pub mod queue;
pub mod ticket;

// Re-exports
pub use error::DomainError;
pub use queue::{Queue, QueueId};
pub use ticket::{Ticket, TicketId, TicketStatus, UserId};
