// Waitline Infra-SQLite - Durable store adapters

mod connection;
mod error_map;
mod migration;
mod queue_repository;
mod ticket_repository;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use queue_repository::SqliteQueueRepository;
pub use ticket_repository::SqliteTicketRepository;
