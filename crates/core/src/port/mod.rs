// Port Layer - Interfaces for external dependencies

pub mod cache_store;
pub mod id_provider; // For deterministic testing
pub mod queue_repository;
pub mod ticket_repository;
pub mod time_provider;

// Re-exports
pub use cache_store::{CacheCommand, CacheError, CacheResult, CacheStore};
pub use id_provider::IdProvider;
pub use queue_repository::QueueRepository;
pub use ticket_repository::TicketRepository;
pub use time_provider::TimeProvider;
