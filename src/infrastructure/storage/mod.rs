//! Storage infrastructure - Storage implementations

mod factory;
mod in_memory;
mod postgres;
mod postgrest;

pub use factory::{StorageConfig, StorageFactory, RUNS_TABLE, WORKFLOWS_TABLE};
pub use in_memory::InMemoryStorage;
pub use postgres::{PostgresConfig, PostgresStorage};
pub use postgrest::{PostgrestConfig, PostgrestStorage};
