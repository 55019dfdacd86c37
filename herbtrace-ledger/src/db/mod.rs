//! Storage adapters for the collection event ledger

mod memory;
mod sqlite;

pub use memory::InMemoryEventRepository;
pub use sqlite::SqliteEventRepository;
