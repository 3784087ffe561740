//! Persistence layer: key-value storage for the profile document.

pub mod libsql_backend;
pub mod memory;
pub(crate) mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::InMemoryStore;
pub use traits::KeyValueStore;
