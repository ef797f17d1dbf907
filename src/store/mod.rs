//! Persistence layer: libSQL-backed keyed store for the session snapshot.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{Database, settings_keys};
