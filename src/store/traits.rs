//! `Database` trait: the process-wide keyed store.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Keys used for session persistence.
pub mod settings_keys {
    /// Scope for client-local state (single local user per install).
    pub const LOCAL_SCOPE: &str = "local";
    /// Key for the session snapshot JSON blob.
    pub const SESSION: &str = "session";
}

/// Backend-agnostic keyed store. Values are JSON documents overwritten
/// wholesale on every write.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Read a value. `Ok(None)` when the key was never written.
    async fn get_setting(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace a value.
    async fn set_setting(
        &self,
        scope: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a value. Returns whether a row was removed.
    async fn delete_setting(&self, scope: &str, key: &str) -> Result<bool, DatabaseError>;
}
