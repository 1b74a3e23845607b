//! Ports to the engine's external collaborators
//!
//! Implementations are in infra/storage. Callers embedding the engine in
//! another host (HTTP backends, test doubles) implement these directly.

use crate::contract::{FileUpload, ValueSlots};
use anyhow::Result;
use async_trait::async_trait;

/// Source of field definitions, optionally joined with stored values
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    /// Fetch definitions for an entity type. When `entity_instance_id` is set
    /// the payload should also carry that instance's stored values.
    ///
    /// The payload may use any shape the normalizer accepts.
    async fn fetch(
        &self,
        entity_type: &str,
        entity_instance_id: Option<&str>,
    ) -> Result<serde_json::Value>;
}

/// Per-field idempotent value storage
#[async_trait]
pub trait ValueSink: Send + Sync {
    /// Create or replace the value keyed by `(entity_instance_id, definition_id)`.
    /// All four slots are written; `None` clears a slot.
    async fn upsert(
        &self,
        entity_instance_id: &str,
        definition_id: &str,
        slots: &ValueSlots,
    ) -> Result<()>;

    /// Remove every stored value of a definition. Returns the number removed.
    async fn delete_by_definition(&self, definition_id: &str) -> Result<u64>;
}

/// Out-of-process file storage
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Store a single binary. Returns metadata with at least `url` and `name`.
    async fn upload(&self, file: &FileUpload) -> Result<serde_json::Value>;
}
