//! In-memory implementation of every storage port
//!
//! Backs embedded callers and tests. Definitions, values and uploaded files
//! live in process memory behind `parking_lot` locks.

use crate::contract::{FieldDefinition, FileUpload, ValueSlots};
use crate::domain::repository::{DefinitionSource, UploadSink, ValueSink};
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use uuid::Uuid;

use super::mapper;

/// Value key: (entity_instance_id, definition_id)
type ValueKey = (String, String);

#[derive(Default)]
pub struct InMemoryFieldStore {
    definitions: RwLock<Vec<FieldDefinition>>,
    values: RwLock<HashMap<ValueKey, ValueSlots>>,
    files: RwLock<HashMap<String, FileUpload>>,
}

impl InMemoryFieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any with the same id
    pub fn put_definition(&self, definition: FieldDefinition) {
        let mut definitions = self.definitions.write();
        definitions.retain(|d| d.definition_id != definition.definition_id);
        definitions.push(definition);
    }

    /// Remove a definition from the registry. Stored values are untouched.
    pub fn remove_definition(&self, definition_id: &str) -> bool {
        let mut definitions = self.definitions.write();
        let before = definitions.len();
        definitions.retain(|d| d.definition_id != definition_id);
        definitions.len() != before
    }

    pub fn stored_value(&self, entity_instance_id: &str, definition_id: &str) -> Option<ValueSlots> {
        self.values
            .read()
            .get(&(entity_instance_id.to_string(), definition_id.to_string()))
            .cloned()
    }

    /// Number of stored values across all instances
    pub fn value_count(&self) -> usize {
        self.values.read().len()
    }

    /// Uploaded file by locator
    pub fn file(&self, url: &str) -> Option<FileUpload> {
        self.files.read().get(url).cloned()
    }
}

#[async_trait]
impl DefinitionSource for InMemoryFieldStore {
    async fn fetch(
        &self,
        entity_type: &str,
        entity_instance_id: Option<&str>,
    ) -> Result<JsonValue> {
        let defs: Vec<JsonValue> = self
            .definitions
            .read()
            .iter()
            .filter(|d| d.entity_type == entity_type)
            .map(mapper::definition_row)
            .collect();

        let values: Vec<JsonValue> = match entity_instance_id {
            Some(instance) => self
                .values
                .read()
                .iter()
                .filter(|((owner, _), _)| owner == instance)
                .map(|((_, definition_id), slots)| mapper::value_row(definition_id, slots))
                .collect(),
            None => Vec::new(),
        };

        Ok(json!({ "defs": defs, "values": values }))
    }
}

#[async_trait]
impl ValueSink for InMemoryFieldStore {
    async fn upsert(
        &self,
        entity_instance_id: &str,
        definition_id: &str,
        slots: &ValueSlots,
    ) -> Result<()> {
        self.values.write().insert(
            (entity_instance_id.to_string(), definition_id.to_string()),
            slots.clone(),
        );
        Ok(())
    }

    async fn delete_by_definition(&self, definition_id: &str) -> Result<u64> {
        let mut values = self.values.write();
        let before = values.len();
        values.retain(|(_, owner), _| owner != definition_id);
        Ok((before - values.len()) as u64)
    }
}

#[async_trait]
impl UploadSink for InMemoryFieldStore {
    async fn upload(&self, file: &FileUpload) -> Result<JsonValue> {
        let url = format!("memory://uploads/{}/{}", Uuid::new_v4(), file.name);
        self.files.write().insert(url.clone(), file.clone());

        Ok(json!({
            "url": url,
            "name": file.name,
            "size": file.size(),
            "content_type": file.content_type,
        }))
    }
}
