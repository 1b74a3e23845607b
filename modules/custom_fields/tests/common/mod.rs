//! Common test utilities: mock ports and a realistic lead field registry

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use custom_fields::contract::*;
use custom_fields::domain::repository::{DefinitionSource, UploadSink, ValueSink};
use custom_fields::domain::Service;
use custom_fields::infra::storage::InMemoryFieldStore;
use custom_fields::Config;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Route test logs through the tracing subscriber once
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("custom_fields=debug")
        .with_test_writer()
        .try_init();
}

/// Value sink that rejects chosen definitions and counts every call
#[derive(Clone)]
pub struct FlakySink {
    pub inner: Arc<InMemoryFieldStore>,
    failing: Arc<RwLock<HashSet<String>>>,
    pub calls: Arc<AtomicUsize>,
}

impl FlakySink {
    pub fn new(inner: Arc<InMemoryFieldStore>) -> Self {
        Self {
            inner,
            failing: Arc::new(RwLock::new(HashSet::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_on(&self, definition_id: &str) {
        self.failing.write().insert(definition_id.to_string());
    }

    pub fn heal(&self) {
        self.failing.write().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValueSink for FlakySink {
    async fn upsert(
        &self,
        entity_instance_id: &str,
        definition_id: &str,
        slots: &ValueSlots,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().contains(definition_id) {
            anyhow::bail!("connection reset while saving {}", definition_id);
        }
        self.inner.upsert(entity_instance_id, definition_id, slots).await
    }

    async fn delete_by_definition(&self, definition_id: &str) -> Result<u64> {
        self.inner.delete_by_definition(definition_id).await
    }
}

/// Upload sink that always fails
pub struct BrokenUploads;

#[async_trait]
impl UploadSink for BrokenUploads {
    async fn upload(&self, file: &FileUpload) -> Result<JsonValue> {
        anyhow::bail!("storage quota exceeded for {}", file.name)
    }
}

/// Upload sink that answers without a url
pub struct NamelessUploads;

#[async_trait]
impl UploadSink for NamelessUploads {
    async fn upload(&self, file: &FileUpload) -> Result<JsonValue> {
        Ok(serde_json::json!({ "name": file.name }))
    }
}

/// Definition source serving a fixed payload
pub struct StaticSource(pub JsonValue);

#[async_trait]
impl DefinitionSource for StaticSource {
    async fn fetch(&self, _entity_type: &str, _instance: Option<&str>) -> Result<JsonValue> {
        Ok(self.0.clone())
    }
}

/// Definition source that is down
pub struct UnreachableSource;

#[async_trait]
impl DefinitionSource for UnreachableSource {
    async fn fetch(&self, entity_type: &str, _instance: Option<&str>) -> Result<JsonValue> {
        anyhow::bail!("registry unavailable for {}", entity_type)
    }
}

/// Service over an in-memory store with a flaky sink in front of it
pub struct Harness {
    pub store: Arc<InMemoryFieldStore>,
    pub sink: FlakySink,
    pub service: Service,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        Self::with_uploads(config, None)
    }

    pub fn with_uploads(config: Config, uploads: Option<Arc<dyn UploadSink>>) -> Self {
        init_tracing();
        let store = Arc::new(InMemoryFieldStore::new());
        let sink = FlakySink::new(store.clone());
        let uploads = uploads.unwrap_or_else(|| store.clone() as Arc<dyn UploadSink>);
        let service = Service::new(config, store.clone(), Arc::new(sink.clone()), uploads);
        Self {
            store,
            sink,
            service,
        }
    }
}

/// Lead fields: a required budget and an optional vip flag
pub fn budget_and_vip() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::new("def-budget", "lead", "budget", "Budget", FieldKind::Number)
            .required(true)
            .sort_order(1),
        FieldDefinition::new("def-vip", "lead", "vip", "VIP", FieldKind::Boolean).sort_order(2),
    ]
}
