//! Domain service - business logic orchestration

use super::dispatch;
use super::normalizer;
use super::persistence;
use super::repository::{DefinitionSource, UploadSink, ValueSink};
use super::validation;
use crate::config::{Config, OrphanPolicy};
use crate::contract::{
    model::upload_locator, ControlInput, CustomFieldsError, FieldDefinition, FieldForm, FieldKind,
    FileUpload, KindFamily, SubmitReport, Value,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Domain service for custom field forms
pub struct Service {
    config: Config,
    source: Arc<dyn DefinitionSource>,
    sink: Arc<dyn ValueSink>,
    uploads: Arc<dyn UploadSink>,
}

impl Service {
    /// Create a new service instance
    pub fn new(
        config: Config,
        source: Arc<dyn DefinitionSource>,
        sink: Arc<dyn ValueSink>,
        uploads: Arc<dyn UploadSink>,
    ) -> Self {
        Self {
            config,
            source,
            sink,
            uploads,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ===== Load =====

    /// Load definitions for an entity type, joined with the instance's stored
    /// values when an instance id is given
    #[tracing::instrument(skip(self))]
    pub async fn load_form(
        &self,
        entity_type: &str,
        entity_instance_id: Option<&str>,
    ) -> Result<FieldForm, CustomFieldsError> {
        let payload = self
            .source
            .fetch(entity_type, entity_instance_id)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "failed to fetch custom field definitions");
                CustomFieldsError::Source {
                    message: e.to_string(),
                }
            })?;

        let entries = normalizer::normalize_entries(&payload, entity_type)
            .into_iter()
            .filter(|entry| {
                let matches = entry.definition.entity_type == entity_type;
                if !matches {
                    tracing::debug!(
                        definition_id = %entry.definition.definition_id,
                        other = %entry.definition.entity_type,
                        "skipping definition of another entity type"
                    );
                }
                matches
            })
            .collect::<Vec<_>>();

        tracing::debug!(fields = entries.len(), "custom field form loaded");
        Ok(FieldForm::new(
            entity_type,
            entity_instance_id.map(str::to_string),
            entries,
        ))
    }

    // ===== Edit =====

    /// Apply raw control input to one field
    pub fn apply_input(
        &self,
        form: &mut FieldForm,
        key: &str,
        input: ControlInput,
    ) -> Result<(), CustomFieldsError> {
        let entry = form
            .get_mut(key)
            .ok_or_else(|| CustomFieldsError::UnknownField {
                key: key.to_string(),
            })?;

        let value = dispatch::apply_input(&entry.definition, &input).map_err(|e| {
            CustomFieldsError::Coercion {
                label: entry.definition.label.clone(),
                input: e.input,
            }
        })?;
        entry.value = value;
        Ok(())
    }

    /// Upload a file for a field rendered with an upload control and record
    /// the result in the slot the field's kind stores.
    ///
    /// On any failure the form is left untouched.
    #[tracing::instrument(skip(self, form, file), fields(file = %file.name, size = file.size()))]
    pub async fn upload_file(
        &self,
        form: &mut FieldForm,
        key: &str,
        file: FileUpload,
    ) -> Result<(), CustomFieldsError> {
        let entry = form.get(key).ok_or_else(|| CustomFieldsError::UnknownField {
            key: key.to_string(),
        })?;
        let definition = entry.definition.clone();
        let current = entry.value.clone();

        let upload_error = |message: String| CustomFieldsError::Upload {
            label: definition.label.clone(),
            message,
        };

        self.check_upload(&definition, &current, &file)
            .map_err(upload_error)?;

        let metadata = self.uploads.upload(&file).await.map_err(|e| {
            tracing::warn!(key = %definition.key, error = ?e, "custom field upload failed");
            upload_error(e.to_string())
        })?;

        let Some(locator) = upload_locator(&metadata).filter(|url| !url.is_empty()) else {
            tracing::warn!(key = %definition.key, "upload response carried no url");
            return Err(upload_error("upload response carried no url".to_string()));
        };

        let uploaded = match dispatch::control_for(&definition).control {
            FieldKind::Files => {
                let mut items = existing_uploads(&current);
                items.push(metadata);
                Value::Upload {
                    locator,
                    metadata: JsonValue::Array(items),
                }
            }
            _ => Value::Upload { locator, metadata },
        };
        let Some(value) = dispatch::fit_to_kind(&definition, uploaded) else {
            return Err(upload_error(format!("{} cannot store files", definition.kind)));
        };

        if let Some(entry) = form.get_mut(key) {
            entry.value = value;
        }
        tracing::debug!(key = %definition.key, "custom field upload recorded");
        Ok(())
    }

    fn check_upload(
        &self,
        definition: &FieldDefinition,
        current: &Value,
        file: &FileUpload,
    ) -> Result<(), String> {
        let control = dispatch::control_for(definition);
        if control.coercion != dispatch::Coercion::Upload {
            return Err(format!("{} does not accept files", control.control));
        }
        if !matches!(
            definition.kind.family(),
            KindFamily::Upload | KindFamily::Text | KindFamily::Structured
        ) {
            return Err(format!("{} cannot store files", definition.kind));
        }

        let options = &definition.options;
        if !options.accept.is_empty() && !accepts(&options.accept, file) {
            return Err(format!(
                "file type not accepted (allowed: {})",
                options.accept.join(", ")
            ));
        }

        let limit = options
            .max_size_bytes
            .map_or(self.config.max_upload_bytes, |max| {
                max.min(self.config.max_upload_bytes)
            });
        if file.size() > limit {
            return Err(format!("file exceeds {} bytes", limit));
        }

        if control.control == FieldKind::Files {
            if let Some(max_files) = options.max_files {
                if existing_uploads(current).len() >= max_files {
                    return Err(format!("at most {} files allowed", max_files));
                }
            }
        }
        Ok(())
    }

    // ===== Validate & submit =====

    /// Check the form locally; the first failing field is reported by label
    pub fn validate(&self, form: &FieldForm) -> Result<(), CustomFieldsError> {
        validation::validate_entries(form.entries(), self.config.strict_value_checks)
    }

    /// Validate, then upsert every visible field with a value. A form loaded
    /// for an instance can only be saved for that instance.
    ///
    /// Upserts run concurrently and are all awaited; successful ones stay
    /// committed when others fail.
    #[tracing::instrument(skip(self, form), fields(entity_type = %form.entity_type()))]
    pub async fn submit(
        &self,
        form: &FieldForm,
        entity_instance_id: &str,
    ) -> Result<SubmitReport, CustomFieldsError> {
        if let Some(loaded_for) = form.entity_instance_id() {
            if loaded_for != entity_instance_id {
                tracing::warn!(
                    loaded_for,
                    entity_instance_id,
                    "refusing to save custom fields for another instance"
                );
                return Err(CustomFieldsError::InstanceMismatch {
                    expected: loaded_for.to_string(),
                    actual: entity_instance_id.to_string(),
                });
            }
        }
        self.validate(form)?;

        let commands = persistence::plan_upserts(form, entity_instance_id);
        let skipped = form
            .visible()
            .filter(|entry| entry.value.is_absent())
            .map(|entry| entry.definition.key.clone())
            .collect::<Vec<_>>();

        let report =
            persistence::execute(self.sink.as_ref(), commands, self.config.max_concurrent_upserts)
                .await;

        if !report.is_success() {
            let labels = report
                .failed()
                .map(|o| o.command.label.clone())
                .collect::<Vec<_>>();
            tracing::warn!(
                failed = labels.len(),
                total = report.total(),
                "custom field submission partially failed"
            );
            return Err(CustomFieldsError::PartialPersistence {
                failed: labels.len(),
                total: report.total(),
                labels,
            });
        }

        tracing::info!(saved = report.total(), "custom fields saved");
        Ok(SubmitReport {
            saved: report.total(),
            skipped,
        })
    }

    // ===== Definition lifecycle =====

    /// React to a definition deletion according to the orphan policy.
    /// Returns the number of stored values removed.
    #[tracing::instrument(skip(self))]
    pub async fn definition_deleted(&self, definition_id: &str) -> Result<u64, CustomFieldsError> {
        match self.config.orphan_policy {
            OrphanPolicy::Retain => {
                tracing::debug!("retaining values of deleted definition");
                Ok(0)
            }
            OrphanPolicy::Cascade => {
                let removed = self
                    .sink
                    .delete_by_definition(definition_id)
                    .await
                    .map_err(|e| {
                        tracing::error!(error = ?e, "failed to delete orphaned values");
                        CustomFieldsError::Internal
                    })?;
                tracing::info!(removed, "deleted values of removed definition");
                Ok(removed)
            }
        }
    }
}

/// Upload metadata objects already held by a value
fn existing_uploads(value: &Value) -> Vec<JsonValue> {
    match value {
        Value::Upload {
            metadata: JsonValue::Array(items),
            ..
        } => items.clone(),
        Value::Upload { metadata, .. } if metadata.is_object() => vec![metadata.clone()],
        Value::Upload { locator, .. } if !locator.is_empty() => {
            vec![serde_json::json!({ "url": locator })]
        }
        Value::Json(JsonValue::Array(items)) => items.clone(),
        Value::Json(metadata) if metadata.is_object() => vec![metadata.clone()],
        Value::Text(locator) if !locator.is_empty() => {
            vec![serde_json::json!({ "url": locator })]
        }
        _ => Vec::new(),
    }
}

/// Match a file against accepted MIME types (`image/png`, `image/*`) or
/// extensions (`.pdf`)
fn accepts(accept: &[String], file: &FileUpload) -> bool {
    let content_type = file.content_type.to_ascii_lowercase();
    let extension = file.extension();

    accept.iter().any(|pattern| {
        let pattern = pattern.trim().to_ascii_lowercase();
        if pattern.starts_with('.') {
            extension.as_deref() == Some(pattern.as_str())
        } else if let Some(prefix) = pattern.strip_suffix("/*") {
            content_type
                .split_once('/')
                .is_some_and(|(major, _)| major == prefix)
        } else {
            pattern == content_type
        }
    })
}
