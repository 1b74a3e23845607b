//! Batch persistence of field values
//!
//! A submission fans out one idempotent upsert per visible field with a
//! value and waits for all of them. Failures never cancel or roll back
//! siblings; the caller gets one outcome per command.

use futures::stream::{self, StreamExt};

use super::repository::ValueSink;
use crate::contract::{FieldForm, ValueSlots};

/// One upsert keyed by `(entity_instance_id, definition_id)`
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertCommand {
    pub entity_instance_id: String,
    pub definition_id: String,
    pub key: String,
    pub label: String,
    pub slots: ValueSlots,
}

/// Result of one upsert
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    pub command: UpsertCommand,
    /// Failure cause, if any
    pub error: Option<String>,
}

impl UpsertOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcomes of one batch, in command order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
    pub outcomes: Vec<UpsertOutcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &UpsertOutcome> {
        self.outcomes.iter().filter(|o| o.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &UpsertOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Plan the upserts for a form: visible fields whose value is not absent,
/// in display order
pub fn plan_upserts(form: &FieldForm, entity_instance_id: &str) -> Vec<UpsertCommand> {
    form.visible()
        .filter(|entry| !entry.value.is_absent())
        .map(|entry| UpsertCommand {
            entity_instance_id: entity_instance_id.to_string(),
            definition_id: entry.definition.definition_id.clone(),
            key: entry.definition.key.clone(),
            label: entry.definition.label.clone(),
            slots: entry.value.to_slots(),
        })
        .collect()
}

/// Issue every command concurrently and collect all outcomes.
///
/// `max_in_flight == 0` starts them all at once.
pub async fn execute(
    sink: &dyn ValueSink,
    commands: Vec<UpsertCommand>,
    max_in_flight: usize,
) -> BatchReport {
    let limit = if max_in_flight == 0 {
        commands.len().max(1)
    } else {
        max_in_flight
    };

    let outcomes = stream::iter(commands)
        .map(|command| async move {
            let result = sink
                .upsert(&command.entity_instance_id, &command.definition_id, &command.slots)
                .await;
            let error = match result {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(
                        entity_instance_id = %command.entity_instance_id,
                        definition_id = %command.definition_id,
                        key = %command.key,
                        error = ?e,
                        "custom field upsert failed"
                    );
                    Some(e.to_string())
                }
            };
            UpsertOutcome { command, error }
        })
        .buffered(limit)
        .collect::<Vec<_>>()
        .await;

    BatchReport { outcomes }
}
