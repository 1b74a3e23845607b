//! Entity to model mappers
//!
//! Conversions between SeaORM entities, contract models and the canonical
//! payload rows the normalizer consumes.

use super::entity::{self, field_definition};
use crate::contract::{FieldDefinition, ValueSlots};
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};

// ===== Definition Conversions =====

/// Canonical payload row for a definition
pub fn definition_row(definition: &FieldDefinition) -> JsonValue {
    json!({
        "definition_id": definition.definition_id,
        "entity_type": definition.entity_type,
        "key": definition.key,
        "label": definition.label,
        "field_type": definition.kind.as_str(),
        "options": definition.options.raw,
        "required": definition.required,
        "visible": definition.visible,
        "sort_order": definition.sort_order,
        "metadata": definition.metadata,
    })
}

impl From<field_definition::Model> for JsonValue {
    fn from(model: field_definition::Model) -> Self {
        json!({
            "definition_id": model.definition_id,
            "entity_type": model.entity_type,
            "key": model.key,
            "label": model.label,
            "field_type": model.field_type,
            "options": model.options,
            "required": model.required,
            "visible": model.visible,
            "sort_order": model.sort_order,
            "metadata": model.metadata,
        })
    }
}

/// Active model for a definition, stamped with `now`
pub fn definition_active(
    definition: &FieldDefinition,
    now: DateTime<Utc>,
) -> field_definition::ActiveModel {
    use sea_orm::ActiveValue::*;

    field_definition::ActiveModel {
        definition_id: Set(definition.definition_id.clone()),
        entity_type: Set(definition.entity_type.clone()),
        key: Set(definition.key.clone()),
        label: Set(definition.label.clone()),
        field_type: Set(definition.kind.as_str().to_string()),
        options: Set(Some(definition.options.raw.clone()).filter(|o| !o.is_null())),
        required: Set(definition.required),
        visible: Set(definition.visible),
        sort_order: Set(definition.sort_order),
        metadata: Set(Some(JsonValue::Object(definition.metadata.clone()))),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

// ===== Value Conversions =====

/// Payload row for a stored value, keyed by definition id
pub fn value_row(definition_id: &str, slots: &ValueSlots) -> JsonValue {
    json!({
        "definition_id": definition_id,
        "value_text": slots.value_text,
        "value_number": slots.value_number,
        "value_boolean": slots.value_boolean,
        "value_json": slots.value_json,
    })
}

impl From<&entity::Model> for ValueSlots {
    fn from(model: &entity::Model) -> Self {
        Self {
            value_text: model.value_text.clone(),
            value_number: model.value_number,
            value_boolean: model.value_boolean,
            value_json: model.value_json.clone(),
        }
    }
}

/// Active model for an upsert, stamped with `now`
pub fn value_active(
    entity_instance_id: &str,
    definition_id: &str,
    slots: &ValueSlots,
    now: DateTime<Utc>,
) -> entity::ActiveModel {
    use sea_orm::ActiveValue::*;

    entity::ActiveModel {
        entity_instance_id: Set(entity_instance_id.to_string()),
        definition_id: Set(definition_id.to_string()),
        value_text: Set(slots.value_text.clone()),
        value_number: Set(slots.value_number),
        value_boolean: Set(slots.value_boolean),
        value_json: Set(slots.value_json.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{FieldKind, FieldOptions};
    use crate::domain::normalizer;

    #[test]
    fn test_definition_row_normalizes_back() {
        let definition = FieldDefinition::new("d1", "lead", "stage", "Stage", FieldKind::Select)
            .required(true)
            .sort_order(3)
            .with_options(FieldOptions::with_choices(["new", "won"]));

        let payload = json!({ "defs": [definition_row(&definition)], "values": [] });
        let entries = normalizer::normalize_entries(&payload, "lead");

        assert_eq!(entries.len(), 1);
        let loaded = &entries[0].definition;
        assert_eq!(loaded.key, "stage");
        assert_eq!(loaded.kind, FieldKind::Select);
        assert!(loaded.required);
        assert_eq!(loaded.sort_order, 3);
        assert!(loaded.options.has_choice("won"));
    }

    #[test]
    fn test_value_row_carries_all_slots() {
        let slots = ValueSlots {
            value_number: Some(5000.0),
            ..Default::default()
        };
        let row = value_row("d1", &slots);
        let object = row.as_object().unwrap();
        assert_eq!(object.len(), 5);
        assert!(object["value_text"].is_null());
        assert_eq!(object["value_number"], json!(5000.0));
    }
}
