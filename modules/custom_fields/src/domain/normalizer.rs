//! Response normalizer
//!
//! Definition sources answer in several historical shapes. Each accepted shape
//! has its own adapter; the first adapter that recognizes the payload wins.
//! Adapters produce raw rows, rows are canonicalized (aliases folded, kind
//! validated, options decoded, value slots nested under `value`) and only then
//! turned into definitions and values.
//!
//! Normalization never fails. Malformed pieces degrade: unknown kinds become
//! `text`, undecodable options stay as the raw string, rows without an id or
//! key are dropped.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value as JsonValue};

use crate::contract::{
    FieldDefinition, FieldEntry, FieldKind, FieldOptions, KindFamily, Value, ValueSlots,
    DEFAULT_SORT_ORDER,
};

/// A payload row: definition fields plus an optional `value`
pub type Row = Map<String, JsonValue>;

/// Shape adapter: recognizes a payload and extracts its rows
pub type Adapter = fn(&JsonValue) -> Option<Vec<Row>>;

/// Accepted payload shapes, in the order they are tried
pub const ADAPTERS: &[(&str, Adapter)] = &[
    ("array", from_array as Adapter),
    ("items", from_items as Adapter),
    ("data.items", from_data_items as Adapter),
    ("results", from_results as Adapter),
    ("rows", from_rows as Adapter),
    ("defs+values", from_split as Adapter),
];

const ID_KEYS: [&str; 3] = ["definition_id", "definitionId", "id"];
const KIND_KEYS: [&str; 3] = ["field_type", "type", "input_type"];
const OPTIONS_KEYS: [&str; 3] = ["options", "choices", "select_options"];

const TEXT_KEYS: [&str; 2] = ["value_text", "valueText"];
const NUMBER_KEYS: [&str; 2] = ["value_number", "valueNumber"];
const BOOLEAN_KEYS: [&str; 2] = ["value_boolean", "valueBoolean"];
const JSON_KEYS: [&str; 2] = ["value_json", "valueJson"];

// ===== Adapters =====

fn rows_of(list: &JsonValue) -> Option<Vec<Row>> {
    list.as_array().map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect()
    })
}

/// `[...]`
pub fn from_array(payload: &JsonValue) -> Option<Vec<Row>> {
    rows_of(payload)
}

/// `{items: [...]}`
pub fn from_items(payload: &JsonValue) -> Option<Vec<Row>> {
    payload.get("items").and_then(rows_of)
}

/// `{data: {items: [...]}}`
pub fn from_data_items(payload: &JsonValue) -> Option<Vec<Row>> {
    payload
        .get("data")
        .and_then(|data| data.get("items"))
        .and_then(rows_of)
}

/// `{results: [...]}`
pub fn from_results(payload: &JsonValue) -> Option<Vec<Row>> {
    payload.get("results").and_then(rows_of)
}

/// `{rows: [...]}`
pub fn from_rows(payload: &JsonValue) -> Option<Vec<Row>> {
    payload.get("rows").and_then(rows_of)
}

/// `{defs: [...], values: [...]}`, values joined to defs by definition id
pub fn from_split(payload: &JsonValue) -> Option<Vec<Row>> {
    let defs = payload.get("defs").and_then(rows_of)?;
    let values = payload
        .get("values")
        .and_then(rows_of)
        .unwrap_or_default();

    let mut by_definition: HashMap<String, Row> = HashMap::new();
    for value_row in values {
        let Some(id) = first_id(&value_row) else {
            continue;
        };
        match by_definition.get_mut(&id) {
            Some(kept) => {
                tracing::warn!(definition_id = %id, "duplicate stored value for custom field");
                if value_precedence(&value_row) > value_precedence(kept) {
                    *kept = value_row;
                }
            }
            None => {
                by_definition.insert(id, value_row);
            }
        }
    }

    let rows: Vec<Row> = defs
        .into_iter()
        .map(|mut def| {
            let kind = row_kind(&def);
            if let Some(value_row) = first_id(&def).and_then(|id| by_definition.remove(&id)) {
                if let Some(slots) = extract_slots(&value_row, kind) {
                    def.insert("value".to_string(), slots_to_json(&slots));
                }
            }
            def
        })
        .collect();

    for definition_id in by_definition.keys() {
        tracing::debug!(definition_id = %definition_id, "ignoring orphaned custom field value");
    }

    Some(rows)
}

/// Order among value rows sharing a definition id, independent of payload
/// order: latest `updated_at` first, then the serialized slots.
fn value_precedence(row: &Row) -> (String, String) {
    let updated_at = str_at(row, &["updated_at", "updatedAt"]).unwrap_or_default();
    let slots = extract_slots(row, FieldKind::Text)
        .map(|slots| slots_to_json(&slots).to_string())
        .unwrap_or_default();
    (updated_at, slots)
}

fn row_kind(row: &Row) -> FieldKind {
    first_present(row, &KIND_KEYS)
        .and_then(|k| k.as_str())
        .map(FieldKind::from_tag)
        .unwrap_or(FieldKind::Text)
}

// ===== Canonicalization =====

/// Extract and canonicalize rows from any accepted payload shape.
///
/// Pure and idempotent: feeding the result back in as an array yields the
/// same rows.
pub fn normalize(payload: &JsonValue) -> Vec<Row> {
    let Some((shape, rows)) = ADAPTERS
        .iter()
        .find_map(|(name, adapter)| adapter(payload).map(|rows| (*name, rows)))
    else {
        tracing::debug!("custom field payload shape not recognized");
        return Vec::new();
    };

    tracing::trace!(shape, rows = rows.len(), "normalizing custom field rows");
    rows.into_iter().map(canonicalize_row).collect()
}

/// Fold aliases into canonical keys
pub fn canonicalize_row(mut row: Row) -> Row {
    if let Some(id) = first_id(&row) {
        row.insert("definition_id".to_string(), JsonValue::String(id));
    }
    row.remove("definitionId");

    let kind = row_kind(&row);
    row.remove("type");
    row.remove("input_type");
    row.insert(
        "field_type".to_string(),
        JsonValue::String(kind.as_str().to_string()),
    );

    if let Some(options) = first_present(&row, &OPTIONS_KEYS).map(decode_embedded_json) {
        row.insert("options".to_string(), options);
    }
    row.remove("choices");
    row.remove("select_options");

    if let Some(metadata) = row.get("metadata").map(decode_embedded_json) {
        row.insert("metadata".to_string(), metadata);
    }

    let slots = extract_slots(&row, kind);
    for key in TEXT_KEYS
        .iter()
        .chain(NUMBER_KEYS.iter())
        .chain(BOOLEAN_KEYS.iter())
        .chain(JSON_KEYS.iter())
    {
        row.remove(*key);
    }
    match slots {
        Some(slots) => {
            row.insert("value".to_string(), slots_to_json(&slots));
        }
        None => {
            row.remove("value");
        }
    }

    row
}

/// Parse a JSON-encoded string into an array or object. Anything else,
/// including strings that fail to parse, is returned unchanged.
pub fn decode_embedded_json(value: &JsonValue) -> JsonValue {
    if let JsonValue::String(text) = value {
        match serde_json::from_str::<JsonValue>(text) {
            Ok(parsed @ (JsonValue::Array(_) | JsonValue::Object(_))) => return parsed,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "keeping undecodable embedded json as raw string");
            }
        }
    }
    value.clone()
}

fn first_present<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .find(|v| !v.is_null())
}

fn first_id(row: &Row) -> Option<String> {
    first_present(row, &ID_KEYS).and_then(|id| match id {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn has_slot_keys(map: &Row) -> bool {
    TEXT_KEYS
        .iter()
        .chain(NUMBER_KEYS.iter())
        .chain(BOOLEAN_KEYS.iter())
        .chain(JSON_KEYS.iter())
        .any(|k| map.contains_key(*k))
}

/// Read value slots from a row, either flattened or nested under `value`.
/// A legacy scalar `value` is mapped onto the slot `kind` stores.
fn extract_slots(row: &Row, kind: FieldKind) -> Option<ValueSlots> {
    match row.get("value") {
        Some(JsonValue::Object(nested)) if has_slot_keys(nested) => Some(read_slots(nested)),
        Some(JsonValue::Null) | None => {
            if has_slot_keys(row) {
                Some(read_slots(row))
            } else {
                None
            }
        }
        Some(legacy) => Some(legacy_slots(legacy, kind)),
    }
}

fn read_slots(map: &Row) -> ValueSlots {
    ValueSlots {
        value_text: first_present(map, &TEXT_KEYS).and_then(|v| match v {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }),
        value_number: first_present(map, &NUMBER_KEYS).and_then(json_number),
        value_boolean: first_present(map, &BOOLEAN_KEYS).and_then(json_bool),
        value_json: first_present(map, &JSON_KEYS).map(decode_embedded_json),
    }
}

fn legacy_slots(value: &JsonValue, kind: FieldKind) -> ValueSlots {
    let mut slots = ValueSlots::default();
    match kind.family() {
        KindFamily::Numeric => slots.value_number = json_number(value),
        KindFamily::Boolean => slots.value_boolean = json_bool(value),
        KindFamily::List | KindFamily::Structured => match decode_embedded_json(value) {
            JsonValue::Null => {}
            json @ (JsonValue::Array(_) | JsonValue::Object(_)) => slots.value_json = Some(json),
            scalar if kind.family() == KindFamily::Structured => slots.value_json = Some(scalar),
            _ => {}
        },
        KindFamily::Text => {
            slots.value_text = match value {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Number(n) => Some(n.to_string()),
                JsonValue::Bool(b) => Some(b.to_string()),
                _ => None,
            }
        }
        KindFamily::Upload => {}
    }
    if !slots.is_empty() {
        return slots;
    }

    match value {
        JsonValue::String(s) => slots.value_text = Some(s.clone()),
        JsonValue::Number(_) => slots.value_number = json_number(value),
        JsonValue::Bool(b) => slots.value_boolean = Some(*b),
        JsonValue::Array(_) | JsonValue::Object(_) => slots.value_json = Some(value.clone()),
        JsonValue::Null => {}
    }
    slots
}

fn slots_to_json(slots: &ValueSlots) -> JsonValue {
    let mut map = Map::new();
    map.insert(
        "value_text".to_string(),
        slots
            .value_text
            .clone()
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null),
    );
    map.insert(
        "value_number".to_string(),
        slots
            .value_number
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
    );
    map.insert(
        "value_boolean".to_string(),
        slots
            .value_boolean
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null),
    );
    map.insert(
        "value_json".to_string(),
        slots.value_json.clone().unwrap_or(JsonValue::Null),
    );
    JsonValue::Object(map)
}

fn json_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn json_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => n.as_i64().map(|i| i != 0),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn json_int(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn str_at(row: &Row, keys: &[&str]) -> Option<String> {
    first_present(row, keys)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ===== Definitions and values =====

/// Build a definition from a canonical row. Returns `None` when the row has
/// no definition id or no key.
pub fn definition_from_row(row: &Row, fallback_entity_type: &str) -> Option<FieldDefinition> {
    let definition_id = str_at(row, &["definition_id"])?;
    let key = str_at(row, &["key", "name"])?;
    let label = str_at(row, &["label"]).unwrap_or_else(|| key.clone());
    let entity_type = str_at(row, &["entity_type", "entityType"])
        .unwrap_or_else(|| fallback_entity_type.to_string());
    let kind = row
        .get("field_type")
        .and_then(|k| k.as_str())
        .map(FieldKind::from_tag)
        .unwrap_or(FieldKind::Text);
    let options = FieldOptions::parse(kind, row.get("options").unwrap_or(&JsonValue::Null));

    Some(FieldDefinition {
        definition_id,
        entity_type,
        key,
        label,
        kind,
        options,
        required: first_present(row, &["required", "is_required"])
            .and_then(json_bool)
            .unwrap_or(false),
        visible: first_present(row, &["visible", "is_visible"])
            .and_then(json_bool)
            .unwrap_or(true),
        sort_order: first_present(row, &["sort_order", "sortOrder", "order"])
            .and_then(json_int)
            .unwrap_or(DEFAULT_SORT_ORDER),
        metadata: row
            .get("metadata")
            .and_then(|m| m.as_object())
            .cloned()
            .unwrap_or_default(),
    })
}

/// Turn canonical rows into display-ordered entries.
///
/// Stored slots are decoded against each definition's kind; definitions
/// without a stored value get their kind default. When two rows share an
/// `(entity_type, key)` the first in display order wins.
pub fn into_entries(rows: &[Row], fallback_entity_type: &str) -> Vec<FieldEntry> {
    let mut entries: Vec<FieldEntry> = rows
        .iter()
        .filter_map(|row| {
            let Some(definition) = definition_from_row(row, fallback_entity_type) else {
                tracing::debug!("dropping custom field row without definition id or key");
                return None;
            };
            let value = row
                .get("value")
                .and_then(|v| serde_json::from_value::<ValueSlots>(v.clone()).ok())
                .map(|slots| Value::from_slots(definition.kind, &slots))
                .unwrap_or_else(|| Value::default_for(definition.kind));
            Some(FieldEntry::new(definition, value))
        })
        .collect();

    entries.sort_by(|a, b| {
        a.definition
            .display_cmp(&b.definition)
            .then_with(|| a.definition.key.cmp(&b.definition.key))
            .then_with(|| a.definition.definition_id.cmp(&b.definition.definition_id))
    });

    let mut seen = HashSet::new();
    entries.retain(|entry| {
        let unique = seen.insert((
            entry.definition.entity_type.clone(),
            entry.definition.key.clone(),
        ));
        if !unique {
            tracing::warn!(
                entity_type = %entry.definition.entity_type,
                key = %entry.definition.key,
                definition_id = %entry.definition.definition_id,
                "dropping duplicate custom field definition"
            );
        }
        unique
    });

    entries
}

/// Normalize a payload straight into display-ordered entries
pub fn normalize_entries(payload: &JsonValue, fallback_entity_type: &str) -> Vec<FieldEntry> {
    into_entries(&normalize(payload), fallback_entity_type)
}
