//! Render dispatch
//!
//! Every kind maps to a fixed control behavior: the slots it reads for
//! display, the slots it writes on change and the coercion applied to raw
//! input. A `metadata.ui` override picks a different control but never
//! changes where the value is stored: coerced input is always reshaped into
//! the definition kind's own slot.

use serde_json::Value as JsonValue;

use crate::contract::{
    model::upload_locator, ControlInput, FieldDefinition, FieldKind, KindFamily, Slot, Value,
};

/// How raw control input becomes a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Store the string as typed
    Verbatim,
    /// Parse a number; empty input clears the field
    Numeric,
    /// Checkbox state or a boolean-ish string
    Boolean,
    /// Split on commas, trim, drop empties and duplicates
    CommaSplit,
    /// Collect every selected option value into an array
    MultiSelect,
    /// Parse json, keeping the raw string when it does not parse
    JsonOrString,
    /// Structured object input (address widgets)
    Structured,
    /// Out-of-process upload; direct input only accepts a locator
    Upload,
}

/// Control behavior for one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSpec {
    /// Control selected for rendering
    pub control: FieldKind,
    /// Slots read to display the current value
    pub reads: &'static [Slot],
    /// Slots written on change
    pub writes: &'static [Slot],
    pub coercion: Coercion,
}

/// The fixed dispatch table
pub fn control_spec(kind: FieldKind) -> ControlSpec {
    const TEXT: &[Slot] = &[Slot::Text];
    const NUMBER: &[Slot] = &[Slot::Number];
    const BOOLEAN: &[Slot] = &[Slot::Boolean];
    const JSON: &[Slot] = &[Slot::Json];
    const UPLOAD: &[Slot] = &[Slot::Text, Slot::Json];

    let (reads, writes, coercion) = match kind {
        FieldKind::Text
        | FieldKind::Textarea
        | FieldKind::Date
        | FieldKind::Datetime
        | FieldKind::Select
        | FieldKind::Email
        | FieldKind::Phone
        | FieldKind::Url
        | FieldKind::Richtext => (TEXT, TEXT, Coercion::Verbatim),
        FieldKind::Number | FieldKind::Currency | FieldKind::Percent | FieldKind::Rating => {
            (NUMBER, NUMBER, Coercion::Numeric)
        }
        FieldKind::Boolean => (BOOLEAN, BOOLEAN, Coercion::Boolean),
        FieldKind::Multiselect => (JSON, JSON, Coercion::MultiSelect),
        FieldKind::Tags => (JSON, JSON, Coercion::CommaSplit),
        FieldKind::Json => (JSON, JSON, Coercion::JsonOrString),
        FieldKind::Address => (JSON, JSON, Coercion::Structured),
        FieldKind::File | FieldKind::Files | FieldKind::Image => (UPLOAD, UPLOAD, Coercion::Upload),
    };

    ControlSpec {
        control: kind,
        reads,
        writes,
        coercion,
    }
}

/// Control for a definition: `metadata.ui` when it names a known kind, else the kind
pub fn control_for(def: &FieldDefinition) -> ControlSpec {
    control_spec(def.ui_override().unwrap_or(def.kind))
}

/// Input that could not be coerced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionError {
    pub input: String,
}

impl CoercionError {
    fn of(input: &ControlInput) -> Self {
        let input = match input {
            ControlInput::Text(text) => text.clone(),
            ControlInput::Bool(flag) => flag.to_string(),
            ControlInput::Selected(items) => items.join(","),
            ControlInput::Json(json) => json.to_string(),
        };
        Self { input }
    }
}

/// Coerce control input into the value the definition stores
pub fn apply_input(def: &FieldDefinition, input: &ControlInput) -> Result<Value, CoercionError> {
    let spec = control_for(def);
    let coerced = coerce(spec.coercion, input).ok_or_else(|| CoercionError::of(input))?;
    reshape(def.kind, coerced).ok_or_else(|| CoercionError::of(input))
}

/// Display form of the current value, read from the control's slots
pub fn display_value(def: &FieldDefinition, value: &Value) -> ControlInput {
    let spec = control_for(def);
    let slots = value.to_slots();
    match spec.coercion {
        Coercion::Numeric => ControlInput::Text(
            slots
                .value_number
                .map(format_number)
                .or(slots.value_text)
                .unwrap_or_default(),
        ),
        Coercion::Boolean => ControlInput::Bool(slots.value_boolean.unwrap_or(false)),
        Coercion::MultiSelect => ControlInput::Selected(string_items(slots.value_json.as_ref())),
        Coercion::CommaSplit => {
            ControlInput::Text(string_items(slots.value_json.as_ref()).join(", "))
        }
        Coercion::JsonOrString => ControlInput::Text(match slots.value_json {
            Some(JsonValue::String(text)) => text,
            Some(json) => serde_json::to_string_pretty(&json).unwrap_or_default(),
            None => slots.value_text.unwrap_or_default(),
        }),
        Coercion::Structured => ControlInput::Json(slots.value_json.unwrap_or(JsonValue::Null)),
        Coercion::Upload => ControlInput::Text(
            slots
                .value_text
                .or_else(|| slots.value_json.as_ref().and_then(upload_locator))
                .unwrap_or_default(),
        ),
        Coercion::Verbatim => ControlInput::Text(match value {
            Value::Text(text) => text.clone(),
            Value::Number(number) => format_number(*number),
            Value::Bool(flag) => flag.to_string(),
            Value::Json(json) => json_to_text(json),
            Value::Upload { locator, .. } => locator.clone(),
            Value::Empty => String::new(),
        }),
    }
}

fn coerce(coercion: Coercion, input: &ControlInput) -> Option<Value> {
    match coercion {
        Coercion::Verbatim => Some(match input {
            ControlInput::Text(text) => Value::Text(text.clone()),
            ControlInput::Bool(flag) => Value::Text(flag.to_string()),
            ControlInput::Selected(items) => Value::Text(items.first().cloned().unwrap_or_default()),
            ControlInput::Json(json) => Value::Text(json_to_text(json)),
        }),
        Coercion::Numeric => match input {
            ControlInput::Text(text) => parse_number(text),
            ControlInput::Json(JsonValue::Number(n)) => n.as_f64().map(Value::Number),
            ControlInput::Json(JsonValue::Null) => Some(Value::Empty),
            _ => None,
        },
        Coercion::Boolean => match input {
            ControlInput::Bool(flag) => Some(Value::Bool(*flag)),
            ControlInput::Text(text) => parse_bool(text).map(Value::Bool),
            ControlInput::Json(JsonValue::Bool(flag)) => Some(Value::Bool(*flag)),
            ControlInput::Json(JsonValue::Number(n)) => n.as_i64().map(|i| Value::Bool(i != 0)),
            _ => None,
        },
        Coercion::CommaSplit => match input {
            ControlInput::Text(text) => Some(string_list(text.split(','))),
            ControlInput::Selected(items) => Some(string_list(items.iter().map(String::as_str))),
            ControlInput::Json(json @ JsonValue::Array(_)) => Some(Value::Json(JsonValue::Array(
                string_items(Some(json)).into_iter().map(JsonValue::String).collect(),
            ))),
            _ => None,
        },
        Coercion::MultiSelect => match input {
            ControlInput::Selected(items) => Some(string_list(items.iter().map(String::as_str))),
            ControlInput::Text(text) if text.trim().is_empty() => {
                Some(Value::Json(JsonValue::Array(Vec::new())))
            }
            ControlInput::Text(text) => Some(string_list(std::iter::once(text.as_str()))),
            ControlInput::Json(json @ JsonValue::Array(_)) => Some(Value::Json(JsonValue::Array(
                string_items(Some(json)).into_iter().map(JsonValue::String).collect(),
            ))),
            _ => None,
        },
        Coercion::JsonOrString => match input {
            ControlInput::Text(text) if text.trim().is_empty() => Some(Value::Empty),
            ControlInput::Text(text) => Some(Value::json(
                serde_json::from_str::<JsonValue>(text)
                    .unwrap_or_else(|_| JsonValue::String(text.clone())),
            )),
            ControlInput::Json(json) => Some(Value::json(json.clone())),
            ControlInput::Bool(flag) => Some(Value::Json(JsonValue::Bool(*flag))),
            ControlInput::Selected(items) => Some(Value::Json(JsonValue::Array(
                items.iter().cloned().map(JsonValue::String).collect(),
            ))),
        },
        Coercion::Structured => match input {
            ControlInput::Json(json) => Some(Value::json(json.clone())),
            ControlInput::Text(text) if text.trim().is_empty() => Some(Value::Empty),
            ControlInput::Text(text) => Some(Value::Json(
                serde_json::from_str::<JsonValue>(text)
                    .ok()
                    .filter(JsonValue::is_object)
                    .unwrap_or_else(|| serde_json::json!({ "line1": text.trim() })),
            )),
            _ => None,
        },
        Coercion::Upload => match input {
            ControlInput::Text(text) if text.trim().is_empty() => Some(Value::Empty),
            ControlInput::Text(text) => Some(Value::Upload {
                locator: text.trim().to_string(),
                metadata: serde_json::json!({ "url": text.trim() }),
            }),
            ControlInput::Json(json) => {
                upload_locator(json).map(|locator| Value::Upload {
                    locator,
                    metadata: json.clone(),
                })
            }
            _ => None,
        },
    }
}

/// Fit a value produced by a definition's control into the slot its kind
/// stores. `None` when the kind has no slot for it.
pub fn fit_to_kind(def: &FieldDefinition, value: Value) -> Option<Value> {
    reshape(def.kind, value)
}

/// Fit a coerced value into the slot contract of `kind`
fn reshape(kind: FieldKind, value: Value) -> Option<Value> {
    if value.is_absent() {
        return Some(Value::Empty);
    }

    match kind.family() {
        KindFamily::Numeric => match value {
            Value::Number(n) => Some(Value::Number(n)),
            Value::Text(text) => parse_number(&text),
            Value::Json(JsonValue::Number(n)) => n.as_f64().map(Value::Number),
            _ => None,
        },
        KindFamily::Boolean => match value {
            Value::Bool(flag) => Some(Value::Bool(flag)),
            Value::Text(text) => parse_bool(&text).map(Value::Bool),
            Value::Number(n) => Some(Value::Bool(n != 0.0)),
            Value::Json(JsonValue::Bool(flag)) => Some(Value::Bool(flag)),
            _ => None,
        },
        KindFamily::List => match value {
            Value::Json(json @ JsonValue::Array(_)) => Some(Value::Json(JsonValue::Array(
                string_items(Some(&json)).into_iter().map(JsonValue::String).collect(),
            ))),
            Value::Text(text) => Some(string_list(text.split(','))),
            _ => None,
        },
        KindFamily::Structured => match value {
            Value::Json(json) => Some(Value::json(json)),
            Value::Text(text) => Some(Value::Json(JsonValue::String(text))),
            Value::Number(n) => serde_json::Number::from_f64(n).map(|n| Value::Json(JsonValue::Number(n))),
            Value::Bool(flag) => Some(Value::Json(JsonValue::Bool(flag))),
            Value::Upload { metadata, .. } => Some(Value::json(metadata)),
            Value::Empty => Some(Value::Empty),
        },
        KindFamily::Upload => match value {
            upload @ Value::Upload { .. } => Some(upload),
            Value::Text(text) if text.trim().is_empty() => Some(Value::Empty),
            Value::Text(text) => Some(Value::Upload {
                metadata: serde_json::json!({ "url": text }),
                locator: text,
            }),
            _ => None,
        },
        KindFamily::Text => Some(match value {
            Value::Text(text) => Value::Text(text),
            Value::Number(n) => Value::Text(format_number(n)),
            Value::Bool(flag) => Value::Text(flag.to_string()),
            Value::Json(json) => Value::Text(json_to_text(&json)),
            Value::Upload { locator, .. } => Value::Text(locator),
            Value::Empty => Value::Empty,
        }),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(Value::Empty);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(Value::Number)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" | "" => Some(false),
        _ => None,
    }
}

fn string_list<'a>(parts: impl Iterator<Item = &'a str>) -> Value {
    let mut items: Vec<String> = Vec::new();
    for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
        if !items.iter().any(|existing| existing == part) {
            items.push(part.to_string());
        }
    }
    Value::Json(JsonValue::Array(
        items.into_iter().map(JsonValue::String).collect(),
    ))
}

fn string_items(json: Option<&JsonValue>) -> Vec<String> {
    match json {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Number(n) => Some(n.to_string()),
                JsonValue::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn json_to_text(json: &JsonValue) -> String {
    match json {
        JsonValue::String(text) => text.clone(),
        JsonValue::Array(_) => string_items(Some(json)).join(", "),
        other => other.to_string(),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(kind: FieldKind) -> FieldDefinition {
        FieldDefinition::new("d1", "lead", "field", "Field", kind)
    }

    fn text(s: &str) -> ControlInput {
        ControlInput::Text(s.to_string())
    }

    #[test]
    fn test_table_is_consistent_with_slot_mapping() {
        for kind in FieldKind::ALL {
            let spec = control_spec(kind);
            assert!(spec.writes.contains(&kind.slot()), "{} does not write its slot", kind);
            assert_eq!(spec.control, kind);
        }
    }

    #[test]
    fn test_upload_controls_write_two_slots() {
        let spec = control_spec(FieldKind::Image);
        assert_eq!(spec.writes, &[Slot::Text, Slot::Json]);
        assert_eq!(spec.coercion, Coercion::Upload);
    }

    #[test]
    fn test_numeric_parse() {
        let d = def(FieldKind::Currency);
        assert_eq!(apply_input(&d, &text(" 5000 ")).unwrap(), Value::Number(5000.0));
        assert_eq!(apply_input(&d, &text("")).unwrap(), Value::Empty);
        assert!(apply_input(&d, &text("lots")).is_err());
    }

    #[test]
    fn test_boolean_inputs() {
        let d = def(FieldKind::Boolean);
        assert_eq!(apply_input(&d, &ControlInput::Bool(true)).unwrap(), Value::Bool(true));
        assert_eq!(apply_input(&d, &text("on")).unwrap(), Value::Bool(true));
        assert_eq!(apply_input(&d, &text("false")).unwrap(), Value::Bool(false));
        assert!(apply_input(&d, &text("maybe")).is_err());
    }

    #[test]
    fn test_tags_comma_split() {
        let d = def(FieldKind::Tags);
        assert_eq!(
            apply_input(&d, &text("vip, hot,,vip , new")).unwrap(),
            Value::Json(json!(["vip", "hot", "new"]))
        );
    }

    #[test]
    fn test_multiselect_collects_selection() {
        let d = def(FieldKind::Multiselect);
        let input = ControlInput::Selected(vec!["a".to_string(), "c".to_string()]);
        assert_eq!(apply_input(&d, &input).unwrap(), Value::Json(json!(["a", "c"])));
    }

    #[test]
    fn test_json_parse_with_string_fallback() {
        let d = def(FieldKind::Json);
        assert_eq!(apply_input(&d, &text("{\"a\":1}")).unwrap(), Value::Json(json!({"a": 1})));
        assert_eq!(
            apply_input(&d, &text("{oops")).unwrap(),
            Value::Json(json!("{oops"))
        );
        assert_eq!(apply_input(&d, &text("null")).unwrap(), Value::Empty);
    }

    #[test]
    fn test_ui_override_keeps_storage_slot() {
        let d = def(FieldKind::Number).with_metadata("ui", json!("text"));
        assert_eq!(control_for(&d).control, FieldKind::Text);
        assert_eq!(apply_input(&d, &text("42")).unwrap(), Value::Number(42.0));
        assert!(apply_input(&d, &text("forty-two")).is_err());
    }

    #[test]
    fn test_select_rendered_as_multiselect_stores_text() {
        let d = def(FieldKind::Select).with_metadata("ui", json!("multiselect"));
        let input = ControlInput::Selected(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(apply_input(&d, &input).unwrap(), Value::Text("a, b".to_string()));
    }

    #[test]
    fn test_unknown_kind_dispatches_as_text() {
        let d = def(FieldKind::from_tag("wizzbang"));
        assert_eq!(control_for(&d), control_spec(FieldKind::Text));
        assert_eq!(apply_input(&d, &text("hi")).unwrap(), Value::Text("hi".to_string()));
    }

    #[test]
    fn test_display_values() {
        assert_eq!(
            display_value(&def(FieldKind::Number), &Value::Number(5000.0)),
            text("5000")
        );
        assert_eq!(display_value(&def(FieldKind::Number), &Value::Empty), text(""));
        assert_eq!(
            display_value(&def(FieldKind::Tags), &Value::Json(json!(["a", "b"]))),
            text("a, b")
        );
        assert_eq!(
            display_value(&def(FieldKind::Boolean), &Value::Empty),
            ControlInput::Bool(false)
        );
        let upload = Value::Upload {
            locator: "https://cdn/x".to_string(),
            metadata: json!({"url": "https://cdn/x"}),
        };
        assert_eq!(display_value(&def(FieldKind::File), &upload), text("https://cdn/x"));
    }

    #[test]
    fn test_direct_locator_input_for_upload() {
        let d = def(FieldKind::File);
        match apply_input(&d, &text("https://cdn/y.pdf")).unwrap() {
            Value::Upload { locator, metadata } => {
                assert_eq!(locator, "https://cdn/y.pdf");
                assert_eq!(metadata, json!({"url": "https://cdn/y.pdf"}));
            }
            other => panic!("Expected upload, got {:?}", other),
        }
    }
}
