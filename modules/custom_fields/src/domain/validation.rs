//! Pre-submit validation of custom field values
//!
//! Runs locally before any storage call. Fields are checked in display order
//! and the first failure is reported by label. Hidden fields are never checked.

use crate::contract::{
    CustomFieldsError, FieldDefinition, FieldEntry, FieldKind, KindFamily, Value,
};
use jsonschema::Validator;
use serde_json::Value as JsonValue;

/// Whether a value counts as unanswered for its kind.
///
/// Works on the flattened slots so that a value set through a `ui` override
/// is judged by the slot the kind actually stores.
pub fn is_empty(kind: FieldKind, value: &Value) -> bool {
    let slots = value.to_slots();
    match kind.family() {
        KindFamily::Numeric => slots.value_number.is_none(),
        // `false` is an answer
        KindFamily::Boolean => slots.value_boolean.is_none(),
        KindFamily::List => !matches!(&slots.value_json, Some(JsonValue::Array(items)) if !items.is_empty()),
        KindFamily::Structured => slots.value_json.is_none(),
        KindFamily::Upload => {
            slots.value_text.filter(|t| !t.is_empty()).is_none() && slots.value_json.is_none()
        }
        KindFamily::Text => slots
            .value_text
            .map(|t| t.trim().is_empty())
            .unwrap_or(true),
    }
}

/// Validate every visible field, stopping at the first failure.
///
/// With `strict` set, non-empty values are also checked against their
/// options (bounds, choices, formats, json schema).
pub fn validate_entries(entries: &[FieldEntry], strict: bool) -> Result<(), CustomFieldsError> {
    let mut ordered: Vec<&FieldEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| a.definition.display_cmp(&b.definition));

    for entry in ordered {
        validate_entry(entry, strict)?;
    }
    Ok(())
}

/// Validate a single field
pub fn validate_entry(entry: &FieldEntry, strict: bool) -> Result<(), CustomFieldsError> {
    let def = &entry.definition;
    if !def.visible {
        return Ok(());
    }

    if is_empty(def.kind, &entry.value) {
        if def.required {
            return Err(CustomFieldsError::required(&def.key, &def.label));
        }
        return Ok(());
    }

    if strict {
        check_value(def, &entry.value)
            .map_err(|reason| CustomFieldsError::invalid(&def.key, &def.label, reason))?;
    }
    Ok(())
}

/// Check a non-empty value against the definition's options
pub fn check_value(def: &FieldDefinition, value: &Value) -> Result<(), String> {
    let options = &def.options;
    let slots = value.to_slots();

    match def.kind {
        FieldKind::Number | FieldKind::Currency | FieldKind::Percent | FieldKind::Rating => {
            let Some(number) = slots.value_number else {
                return Ok(());
            };
            if let Some(min) = options.min {
                if number < min {
                    return Err(format!("must be at least {}", min));
                }
            }
            if let Some(max) = options.max {
                if number > max {
                    return Err(format!("must be at most {}", max));
                }
            }
            if def.kind == FieldKind::Rating {
                let ceiling = f64::from(options.rating_ceiling());
                if number < 1.0 || number > ceiling {
                    return Err(format!("must be between 1 and {}", ceiling));
                }
            }
        }
        FieldKind::Select => {
            if let Some(text) = slots.value_text.as_deref() {
                if !options.choices.is_empty() && !options.has_choice(text) {
                    return Err(format!("'{}' is not one of the allowed choices", text));
                }
            }
        }
        FieldKind::Multiselect => {
            if let Some(JsonValue::Array(items)) = &slots.value_json {
                if !options.choices.is_empty() {
                    for item in items {
                        let picked = item.as_str().unwrap_or_default();
                        if !options.has_choice(picked) {
                            return Err(format!("'{}' is not one of the allowed choices", item));
                        }
                    }
                }
            }
        }
        FieldKind::Email => {
            if let Some(text) = slots.value_text.as_deref() {
                validate_email(text.trim())?;
            }
        }
        FieldKind::Url => {
            if let Some(text) = slots.value_text.as_deref() {
                validate_url(text.trim())?;
            }
        }
        FieldKind::Json => {
            if let (Some(schema), Some(data)) = (&options.schema, &slots.value_json) {
                validate_against_schema(data, schema)?;
            }
        }
        FieldKind::Text
        | FieldKind::Textarea
        | FieldKind::Boolean
        | FieldKind::Date
        | FieldKind::Datetime
        | FieldKind::Tags
        | FieldKind::Phone
        | FieldKind::File
        | FieldKind::Files
        | FieldKind::Image
        | FieldKind::Richtext
        | FieldKind::Address => {}
    }
    Ok(())
}

/// Exactly one `@` with non-empty local and domain parts, domain containing a dot
pub fn validate_email(email: &str) -> Result<(), String> {
    let mut parts = email.split('@');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid email address", email))
    }
}

/// Absolute http(s) URL
pub fn validate_url(text: &str) -> Result<(), String> {
    match url::Url::parse(text) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            Ok(())
        }
        _ => Err(format!("'{}' is not a valid http(s) URL", text)),
    }
}

/// Validate a json value against a JSON Schema
pub fn validate_against_schema(data: &JsonValue, schema: &JsonValue) -> Result<(), String> {
    let validator =
        Validator::new(schema).map_err(|e| format!("invalid schema configured: {}", e))?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::FieldOptions;
    use serde_json::json;

    fn def(kind: FieldKind) -> FieldDefinition {
        FieldDefinition::new("d1", "lead", kind.as_str(), kind.as_str(), kind).required(true)
    }

    /// A minimally valid answer for each kind
    fn minimal(kind: FieldKind) -> Value {
        match kind.family() {
            KindFamily::Numeric => Value::Number(if kind == FieldKind::Rating { 1.0 } else { 0.0 }),
            KindFamily::Boolean => Value::Bool(false),
            KindFamily::List => Value::Json(json!(["x"])),
            KindFamily::Structured => Value::Json(json!({})),
            KindFamily::Upload => Value::Upload {
                locator: "https://cdn/x".to_string(),
                metadata: json!({"url": "https://cdn/x", "name": "x"}),
            },
            KindFamily::Text => Value::Text(match kind {
                FieldKind::Email => "a@b.co".to_string(),
                FieldKind::Url => "https://example.com".to_string(),
                _ => "x".to_string(),
            }),
        }
    }

    #[test]
    fn test_defaults_are_empty_except_boolean() {
        for kind in FieldKind::ALL {
            let default = Value::default_for(kind);
            if kind == FieldKind::Boolean {
                assert!(!is_empty(kind, &default), "false is an answer");
            } else {
                assert!(is_empty(kind, &default), "{} default should be empty", kind);
            }
        }
    }

    #[test]
    fn test_required_default_blocks_submit() {
        for kind in FieldKind::ALL {
            if kind == FieldKind::Boolean {
                continue;
            }
            let entry = FieldEntry::with_default(def(kind));
            let err = validate_entry(&entry, true).unwrap_err();
            assert_eq!(err.to_string(), format!("{} is required", kind.as_str()));
        }
    }

    #[test]
    fn test_minimal_values_pass() {
        for kind in FieldKind::ALL {
            let entry = FieldEntry::new(def(kind), minimal(kind));
            assert!(validate_entry(&entry, true).is_ok(), "{} minimal value rejected", kind);
        }
    }

    #[test]
    fn test_hidden_fields_are_exempt() {
        for kind in FieldKind::ALL {
            let entry = FieldEntry::new(def(kind).visible(false), Value::Empty);
            assert!(validate_entry(&entry, true).is_ok());
        }
    }

    #[test]
    fn test_whitespace_text_is_empty() {
        assert!(is_empty(FieldKind::Text, &Value::Text("   ".to_string())));
        assert!(!is_empty(FieldKind::Text, &Value::Text(" a ".to_string())));
    }

    #[test]
    fn test_empty_list_is_empty() {
        assert!(is_empty(FieldKind::Tags, &Value::Json(json!([]))));
        assert!(is_empty(FieldKind::Multiselect, &Value::Json(json!("x"))));
    }

    #[test]
    fn test_upload_with_only_locator_is_answered() {
        assert!(!is_empty(FieldKind::File, &Value::Text("https://cdn/a".to_string())));
        assert!(is_empty(FieldKind::File, &Value::Text(String::new())));
    }

    #[test]
    fn test_short_circuits_in_display_order() {
        let late = FieldEntry::with_default(
            FieldDefinition::new("1", "lead", "late", "Late", FieldKind::Text)
                .required(true)
                .sort_order(50),
        );
        let early = FieldEntry::with_default(
            FieldDefinition::new("2", "lead", "early", "Early", FieldKind::Number)
                .required(true)
                .sort_order(10),
        );
        let err = validate_entries(&[late, early], true).unwrap_err();
        assert!(err.to_string().contains("Early"));
    }

    #[test]
    fn test_numeric_bounds() {
        let options = FieldOptions::parse(FieldKind::Percent, &json!({"min": 0, "max": 100}));
        let d = def(FieldKind::Percent).with_options(options);
        assert!(check_value(&d, &Value::Number(50.0)).is_ok());
        assert!(check_value(&d, &Value::Number(101.0)).is_err());
        assert!(check_value(&d, &Value::Number(-1.0)).is_err());
    }

    #[test]
    fn test_rating_ceiling() {
        let d = def(FieldKind::Rating);
        assert!(check_value(&d, &Value::Number(5.0)).is_ok());
        assert!(check_value(&d, &Value::Number(6.0)).is_err());
        assert!(check_value(&d, &Value::Number(0.0)).is_err());
    }

    #[test]
    fn test_select_choices() {
        let d = def(FieldKind::Select).with_options(FieldOptions::with_choices(["hot", "cold"]));
        assert!(check_value(&d, &Value::Text("hot".to_string())).is_ok());
        assert!(check_value(&d, &Value::Text("warm".to_string())).is_err());

        let d = def(FieldKind::Multiselect).with_options(FieldOptions::with_choices(["a", "b"]));
        assert!(check_value(&d, &Value::Json(json!(["a", "b"]))).is_ok());
        assert!(check_value(&d, &Value::Json(json!(["a", "z"]))).is_err());
    }

    #[test]
    fn test_select_without_choices_accepts_anything() {
        let d = def(FieldKind::Select);
        assert!(check_value(&d, &Value::Text("anything".to_string())).is_ok());
    }

    #[test]
    fn test_email_format() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("jane@@example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("jane@localhost").is_err());
        assert!(validate_email("ja ne@example.com").is_err());
    }

    #[test]
    fn test_url_format() {
        assert!(validate_url("https://example.com/a?b=c").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("example.com").is_err());
    }

    #[test]
    fn test_json_schema() {
        let schema = json!({
            "type": "object",
            "properties": { "age": { "type": "number", "minimum": 0 } },
            "required": ["age"]
        });
        let options = FieldOptions::parse(FieldKind::Json, &json!({ "schema": schema }));
        let d = def(FieldKind::Json).with_options(options);
        assert!(check_value(&d, &Value::Json(json!({"age": 3}))).is_ok());
        assert!(check_value(&d, &Value::Json(json!({"age": -1}))).is_err());
        assert!(check_value(&d, &Value::Json(json!({}))).is_err());
    }

    #[test]
    fn test_lenient_mode_only_checks_required() {
        let d = def(FieldKind::Email);
        let entry = FieldEntry::new(d, Value::Text("not-an-email".to_string()));
        assert!(validate_entry(&entry, false).is_ok());
        assert!(validate_entry(&entry, true).is_err());
    }
}
