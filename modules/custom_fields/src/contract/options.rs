//! Kind-specific options schema
//!
//! Options arrive as free-form json. Parsing never fails: anything that is not
//! understood stays available through `raw`.

use serde_json::Value as JsonValue;

use super::model::{FieldKind, KindFamily};

/// Default upper bound for `rating` fields
pub const DEFAULT_MAX_RATING: u32 = 5;

/// A selectable value for select, multiselect and tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Parsed options for a definition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldOptions {
    /// Declared choices (choice kinds)
    pub choices: Vec<Choice>,
    /// Inclusive numeric bounds (numeric kinds)
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    /// ISO currency code (currency)
    pub currency: Option<String>,
    /// Upper bound for rating (rating)
    pub max_rating: Option<u32>,
    /// Accepted MIME types or extensions (upload kinds)
    pub accept: Vec<String>,
    pub max_size_bytes: Option<u64>,
    /// Maximum number of uploads (files)
    pub max_files: Option<usize>,
    /// JSON Schema a json value must satisfy (json)
    pub schema: Option<JsonValue>,
    /// Options exactly as received, after string decoding
    pub raw: JsonValue,
}

impl FieldOptions {
    /// Interpret raw options for a kind
    pub fn parse(kind: FieldKind, raw: &JsonValue) -> Self {
        let mut options = FieldOptions {
            raw: raw.clone(),
            ..Default::default()
        };

        match kind.family() {
            KindFamily::Numeric => {
                options.min = number_at(raw, "min");
                options.max = number_at(raw, "max");
                options.step = number_at(raw, "step");
                options.currency = raw
                    .get("currency")
                    .and_then(|c| c.as_str())
                    .map(str::to_string);
                if kind == FieldKind::Rating {
                    options.max_rating = number_at(raw, "max_rating")
                        .or_else(|| number_at(raw, "max"))
                        .filter(|n| *n >= 1.0)
                        .map(|n| n as u32);
                }
            }
            KindFamily::Upload => {
                options.accept = match raw.get("accept") {
                    Some(JsonValue::Array(items)) => items
                        .iter()
                        .filter_map(|i| i.as_str())
                        .map(|s| s.trim().to_ascii_lowercase())
                        .collect(),
                    Some(JsonValue::String(list)) => list
                        .split(',')
                        .map(|s| s.trim().to_ascii_lowercase())
                        .filter(|s| !s.is_empty())
                        .collect(),
                    _ => Vec::new(),
                };
                options.max_size_bytes = number_at(raw, "max_size_bytes")
                    .or_else(|| number_at(raw, "max_size"))
                    .filter(|n| *n > 0.0)
                    .map(|n| n as u64);
                options.max_files = number_at(raw, "max_files")
                    .filter(|n| *n >= 1.0)
                    .map(|n| n as usize);
            }
            KindFamily::Structured => {
                options.schema = raw.get("schema").filter(|s| s.is_object()).cloned();
            }
            KindFamily::List | KindFamily::Text | KindFamily::Boolean => {}
        }

        if matches!(
            kind,
            FieldKind::Select | FieldKind::Multiselect | FieldKind::Tags
        ) {
            options.choices = parse_choices(raw);
        }

        options
    }

    /// Build options from a plain list of choice values
    pub fn with_choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices: Vec<Choice> = values
            .into_iter()
            .map(|v| {
                let v = v.into();
                Choice::new(v.clone(), v)
            })
            .collect();
        let raw = JsonValue::Array(
            choices
                .iter()
                .map(|c| JsonValue::String(c.value.clone()))
                .collect(),
        );
        Self {
            choices,
            raw,
            ..Default::default()
        }
    }

    pub fn has_choice(&self, value: &str) -> bool {
        self.choices.iter().any(|c| c.value == value)
    }

    /// Effective rating ceiling
    pub fn rating_ceiling(&self) -> u32 {
        self.max_rating.unwrap_or(DEFAULT_MAX_RATING)
    }
}

fn number_at(raw: &JsonValue, key: &str) -> Option<f64> {
    match raw.get(key)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Accepts a bare array, `{choices: [...]}`, `{options: [...]}` or a
/// `{value: label}` map. Array items may be strings, numbers or
/// `{value, label}` objects.
fn parse_choices(raw: &JsonValue) -> Vec<Choice> {
    let list = match raw {
        JsonValue::Array(items) => Some(items),
        JsonValue::Object(map) => match map.get("choices").or_else(|| map.get("options")) {
            Some(JsonValue::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    };

    if let Some(items) = list {
        return items.iter().filter_map(choice_from_item).collect();
    }

    match raw {
        JsonValue::Object(map) if !map.contains_key("choices") && !map.contains_key("options") => map
            .iter()
            .filter_map(|(value, label)| {
                label
                    .as_str()
                    .map(|label| Choice::new(value.clone(), label))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn choice_from_item(item: &JsonValue) -> Option<Choice> {
    match item {
        JsonValue::String(s) => Some(Choice::new(s.clone(), s.clone())),
        JsonValue::Number(n) => Some(Choice::new(n.to_string(), n.to_string())),
        JsonValue::Object(map) => {
            let value = match map.get("value") {
                Some(JsonValue::String(s)) => s.clone(),
                Some(JsonValue::Number(n)) => n.to_string(),
                _ => return None,
            };
            let label = map
                .get("label")
                .and_then(|l| l.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| value.clone());
            Some(Choice { value, label })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_choices_from_plain_strings() {
        let options = FieldOptions::parse(FieldKind::Select, &json!(["hot", "cold"]));
        assert_eq!(options.choices.len(), 2);
        assert!(options.has_choice("hot"));
        assert!(!options.has_choice("warm"));
    }

    #[test]
    fn test_choices_from_objects_and_nested_key() {
        let raw = json!({"choices": [{"value": "a", "label": "Alpha"}, {"value": 2}]});
        let options = FieldOptions::parse(FieldKind::Multiselect, &raw);
        assert_eq!(options.choices[0], Choice::new("a", "Alpha"));
        assert_eq!(options.choices[1], Choice::new("2", "2"));
    }

    #[test]
    fn test_choices_from_value_label_map() {
        let options = FieldOptions::parse(FieldKind::Select, &json!({"vip": "VIP", "std": "Standard"}));
        assert!(options.has_choice("vip"));
        assert!(options.has_choice("std"));
    }

    #[test]
    fn test_numeric_bounds_accept_strings() {
        let options = FieldOptions::parse(FieldKind::Percent, &json!({"min": "0", "max": 100}));
        assert_eq!(options.min, Some(0.0));
        assert_eq!(options.max, Some(100.0));
    }

    #[test]
    fn test_rating_ceiling_defaults_to_five() {
        let options = FieldOptions::parse(FieldKind::Rating, &JsonValue::Null);
        assert_eq!(options.rating_ceiling(), 5);
        let options = FieldOptions::parse(FieldKind::Rating, &json!({"max_rating": 10}));
        assert_eq!(options.rating_ceiling(), 10);
    }

    #[test]
    fn test_file_constraints() {
        let raw = json!({"accept": "image/png, .JPG", "max_size_bytes": 2048, "max_files": 3});
        let options = FieldOptions::parse(FieldKind::Files, &raw);
        assert_eq!(options.accept, vec!["image/png".to_string(), ".jpg".to_string()]);
        assert_eq!(options.max_size_bytes, Some(2048));
        assert_eq!(options.max_files, Some(3));
    }

    #[test]
    fn test_raw_string_is_kept() {
        let raw = JsonValue::String("{not json".to_string());
        let options = FieldOptions::parse(FieldKind::Select, &raw);
        assert!(options.choices.is_empty());
        assert_eq!(options.raw, raw);
    }
}
