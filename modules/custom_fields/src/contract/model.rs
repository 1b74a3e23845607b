//! Contract models for custom fields
//!
//! These models are transport-agnostic and shared by every screen that renders
//! custom fields. Only `ValueSlots` carries serde derives: it is the exact shape
//! the value sink receives.

use serde::{Deserialize, Serialize};
use serde_json::Map;

use super::options::FieldOptions;

/// Default display position for definitions that do not declare one
pub const DEFAULT_SORT_ORDER: i64 = 100;

/// Declared type of a custom field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Boolean,
    Date,
    Datetime,
    Select,
    Multiselect,
    Tags,
    Email,
    Phone,
    Url,
    Currency,
    Percent,
    Rating,
    File,
    Files,
    Image,
    Richtext,
    Address,
    Json,
}

/// One of the four typed storage columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Text,
    Number,
    Boolean,
    Json,
}

/// Kinds grouped by how they store, default and validate their value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFamily {
    /// number, currency, percent, rating
    Numeric,
    /// boolean
    Boolean,
    /// multiselect, tags: array of strings in the json slot
    List,
    /// json, address: arbitrary json in the json slot
    Structured,
    /// file, files, image: metadata in the json slot, locator echoed as text
    Upload,
    /// everything else stores a string
    Text,
}

impl FieldKind {
    pub const ALL: [FieldKind; 21] = [
        FieldKind::Text,
        FieldKind::Textarea,
        FieldKind::Number,
        FieldKind::Boolean,
        FieldKind::Date,
        FieldKind::Datetime,
        FieldKind::Select,
        FieldKind::Multiselect,
        FieldKind::Tags,
        FieldKind::Email,
        FieldKind::Phone,
        FieldKind::Url,
        FieldKind::Currency,
        FieldKind::Percent,
        FieldKind::Rating,
        FieldKind::File,
        FieldKind::Files,
        FieldKind::Image,
        FieldKind::Richtext,
        FieldKind::Address,
        FieldKind::Json,
    ];

    /// Canonical lower-case tag
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Datetime => "datetime",
            FieldKind::Select => "select",
            FieldKind::Multiselect => "multiselect",
            FieldKind::Tags => "tags",
            FieldKind::Email => "email",
            FieldKind::Phone => "phone",
            FieldKind::Url => "url",
            FieldKind::Currency => "currency",
            FieldKind::Percent => "percent",
            FieldKind::Rating => "rating",
            FieldKind::File => "file",
            FieldKind::Files => "files",
            FieldKind::Image => "image",
            FieldKind::Richtext => "richtext",
            FieldKind::Address => "address",
            FieldKind::Json => "json",
        }
    }

    /// Parse a tag case-insensitively. Returns `None` for unknown tags.
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }

    /// Parse a tag, downgrading anything unknown to `Text`
    pub fn from_tag(tag: &str) -> Self {
        Self::parse(tag).unwrap_or(FieldKind::Text)
    }

    pub fn family(&self) -> KindFamily {
        match self {
            FieldKind::Number | FieldKind::Currency | FieldKind::Percent | FieldKind::Rating => {
                KindFamily::Numeric
            }
            FieldKind::Boolean => KindFamily::Boolean,
            FieldKind::Multiselect | FieldKind::Tags => KindFamily::List,
            FieldKind::Json | FieldKind::Address => KindFamily::Structured,
            FieldKind::File | FieldKind::Files | FieldKind::Image => KindFamily::Upload,
            FieldKind::Text
            | FieldKind::Textarea
            | FieldKind::Date
            | FieldKind::Datetime
            | FieldKind::Select
            | FieldKind::Email
            | FieldKind::Phone
            | FieldKind::Url
            | FieldKind::Richtext => KindFamily::Text,
        }
    }

    /// The authoritative storage slot for this kind
    pub fn slot(&self) -> Slot {
        match self.family() {
            KindFamily::Numeric => Slot::Number,
            KindFamily::Boolean => Slot::Boolean,
            KindFamily::List | KindFamily::Structured | KindFamily::Upload => Slot::Json,
            KindFamily::Text => Slot::Text,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tenant-configured description of one custom attribute for an entity type
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Opaque, immutable identifier
    pub definition_id: String,
    /// Entity type tag (e.g. "lead")
    pub entity_type: String,
    /// Machine name, unique within the entity type
    pub key: String,
    /// Display name
    pub label: String,
    pub kind: FieldKind,
    /// Kind-specific options, parsed leniently
    pub options: FieldOptions,
    pub required: bool,
    /// Hidden fields are not rendered or validated but their values still load
    pub visible: bool,
    /// Ascending display order, ties broken by label
    pub sort_order: i64,
    /// Free-form metadata. `ui` overrides the rendering control.
    pub metadata: Map<String, serde_json::Value>,
}

impl FieldDefinition {
    /// Create a visible, optional definition with default ordering
    pub fn new(
        definition_id: impl Into<String>,
        entity_type: impl Into<String>,
        key: impl Into<String>,
        label: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        Self {
            definition_id: definition_id.into(),
            entity_type: entity_type.into(),
            key: key.into(),
            label: label.into(),
            kind,
            options: FieldOptions::default(),
            required: false,
            visible: true,
            sort_order: DEFAULT_SORT_ORDER,
            metadata: Map::new(),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Rendering override from `metadata.ui`, when it names a known kind
    pub fn ui_override(&self) -> Option<FieldKind> {
        self.metadata
            .get("ui")
            .and_then(|ui| ui.as_str())
            .and_then(FieldKind::parse)
    }

    /// Display ordering: `sort_order` ascending, then `label`
    pub fn display_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then_with(|| self.label.cmp(&other.label))
    }
}

/// In-memory value of one field on one entity instance.
///
/// Flattened to [`ValueSlots`] only at the persistence boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// All slots unset
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Never holds `null`; use [`Value::json`] to construct
    Json(serde_json::Value),
    /// A completed upload: locator echoed to the text slot, metadata to the json slot
    Upload {
        locator: String,
        metadata: serde_json::Value,
    },
}

impl Value {
    /// Wrap json, mapping `null` to `Empty`
    pub fn json(value: serde_json::Value) -> Self {
        if value.is_null() {
            Value::Empty
        } else {
            Value::Json(value)
        }
    }

    /// Pre-input value for a kind
    pub fn default_for(kind: FieldKind) -> Self {
        match kind.family() {
            KindFamily::Numeric => Value::Empty,
            KindFamily::Boolean => Value::Bool(false),
            KindFamily::List => Value::Json(serde_json::Value::Array(Vec::new())),
            KindFamily::Structured | KindFamily::Upload => Value::Empty,
            KindFamily::Text => Value::Text(String::new()),
        }
    }

    /// Whether every slot is unset
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Flatten into the four storage slots
    pub fn to_slots(&self) -> ValueSlots {
        let mut slots = ValueSlots::default();
        match self {
            Value::Empty => {}
            Value::Text(text) => slots.value_text = Some(text.clone()),
            Value::Number(number) => slots.value_number = Some(*number),
            Value::Bool(flag) => slots.value_boolean = Some(*flag),
            Value::Json(json) => slots.value_json = Some(json.clone()),
            Value::Upload { locator, metadata } => {
                slots.value_text = Some(locator.clone());
                slots.value_json = Some(metadata.clone());
            }
        }
        slots
    }

    /// Decode stored slots according to the kind's slot contract.
    ///
    /// Slots that do not belong to the kind are ignored. A row with nothing
    /// usable for the kind yields the kind's default.
    pub fn from_slots(kind: FieldKind, slots: &ValueSlots) -> Self {
        let decoded = match kind.family() {
            KindFamily::Numeric => slots
                .value_number
                .filter(|n| n.is_finite())
                .map(Value::Number),
            KindFamily::Boolean => slots.value_boolean.map(Value::Bool),
            KindFamily::List => match &slots.value_json {
                Some(serde_json::Value::Array(items)) => {
                    Some(Value::Json(serde_json::Value::Array(items.clone())))
                }
                _ => None,
            },
            KindFamily::Structured => slots.value_json.clone().map(Value::json),
            KindFamily::Upload => {
                let locator = slots.value_text.clone().filter(|s| !s.is_empty());
                let metadata = slots.value_json.clone().filter(|j| !j.is_null());
                match (locator, metadata) {
                    (None, None) => None,
                    (Some(locator), None) => Some(Value::Upload {
                        metadata: serde_json::json!({ "url": locator }),
                        locator,
                    }),
                    (locator, Some(metadata)) => Some(Value::Upload {
                        locator: locator
                            .or_else(|| upload_locator(&metadata))
                            .unwrap_or_default(),
                        metadata,
                    }),
                }
            }
            KindFamily::Text => slots.value_text.clone().map(Value::Text),
        };

        decoded.unwrap_or_else(|| Value::default_for(kind))
    }
}

/// Locator of an upload metadata object, or of the last entry of a list of them
pub fn upload_locator(metadata: &serde_json::Value) -> Option<String> {
    match metadata {
        serde_json::Value::Object(map) => map.get("url").and_then(|u| u.as_str()).map(str::to_string),
        serde_json::Value::Array(items) => items.last().and_then(upload_locator),
        _ => None,
    }
}

/// Four nullable storage columns, as sent to the value sink.
///
/// Every slot is always serialized; unset slots go out as `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueSlots {
    pub value_text: Option<String>,
    pub value_number: Option<f64>,
    pub value_boolean: Option<bool>,
    pub value_json: Option<serde_json::Value>,
}

impl ValueSlots {
    pub fn is_empty(&self) -> bool {
        self.value_text.is_none()
            && self.value_number.is_none()
            && self.value_boolean.is_none()
            && self.value_json.is_none()
    }
}

/// A definition paired with its current in-memory value
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub definition: FieldDefinition,
    pub value: Value,
}

impl FieldEntry {
    pub fn new(definition: FieldDefinition, value: Value) -> Self {
        Self { definition, value }
    }

    /// Pair a definition with its kind default
    pub fn with_default(definition: FieldDefinition) -> Self {
        let value = Value::default_for(definition.kind);
        Self { definition, value }
    }
}

/// The custom fields of one entity instance as edited by a screen.
///
/// Entries are kept in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldForm {
    entity_type: String,
    entity_instance_id: Option<String>,
    entries: Vec<FieldEntry>,
}

impl FieldForm {
    pub fn new(
        entity_type: impl Into<String>,
        entity_instance_id: Option<String>,
        mut entries: Vec<FieldEntry>,
    ) -> Self {
        entries.sort_by(|a, b| a.definition.display_cmp(&b.definition));
        Self {
            entity_type: entity_type.into(),
            entity_instance_id,
            entries,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_instance_id(&self) -> Option<&str> {
        self.entity_instance_id.as_deref()
    }

    /// All entries, hidden ones included
    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    /// Entries a screen should render
    pub fn visible(&self) -> impl Iterator<Item = &FieldEntry> {
        self.entries.iter().filter(|e| e.definition.visible)
    }

    pub fn get(&self, key: &str) -> Option<&FieldEntry> {
        self.entries.iter().find(|e| e.definition.key == key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldEntry> {
        self.entries.iter_mut().find(|e| e.definition.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A binary handed to the file upload sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lower-cased extension including the dot, e.g. ".pdf"
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
    }
}

/// Raw input from a rendered control
#[derive(Debug, Clone, PartialEq)]
pub enum ControlInput {
    /// Typed or picked text
    Text(String),
    /// Checkbox or toggle state
    Bool(bool),
    /// All selected option values of a multi-select
    Selected(Vec<String>),
    /// Structured input (address widgets, json editors)
    Json(serde_json::Value),
}

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    /// Number of upserts issued and confirmed
    pub saved: usize,
    /// Keys of visible fields skipped because their value was absent
    pub skipped: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!(FieldKind::parse("Number"), Some(FieldKind::Number));
        assert_eq!(FieldKind::parse(" MULTISELECT "), Some(FieldKind::Multiselect));
        assert_eq!(FieldKind::parse("wizzbang"), None);
        assert_eq!(FieldKind::from_tag("wizzbang"), FieldKind::Text);
    }

    #[test]
    fn test_every_kind_round_trips_its_tag() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_slot_mapping() {
        assert_eq!(FieldKind::Rating.slot(), Slot::Number);
        assert_eq!(FieldKind::Boolean.slot(), Slot::Boolean);
        assert_eq!(FieldKind::Tags.slot(), Slot::Json);
        assert_eq!(FieldKind::Address.slot(), Slot::Json);
        assert_eq!(FieldKind::Image.slot(), Slot::Json);
        assert_eq!(FieldKind::Datetime.slot(), Slot::Text);
        assert_eq!(FieldKind::Richtext.slot(), Slot::Text);
    }

    #[test]
    fn test_default_table() {
        assert_eq!(Value::default_for(FieldKind::Currency), Value::Empty);
        assert_eq!(Value::default_for(FieldKind::Boolean), Value::Bool(false));
        assert_eq!(Value::default_for(FieldKind::Tags), Value::Json(json!([])));
        assert_eq!(Value::default_for(FieldKind::Address), Value::Empty);
        assert_eq!(Value::default_for(FieldKind::File), Value::Empty);
        assert_eq!(Value::default_for(FieldKind::Email), Value::Text(String::new()));
    }

    #[test]
    fn test_upload_flattens_into_two_slots() {
        let value = Value::Upload {
            locator: "https://cdn/x.pdf".to_string(),
            metadata: json!({"url": "https://cdn/x.pdf", "name": "x.pdf"}),
        };
        let slots = value.to_slots();
        assert_eq!(slots.value_text.as_deref(), Some("https://cdn/x.pdf"));
        assert!(slots.value_json.is_some());
        assert!(slots.value_number.is_none());
        assert!(slots.value_boolean.is_none());
    }

    #[test]
    fn test_slots_serialize_nulls() {
        let slots = Value::Number(5000.0).to_slots();
        let wire = serde_json::to_value(&slots).unwrap();
        assert_eq!(
            wire,
            json!({"value_text": null, "value_number": 5000.0, "value_boolean": null, "value_json": null})
        );
    }

    #[test]
    fn test_from_slots_ignores_foreign_slots() {
        let slots = ValueSlots {
            value_text: Some("12".to_string()),
            ..Default::default()
        };
        assert_eq!(Value::from_slots(FieldKind::Number, &slots), Value::Empty);
        assert_eq!(
            Value::from_slots(FieldKind::Text, &slots),
            Value::Text("12".to_string())
        );
    }

    #[test]
    fn test_from_slots_applies_default_when_empty() {
        let slots = ValueSlots::default();
        assert_eq!(Value::from_slots(FieldKind::Boolean, &slots), Value::Bool(false));
        assert_eq!(Value::from_slots(FieldKind::Multiselect, &slots), Value::Json(json!([])));
    }

    #[test]
    fn test_from_slots_recovers_upload_locator_from_metadata() {
        let slots = ValueSlots {
            value_json: Some(json!({"url": "https://cdn/a.png", "name": "a.png"})),
            ..Default::default()
        };
        match Value::from_slots(FieldKind::Image, &slots) {
            Value::Upload { locator, .. } => assert_eq!(locator, "https://cdn/a.png"),
            other => panic!("Expected upload, got {:?}", other),
        }
    }

    #[test]
    fn test_form_sorts_by_order_then_label() {
        let beta = FieldDefinition::new("2", "lead", "beta", "Beta", FieldKind::Text);
        let alpha = FieldDefinition::new("1", "lead", "alpha", "Alpha", FieldKind::Text);
        let first = FieldDefinition::new("3", "lead", "zeta", "Zeta", FieldKind::Text).sort_order(1);
        let form = FieldForm::new(
            "lead",
            None,
            vec![
                FieldEntry::with_default(beta),
                FieldEntry::with_default(alpha),
                FieldEntry::with_default(first),
            ],
        );
        let keys: Vec<_> = form.entries().iter().map(|e| e.definition.key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "beta"]);
    }

    #[test]
    fn test_ui_override_ignores_unknown_controls() {
        let def = FieldDefinition::new("1", "lead", "k", "K", FieldKind::Number)
            .with_metadata("ui", json!("slider-3d"));
        assert_eq!(def.ui_override(), None);

        let def = def.with_metadata("ui", json!("Text"));
        assert_eq!(def.ui_override(), Some(FieldKind::Text));
    }

    #[test]
    fn test_file_upload_extension() {
        let upload = FileUpload::new("Report.PDF", "application/pdf", vec![1, 2, 3]);
        assert_eq!(upload.extension().as_deref(), Some(".pdf"));
        assert_eq!(upload.size(), 3);
    }
}
