//! Contract layer - public API for screens embedding custom fields
//!
//! This layer contains transport-agnostic models and the native client trait.

pub mod client;
pub mod error;
pub mod model;
pub mod options;

pub use client::CustomFieldsApi;
pub use error::CustomFieldsError;
pub use model::{
    ControlInput, FieldDefinition, FieldEntry, FieldForm, FieldKind, FileUpload, KindFamily,
    Slot, SubmitReport, Value, ValueSlots, DEFAULT_SORT_ORDER,
};
pub use options::{Choice, FieldOptions};
