//! Custom Fields Module
//!
//! Tenant-configurable typed attributes attached to domain entities (leads,
//! contacts, accounts). Definitions come from a registry; values are stored
//! per entity instance in four typed slots and edited through one shared
//! render, validate and save pipeline.

// Public exports
pub mod contract;
pub use contract::{
    client::CustomFieldsApi, error::CustomFieldsError, Choice, ControlInput, FieldDefinition,
    FieldEntry, FieldForm, FieldKind, FieldOptions, FileUpload, KindFamily, Slot, SubmitReport,
    Value, ValueSlots,
};

pub mod config;
pub use config::{Config, OrphanPolicy};

pub mod module;
pub use module::CustomFieldsModule;

// Internal modules (hidden from public API)
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
