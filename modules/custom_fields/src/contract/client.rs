//! Native client trait used by screens
//!
//! Every screen that shows custom fields (quick-create, detailed-create, edit,
//! admin preview) goes through this API so rendering, validation and saving
//! behave the same everywhere.

use super::{
    error::CustomFieldsError,
    model::{ControlInput, FieldForm, FileUpload, SubmitReport},
};
use async_trait::async_trait;

/// Custom fields API for in-process callers
#[async_trait]
pub trait CustomFieldsApi: Send + Sync {
    // ===== Loading =====

    /// Load definitions for an entity type, joined with the instance's stored
    /// values when `entity_instance_id` is given. Fields without a stored
    /// value start at their kind default.
    async fn load_form(
        &self,
        entity_type: &str,
        entity_instance_id: Option<&str>,
    ) -> Result<FieldForm, CustomFieldsError>;

    // ===== Editing =====

    /// Coerce control input into a field's value
    fn apply_input(
        &self,
        form: &mut FieldForm,
        key: &str,
        input: ControlInput,
    ) -> Result<(), CustomFieldsError>;

    /// Upload a file for a file, files or image field. On failure the form
    /// is left untouched.
    async fn upload_file(
        &self,
        form: &mut FieldForm,
        key: &str,
        file: FileUpload,
    ) -> Result<(), CustomFieldsError>;

    // ===== Saving =====

    /// Check required and value constraints without contacting storage
    fn validate(&self, form: &FieldForm) -> Result<(), CustomFieldsError>;

    /// Validate, then upsert every visible field with a value. The entity
    /// itself must already be saved by the caller.
    async fn submit(
        &self,
        form: &FieldForm,
        entity_instance_id: &str,
    ) -> Result<SubmitReport, CustomFieldsError>;

    // ===== Definition lifecycle =====

    /// React to a definition being deleted in the registry. Returns the number
    /// of stored values removed (always 0 when orphans are retained).
    async fn definition_deleted(&self, definition_id: &str) -> Result<u64, CustomFieldsError>;
}
