//! Native client implementation - wraps domain service for in-process calls

use crate::contract::{
    ControlInput, CustomFieldsApi, CustomFieldsError, FieldForm, FileUpload, SubmitReport,
};
use crate::domain::Service;
use async_trait::async_trait;
use std::sync::Arc;

/// Native client that calls the domain service directly
#[derive(Clone)]
pub struct NativeClient {
    service: Arc<Service>,
}

impl NativeClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CustomFieldsApi for NativeClient {
    async fn load_form(
        &self,
        entity_type: &str,
        entity_instance_id: Option<&str>,
    ) -> Result<FieldForm, CustomFieldsError> {
        self.service.load_form(entity_type, entity_instance_id).await
    }

    fn apply_input(
        &self,
        form: &mut FieldForm,
        key: &str,
        input: ControlInput,
    ) -> Result<(), CustomFieldsError> {
        self.service.apply_input(form, key, input)
    }

    async fn upload_file(
        &self,
        form: &mut FieldForm,
        key: &str,
        file: FileUpload,
    ) -> Result<(), CustomFieldsError> {
        self.service.upload_file(form, key, file).await
    }

    fn validate(&self, form: &FieldForm) -> Result<(), CustomFieldsError> {
        self.service.validate(form)
    }

    async fn submit(
        &self,
        form: &FieldForm,
        entity_instance_id: &str,
    ) -> Result<SubmitReport, CustomFieldsError> {
        self.service.submit(form, entity_instance_id).await
    }

    async fn definition_deleted(&self, definition_id: &str) -> Result<u64, CustomFieldsError> {
        self.service.definition_deleted(definition_id).await
    }
}
