//! SeaORM repository implementations

use crate::contract::{FieldDefinition, ValueSlots};
use crate::domain::repository::{DefinitionSource, ValueSink};
use anyhow::Result;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

use super::entity::{self, field_definition};
use super::mapper;

/// Definitions and values in the `field_definitions` / `field_values` tables
pub struct SeaOrmFieldRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmFieldRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert or replace a definition in the registry
    pub async fn save_definition(&self, definition: &FieldDefinition) -> Result<()> {
        let active = mapper::definition_active(definition, chrono::Utc::now());

        field_definition::Entity::insert(active)
            .on_conflict(
                OnConflict::column(field_definition::Column::DefinitionId)
                    .update_columns([
                        field_definition::Column::EntityType,
                        field_definition::Column::Key,
                        field_definition::Column::Label,
                        field_definition::Column::FieldType,
                        field_definition::Column::Options,
                        field_definition::Column::Required,
                        field_definition::Column::Visible,
                        field_definition::Column::SortOrder,
                        field_definition::Column::Metadata,
                        field_definition::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        Ok(())
    }

    /// Remove a definition from the registry. Stored values are untouched.
    pub async fn delete_definition(&self, definition_id: &str) -> Result<bool> {
        let result = field_definition::Entity::delete_by_id(definition_id.to_string())
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Stored slots of one value, if any
    pub async fn find_value(
        &self,
        entity_instance_id: &str,
        definition_id: &str,
    ) -> Result<Option<ValueSlots>> {
        let result = entity::Entity::find_by_id((
            entity_instance_id.to_string(),
            definition_id.to_string(),
        ))
        .one(&*self.db)
        .await?;

        Ok(result.as_ref().map(ValueSlots::from))
    }
}

#[async_trait]
impl DefinitionSource for SeaOrmFieldRepository {
    async fn fetch(
        &self,
        entity_type: &str,
        entity_instance_id: Option<&str>,
    ) -> Result<JsonValue> {
        let defs: Vec<JsonValue> = field_definition::Entity::find()
            .filter(field_definition::Column::EntityType.eq(entity_type))
            .order_by_asc(field_definition::Column::SortOrder)
            .order_by_asc(field_definition::Column::Label)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(JsonValue::from)
            .collect();

        let values: Vec<JsonValue> = match entity_instance_id {
            Some(instance) => entity::Entity::find()
                .filter(entity::Column::EntityInstanceId.eq(instance))
                .all(&*self.db)
                .await?
                .iter()
                .map(|model| mapper::value_row(&model.definition_id, &ValueSlots::from(model)))
                .collect(),
            None => Vec::new(),
        };

        tracing::trace!(
            entity_type,
            defs = defs.len(),
            values = values.len(),
            "fetched custom field rows"
        );
        Ok(json!({ "defs": defs, "values": values }))
    }
}

#[async_trait]
impl ValueSink for SeaOrmFieldRepository {
    async fn upsert(
        &self,
        entity_instance_id: &str,
        definition_id: &str,
        slots: &ValueSlots,
    ) -> Result<()> {
        let active = mapper::value_active(entity_instance_id, definition_id, slots, chrono::Utc::now());

        entity::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([entity::Column::EntityInstanceId, entity::Column::DefinitionId])
                    .update_columns([
                        entity::Column::ValueText,
                        entity::Column::ValueNumber,
                        entity::Column::ValueBoolean,
                        entity::Column::ValueJson,
                        entity::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;

        Ok(())
    }

    async fn delete_by_definition(&self, definition_id: &str) -> Result<u64> {
        let result = entity::Entity::delete_many()
            .filter(entity::Column::DefinitionId.eq(definition_id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
