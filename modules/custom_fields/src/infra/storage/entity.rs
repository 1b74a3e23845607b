//! SeaORM entities for database tables

use sea_orm::entity::prelude::*;

/// Field values table entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "field_values")]
pub struct Model {
    /// Owning entity instance (part of composite primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub entity_instance_id: String,

    /// Definition the value answers (part of composite primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub definition_id: String,

    pub value_text: Option<String>,
    pub value_number: Option<f64>,
    pub value_boolean: Option<bool>,
    pub value_json: Option<Json>,

    /// Creation timestamp
    pub created_at: DateTimeUtc,

    /// Last upsert timestamp
    pub updated_at: DateTimeUtc,
}

// No foreign key: retained values may outlive their definition
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Field definition registry
pub mod field_definition {
    use sea_orm::entity::prelude::*;

    /// Field definitions table entity
    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "field_definitions")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub definition_id: String,

        /// Entity type the field is attached to (lead, contact, ...)
        pub entity_type: String,

        /// Machine name, unique per entity type
        pub key: String,

        pub label: String,

        /// Kind tag; unknown tags load as text
        pub field_type: String,

        pub options: Option<Json>,
        pub required: bool,
        pub visible: bool,
        pub sort_order: i64,
        pub metadata: Option<Json>,

        pub created_at: DateTimeUtc,
        pub updated_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
