//! Database migrations for custom fields

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_field_definitions::Migration),
            Box::new(m20250301_000002_create_field_values::Migration),
        ]
    }
}

mod m20250301_000001_create_field_definitions {
    use super::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FieldDefinitions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FieldDefinitions::DefinitionId)
                                .string()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FieldDefinitions::EntityType).string().not_null())
                        .col(ColumnDef::new(FieldDefinitions::Key).string().not_null())
                        .col(ColumnDef::new(FieldDefinitions::Label).string().not_null())
                        .col(ColumnDef::new(FieldDefinitions::FieldType).string().not_null())
                        .col(ColumnDef::new(FieldDefinitions::Options).json())
                        .col(
                            ColumnDef::new(FieldDefinitions::Required)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(FieldDefinitions::Visible)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(FieldDefinitions::SortOrder)
                                .big_integer()
                                .not_null()
                                .default(100),
                        )
                        .col(ColumnDef::new(FieldDefinitions::Metadata).json())
                        .col(
                            ColumnDef::new(FieldDefinitions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(FieldDefinitions::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_field_definitions_entity_type_key")
                        .table(FieldDefinitions::Table)
                        .col(FieldDefinitions::EntityType)
                        .col(FieldDefinitions::Key)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FieldDefinitions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FieldDefinitions {
        Table,
        DefinitionId,
        EntityType,
        Key,
        Label,
        FieldType,
        Options,
        Required,
        Visible,
        SortOrder,
        Metadata,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_field_values {
    use super::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FieldValues::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(FieldValues::EntityInstanceId).string().not_null())
                        .col(ColumnDef::new(FieldValues::DefinitionId).string().not_null())
                        .col(ColumnDef::new(FieldValues::ValueText).text())
                        .col(ColumnDef::new(FieldValues::ValueNumber).double())
                        .col(ColumnDef::new(FieldValues::ValueBoolean).boolean())
                        .col(ColumnDef::new(FieldValues::ValueJson).json())
                        .col(
                            ColumnDef::new(FieldValues::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .col(
                            ColumnDef::new(FieldValues::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null()
                                .default(Expr::current_timestamp()),
                        )
                        .primary_key(
                            Index::create()
                                .col(FieldValues::EntityInstanceId)
                                .col(FieldValues::DefinitionId),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_field_values_definition_id")
                        .table(FieldValues::Table)
                        .col(FieldValues::DefinitionId)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FieldValues::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FieldValues {
        Table,
        EntityInstanceId,
        DefinitionId,
        ValueText,
        ValueNumber,
        ValueBoolean,
        ValueJson,
        CreatedAt,
        UpdatedAt,
    }
}
