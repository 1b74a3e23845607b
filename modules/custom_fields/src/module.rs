//! Module declaration and lifecycle

use crate::api::native::NativeClient;
use crate::config::Config;
use crate::contract::CustomFieldsApi;
use crate::domain::{DefinitionSource, Service, UploadSink, ValueSink};
use crate::infra::storage::repositories::SeaOrmFieldRepository;
use anyhow::Result;
use parking_lot::RwLock;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Custom fields module
pub struct CustomFieldsModule {
    config: RwLock<Config>,
    service: RwLock<Option<Arc<Service>>>,
}

impl Default for CustomFieldsModule {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl CustomFieldsModule {
    pub fn new(config: Config) -> Self {
        Self {
            config: RwLock::new(config),
            service: RwLock::new(None),
        }
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Build the domain service over the given ports and return its client.
    /// Calling again replaces the service.
    pub fn init(
        &self,
        source: Arc<dyn DefinitionSource>,
        sink: Arc<dyn ValueSink>,
        uploads: Arc<dyn UploadSink>,
    ) -> Arc<dyn CustomFieldsApi> {
        let config = self.config();
        tracing::debug!(?config, "initializing custom fields");

        let service = Arc::new(Service::new(config, source, sink, uploads));
        *self.service.write() = Some(service.clone());

        tracing::info!("Custom fields initialized with native client");
        Arc::new(NativeClient::new(service))
    }

    /// Run migrations, then wire definitions and values to the database.
    /// Uploads still go through `uploads`.
    pub async fn init_with_database(
        &self,
        db: Arc<DatabaseConnection>,
        uploads: Arc<dyn UploadSink>,
    ) -> Result<Arc<dyn CustomFieldsApi>> {
        Self::migrate(&db).await?;

        let repo = Arc::new(SeaOrmFieldRepository::new(db));
        Ok(self.init(repo.clone(), repo, uploads))
    }

    /// Client of the initialized service
    pub fn client(&self) -> Result<Arc<dyn CustomFieldsApi>> {
        let service = self
            .service
            .read()
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Custom fields service not initialized"))?
            .clone();
        Ok(Arc::new(NativeClient::new(service)))
    }

    /// Apply database migrations
    pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
        use crate::infra::storage::migrations::Migrator;
        use sea_orm_migration::MigratorTrait;

        Migrator::up(db, None).await?;
        tracing::info!("Custom fields migrations completed");
        Ok(())
    }
}
