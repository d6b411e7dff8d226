//! Storage factory for runtime storage selection

use std::sync::Arc;

use sqlx::postgres::PgPool;

use crate::config::{StorageBackend, StorageSettings};
use crate::domain::storage::{Storage, StorageEntity};
use crate::domain::DomainError;

use super::in_memory::InMemoryStorage;
use super::postgres::{PostgresConfig, PostgresStorage};
use super::postgrest::{PostgrestConfig, PostgrestStorage};

/// Table holding workflow definitions
pub const WORKFLOWS_TABLE: &str = "workflows";

/// Table holding run records
pub const RUNS_TABLE: &str = "workflow_runs";

/// Resolved storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage, tables hold a JSONB document per entity
    Postgres(PostgresConfig),
    /// PostgREST/Supabase over HTTP
    Postgrest(PostgrestConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        match settings.backend {
            StorageBackend::Memory => Self::InMemory,
            StorageBackend::Postgres => Self::Postgres(
                PostgresConfig::new(&settings.database_url)
                    .with_max_connections(settings.max_connections),
            ),
            StorageBackend::Postgrest => Self::Postgrest(
                PostgrestConfig::new(&settings.postgrest_url, &settings.postgrest_key)
                    .with_timeout(settings.timeout_secs),
            ),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Self::InMemory => StorageBackend::Memory,
            Self::Postgres(_) => StorageBackend::Postgres,
            Self::Postgrest(_) => StorageBackend::Postgrest,
        }
    }
}

/// Creates storages for each entity table, sharing one connection pool where applicable
#[derive(Debug)]
pub struct StorageFactory {
    config: StorageConfig,
    pool: Option<PgPool>,
}

impl StorageFactory {
    /// Prepare the factory, opening the database pool if one is needed
    pub async fn connect(config: StorageConfig) -> Result<Self, DomainError> {
        let pool = match &config {
            StorageConfig::Postgres(pg_config) => Some(pg_config.connect().await?),
            _ => None,
        };

        Ok(Self { config, pool })
    }

    pub fn in_memory() -> Self {
        Self {
            config: StorageConfig::InMemory,
            pool: None,
        }
    }

    pub fn backend(&self) -> StorageBackend {
        self.config.backend()
    }

    /// Creates a storage instance for `table_name`
    pub async fn create<E>(&self, table_name: &str) -> Result<Arc<dyn Storage<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        match (&self.config, &self.pool) {
            (StorageConfig::InMemory, _) => Ok(Arc::new(InMemoryStorage::<E>::new())),
            (StorageConfig::Postgres(_), Some(pool)) => {
                let storage = PostgresStorage::<E>::new(pool.clone(), table_name)?;
                storage.ensure_table().await?;
                Ok(Arc::new(storage))
            }
            (StorageConfig::Postgres(_), None) => Err(DomainError::configuration(
                "PostgreSQL storage used before connecting",
            )),
            (StorageConfig::Postgrest(rest_config), _) => {
                Ok(Arc::new(PostgrestStorage::<E>::new(rest_config, table_name)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::ListOptions;
    use crate::domain::Run;

    #[test]
    fn test_config_from_settings() {
        let mut settings = StorageSettings::default();
        assert_eq!(
            StorageConfig::from_settings(&settings).backend(),
            StorageBackend::Memory
        );

        settings.backend = StorageBackend::Postgres;
        settings.max_connections = 3;
        match StorageConfig::from_settings(&settings) {
            StorageConfig::Postgres(pg) => assert_eq!(pg.max_connections, 3),
            other => panic!("Expected Postgres config, got {:?}", other),
        }

        settings.backend = StorageBackend::Postgrest;
        settings.postgrest_url = "https://db.example.com".to_string();
        settings.timeout_secs = 4;
        match StorageConfig::from_settings(&settings) {
            StorageConfig::Postgrest(rest) => {
                assert_eq!(rest.url, "https://db.example.com");
                assert_eq!(rest.timeout_secs, 4);
            }
            other => panic!("Expected PostgREST config, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_in_memory_factory_creates_working_storage() {
        let factory = StorageFactory::connect(StorageConfig::in_memory()).await.unwrap();
        let storage = factory.create::<Run>(RUNS_TABLE).await.unwrap();

        assert!(storage.list(ListOptions::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_postgrest_factory_requires_credentials() {
        let factory = StorageFactory::connect(StorageConfig::Postgrest(PostgrestConfig::new(
            "", "",
        )))
        .await
        .unwrap();

        assert!(factory.create::<Run>(RUNS_TABLE).await.is_err());
    }
}
