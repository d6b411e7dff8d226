//! PostgREST (Supabase) storage implementation over HTTP

use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;

use crate::domain::storage::{ListOptions, Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Column holding the entity key in every table
const KEY_COLUMN: &str = "id";

/// Column used for listing order
const ORDER_COLUMN: &str = "created_at";

/// PostgREST connection settings
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project URL, without the `/rest/v1` suffix
    pub url: String,
    /// Service or anon key, sent as `apikey` and bearer token
    pub api_key: String,
    pub timeout_secs: u64,
}

impl PostgrestConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout_secs: 10,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Storage backed by one PostgREST table whose columns mirror the entity's fields
pub struct PostgrestStorage<E>
where
    E: StorageEntity,
{
    client: reqwest::Client,
    table_url: String,
    api_key: String,
    _phantom: PhantomData<E>,
}

impl<E> Debug for PostgrestStorage<E>
where
    E: StorageEntity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgrestStorage")
            .field("table_url", &self.table_url)
            .finish()
    }
}

impl<E> PostgrestStorage<E>
where
    E: StorageEntity,
{
    pub fn new(config: &PostgrestConfig, table: &str) -> Result<Self, DomainError> {
        if config.url.trim().is_empty() || config.api_key.trim().is_empty() {
            return Err(DomainError::configuration(
                "PostgREST storage requires a URL and key \
                 (storage.postgrest_url / SUPABASE_URL, storage.postgrest_key / SUPABASE_KEY)",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", config.url.trim_end_matches('/'), table),
            api_key: config.api_key.clone(),
            _phantom: PhantomData,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    fn key_filter(key: &E::Key) -> (&'static str, String) {
        (KEY_COLUMN, format!("eq.{}", key.as_str()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DomainError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| DomainError::storage(format!("PostgREST request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "PostgREST returned an error");

        if status == StatusCode::CONFLICT {
            return Err(DomainError::conflict(body));
        }
        Err(DomainError::storage(format!("PostgREST HTTP {}: {}", status, body)))
    }

    async fn rows(response: Response) -> Result<Vec<E>, DomainError> {
        response
            .json::<Vec<E>>()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to decode PostgREST rows: {}", e)))
    }
}

#[async_trait]
impl<E> Storage<E> for PostgrestStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let request = self
            .client
            .get(&self.table_url)
            .query(&[("select", "*".to_string()), Self::key_filter(key)]);

        let response = self.send(request).await?;
        Ok(Self::rows(response).await?.into_iter().next())
    }

    async fn list(&self, options: ListOptions) -> Result<Vec<E>, DomainError> {
        if options.limit == Some(0) {
            return Ok(Vec::new());
        }

        let direction = if options.newest_first { "desc" } else { "asc" };
        let mut request = self.client.get(&self.table_url).query(&[
            ("select", "*".to_string()),
            ("order", format!("{}.{}", ORDER_COLUMN, direction)),
        ]);

        if let Some(limit) = options.limit {
            request = request
                .header("Range-Unit", "items")
                .header("Range", format!("0-{}", limit - 1));
        }

        let response = self.send(request).await?;
        Self::rows(response).await
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let request = self
            .client
            .post(&self.table_url)
            .header("Prefer", "return=representation")
            .json(&entity);

        let response = self.send(request).await?;
        Ok(Self::rows(response).await?.into_iter().next().unwrap_or(entity))
    }

    async fn patch(&self, key: &E::Key, changes: Value) -> Result<E, DomainError> {
        let request = self
            .client
            .patch(&self.table_url)
            .query(&[Self::key_filter(key)])
            .header("Prefer", "return=representation")
            .json(&changes);

        let response = self.send(request).await?;
        Self::rows(response).await?.into_iter().next().ok_or_else(|| {
            DomainError::not_found(format!("Entity with key '{}' not found", key.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::{Run, RunStatus, RunUpdate};
    use crate::domain::workflow::WorkflowId;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn storage(server: &MockServer) -> PostgrestStorage<Run> {
        let config = PostgrestConfig::new(server.uri(), "anon-key");
        PostgrestStorage::new(&config, "workflow_runs").unwrap()
    }

    #[test]
    fn test_requires_url_and_key() {
        let config = PostgrestConfig::new("", "key");
        assert!(PostgrestStorage::<Run>::new(&config, "workflow_runs").is_err());

        let config = PostgrestConfig::new("https://db.example.com", "");
        assert!(PostgrestStorage::<Run>::new(&config, "workflow_runs").is_err());
    }

    #[tokio::test]
    async fn test_get_filters_by_id_and_authenticates() {
        let server = MockServer::start().await;
        let run = Run::pending(WorkflowId::generate());

        Mock::given(method("GET"))
            .and(path("/rest/v1/workflow_runs"))
            .and(query_param("id", format!("eq.{}", run.id())))
            .and(query_param("select", "*"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![run.clone()]))
            .expect(1)
            .mount(&server)
            .await;

        let found = storage(&server).get(run.id()).await.unwrap();
        assert_eq!(found, Some(run));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let run = Run::pending(WorkflowId::generate());
        assert!(storage(&server).get(run.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_and_limits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/workflow_runs"))
            .and(query_param("order", "created_at.desc"))
            .and(header("Range", "0-49"))
            .and(header("Range-Unit", "items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let runs = storage(&server)
            .list(ListOptions::newest_first().with_limit(50))
            .await
            .unwrap();
        assert!(runs.is_empty());
    }

    #[tokio::test]
    async fn test_create_asks_for_representation() {
        let server = MockServer::start().await;
        let run = Run::pending(WorkflowId::generate());

        Mock::given(method("POST"))
            .and(path("/rest/v1/workflow_runs"))
            .and(header("Prefer", "return=representation"))
            .and(body_partial_json(serde_json::json!({"status": "pending"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(vec![run.clone()]))
            .expect(1)
            .mount(&server)
            .await;

        let created = storage(&server).create(run.clone()).await.unwrap();
        assert_eq!(created, run);
    }

    #[tokio::test]
    async fn test_patch_sends_partial_record() {
        let server = MockServer::start().await;
        let run = Run::pending(WorkflowId::generate());
        let mut updated = run.clone();
        updated.apply(RunUpdate::status(RunStatus::Running));

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/workflow_runs"))
            .and(query_param("id", format!("eq.{}", run.id())))
            .and(body_partial_json(serde_json::json!({"status": "running"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![updated.clone()]))
            .expect(1)
            .mount(&server)
            .await;

        let patched = storage(&server)
            .patch(run.id(), RunUpdate::status(RunStatus::Running).to_patch())
            .await
            .unwrap();
        assert_eq!(patched.status(), RunStatus::Running);
    }

    #[tokio::test]
    async fn test_patch_missing_row_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let run = Run::pending(WorkflowId::generate());
        let result = storage(&server)
            .patch(run.id(), serde_json::json!({"status": "running"}))
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_http_error_maps_to_storage_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let result = storage(&server).list(ListOptions::default()).await;
        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }
}
