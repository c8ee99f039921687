use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::*;
use super::{StorageError, StorageProvider, StorageResult};

#[derive(Debug, Default)]
struct Tables {
    collections: Vec<Collection>,
    requests: Vec<Request>,
    environments: Vec<Environment>,
    history: Vec<HistoryEntry>,
}

/// In-memory implementation of [`StorageProvider`]; rows are kept in insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn live_mut<'a, T, F>(rows: &'a mut [T], entity: &'static str, id: Uuid, matches: F) -> StorageResult<&'a mut T>
where
    F: Fn(&T) -> bool,
{
    rows.iter_mut()
        .find(|row| matches(row))
        .ok_or(StorageError::NotFound { entity, id })
}

#[async_trait]
impl StorageProvider for InMemoryStorage {
    async fn get_collections(&self, user_id: &str) -> StorageResult<Vec<Collection>> {
        let tables = self.tables.read().await;
        Ok(tables
            .collections
            .iter()
            .filter(|c| !c.is_deleted && c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_collection(
        &self,
        user_id: &str,
        input: CreateCollectionInput,
    ) -> StorageResult<Collection> {
        let collection = Collection::new(user_id, input);
        self.tables.write().await.collections.push(collection.clone());
        info!("Created collection {} ({})", collection.name, collection.id);
        Ok(collection)
    }

    async fn update_collection(
        &self,
        id: Uuid,
        input: UpdateCollectionInput,
    ) -> StorageResult<Collection> {
        let mut tables = self.tables.write().await;
        let collection = live_mut(&mut tables.collections, "collection", id, |c| {
            c.id == id && !c.is_deleted
        })?;
        collection.apply_update(input);
        Ok(collection.clone())
    }

    async fn delete_collection(&self, id: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let collection = live_mut(&mut tables.collections, "collection", id, |c| {
            c.id == id && !c.is_deleted
        })?;
        collection.is_deleted = true;
        collection.updated_at = next_updated_at(collection.updated_at);

        for request in tables
            .requests
            .iter_mut()
            .filter(|r| r.collection_id == id && !r.is_deleted)
        {
            request.is_deleted = true;
            request.updated_at = next_updated_at(request.updated_at);
        }
        debug!("Soft deleted collection {}", id);
        Ok(())
    }

    async fn get_requests(&self, collection_id: Uuid) -> StorageResult<Vec<Request>> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests
            .iter()
            .filter(|r| !r.is_deleted && r.collection_id == collection_id)
            .cloned()
            .collect())
    }

    async fn get_request(&self, id: Uuid) -> StorageResult<Option<Request>> {
        let tables = self.tables.read().await;
        Ok(tables
            .requests
            .iter()
            .find(|r| r.id == id && !r.is_deleted)
            .cloned())
    }

    async fn create_request(&self, input: CreateRequestInput) -> StorageResult<Request> {
        let mut tables = self.tables.write().await;
        let collection_id = input.collection_id;
        if !tables
            .collections
            .iter()
            .any(|c| c.id == collection_id && !c.is_deleted)
        {
            return Err(StorageError::NotFound {
                entity: "collection",
                id: collection_id,
            });
        }
        let request = Request::new(input);
        tables.requests.push(request.clone());
        debug!("Created request {} ({})", request.name, request.id);
        Ok(request)
    }

    async fn update_request(&self, id: Uuid, input: UpdateRequestInput) -> StorageResult<Request> {
        let mut tables = self.tables.write().await;
        let request = live_mut(&mut tables.requests, "request", id, |r| {
            r.id == id && !r.is_deleted
        })?;
        request.apply_update(input);
        Ok(request.clone())
    }

    async fn delete_request(&self, id: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let request = live_mut(&mut tables.requests, "request", id, |r| {
            r.id == id && !r.is_deleted
        })?;
        request.is_deleted = true;
        request.updated_at = next_updated_at(request.updated_at);
        Ok(())
    }

    async fn get_environments(&self) -> StorageResult<Vec<Environment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .environments
            .iter()
            .filter(|e| !e.is_deleted)
            .cloned()
            .collect())
    }

    async fn create_environment(&self, input: CreateEnvironmentInput) -> StorageResult<Environment> {
        let environment = Environment::new(input);
        self.tables
            .write()
            .await
            .environments
            .push(environment.clone());
        Ok(environment)
    }

    async fn update_environment(
        &self,
        id: Uuid,
        input: UpdateEnvironmentInput,
    ) -> StorageResult<Environment> {
        let mut tables = self.tables.write().await;
        let environment = live_mut(&mut tables.environments, "environment", id, |e| {
            e.id == id && !e.is_deleted
        })?;
        environment.apply_update(input);
        Ok(environment.clone())
    }

    async fn delete_environment(&self, id: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let environment = live_mut(&mut tables.environments, "environment", id, |e| {
            e.id == id && !e.is_deleted
        })?;
        environment.is_deleted = true;
        environment.updated_at = next_updated_at(environment.updated_at);
        Ok(())
    }

    async fn get_history(&self, user_id: &str) -> StorageResult<Vec<HistoryEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .history
            .iter()
            .rev()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_to_history(
        &self,
        user_id: &str,
        input: AddToHistoryInput,
    ) -> StorageResult<HistoryEntry> {
        let entry = HistoryEntry::new(user_id, input);
        self.tables.write().await.history.push(entry.clone());
        Ok(entry)
    }

    async fn clear_history(&self, user_id: &str) -> StorageResult<()> {
        self.tables
            .write()
            .await
            .history
            .retain(|h| h.user_id != user_id);
        Ok(())
    }

    async fn delete_history_item(&self, id: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.history.len();
        tables.history.retain(|h| h.id != id);
        if tables.history.len() == before {
            return Err(StorageError::NotFound {
                entity: "history entry",
                id,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage_with_collection() -> (InMemoryStorage, Collection) {
        let storage = InMemoryStorage::new();
        let collection = storage
            .create_collection(
                "user-1",
                CreateCollectionInput {
                    name: "Discovered API".to_string(),
                    headers: None,
                },
            )
            .await
            .unwrap();
        (storage, collection)
    }

    fn request_input(collection_id: Uuid, method: &str, url: &str) -> CreateRequestInput {
        CreateRequestInput {
            collection_id,
            name: format!("{} {}", method, url),
            method: method.to_string(),
            url: url.to_string(),
            headers: None,
            body: None,
        }
    }

    fn history_input(url: &str) -> AddToHistoryInput {
        AddToHistoryInput {
            method: "GET".to_string(),
            url: url.to_string(),
            status: 200,
            duration: 12,
            request_headers: "{}".to_string(),
            request_body: None,
            response_headers: "{}".to_string(),
            response_body: Some("[]".to_string()),
        }
    }

    #[tokio::test]
    async fn test_collections_are_scoped_per_user() {
        let (storage, collection) = storage_with_collection().await;
        let mine = storage.get_collections("user-1").await.unwrap();
        assert_eq!(mine, vec![collection]);
        assert!(storage.get_collections("user-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_collection_keeps_timestamps_monotonic() {
        let (storage, collection) = storage_with_collection().await;
        let updated = storage
            .update_collection(
                collection.id,
                UpdateCollectionInput {
                    name: Some("Renamed".to_string()),
                    headers: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert!(updated.updated_at >= collection.updated_at);
        assert_eq!(updated.created_at, collection.created_at);
    }

    #[tokio::test]
    async fn test_soft_deleted_collection_hides_its_requests() {
        let (storage, collection) = storage_with_collection().await;
        let request = storage
            .create_request(request_input(collection.id, "GET", "/users"))
            .await
            .unwrap();

        storage.delete_collection(collection.id).await.unwrap();

        assert!(storage.get_collections("user-1").await.unwrap().is_empty());
        assert!(storage.get_requests(collection.id).await.unwrap().is_empty());
        assert_eq!(storage.get_request(request.id).await.unwrap(), None);
        assert_eq!(storage.tables.read().await.requests.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let storage = InMemoryStorage::new();
        let id = Uuid::new_v4();

        let err = storage
            .update_request(id, UpdateRequestInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { entity: "request", .. }));

        let err = storage
            .create_request(request_input(id, "GET", "/"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { entity: "collection", .. }));

        assert!(storage.delete_environment(id).await.is_err());
        assert!(storage.delete_history_item(id).await.is_err());
    }

    #[tokio::test]
    async fn test_deleting_twice_fails() {
        let (storage, collection) = storage_with_collection().await;
        let request = storage
            .create_request(request_input(collection.id, "GET", "/users"))
            .await
            .unwrap();
        storage.delete_request(request.id).await.unwrap();
        assert!(storage.delete_request(request.id).await.is_err());
    }

    #[tokio::test]
    async fn test_environment_lifecycle() {
        let storage = InMemoryStorage::new();
        let env = storage
            .create_environment(CreateEnvironmentInput {
                name: "local".to_string(),
                variables: r#"{"baseUrl":"http://localhost:3000"}"#.to_string(),
            })
            .await
            .unwrap();

        let updated = storage
            .update_environment(
                env.id,
                UpdateEnvironmentInput {
                    name: Some("dev".to_string()),
                    variables: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "dev");
        assert_eq!(updated.variables, env.variables);

        storage.delete_environment(env.id).await.unwrap();
        assert!(storage.get_environments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_newest_first_and_clear() {
        let storage = InMemoryStorage::new();
        storage.add_to_history("user-1", history_input("/a")).await.unwrap();
        let second = storage.add_to_history("user-1", history_input("/b")).await.unwrap();
        storage.add_to_history("user-2", history_input("/c")).await.unwrap();

        let history = storage.get_history("user-1").await.unwrap();
        let urls: Vec<_> = history.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["/b", "/a"]);

        storage.delete_history_item(second.id).await.unwrap();
        assert_eq!(storage.get_history("user-1").await.unwrap().len(), 1);

        storage.clear_history("user-1").await.unwrap();
        assert!(storage.get_history("user-1").await.unwrap().is_empty());
        assert_eq!(storage.get_history("user-2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_default_hooks_succeed() {
        let storage = InMemoryStorage::new();
        storage.init().await.unwrap();
        storage.clear_cache().await.unwrap();
    }
}
