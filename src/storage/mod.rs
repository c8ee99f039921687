//! Persistence contract for discovered requests.
//!
//! The pipeline only talks to [`StorageProvider`]; [`InMemoryStorage`] is the reference
//! implementation used by the binary and the tests.

pub mod memory;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use memory::InMemoryStorage;
pub use models::{
    AddToHistoryInput, Collection, CreateCollectionInput, CreateEnvironmentInput,
    CreateRequestInput, Environment, HistoryEntry, Request, UpdateCollectionInput,
    UpdateEnvironmentInput, UpdateRequestInput,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend for collections, requests, environments and history.
///
/// Deletes of collections, requests and environments are soft: rows stay behind with
/// `is_deleted` set and are skipped by every listing and lookup.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Prepare the backend; a no-op unless overridden
    async fn init(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn get_collections(&self, user_id: &str) -> StorageResult<Vec<Collection>>;
    async fn create_collection(
        &self,
        user_id: &str,
        input: CreateCollectionInput,
    ) -> StorageResult<Collection>;
    async fn update_collection(
        &self,
        id: Uuid,
        input: UpdateCollectionInput,
    ) -> StorageResult<Collection>;
    /// Soft delete the collection and its requests
    async fn delete_collection(&self, id: Uuid) -> StorageResult<()>;

    async fn get_requests(&self, collection_id: Uuid) -> StorageResult<Vec<Request>>;
    async fn get_request(&self, id: Uuid) -> StorageResult<Option<Request>>;
    async fn create_request(&self, input: CreateRequestInput) -> StorageResult<Request>;
    async fn update_request(&self, id: Uuid, input: UpdateRequestInput) -> StorageResult<Request>;
    async fn delete_request(&self, id: Uuid) -> StorageResult<()>;

    async fn get_environments(&self) -> StorageResult<Vec<Environment>>;
    async fn create_environment(&self, input: CreateEnvironmentInput) -> StorageResult<Environment>;
    async fn update_environment(
        &self,
        id: Uuid,
        input: UpdateEnvironmentInput,
    ) -> StorageResult<Environment>;
    async fn delete_environment(&self, id: Uuid) -> StorageResult<()>;

    /// Newest entries first
    async fn get_history(&self, user_id: &str) -> StorageResult<Vec<HistoryEntry>>;
    async fn add_to_history(
        &self,
        user_id: &str,
        input: AddToHistoryInput,
    ) -> StorageResult<HistoryEntry>;
    async fn clear_history(&self, user_id: &str) -> StorageResult<()>;
    async fn delete_history_item(&self, id: Uuid) -> StorageResult<()>;

    /// Drop any cached reads; a no-op unless overridden
    async fn clear_cache(&self) -> StorageResult<()> {
        Ok(())
    }
}
