//! Persisting scan results through a [`StorageProvider`].
//!
//! Requests are keyed by `(METHOD, path template)` inside the target collection, so
//! re-running a scan over an unchanged route tree updates rows instead of duplicating
//! them.

use crate::discovery::ScannedEndpoint;
use crate::exporter::example_body;
use crate::storage::{
    CreateCollectionInput, CreateRequestInput, StorageError, StorageProvider, UpdateRequestInput,
};
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PersistOptions {
    /// Collection that receives the requests; created when missing
    pub collection_name: String,
    /// Headers stored on every request
    pub headers: BTreeMap<String, String>,
    /// Maximum storage calls in flight; 1 is sequential
    pub concurrency: usize,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            collection_name: "Discovered API".to_string(),
            headers: BTreeMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistAction {
    Created,
    Updated,
}

/// What happened to one endpoint
#[derive(Debug)]
pub struct PersistOutcome {
    pub method: String,
    pub path: String,
    pub result: Result<(PersistAction, Uuid), StorageError>,
}

/// Summary of a persistence run, outcomes in input order
#[derive(Debug)]
pub struct PersistReport {
    pub collection_id: Uuid,
    pub outcomes: Vec<PersistOutcome>,
}

impl PersistReport {
    pub fn count(&self, action: PersistAction) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok((a, _)) if a == action))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PersistOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Store every scanned endpoint as a request in the named collection.
///
/// # Errors
///
/// Only failures to find or create the collection abort the run. Per-endpoint storage
/// errors are reported in the returned [`PersistReport`] and not retried.
pub async fn persist_scan<P>(
    provider: &P,
    user_id: &str,
    endpoints: &[ScannedEndpoint],
    options: &PersistOptions,
) -> Result<PersistReport, StorageError>
where
    P: StorageProvider + ?Sized,
{
    let collection = match provider
        .get_collections(user_id)
        .await?
        .into_iter()
        .find(|c| c.name == options.collection_name)
    {
        Some(existing) => existing,
        None => {
            provider
                .create_collection(
                    user_id,
                    CreateCollectionInput {
                        name: options.collection_name.clone(),
                        headers: None,
                    },
                )
                .await?
        }
    };

    let existing: HashMap<(String, String), Uuid> = provider
        .get_requests(collection.id)
        .await?
        .into_iter()
        .map(|r| ((r.method.to_uppercase(), r.url), r.id))
        .collect();
    debug!(
        "Collection {} holds {} existing requests",
        collection.name,
        existing.len()
    );

    let headers = serde_json::to_string(&options.headers)
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    let outcomes: Vec<PersistOutcome> = stream::iter(endpoints)
        .map(|endpoint| {
            let method = endpoint.method().as_str().to_string();
            let path = endpoint.template().to_string();
            let existing_id = existing.get(&(method.clone(), path.clone())).copied();
            let headers = headers.clone();
            let collection_id = collection.id;
            async move {
                let result = save_endpoint(
                    provider,
                    collection_id,
                    existing_id,
                    endpoint,
                    &method,
                    &path,
                    headers,
                )
                .await;
                if let Err(ref e) = result {
                    warn!("Failed to persist {} {}: {}", method, path, e);
                }
                PersistOutcome {
                    method,
                    path,
                    result,
                }
            }
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let report = PersistReport {
        collection_id: collection.id,
        outcomes,
    };
    info!(
        "Persisted scan into '{}': {} created, {} updated, {} failed",
        collection.name,
        report.count(PersistAction::Created),
        report.count(PersistAction::Updated),
        report.failures().count()
    );
    Ok(report)
}

async fn save_endpoint<P>(
    provider: &P,
    collection_id: Uuid,
    existing_id: Option<Uuid>,
    endpoint: &ScannedEndpoint,
    method: &str,
    path: &str,
    headers: String,
) -> Result<(PersistAction, Uuid), StorageError>
where
    P: StorageProvider + ?Sized,
{
    let body = serde_json::to_string_pretty(&example_body(&endpoint.schema))
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    let name = format!("{} {}", method, path);

    match existing_id {
        Some(id) => {
            provider
                .update_request(
                    id,
                    UpdateRequestInput {
                        name: Some(name),
                        method: Some(method.to_string()),
                        url: Some(path.to_string()),
                        headers: Some(headers),
                        body: Some(Some(body)),
                    },
                )
                .await?;
            Ok((PersistAction::Updated, id))
        }
        None => {
            let request = provider
                .create_request(CreateRequestInput {
                    collection_id,
                    name,
                    method: method.to_string(),
                    url: path.to_string(),
                    headers: Some(headers),
                    body: Some(body),
                })
                .await?;
            Ok((PersistAction::Created, request.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::SchemaSource;
    use crate::path_compiler::CompiledPath;
    use crate::route_tree::HttpMethod;
    use crate::schema::{CanonicalSchema, PrimitiveKind};
    use crate::storage::InMemoryStorage;
    use crate::walker::DiscoveredEndpoint;

    fn scanned(method: HttpMethod, path: &str, schema: Option<CanonicalSchema>) -> ScannedEndpoint {
        ScannedEndpoint {
            endpoint: DiscoveredEndpoint {
                method,
                path: CompiledPath {
                    template: path.to_string(),
                    opaque: false,
                },
                handler_chain: Vec::new(),
            },
            source: schema.as_ref().map(|_| SchemaSource::Direct),
            schema: schema.unwrap_or_else(CanonicalSchema::unknown),
        }
    }

    fn endpoints() -> Vec<ScannedEndpoint> {
        vec![
            scanned(HttpMethod::Get, "/users", None),
            scanned(
                HttpMethod::Post,
                "/users",
                Some(CanonicalSchema::object([(
                    "name",
                    CanonicalSchema::primitive(PrimitiveKind::String),
                )])),
            ),
            scanned(HttpMethod::Delete, "/users/:id", None),
        ]
    }

    #[tokio::test]
    async fn test_first_run_creates_collection_and_requests() {
        let storage = InMemoryStorage::new();
        let report = persist_scan(&storage, "user-1", &endpoints(), &PersistOptions::default())
            .await
            .unwrap();

        assert_eq!(report.count(PersistAction::Created), 3);
        let collections = storage.get_collections("user-1").await.unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].name, "Discovered API");

        let requests = storage.get_requests(report.collection_id).await.unwrap();
        let post = requests.iter().find(|r| r.method == "POST").unwrap();
        assert_eq!(post.name, "POST /users");
        assert_eq!(post.url, "/users");
        let body: serde_json::Value = serde_json::from_str(post.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "name": "" }));
        assert_eq!(
            post.headers.as_deref(),
            Some(r#"{"Content-Type":"application/json"}"#)
        );
    }

    #[tokio::test]
    async fn test_second_run_updates_instead_of_duplicating() {
        let storage = InMemoryStorage::new();
        let options = PersistOptions::default();
        let first = persist_scan(&storage, "user-1", &endpoints(), &options)
            .await
            .unwrap();
        let second = persist_scan(&storage, "user-1", &endpoints(), &options)
            .await
            .unwrap();

        assert_eq!(first.collection_id, second.collection_id);
        assert_eq!(second.count(PersistAction::Updated), 3);
        assert_eq!(second.count(PersistAction::Created), 0);
        assert_eq!(
            storage.get_requests(first.collection_id).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn test_outcomes_follow_input_order_when_sequential() {
        let storage = InMemoryStorage::new();
        let options = PersistOptions {
            concurrency: 1,
            ..PersistOptions::default()
        };
        let report = persist_scan(&storage, "user-1", &endpoints(), &options)
            .await
            .unwrap();
        let keys: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| format!("{} {}", o.method, o.path))
            .collect();
        assert_eq!(keys, vec!["GET /users", "POST /users", "DELETE /users/:id"]);

        let stored: Vec<_> = storage
            .get_requests(report.collection_id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(stored, keys);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_treated_as_sequential() {
        let storage = InMemoryStorage::new();
        let options = PersistOptions {
            concurrency: 0,
            ..PersistOptions::default()
        };
        let report = persist_scan(&storage, "user-1", &endpoints(), &options)
            .await
            .unwrap();
        assert_eq!(report.failures().count(), 0);
        assert_eq!(report.outcomes.len(), 3);
    }
}
