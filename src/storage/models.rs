use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Monotonic update timestamp: never earlier than the previous one.
pub(crate) fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}

/// A named group of saved requests owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    /// JSON-encoded default headers
    pub headers: Option<String>,
    #[serde(rename = "is_deleted")]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single saved API request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub name: String,
    pub method: String,
    /// Path template, e.g. `/users/:id`
    pub url: String,
    /// JSON-encoded headers
    pub headers: Option<String>,
    pub body: Option<String>,
    #[serde(rename = "is_deleted")]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Environment variables shared across collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: Uuid,
    pub name: String,
    /// JSON-encoded variable map
    pub variables: String,
    #[serde(rename = "is_deleted")]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A request that was executed, with its response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub user_id: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    /// Round trip in milliseconds
    pub duration: u64,
    pub request_headers: String,
    pub request_body: Option<String>,
    pub response_headers: String,
    pub response_body: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionInput {
    pub name: String,
    #[serde(default)]
    pub headers: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCollectionInput {
    pub name: Option<String>,
    pub headers: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestInput {
    pub collection_id: Uuid,
    pub name: String,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Partial request update; `body: Some(None)` clears the body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequestInput {
    pub name: Option<String>,
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Option<String>,
    #[serde(default)]
    pub body: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnvironmentInput {
    pub name: String,
    pub variables: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnvironmentInput {
    pub name: Option<String>,
    pub variables: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToHistoryInput {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub duration: u64,
    pub request_headers: String,
    #[serde(default)]
    pub request_body: Option<String>,
    pub response_headers: String,
    #[serde(default)]
    pub response_body: Option<String>,
}

impl Collection {
    pub fn new(user_id: &str, input: CreateCollectionInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: input.name,
            headers: input.headers,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateCollectionInput) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(headers) = update.headers {
            self.headers = Some(headers);
        }
        self.updated_at = next_updated_at(self.updated_at);
    }
}

impl Request {
    pub fn new(input: CreateRequestInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            collection_id: input.collection_id,
            name: input.name,
            method: input.method,
            url: input.url,
            headers: input.headers,
            body: input.body,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateRequestInput) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(method) = update.method {
            self.method = method;
        }
        if let Some(url) = update.url {
            self.url = url;
        }
        if let Some(headers) = update.headers {
            self.headers = Some(headers);
        }
        if let Some(body) = update.body {
            self.body = body;
        }
        self.updated_at = next_updated_at(self.updated_at);
    }
}

impl Environment {
    pub fn new(input: CreateEnvironmentInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            variables: input.variables,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: UpdateEnvironmentInput) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(variables) = update.variables {
            self.variables = variables;
        }
        self.updated_at = next_updated_at(self.updated_at);
    }
}

impl HistoryEntry {
    pub fn new(user_id: &str, input: AddToHistoryInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            method: input.method,
            url: input.url,
            status: input.status,
            duration: input.duration,
            request_headers: input.request_headers,
            request_body: input.request_body,
            response_headers: input.response_headers,
            response_body: input.response_body,
            created_at: Utc::now(),
        }
    }
}
