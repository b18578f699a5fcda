// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Document store backend implementation (CouchDB HTTP API)
//
// Each food is one document whose `_id` is the food id. Writes without a
// revision are create-only on the server side, so a duplicate insert comes
// back as 409 Conflict instead of overwriting. Updates and deletes carry the
// revision read just before, so a concurrent writer also surfaces as 409.
//
// CouchDB reserves keys starting with `_`. Such ids, and ids starting with
// the `~` escape itself, are stored under a key with one extra leading `~`.

use super::backend::{StorageBackend, StoreError, StoreResult};
use crate::config::DocumentConfig;
use crate::record::FoodItem;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Food as stored in the document database
#[derive(Debug, Serialize, Deserialize)]
struct FoodDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    name: String,
    protein: f64,
    fat: f64,
    carbs: f64,
}

const KEY_ESCAPE: char = '~';

/// Document key for a food id
fn document_key(id: &str) -> Cow<'_, str> {
    if id.starts_with('_') || id.starts_with(KEY_ESCAPE) {
        Cow::Owned(format!("{}{}", KEY_ESCAPE, id))
    } else {
        Cow::Borrowed(id)
    }
}

/// Food id stored under a document key
fn food_id(mut key: String) -> String {
    if key.starts_with(KEY_ESCAPE) {
        key.remove(0);
    }
    key
}

impl FoodDocument {
    fn new(food: &FoodItem, rev: Option<String>) -> Self {
        Self {
            id: document_key(food.id()).into_owned(),
            rev,
            name: food.name().to_string(),
            protein: food.protein(),
            fat: food.fat(),
            carbs: food.carbs(),
        }
    }
}

impl From<FoodDocument> for FoodItem {
    fn from(doc: FoodDocument) -> Self {
        FoodItem::from_stored(food_id(doc.id), doc.name, doc.protein, doc.fat, doc.carbs)
    }
}

#[derive(Debug, Deserialize)]
struct AllDocs {
    rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
struct AllDocsRow {
    id: String,
    #[serde(default)]
    doc: Option<serde_json::Value>,
}

/// CouchDB-compatible document store client
pub struct DocumentBackend {
    client: Client,
    base_url: Url,
    database: String,
    credentials: Option<(String, String)>,
}

impl DocumentBackend {
    pub fn new(config: DocumentConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.uri)
            .with_context(|| format!("Invalid document store URI: {}", config.uri))?;
        if base_url.cannot_be_a_base() {
            bail!("Document store URI cannot be used as a base: {}", config.uri);
        }

        let client = reqwest::ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        let credentials = match (config.username, config.password) {
            (Some(user), password) => Some((user, password.unwrap_or_default())),
            (None, _) => None,
        };

        Ok(Self {
            client,
            base_url,
            database: config.database,
            credentials,
        })
    }

    fn url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Document store URI cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn document_url(&self, id: &str) -> anyhow::Result<Url> {
        let key = document_key(id);
        self.url(&[self.database.as_str(), key.as_ref()])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    /// Create database if it doesn't exist
    async fn ensure_database(&self) -> anyhow::Result<()> {
        let url = self.url(&[self.database.as_str()])?;
        let response = self
            .request(Method::PUT, url)
            .send()
            .await
            .context("Failed to create database")?;

        match response.status() {
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                info!("Database '{}' created successfully", self.database);
                Ok(())
            }
            StatusCode::PRECONDITION_FAILED => {
                info!("Database '{}' already exists", self.database);
                Ok(())
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                bail!("Failed to create database: {} - {}", status, error_text)
            }
        }
    }

    /// Current revision and body of a food document
    async fn fetch(&self, id: &str) -> StoreResult<FoodDocument> {
        let response = self
            .request(Method::GET, self.document_url(id)?)
            .send()
            .await
            .context("Failed to send request")?;

        match response.status() {
            StatusCode::OK => Ok(response
                .json::<FoodDocument>()
                .await
                .with_context(|| format!("Failed to decode food document '{}'", id))?),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.to_string())),
            _ => Err(unexpected(response, "read").await),
        }
    }

    async fn put(&self, food: &FoodItem, rev: Option<String>) -> anyhow::Result<Response> {
        self.request(Method::PUT, self.document_url(food.id())?)
            .json(&FoodDocument::new(food, rev))
            .send()
            .await
            .context("Failed to send request")
    }
}

async fn unexpected(response: Response, action: &str) -> StoreError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    StoreError::Backend(anyhow!(
        "Document store {} failed with status {}: {}",
        action,
        status,
        error_text
    ))
}

fn conflict(id: &str) -> StoreError {
    StoreError::Backend(anyhow!("Food '{}' was modified concurrently", id))
}

#[async_trait]
impl StorageBackend for DocumentBackend {
    async fn initialize(&self) -> StoreResult<()> {
        self.ensure_database().await.map_err(StoreError::Backend)
    }

    async fn create(&self, food: FoodItem) -> StoreResult<FoodItem> {
        let response = self.put(&food, None).await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                debug!("Inserted food '{}'", food.id());
                Ok(food)
            }
            StatusCode::CONFLICT => Err(StoreError::AlreadyExists(food.id().to_string())),
            _ => Err(unexpected(response, "insert").await),
        }
    }

    async fn get(&self, id: &str) -> StoreResult<FoodItem> {
        self.fetch(id).await.map(FoodItem::from)
    }

    async fn update(&self, food: FoodItem) -> StoreResult<FoodItem> {
        let current = self.fetch(food.id()).await?;
        let response = self.put(&food, current.rev).await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                debug!("Updated food '{}'", food.id());
                Ok(food)
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(food.id().to_string())),
            StatusCode::CONFLICT => Err(conflict(food.id())),
            _ => Err(unexpected(response, "update").await),
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let current = self.fetch(id).await?;

        let mut url = self.document_url(id)?;
        if let Some(rev) = &current.rev {
            url.query_pairs_mut().append_pair("rev", rev);
        }

        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .context("Failed to send request")?;

        match response.status() {
            StatusCode::OK | StatusCode::ACCEPTED => {
                debug!("Deleted food '{}'", id);
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.to_string())),
            StatusCode::CONFLICT => Err(conflict(id)),
            _ => Err(unexpected(response, "delete").await),
        }
    }

    async fn list(&self) -> StoreResult<Vec<FoodItem>> {
        let mut url = self.url(&[self.database.as_str(), "_all_docs"])?;
        url.query_pairs_mut().append_pair("include_docs", "true");

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            return Err(unexpected(response, "list").await);
        }

        let all_docs: AllDocs = response
            .json()
            .await
            .context("Failed to decode document listing")?;

        all_docs
            .rows
            .into_iter()
            .filter(|row| !row.id.starts_with('_'))
            .filter_map(|row| row.doc)
            .map(|doc| {
                serde_json::from_value::<FoodDocument>(doc)
                    .map(FoodItem::from)
                    .context("Failed to decode food document")
                    .map_err(StoreError::Backend)
            })
            .collect()
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        let url = self.url(&["_up"])?;
        match self.request(Method::GET, url).send().await {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                warn!("Health check failed with status: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Health check error: {}", e);
                Ok(false)
            }
        }
    }

    async fn close(&self) -> StoreResult<()> {
        // HTTP connections are pooled per client and go away with it
        info!("Releasing document store client for '{}'", self.database);
        Ok(())
    }

    fn backend_type(&self) -> &str {
        "document"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(uri: &str) -> DocumentBackend {
        DocumentBackend::new(DocumentConfig {
            uri: uri.to_string(),
            ..DocumentConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_document_url_encodes_id() {
        let backend = backend("http://localhost:5984");
        let url = backend.document_url("a/b c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5984/food_db/a%2Fb%20c");
    }

    #[test]
    fn test_reserved_ids_escaped() {
        let backend = backend("http://localhost:5984");
        assert_eq!(
            backend.document_url("_design/x").unwrap().as_str(),
            "http://localhost:5984/food_db/~_design%2Fx"
        );
        assert_eq!(
            backend.document_url("~tilde").unwrap().as_str(),
            "http://localhost:5984/food_db/~~tilde"
        );

        for id in ["_x", "~", "~_", "plain", "mid_~dle"] {
            assert_eq!(food_id(document_key(id).into_owned()), id);
        }
        assert_eq!(document_key("plain"), "plain");
    }

    #[test]
    fn test_url_with_base_path() {
        let backend = backend("http://couch.local/proxy/");
        let url = backend.url(&["food_db", "_all_docs"]).unwrap();
        assert_eq!(url.as_str(), "http://couch.local/proxy/food_db/_all_docs");
    }

    #[test]
    fn test_invalid_uri_rejected() {
        let result = DocumentBackend::new(DocumentConfig {
            uri: "not a uri".to_string(),
            ..DocumentConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_document_serialization_omits_missing_rev() {
        let food = FoodItem::new("1", "Apple", 0.3, 0.2, 14.0).unwrap();
        let json = serde_json::to_value(FoodDocument::new(&food, None)).unwrap();
        assert_eq!(json["_id"], "1");
        assert!(json.get("_rev").is_none());

        let json = serde_json::to_value(FoodDocument::new(&food, Some("2-abc".into()))).unwrap();
        assert_eq!(json["_rev"], "2-abc");
    }
}
