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

// Storage backend trait for food records

use crate::record::FoodItem;
use async_trait::async_trait;
use thiserror::Error;

/// Errors every storage backend reports with the same meaning
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("food '{0}' already exists")]
    AlreadyExists(String),

    #[error("food '{0}' not found")]
    NotFound(String),

    /// Engine-level failure (connectivity, encoding, conflicting writers).
    /// Carries the full detail for logs; callers only see a generic failure.
    #[error("storage backend failure: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Generic storage backend for food records
///
/// Every implementation honours the same contract so the bulk loader and the
/// food service are written once against this trait:
///
/// * `create` rejects an existing id with [`StoreError::AlreadyExists`]
/// * `get`, `update` and `delete` report a missing id with [`StoreError::NotFound`]
/// * `list` returns every record in no particular order
///
/// Implementations must be safe to call from many tasks at once. They rely on
/// the engine's own atomicity (primary keys, document revisions) rather than a
/// lock around the whole store.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Prepare the engine for use (create table/database if needed).
    /// Running it again against a ready engine is a no-op.
    async fn initialize(&self) -> StoreResult<()>;

    /// Insert a new record and return it unchanged
    async fn create(&self, food: FoodItem) -> StoreResult<FoodItem>;

    /// Fetch the record stored under `id`
    async fn get(&self, id: &str) -> StoreResult<FoodItem>;

    /// Replace the mutable fields of the record identified by `food.id()`
    async fn update(&self, food: FoodItem) -> StoreResult<FoodItem>;

    /// Remove the record. Deleting an absent id is an error, not a no-op.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// All stored records
    async fn list(&self) -> StoreResult<Vec<FoodItem>>;

    /// Health check
    async fn health_check(&self) -> anyhow::Result<bool>;

    /// Release the engine connection. Called once during shutdown, after the
    /// last in-flight call has finished.
    async fn close(&self) -> StoreResult<()>;

    /// Get backend type identifier
    fn backend_type(&self) -> &str;
}
