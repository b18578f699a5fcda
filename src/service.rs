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

// Food service facade
//
// Translates remote CRUD calls into storage backend calls and maps every
// failure to exactly one status. Backend detail is logged here and never
// returned to the caller.

use crate::protocol::{FoodMessage, StatusCode};
use crate::record::{validate_id, FoodItem, ValidationError};
use crate::storage::{StorageBackend, StoreError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

const INTERNAL_MESSAGE: &str = "internal error";

/// Service-level failure: a stable code plus a caller-safe message
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for Status {}

impl From<ValidationError> for Status {
    fn from(err: ValidationError) -> Self {
        Status::new(StatusCode::InvalidArgument, err.to_string())
    }
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) => Status::new(StatusCode::AlreadyExists, err.to_string()),
            StoreError::NotFound(_) => Status::new(StatusCode::NotFound, err.to_string()),
            StoreError::Backend(ref detail) => {
                error!("Storage backend failure: {:#}", detail);
                Status::new(StatusCode::Internal, INTERNAL_MESSAGE)
            }
        }
    }
}

impl TryFrom<FoodMessage> for FoodItem {
    type Error = ValidationError;

    fn try_from(message: FoodMessage) -> Result<Self, Self::Error> {
        FoodItem::new(
            message.id,
            message.name,
            message.protein,
            message.fat,
            message.carbs,
        )
    }
}

/// CRUD facade over one storage backend.
///
/// Holds no cache: every call goes to the backend. Cloning is cheap and
/// shares the same backend.
#[derive(Clone)]
pub struct FoodService {
    store: Arc<dyn StorageBackend>,
}

impl FoodService {
    pub fn new(store: Arc<dyn StorageBackend>) -> Self {
        Self { store }
    }

    pub fn backend_type(&self) -> &str {
        self.store.backend_type()
    }

    pub async fn create_food(&self, message: FoodMessage) -> Result<FoodMessage, Status> {
        let food = FoodItem::try_from(message)?;
        debug!("create food '{}'", food.id());
        let stored = self.store.create(food).await?;
        Ok(stored.into())
    }

    pub async fn get_food(&self, id: &str) -> Result<FoodMessage, Status> {
        let id = validate_id(id)?;
        debug!("get food '{}'", id);
        let food = self.store.get(&id).await?;
        Ok(food.into())
    }

    pub async fn update_food(&self, message: FoodMessage) -> Result<FoodMessage, Status> {
        let food = FoodItem::try_from(message)?;
        debug!("update food '{}'", food.id());
        let stored = self.store.update(food).await?;
        Ok(stored.into())
    }

    pub async fn delete_food(&self, id: &str) -> Result<(), Status> {
        let id = validate_id(id)?;
        debug!("delete food '{}'", id);
        self.store.delete(&id).await?;
        Ok(())
    }

    pub async fn list_foods(&self) -> Result<Vec<FoodMessage>, Status> {
        let foods = self.store.list().await?;
        debug!("list foods: {} records", foods.len());
        Ok(foods.into_iter().map(FoodMessage::from).collect())
    }
}
