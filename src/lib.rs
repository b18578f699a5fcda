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

// Food record service with interchangeable storage backends
//
// This is a small record service for nutritional data that:
// - Validates food records (id, name, protein, fat, carbs)
// - Stores them in a relational database or a document store behind one trait
// - Seeds the store once at startup from a CSV file
// - Serves create/get/update/delete/list as protobuf requests over Zenoh

pub mod config;
pub mod protocol;
pub mod record;
pub mod rpc;
pub mod seed;
pub mod service;
pub mod storage;

// Re-export main types
pub use config::{load_config, load_config_with_env, FoodServiceConfig};
pub use protocol::{FoodMessage, FoodRequest, FoodResponse, Operation, StatusCode};
pub use record::{FoodField, FoodItem, ValidationError};
pub use rpc::{dispatch, RpcServer};
pub use seed::{read_seed_file, BulkLoader, LoadError, LoadReport};
pub use service::{FoodService, Status};
pub use storage::{BackendFactory, StorageBackend, StoreError};
