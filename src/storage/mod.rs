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

// Storage backend module
//
// Provides a trait-based abstraction over the engines that hold food
// records, so the loader and the service never name a concrete engine:
// - relational: SeaORM over MySQL (or SQLite for local runs)
// - document: CouchDB-compatible HTTP document store

pub mod backend;
pub mod document;
pub mod factory;
pub mod relational;

pub use backend::{StorageBackend, StoreError, StoreResult};
pub use document::DocumentBackend;
pub use factory::BackendFactory;
pub use relational::RelationalBackend;
