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

// Backend factory for creating storage backends from configuration

use super::backend::StorageBackend;
use super::document::DocumentBackend;
use super::relational::RelationalBackend;
use crate::config::StorageConfig;
use anyhow::{anyhow, bail, Result};
use std::sync::Arc;

pub struct BackendFactory;

impl BackendFactory {
    /// Create storage backend from configuration and prepare it for use.
    ///
    /// The returned backend has already run [`StorageBackend::initialize`],
    /// so the schema or database exists before the first record call.
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>> {
        let backend: Arc<dyn StorageBackend> = match config.backend.as_str() {
            "relational" => {
                let backend_config = config
                    .relational
                    .as_ref()
                    .ok_or_else(|| anyhow!("Relational config missing"))?;

                Arc::new(RelationalBackend::connect(backend_config).await?)
            }

            "document" => {
                let backend_config = config
                    .document
                    .as_ref()
                    .ok_or_else(|| anyhow!("Document config missing"))?;

                Arc::new(DocumentBackend::new(backend_config.clone())?)
            }

            unknown => bail!(
                "Unknown storage backend: '{}'. Supported: relational, document",
                unknown
            ),
        };

        backend.initialize().await?;
        Ok(backend)
    }
}
