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

// Bulk loader seeding a storage backend from tabular rows
//
// Rows are validated and written one at a time, in input order. The first
// failure stops the load; rows written before it stay written. The loader
// must run alone against the store, before the service takes traffic.

use crate::config::ConflictPolicy;
use crate::record::{FoodItem, ValidationError};
use crate::storage::{StorageBackend, StoreError};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One raw seed row: `[id, name, protein, fat, carbs, ..]`
pub type SeedRow = Vec<String>;

/// Why a load stopped. `row` is the 0-based index of the failing row.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("row {row}: {source}")]
    Invalid {
        row: usize,
        #[source]
        source: ValidationError,
    },

    #[error("row {row}: {source}")]
    Store {
        row: usize,
        #[source]
        source: StoreError,
    },

    #[error("load cancelled before row {row} completed")]
    Cancelled { row: usize },
}

impl LoadError {
    pub fn row(&self) -> usize {
        match self {
            LoadError::Invalid { row, .. }
            | LoadError::Store { row, .. }
            | LoadError::Cancelled { row } => *row,
        }
    }
}

/// Outcome of one load: rows written, rows skipped, and the error that
/// stopped it, if any.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub inserted: usize,
    pub skipped: usize,
    pub error: Option<LoadError>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Turn a failed report into an error for callers that treat seeding as fatal
    pub fn into_result(self) -> std::result::Result<usize, LoadError> {
        match self.error {
            None => Ok(self.inserted),
            Some(err) => Err(err),
        }
    }
}

/// Seeds a storage backend from raw rows
pub struct BulkLoader {
    store: Arc<dyn StorageBackend>,
    on_conflict: ConflictPolicy,
}

impl BulkLoader {
    pub fn new(store: Arc<dyn StorageBackend>) -> Self {
        Self {
            store,
            on_conflict: ConflictPolicy::Fail,
        }
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }

    /// Validate and insert every row, stopping at the first error
    pub async fn load<I>(&self, rows: I) -> LoadReport
    where
        I: IntoIterator<Item = SeedRow>,
    {
        self.load_until_cancelled(rows, &CancellationToken::new())
            .await
    }

    /// Like [`BulkLoader::load`], but stops when `cancel` fires. A write in
    /// flight at that moment is abandoned; whether it landed depends on the
    /// engine.
    pub async fn load_until_cancelled<I>(&self, rows: I, cancel: &CancellationToken) -> LoadReport
    where
        I: IntoIterator<Item = SeedRow>,
    {
        let mut report = LoadReport::default();

        for (row, fields) in rows.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.error = Some(LoadError::Cancelled { row });
                break;
            }

            let food = match FoodItem::from_row(&fields) {
                Ok(food) => food,
                Err(source) => {
                    report.error = Some(LoadError::Invalid { row, source });
                    break;
                }
            };
            let id = food.id().to_string();

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.error = Some(LoadError::Cancelled { row });
                    break;
                }
                result = self.store.create(food) => result,
            };

            match result {
                Ok(_) => {
                    debug!("Seeded food '{}' from row {}", id, row);
                    report.inserted += 1;
                }
                Err(StoreError::AlreadyExists(_)) if self.on_conflict == ConflictPolicy::Skip => {
                    debug!("Food '{}' from row {} already stored, skipping", id, row);
                    report.skipped += 1;
                }
                Err(source) => {
                    report.error = Some(LoadError::Store { row, source });
                    break;
                }
            }
        }

        match &report.error {
            None => info!(
                "Seeded {} foods into {} backend ({} skipped)",
                report.inserted,
                self.store.backend_type(),
                report.skipped
            ),
            Some(err) => warn!(
                "Seeding stopped after {} foods: {}",
                report.inserted, err
            ),
        }

        report
    }
}

/// Read a header-less CSV seed file into raw rows.
///
/// Rows may have any number of fields; length checks happen during
/// validation so the failing row index is reported.
pub fn read_seed_file<P: AsRef<Path>>(path: P) -> Result<Vec<SeedRow>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open seed file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to read row {} of {}", index, path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    info!("Read {} seed rows from {}", rows.len(), path.display());
    Ok(rows)
}
